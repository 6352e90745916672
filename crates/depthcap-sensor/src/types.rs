//! 采集参数与帧数据类型

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 容器压缩编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Codec {
    H264,
    #[default]
    H265,
    Lossless,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::H264 => "H264",
            Codec::H265 => "H265",
            Codec::Lossless => "LOSSLESS",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "H264" => Ok(Codec::H264),
            "H265" => Ok(Codec::H265),
            "LOSSLESS" => Ok(Codec::Lossless),
            other => Err(format!("unknown codec: {other}")),
        }
    }
}

/// 传感器分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    Hd2k,
    Hd1200,
    #[default]
    Hd1080,
    Hd720,
    Svga,
    Vga,
}

impl Resolution {
    /// (宽, 高)，单位像素
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Hd2k => (2208, 1242),
            Resolution::Hd1200 => (1920, 1200),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Hd720 => (1280, 720),
            Resolution::Svga => (960, 600),
            Resolution::Vga => (672, 376),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd2k => "HD2K",
            Resolution::Hd1200 => "HD1200",
            Resolution::Hd1080 => "HD1080",
            Resolution::Hd720 => "HD720",
            Resolution::Svga => "SVGA",
            Resolution::Vga => "VGA",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HD2K" => Ok(Resolution::Hd2k),
            "HD1200" => Ok(Resolution::Hd1200),
            "HD1080" => Ok(Resolution::Hd1080),
            "HD720" => Ok(Resolution::Hd720),
            "SVGA" => Ok(Resolution::Svga),
            "VGA" => Ok(Resolution::Vga),
            other => Err(format!("unknown resolution: {other}")),
        }
    }
}

/// 深度计算模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DepthMode {
    /// 不计算深度（仅彩色）
    #[default]
    None,
    /// 神经网络立体匹配
    Neural,
}

impl DepthMode {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { DepthMode::Neural } else { DepthMode::None }
    }

    pub fn is_enabled(self) -> bool {
        self != DepthMode::None
    }
}

/// 输入源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// 按序列号打开实时设备
    Serial(u32),
    /// 回放容器文件
    File(PathBuf),
}

/// 打开参数
#[derive(Debug, Clone, PartialEq)]
pub struct InitParameters {
    pub source: InputSource,
    pub resolution: Resolution,
    pub fps: u32,
    pub depth_mode: DepthMode,
    /// 回放是否按原始帧率节流
    pub real_time: bool,
}

impl InitParameters {
    /// 实时设备（默认不计算深度）
    pub fn live(serial: u32) -> Self {
        Self {
            source: InputSource::Serial(serial),
            resolution: Resolution::default(),
            fps: 30,
            depth_mode: DepthMode::None,
            real_time: true,
        }
    }

    /// 容器回放（非实时）
    pub fn playback(path: impl Into<PathBuf>, depth_mode: DepthMode) -> Self {
        Self {
            source: InputSource::File(path.into()),
            resolution: Resolution::default(),
            fps: 30,
            depth_mode,
            real_time: false,
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_depth_mode(mut self, depth_mode: DepthMode) -> Self {
        self.depth_mode = depth_mode;
        self
    }
}

/// 已连接设备
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: u32,
    pub model: String,
}

/// BGRA8 彩色图像
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    /// 行优先，每像素 4 字节（B, G, R, A）
    pub data: Vec<u8>,
}

impl ColorImage {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// 数据长度是否与尺寸一致
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.pixel_count() * 4
    }
}

/// 深度图（毫米）
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    pub width: u32,
    pub height: u32,
    /// 行优先
    pub data: Vec<f32>,
}

impl DepthMap {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.pixel_count()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get((y * self.width + x) as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_parse() {
        assert_eq!("h265".parse::<Codec>().unwrap(), Codec::H265);
        assert_eq!("LOSSLESS".parse::<Codec>().unwrap(), Codec::Lossless);
        assert!("mjpeg".parse::<Codec>().is_err());
        assert_eq!(Codec::default(), Codec::H265);
    }

    #[test]
    fn test_resolution_dimensions() {
        assert_eq!(Resolution::Hd1080.dimensions(), (1920, 1080));
        assert_eq!(Resolution::Hd1200.dimensions(), (1920, 1200));
        assert_eq!("hd720".parse::<Resolution>().unwrap(), Resolution::Hd720);
        assert_eq!(Resolution::Vga.to_string(), "VGA");
    }

    #[test]
    fn test_depth_mode() {
        assert_eq!(DepthMode::from_enabled(true), DepthMode::Neural);
        assert!(!DepthMode::from_enabled(false).is_enabled());
    }

    #[test]
    fn test_init_parameters() {
        let live = InitParameters::live(42).with_resolution(Resolution::Hd1200).with_fps(60);
        assert_eq!(live.source, InputSource::Serial(42));
        assert_eq!(live.fps, 60);
        assert!(live.real_time);

        let playback = InitParameters::playback("raw/A1.dcap", DepthMode::Neural);
        assert!(!playback.real_time);
        assert!(playback.depth_mode.is_enabled());
    }

    #[test]
    fn test_depth_map_get() {
        let map = DepthMap {
            width: 2,
            height: 2,
            data: vec![1.0, 2.0, 3.0, 4.0],
        };
        assert_eq!(map.get(1, 1), Some(4.0));
        assert_eq!(map.get(2, 0), None);
        assert!(map.is_consistent());
    }
}
