//! # 抽帧
//!
//! 非实时回放一个容器，每 `stride` 帧保存一次：
//! - `images/<index6>.png`：BGRA → RGB8，可选旋转，无损 PNG
//! - `depth/<index6>.npy`：清洗后的 `(height, width)` f32 数组（毫米）
//!
//! 回放中的错误只结束当前样本，记录在 [`ExtractSummary::stop_reason`] 中。

use crate::error::CaptureError;
use crate::guard::ScopedCamera;
use depthcap_sensor::{CameraBackend, DepthCamera, DepthMode, GrabStatus, InitParameters, SensorError};
use depthcap_tools::{
    DEFAULT_MAX_DEPTH_MM, DEFAULT_STRIDE, DatasetLayout, Rotation, SessionPaths, ToolsError,
    bgra_to_rgb, is_sampled, npy, sanitize_depth, write_png_lossless,
};
use std::path::{Path, PathBuf};

/// 抽帧选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
    /// 抽帧步长（>= 1）
    pub stride: u64,
    /// 深度上限，超出置 0（毫米，> 0）
    pub max_depth_mm: f32,
    /// 是否输出深度
    pub depth: bool,
    pub rotation: Rotation,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            max_depth_mm: DEFAULT_MAX_DEPTH_MM,
            depth: true,
            rotation: Rotation::None,
        }
    }
}

impl ExtractOptions {
    /// 仅彩色输出
    pub fn color_only() -> Self {
        Self {
            depth: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.stride == 0 {
            return Err(CaptureError::InvalidOptions("stride must be at least 1".into()));
        }
        if !self.max_depth_mm.is_finite() || self.max_depth_mm <= 0.0 {
            return Err(CaptureError::InvalidOptions(format!(
                "max depth must be a positive number of millimeters, got {}",
                self.max_depth_mm
            )));
        }
        Ok(())
    }
}

/// 回放结束原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// 容器读完
    EndOfStream,
    /// 已读帧数达到容器记录的总帧数
    FrameCountReached,
    /// 回放出错，提前结束（已写出的文件保留）
    ReplayError(String),
}

/// 单个样本的抽帧结果
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSummary {
    pub sample_id: String,
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub images_dir: PathBuf,
    /// 未输出深度时为 `None`
    pub depth_dir: Option<PathBuf>,
    pub stop_reason: StopReason,
}

impl ExtractSummary {
    pub fn is_complete(&self) -> bool {
        !matches!(self.stop_reason, StopReason::ReplayError(_))
    }
}

/// 已打开的回放句柄
pub struct Extractor<C: DepthCamera> {
    camera: ScopedCamera<C>,
    container: PathBuf,
    depth_enabled: bool,
}

impl<C: DepthCamera> Extractor<C> {
    /// 以非实时模式打开容器
    pub fn open_for_replay<B>(backend: &B, container: &Path, depth_enabled: bool) -> Result<Self, CaptureError>
    where
        B: CameraBackend<Camera = C>,
    {
        let params = InitParameters::playback(container, DepthMode::from_enabled(depth_enabled));
        let camera = backend
            .open(&params)
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {e}", container.display())))?;

        Ok(Self {
            camera: ScopedCamera::new(camera),
            container: container.to_path_buf(),
            depth_enabled,
        })
    }

    pub fn container(&self) -> &Path {
        &self.container
    }

    /// 回放整个容器并写出抽中的帧
    ///
    /// 句柄在返回前关闭（无论成功与否）。
    pub fn extract(
        mut self,
        sample_id: &str,
        options: &ExtractOptions,
        layout: &DatasetLayout,
    ) -> Result<ExtractSummary, CaptureError> {
        options.validate()?;
        let write_depth = options.depth && self.depth_enabled;

        let paths = layout.session(sample_id).map_err(CaptureError::from_tools)?;
        paths.ensure_output_dirs(write_depth).map_err(ToolsError::from)?;

        let total = self.camera.frame_count();
        tracing::info!(
            "extracting {} from {} ({} frames, stride {})",
            paths.sample_id,
            self.container.display(),
            total.map_or_else(|| "unknown".to_string(), |n| n.to_string()),
            options.stride
        );

        let mut index = 0u64;
        let mut sampled = 0u64;
        let stop_reason = loop {
            match self.camera.grab() {
                Ok(GrabStatus::FrameReady) => {},
                Ok(GrabStatus::EndOfStream) => break StopReason::EndOfStream,
                Err(e) => break replay_error(&paths, index, e),
            }

            if is_sampled(index, options.stride) {
                match self.write_sample(&paths, index, options, write_depth) {
                    Ok(()) => sampled += 1,
                    Err(WriteError::Sensor(e)) => break replay_error(&paths, index, e),
                    Err(WriteError::Tools(e)) => return Err(e.into()),
                }
            }

            index += 1;
            if total.is_some_and(|total| index >= total) {
                break StopReason::FrameCountReached;
            }
        };

        self.camera.close();
        tracing::info!(
            "{}: {index} frames read, {sampled} sampled ({:?})",
            paths.sample_id,
            stop_reason
        );

        Ok(ExtractSummary {
            sample_id: paths.sample_id,
            frames_read: index,
            frames_sampled: sampled,
            images_dir: paths.images_dir,
            depth_dir: write_depth.then_some(paths.depth_dir),
            stop_reason,
        })
    }

    fn write_sample(
        &mut self,
        paths: &SessionPaths,
        index: u64,
        options: &ExtractOptions,
        write_depth: bool,
    ) -> Result<(), WriteError> {
        let color = self.camera.retrieve_color()?;
        let rgb = options.rotation.apply(bgra_to_rgb(&color)?);
        write_png_lossless(paths.image_path(index), &rgb)?;

        if write_depth {
            let mut depth = self.camera.retrieve_depth()?;
            let replaced = sanitize_depth(&mut depth.data, options.max_depth_mm);
            npy::write_f32(
                paths.depth_path(index),
                depth.height as usize,
                depth.width as usize,
                &depth.data,
            )?;
            tracing::debug!("frame {index}: {replaced} depth pixels zeroed");
        } else {
            tracing::debug!("frame {index}: color written");
        }

        Ok(())
    }
}

fn replay_error(paths: &SessionPaths, index: u64, err: SensorError) -> StopReason {
    tracing::warn!("{}: replay stopped at frame {index}: {err}", paths.sample_id);
    StopReason::ReplayError(err.to_string())
}

/// 写帧时的错误：读取失败算回放错误，写文件失败向上传播
enum WriteError {
    Sensor(SensorError),
    Tools(ToolsError),
}

impl From<SensorError> for WriteError {
    fn from(err: SensorError) -> Self {
        WriteError::Sensor(err)
    }
}

impl From<ToolsError> for WriteError {
    fn from(err: ToolsError) -> Self {
        WriteError::Tools(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ExtractOptions::default();
        assert_eq!(options.stride, 20);
        assert_eq!(options.max_depth_mm, 2000.0);
        assert!(options.depth);
        assert_eq!(options.rotation, Rotation::None);
        assert!(options.validate().is_ok());
        assert!(!ExtractOptions::color_only().depth);
    }

    #[test]
    fn test_invalid_options() {
        let zero_stride = ExtractOptions {
            stride: 0,
            ..Default::default()
        };
        assert!(matches!(zero_stride.validate(), Err(CaptureError::InvalidOptions(_))));

        for cap in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let options = ExtractOptions {
                max_depth_mm: cap,
                ..Default::default()
            };
            assert!(options.validate().is_err(), "cap {cap} accepted");
        }
    }
}
