//! # 定长录制
//!
//! 相机只打开一次，之后按样本 ID 逐个录制：
//!
//! ```text
//! open ──> record(A1) ──> record(A2) ──> ... ──> drop (close)
//!            │
//!            ├─ 校验样本 ID / 查重 / 校验测量值 / 检查取消（不触碰相机）
//!            ├─ RecordingGuard::start  (enable_recording)
//!            ├─ grab 循环直到时长到达或被取消
//!            ├─ drop guard            (disable_recording)
//!            └─ 成功时写标签 + 追加账本行
//! ```

use crate::cancel::CancelToken;
use crate::error::CaptureError;
use crate::guard::{RecordingGuard, ScopedCamera};
use depthcap_sensor::{
    CameraBackend, Codec, DepthCamera, DepthMode, DeviceInfo, GrabStatus, InitParameters,
    Resolution, SensorError,
};
use depthcap_tools::{
    CaptureInfo, DatasetLayout, LedgerRow, Measurement, MetadataLedger, SessionLabel, check_columns,
};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// 默认录制时长（秒）
pub const DEFAULT_DURATION_S: f64 = 15.0;

/// 最短录制时长（秒），更短的值会被提升到该值
pub const MIN_DURATION_S: f64 = 0.5;

/// 默认测量字段
pub const DEFAULT_MEASUREMENT_FIELDS: [&str; 2] = ["weight_g", "caliber_mm"];

/// 校验并规整录制时长
///
/// 非有限值或 `<= 0` 返回 [`CaptureError::InvalidDuration`]；
/// 小于 [`MIN_DURATION_S`] 的值提升到 [`MIN_DURATION_S`]。
pub fn normalize_duration(duration_s: f64) -> Result<f64, CaptureError> {
    if !duration_s.is_finite() || duration_s <= 0.0 {
        return Err(CaptureError::InvalidDuration(duration_s));
    }
    Ok(duration_s.max(MIN_DURATION_S))
}

/// 相机选择方式
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CameraSelector {
    /// 第一台枚举到的设备
    #[default]
    First,
    Serial(u32),
    /// 形如 `ZEDXMini_SN50918724` 的相机 ID，末尾数字即序列号
    Id(String),
}

impl CameraSelector {
    /// 解析出序列号，并确认设备已连接
    pub fn resolve(&self, devices: &[DeviceInfo]) -> Result<u32, CaptureError> {
        let serial = match self {
            CameraSelector::First => {
                return devices
                    .first()
                    .map(|d| d.serial)
                    .ok_or_else(|| CaptureError::OpenFailed("no cameras connected".into()));
            },
            CameraSelector::Serial(serial) => *serial,
            CameraSelector::Id(id) => trailing_serial(id)?,
        };

        if devices.iter().any(|d| d.serial == serial) {
            Ok(serial)
        } else {
            Err(CaptureError::DeviceNotFound { serial })
        }
    }
}

fn trailing_serial(id: &str) -> Result<u32, CaptureError> {
    let digits_start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .ok_or_else(|| CaptureError::InvalidSelector(id.to_string()))?;

    id[digits_start..]
        .parse()
        .map_err(|_| CaptureError::InvalidSelector(id.to_string()))
}

impl FromStr for CameraSelector {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(CameraSelector::First);
        }
        if let Ok(serial) = s.parse::<u32>() {
            return Ok(CameraSelector::Serial(serial));
        }
        trailing_serial(s)?;
        Ok(CameraSelector::Id(s.to_string()))
    }
}

impl fmt::Display for CameraSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraSelector::First => write!(f, "first available"),
            CameraSelector::Serial(serial) => write!(f, "SN{serial}"),
            CameraSelector::Id(id) => f.write_str(id),
        }
    }
}

/// 采集参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureParams {
    pub codec: Codec,
    pub depth: bool,
    pub resolution: Resolution,
    pub fps: u32,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            codec: Codec::H265,
            depth: false,
            resolution: Resolution::Hd1080,
            fps: 30,
        }
    }
}

impl CaptureParams {
    pub fn depth_mode(&self) -> DepthMode {
        DepthMode::from_enabled(self.depth)
    }

    pub fn init_parameters(&self, serial: u32) -> InitParameters {
        InitParameters::live(serial)
            .with_resolution(self.resolution)
            .with_fps(self.fps)
            .with_depth_mode(self.depth_mode())
    }
}

/// 一次成功录制的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub sample_id: String,
    pub container: PathBuf,
    pub label: PathBuf,
    pub duration_s: f64,
    pub frames_grabbed: u64,
    pub row: LedgerRow,
}

/// 已打开的录制器
pub struct Recorder<C: DepthCamera> {
    camera: ScopedCamera<C>,
    serial: u32,
    params: CaptureParams,
    layout: DatasetLayout,
    ledger: MetadataLedger,
    measurement_fields: Vec<String>,
    cancel: CancelToken,
}

impl<C: DepthCamera> Recorder<C> {
    /// 打开相机并创建数据集目录
    ///
    /// 设备未连接时在创建任何文件之前失败。
    pub fn open<B>(
        backend: &B,
        selector: &CameraSelector,
        params: CaptureParams,
        layout: DatasetLayout,
    ) -> Result<Self, CaptureError>
    where
        B: CameraBackend<Camera = C>,
    {
        let devices = backend.list_devices()?;
        let serial = selector.resolve(&devices)?;

        let camera = backend.open(&params.init_parameters(serial)).map_err(|e| match e {
            SensorError::DeviceNotFound(serial) => CaptureError::DeviceNotFound { serial },
            other => CaptureError::OpenFailed(other.to_string()),
        })?;
        let camera = ScopedCamera::new(camera);

        layout.ensure_dirs().map_err(depthcap_tools::ToolsError::from)?;
        tracing::info!(
            "camera SN{serial} opened ({} @ {} fps, depth {})",
            params.resolution,
            params.fps,
            if params.depth { "on" } else { "off" }
        );

        Ok(Self {
            camera,
            serial,
            params,
            ledger: MetadataLedger::new(layout.ledger_path()),
            layout,
            measurement_fields: DEFAULT_MEASUREMENT_FIELDS.iter().map(|s| s.to_string()).collect(),
            cancel: CancelToken::new(),
        })
    }

    /// 设置测量字段（至少两个，不可为空、重复或占用固定列名）
    pub fn with_measurement_fields<I, S>(self, fields: I) -> Result<Self, CaptureError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column = self.ledger.container_column().to_string();
        self.with_ledger_columns(fields, column)
    }

    /// 账本中容器路径所在列的列名
    pub fn with_container_column(self, column: impl Into<String>) -> Result<Self, CaptureError> {
        let fields = self.measurement_fields.clone();
        self.with_ledger_columns(fields, column)
    }

    /// 同时设置测量字段与容器列名，两者一起校验
    pub fn with_ledger_columns<I, S>(
        mut self,
        fields: I,
        container_column: impl Into<String>,
    ) -> Result<Self, CaptureError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(|s| s.into().trim().to_string()).collect();
        let container_column = container_column.into().trim().to_string();
        if fields.len() < 2 {
            return Err(CaptureError::InvalidMeasurements(format!(
                "at least two measurement fields required, got {}",
                fields.len()
            )));
        }
        check_columns(&fields, &container_column).map_err(CaptureError::from_tools)?;

        self.measurement_fields = fields;
        self.ledger = self.ledger.with_container_column(container_column);
        Ok(self)
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn params(&self) -> &CaptureParams {
        &self.params
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn measurement_fields(&self) -> &[String] {
        &self.measurement_fields
    }

    /// 录制前的检查：样本 ID 合法且未被占用
    ///
    /// 不访问相机，供交互界面在询问测量值之前调用。
    pub fn check_sample_id(&self, sample_id: &str) -> Result<String, CaptureError> {
        let paths = self.layout.session(sample_id).map_err(CaptureError::from_tools)?;
        if paths.container.exists() {
            return Err(CaptureError::AlreadyExists {
                sample_id: paths.sample_id,
            });
        }
        Ok(paths.sample_id)
    }

    /// 录制一个样本
    pub fn record(
        &mut self,
        sample_id: &str,
        duration_s: f64,
        measurements: &[Measurement],
    ) -> Result<Session, CaptureError> {
        let duration_s = normalize_duration(duration_s)?;
        let sample_id = self.check_sample_id(sample_id)?;
        self.check_measurements(measurements)?;

        // 已取消时不创建容器，样本 ID 保持可用
        if self.cancel.is_cancelled() {
            tracing::warn!("recording {sample_id} cancelled before start");
            return Err(CaptureError::Cancelled { sample_id });
        }

        let paths = self.layout.session(&sample_id).map_err(CaptureError::from_tools)?;
        tracing::info!("recording {sample_id} for {duration_s:.1} s -> {}", paths.container.display());

        let frames_grabbed = {
            let mut guard = RecordingGuard::start(&mut *self.camera, &paths.container, self.params.codec)
                .map_err(|source| CaptureError::RecordingFailed {
                    sample_id: sample_id.clone(),
                    source,
                })?;
            stream_for(guard.camera(), Duration::from_secs_f64(duration_s), &self.cancel)
        };

        let frames_grabbed = match frames_grabbed {
            Ok(Some(frames)) => frames,
            Ok(None) => {
                tracing::warn!("recording {sample_id} cancelled, no metadata written");
                return Err(CaptureError::Cancelled { sample_id });
            },
            Err(source) => {
                tracing::warn!("recording {sample_id} failed: {source}");
                return Err(CaptureError::RecordingFailed { sample_id, source });
            },
        };

        let row = LedgerRow {
            sample_id: sample_id.clone(),
            measurements: measurements.to_vec(),
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            container: self.layout.container_relative(&sample_id),
        };
        let label = SessionLabel {
            row: row.clone(),
            container_key: self.ledger.container_column().to_string(),
            capture: CaptureInfo {
                codec: self.params.codec,
                duration_s,
                depth_mode: self.params.depth_mode(),
                resolution: self.params.resolution,
                fps: self.params.fps,
                camera_serial: self.serial,
                frames_grabbed,
            },
        };

        label.write(&paths.label)?;
        self.ledger.append(&row)?;
        tracing::info!("recorded {sample_id}: {frames_grabbed} frames");

        Ok(Session {
            sample_id,
            container: paths.container,
            label: paths.label,
            duration_s,
            frames_grabbed,
            row,
        })
    }

    fn check_measurements(&self, measurements: &[Measurement]) -> Result<(), CaptureError> {
        let names: Vec<&str> = measurements.iter().map(|m| m.name.as_str()).collect();
        if names != self.measurement_fields {
            return Err(CaptureError::InvalidMeasurements(format!(
                "expected fields {:?}, got {names:?}",
                self.measurement_fields
            )));
        }
        if let Some(m) = measurements.iter().find(|m| !m.value.is_finite()) {
            return Err(CaptureError::InvalidMeasurements(format!("{} is not finite", m.name)));
        }
        Ok(())
    }

    /// 关闭相机
    pub fn close(self) {
        self.camera.close();
    }
}

/// 丢弃帧内容，持续 grab 直到时长到达
///
/// 返回 `Ok(None)` 表示被取消。
fn stream_for<C: DepthCamera>(
    camera: &mut C,
    duration: Duration,
    cancel: &CancelToken,
) -> Result<Option<u64>, SensorError> {
    let start = Instant::now();
    let mut frames = 0u64;

    while start.elapsed() < duration {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        match camera.grab()? {
            GrabStatus::FrameReady => frames += 1,
            GrabStatus::EndOfStream => break,
        }
    }

    Ok(Some(frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo {
                serial: 50918724,
                model: "ZED X Mini".into(),
            },
            DeviceInfo {
                serial: 47200189,
                model: "ZED 2i".into(),
            },
        ]
    }

    #[test]
    fn test_normalize_duration() {
        assert_eq!(normalize_duration(15.0).unwrap(), 15.0);
        assert_eq!(normalize_duration(0.1).unwrap(), MIN_DURATION_S);
        assert!(matches!(normalize_duration(0.0), Err(CaptureError::InvalidDuration(_))));
        assert!(matches!(normalize_duration(-3.0), Err(CaptureError::InvalidDuration(_))));
        assert!(normalize_duration(f64::NAN).is_err());
        assert!(normalize_duration(f64::INFINITY).is_err());
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!(
            "ZEDXMini_SN50918724".parse::<CameraSelector>().unwrap(),
            CameraSelector::Id("ZEDXMini_SN50918724".into())
        );
        assert_eq!("47200189".parse::<CameraSelector>().unwrap(), CameraSelector::Serial(47200189));
        assert_eq!("".parse::<CameraSelector>().unwrap(), CameraSelector::First);
        assert!(matches!(
            "ZEDXMini".parse::<CameraSelector>(),
            Err(CaptureError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_selector_resolve() {
        let devices = devices();
        let by_id = CameraSelector::Id("ZEDXMini_SN50918724".into());
        assert_eq!(by_id.resolve(&devices).unwrap(), 50918724);
        assert_eq!(CameraSelector::First.resolve(&devices).unwrap(), 50918724);
        assert_eq!(CameraSelector::Serial(47200189).resolve(&devices).unwrap(), 47200189);

        let missing = CameraSelector::Id("ZED2i_SN11111111".into());
        assert!(matches!(
            missing.resolve(&devices),
            Err(CaptureError::DeviceNotFound { serial: 11111111 })
        ));
        assert!(CameraSelector::First.resolve(&[]).is_err());
    }

    #[test]
    fn test_capture_params_default() {
        let params = CaptureParams::default();
        assert_eq!(params.codec, Codec::H265);
        assert_eq!(params.resolution, Resolution::Hd1080);
        assert_eq!(params.fps, 30);
        assert!(!params.depth);

        let init = CaptureParams {
            depth: true,
            ..params
        }
        .init_parameters(50918724);
        assert_eq!(init.depth_mode, DepthMode::Neural);
        assert!(init.real_time);
    }
}
