//! 会话层错误类型定义

use depthcap_sensor::SensorError;
use depthcap_tools::ToolsError;
use std::path::PathBuf;
use thiserror::Error;

/// 会话层错误类型
#[derive(Error, Debug)]
pub enum CaptureError {
    /// 请求的相机未连接
    #[error("Camera with serial {serial} not found")]
    DeviceNotFound { serial: u32 },

    /// 打开设备或容器失败
    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    /// 相机 ID 中没有可解析的序列号
    #[error("Invalid camera selector: {0:?}")]
    InvalidSelector(String),

    /// 该样本的容器已存在
    #[error("Sample {sample_id:?} already exists")]
    AlreadyExists { sample_id: String },

    #[error("Invalid sample id: {0:?}")]
    InvalidSampleId(String),

    #[error("Invalid duration: {0} s (must be finite and positive)")]
    InvalidDuration(f64),

    /// 测量值与配置的字段列表不一致
    #[error("Invalid measurements: {0}")]
    InvalidMeasurements(String),

    /// 录制中途失败，会话作废（不写元数据，残留容器保留）
    #[error("Recording of {sample_id:?} failed: {source}")]
    RecordingFailed {
        sample_id: String,
        #[source]
        source: SensorError,
    },

    /// 录制被操作员中断
    #[error("Recording of {sample_id:?} cancelled")]
    Cancelled { sample_id: String },

    #[error("Invalid extract options: {0}")]
    InvalidOptions(String),

    #[error("Raw folder not found: {}", .0.display())]
    RawDirMissing(PathBuf),

    #[error("No .{ext} files found in {}", .dir.display())]
    NoContainers { dir: PathBuf, ext: String },

    #[error(transparent)]
    Tools(#[from] ToolsError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
}

impl CaptureError {
    /// 是否需要终止整个进程
    ///
    /// 设备级错误（以及无法继续的输入）为 `true`；
    /// 单个会话内的错误为 `false`，调用方打印诊断后继续处理下一个样本。
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CaptureError::AlreadyExists { .. }
                | CaptureError::InvalidSampleId(_)
                | CaptureError::InvalidMeasurements(_)
                | CaptureError::RecordingFailed { .. }
        )
    }

    /// 操作员可以直接重新输入后重试
    pub fn is_reprompt(&self) -> bool {
        matches!(
            self,
            CaptureError::AlreadyExists { .. }
                | CaptureError::InvalidSampleId(_)
                | CaptureError::InvalidMeasurements(_)
        )
    }

    /// 从工具层错误中提取输入校验失败
    pub(crate) fn from_tools(err: ToolsError) -> Self {
        match err {
            ToolsError::InvalidSampleId(id) => CaptureError::InvalidSampleId(id),
            ToolsError::InvalidColumns(msg) => CaptureError::InvalidMeasurements(msg),
            other => CaptureError::Tools(other),
        }
    }
}
