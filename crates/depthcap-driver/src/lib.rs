//! # depthcap Driver
//!
//! 会话层：在传感器句柄之上组织一次完整的录制或抽帧。
//!
//! - [`Recorder`]: 打开一次相机，按样本 ID 循环录制定长容器，成功后写入标签和账本
//! - [`Extractor`]: 回放单个容器，每 `stride` 帧保存一张 PNG 与一份清洗后的深度数组
//! - [`extract_all`]: 顺序处理 `raw/` 下所有容器，单个样本失败不影响其余样本
//!
//! 设备句柄由 [`ScopedCamera`] 持有，`Drop` 时保证 `close()` 被调用；
//! 录制状态由 [`RecordingGuard`] 持有，`Drop` 时保证 `disable_recording()` 被调用。

mod batch;
mod cancel;
mod error;
mod extractor;
mod guard;
mod recorder;

pub use batch::{BatchFailure, BatchReport, extract_all};
pub use cancel::CancelToken;
pub use error::CaptureError;
pub use extractor::{ExtractOptions, ExtractSummary, Extractor, StopReason};
pub use guard::{RecordingGuard, ScopedCamera};
pub use recorder::{
    CameraSelector, CaptureParams, DEFAULT_DURATION_S, DEFAULT_MEASUREMENT_FIELDS, MIN_DURATION_S,
    Recorder, Session, normalize_duration,
};
