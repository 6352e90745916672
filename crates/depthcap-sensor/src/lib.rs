//! # depthcap Sensor Layer
//!
//! 深度相机抽象层，提供统一的采集/回放接口。
//!
//! - [`CameraBackend`]: 设备枚举与打开（实时设备或容器文件回放）
//! - [`DepthCamera`]: 单个已打开句柄上的逐帧操作
//! - [`container`]: `.dcap` 容器格式（录制写入 / 回放读取）
//! - [`sim`]: 内置模拟后端，无硬件时驱动完整流水线

use std::path::Path;
use thiserror::Error;

pub mod container;
pub mod sim;
mod types;

pub use container::{CONTAINER_EXT, ContainerHeader, ContainerReader, ContainerWriter, FrameRecord};
pub use sim::{DEFAULT_SIM_SERIAL, SimBackend, SimCamera, SimDevice, SimStats};
pub use types::*;

/// 传感器层统一错误类型
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Camera with serial {0} not found")]
    DeviceNotFound(u32),
    #[error("Open failed: {0}")]
    OpenFailed(String),
    #[error("Recording already enabled")]
    AlreadyRecording,
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
    #[error("No frame grabbed yet")]
    NoFrame,
    #[error("Depth computation disabled")]
    DepthDisabled,
    #[error("Corrupt container: {0}")]
    Corrupt(String),
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u8),
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Grab failed: {0}")]
    Grab(String),
    #[error("Camera closed")]
    Closed,
}

/// `grab()` 的非错误结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabStatus {
    /// 新帧已就绪，可调用 `retrieve_*`
    FrameReady,
    /// 回放到达容器末尾
    EndOfStream,
}

/// 已打开的相机句柄
///
/// 所有方法均为阻塞调用。实时设备的 `grab()` 阻塞到下一帧到达；
/// 回放句柄不做节流，尽可能快地返回下一帧。
pub trait DepthCamera {
    fn grab(&mut self) -> Result<GrabStatus, SensorError>;

    /// 最近一次 `grab()` 的左目彩色图（BGRA8）
    fn retrieve_color(&mut self) -> Result<ColorImage, SensorError>;

    /// 最近一次 `grab()` 的深度图（毫米，f32）
    ///
    /// 以 `DepthMode::None` 打开时返回 [`SensorError::DepthDisabled`]。
    fn retrieve_depth(&mut self) -> Result<DepthMap, SensorError>;

    /// 回放时的总帧数；实时设备或未知时为 `None`
    fn frame_count(&self) -> Option<u64> {
        None
    }

    /// 开始把采集流写入容器文件
    fn enable_recording(&mut self, path: &Path, codec: Codec) -> Result<(), SensorError>;

    /// 停止写入；未在录制时为空操作
    fn disable_recording(&mut self);

    /// 释放设备。之后的调用返回 [`SensorError::Closed`]
    fn close(&mut self);
}

/// 相机后端（设备发现 + 打开）
pub trait CameraBackend {
    type Camera: DepthCamera;

    fn list_devices(&self) -> Result<Vec<DeviceInfo>, SensorError>;

    fn open(&self, params: &InitParameters) -> Result<Self::Camera, SensorError>;
}
