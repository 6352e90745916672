//! RAII 资源守卫
//!
//! 每条退出路径（正常返回、`?` 提前返回、取消、panic 展开）都经过 `Drop`：
//! - [`RecordingGuard`] 先停止录制
//! - [`ScopedCamera`] 再关闭设备，且只关闭一次

use depthcap_sensor::{Codec, DepthCamera, SensorError};
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// 持有已打开的相机，离开作用域时调用 `close()`
pub struct ScopedCamera<C: DepthCamera> {
    camera: C,
    closed: bool,
}

impl<C: DepthCamera> ScopedCamera<C> {
    pub fn new(camera: C) -> Self {
        Self {
            camera,
            closed: false,
        }
    }

    /// 立即关闭（之后 `Drop` 不再重复关闭）
    pub fn close(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if !self.closed {
            self.closed = true;
            self.camera.close();
            tracing::debug!("camera closed");
        }
    }
}

impl<C: DepthCamera> Deref for ScopedCamera<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.camera
    }
}

impl<C: DepthCamera> DerefMut for ScopedCamera<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.camera
    }
}

impl<C: DepthCamera> Drop for ScopedCamera<C> {
    fn drop(&mut self) {
        self.close_once();
    }
}

/// 录制期间借用相机，离开作用域时调用 `disable_recording()`
pub struct RecordingGuard<'a, C: DepthCamera> {
    camera: &'a mut C,
}

impl<'a, C: DepthCamera> RecordingGuard<'a, C> {
    /// 开启录制；失败时不产生守卫，也不会调用 `disable_recording()`
    pub fn start(camera: &'a mut C, path: &Path, codec: Codec) -> Result<Self, SensorError> {
        camera.enable_recording(path, codec)?;
        Ok(Self { camera })
    }

    pub fn camera(&mut self) -> &mut C {
        self.camera
    }
}

impl<C: DepthCamera> Drop for RecordingGuard<'_, C> {
    fn drop(&mut self) {
        self.camera.disable_recording();
    }
}
