//! 模拟后端
//!
//! 无硬件环境下的 [`CameraBackend`] 实现：
//! - 实时源：按序列号注册的虚拟设备，按帧率阻塞出帧，
//!   深度平面带有可复现的无效像素（NaN / ∞ / 超远值）
//! - 回放源：读取 `.dcap` 容器
//!
//! [`SimStats`] 记录协作方调用次数，供测试断言资源释放。

use crate::container::{ContainerHeader, ContainerReader, ContainerWriter, FrameRecord};
use crate::{
    CameraBackend, Codec, ColorImage, DepthCamera, DepthMap, DepthMode, DeviceInfo, GrabStatus,
    InitParameters, InputSource, SensorError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// 默认虚拟设备序列号
pub const DEFAULT_SIM_SERIAL: u32 = 10_000_001;

/// 虚拟设备描述
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub serial: u32,
    pub model: String,
    /// 覆盖分辨率对应的像素尺寸
    pub frame_size: Option<(u32, u32)>,
    /// 第 N 次 grab 起返回错误
    pub fail_after: Option<u64>,
    pub seed: u64,
}

impl SimDevice {
    pub fn new(serial: u32, model: impl Into<String>) -> Self {
        Self {
            serial,
            model: model.into(),
            frame_size: None,
            fail_after: None,
            seed: serial as u64,
        }
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    pub fn with_grab_failure_after(mut self, grabs: u64) -> Self {
        self.fail_after = Some(grabs);
        self
    }
}

/// 协作方调用计数
#[derive(Debug, Default)]
pub struct SimStats {
    opens: AtomicU64,
    grabs: AtomicU64,
    enable_recording: AtomicU64,
    disable_recording: AtomicU64,
    closes: AtomicU64,
}

impl SimStats {
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn grabs(&self) -> u64 {
        self.grabs.load(Ordering::SeqCst)
    }

    pub fn enable_recording_calls(&self) -> u64 {
        self.enable_recording.load(Ordering::SeqCst)
    }

    pub fn disable_recording_calls(&self) -> u64 {
        self.disable_recording.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }
}

/// 模拟后端
#[derive(Debug, Clone)]
pub struct SimBackend {
    devices: Vec<SimDevice>,
    stats: Arc<SimStats>,
}

impl SimBackend {
    /// 不含任何设备的后端
    pub fn empty() -> Self {
        Self {
            devices: Vec::new(),
            stats: Arc::new(SimStats::default()),
        }
    }

    pub fn with_device(mut self, device: SimDevice) -> Self {
        self.devices.push(device);
        self
    }

    pub fn devices(&self) -> &[SimDevice] {
        &self.devices
    }

    pub fn stats(&self) -> Arc<SimStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for SimBackend {
    /// 一台 320x180 的虚拟双目相机
    fn default() -> Self {
        Self::empty().with_device(
            SimDevice::new(DEFAULT_SIM_SERIAL, "SIM-Stereo").with_frame_size(320, 180),
        )
    }
}

impl CameraBackend for SimBackend {
    type Camera = SimCamera;

    fn list_devices(&self) -> Result<Vec<DeviceInfo>, SensorError> {
        Ok(self
            .devices
            .iter()
            .map(|d| DeviceInfo {
                serial: d.serial,
                model: d.model.clone(),
            })
            .collect())
    }

    fn open(&self, params: &InitParameters) -> Result<SimCamera, SensorError> {
        let source = match &params.source {
            InputSource::Serial(serial) => {
                let device = self
                    .devices
                    .iter()
                    .find(|d| d.serial == *serial)
                    .ok_or(SensorError::DeviceNotFound(*serial))?;
                if params.fps == 0 {
                    return Err(SensorError::OpenFailed("fps must be positive".into()));
                }
                Source::Live(LiveSource::new(device, params))
            },
            InputSource::File(path) => {
                let reader = ContainerReader::open(path).map_err(|e| {
                    SensorError::OpenFailed(format!("{}: {e}", path.display()))
                })?;
                Source::Playback(reader)
            },
        };

        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("sim camera opened: {:?}", params.source);

        Ok(SimCamera {
            source,
            depth_mode: params.depth_mode,
            stats: Arc::clone(&self.stats),
            current: None,
            recorder: None,
            closed: false,
        })
    }
}

/// 模拟相机句柄
pub struct SimCamera {
    source: Source,
    depth_mode: DepthMode,
    stats: Arc<SimStats>,
    current: Option<FrameRecord>,
    recorder: Option<ContainerWriter>,
    closed: bool,
}

enum Source {
    Live(LiveSource),
    Playback(ContainerReader),
}

struct LiveSource {
    serial: u32,
    width: u32,
    height: u32,
    fps: u32,
    interval: Duration,
    rng: StdRng,
    next_index: u64,
    fail_after: Option<u64>,
    started: Instant,
    next_due: Instant,
}

impl LiveSource {
    fn new(device: &SimDevice, params: &InitParameters) -> Self {
        let (width, height) = device.frame_size.unwrap_or_else(|| params.resolution.dimensions());
        let now = Instant::now();
        Self {
            serial: device.serial,
            width,
            height,
            fps: params.fps,
            interval: Duration::from_secs_f64(1.0 / params.fps as f64),
            rng: StdRng::seed_from_u64(device.seed),
            next_index: 0,
            fail_after: device.fail_after,
            started: now,
            next_due: now,
        }
    }

    /// 阻塞到下一帧时刻，生成合成帧
    fn next_frame(&mut self) -> Result<FrameRecord, SensorError> {
        if matches!(self.fail_after, Some(n) if self.next_index >= n) {
            return Err(SensorError::Grab("simulated sensor fault".into()));
        }

        let now = Instant::now();
        if self.next_due > now {
            std::thread::sleep(self.next_due - now);
        }
        self.next_due += self.interval;

        let index = self.next_index;
        self.next_index += 1;

        let pixels = self.width as usize * self.height as usize;
        let mut bgra = Vec::with_capacity(pixels * 4);
        let mut depth_mm = Vec::with_capacity(pixels);
        for y in 0..self.height {
            for x in 0..self.width {
                bgra.extend_from_slice(&[
                    (x as u64 + index) as u8,
                    (y as u64 + index) as u8,
                    ((x + y) as u64) as u8,
                    255,
                ]);
                depth_mm.push(self.sample_depth(x, y));
            }
        }

        Ok(FrameRecord {
            timestamp_us: self.started.elapsed().as_micros() as u64,
            bgra,
            depth_mm,
        })
    }

    fn sample_depth(&mut self, x: u32, y: u32) -> f32 {
        let roll: f32 = self.rng.r#gen();
        if roll < 0.01 {
            f32::NAN
        } else if roll < 0.015 {
            f32::INFINITY
        } else if roll < 0.05 {
            self.rng.gen_range(2000.0..6000.0)
        } else {
            // 中心物体约 400 mm，背景约 1500 mm
            let cx = self.width as f32 / 2.0;
            let cy = self.height as f32 / 2.0;
            let r = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            let base = if r < self.height as f32 / 4.0 { 400.0 } else { 1500.0 };
            base + self.rng.gen_range(-5.0..5.0)
        }
    }
}

impl SimCamera {
    fn ensure_open(&self) -> Result<(), SensorError> {
        if self.closed { Err(SensorError::Closed) } else { Ok(()) }
    }

    fn live_header(live: &LiveSource, codec: Codec) -> ContainerHeader {
        ContainerHeader {
            codec,
            width: live.width,
            height: live.height,
            fps: live.fps,
            camera_serial: live.serial,
            created_unix: SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs(),
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        match &self.source {
            Source::Live(live) => (live.width, live.height),
            Source::Playback(reader) => (reader.header().width, reader.header().height),
        }
    }
}

impl DepthCamera for SimCamera {
    fn grab(&mut self) -> Result<GrabStatus, SensorError> {
        self.ensure_open()?;
        self.stats.grabs.fetch_add(1, Ordering::SeqCst);

        let frame = match &mut self.source {
            Source::Live(live) => live.next_frame()?,
            Source::Playback(reader) => match reader.next_frame()? {
                Some(frame) => frame,
                None => {
                    self.current = None;
                    return Ok(GrabStatus::EndOfStream);
                },
            },
        };

        if let Some(writer) = self.recorder.as_mut() {
            writer.append(&frame)?;
        }

        self.current = Some(frame);
        Ok(GrabStatus::FrameReady)
    }

    fn retrieve_color(&mut self) -> Result<ColorImage, SensorError> {
        self.ensure_open()?;
        let (width, height) = self.dimensions();
        let frame = self.current.as_ref().ok_or(SensorError::NoFrame)?;
        Ok(ColorImage {
            width,
            height,
            data: frame.bgra.clone(),
        })
    }

    fn retrieve_depth(&mut self) -> Result<DepthMap, SensorError> {
        self.ensure_open()?;
        if !self.depth_mode.is_enabled() {
            return Err(SensorError::DepthDisabled);
        }
        let (width, height) = self.dimensions();
        let frame = self.current.as_ref().ok_or(SensorError::NoFrame)?;
        Ok(DepthMap {
            width,
            height,
            data: frame.depth_mm.clone(),
        })
    }

    fn frame_count(&self) -> Option<u64> {
        match &self.source {
            Source::Live(_) => None,
            Source::Playback(reader) => reader.frame_count(),
        }
    }

    fn enable_recording(&mut self, path: &Path, codec: Codec) -> Result<(), SensorError> {
        self.ensure_open()?;
        self.stats.enable_recording.fetch_add(1, Ordering::SeqCst);

        let header = match &self.source {
            Source::Live(live) => Self::live_header(live, codec),
            Source::Playback(_) => {
                return Err(SensorError::Unsupported("recording requires a live source"));
            },
        };
        if self.recorder.is_some() {
            return Err(SensorError::AlreadyRecording);
        }

        self.recorder = Some(ContainerWriter::create(path, header)?);
        tracing::debug!("recording enabled: {}", path.display());
        Ok(())
    }

    fn disable_recording(&mut self) {
        self.stats.disable_recording.fetch_add(1, Ordering::SeqCst);
        if let Some(writer) = self.recorder.take() {
            let path = writer.path().to_path_buf();
            match writer.finish() {
                Ok(frames) => tracing::debug!("recording finalized: {} ({frames} frames)", path.display()),
                Err(e) => tracing::warn!("failed to finalize {}: {e}", path.display()),
            }
        }
    }

    fn close(&mut self) {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        if self.closed {
            return;
        }
        if self.recorder.is_some() {
            self.disable_recording();
        }
        self.current = None;
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SimBackend {
        SimBackend::empty().with_device(SimDevice::new(7, "test").with_frame_size(4, 3))
    }

    #[test]
    fn test_list_devices() {
        let devices = backend().list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, 7);

        let default = SimBackend::default().list_devices().unwrap();
        assert_eq!(default[0].serial, DEFAULT_SIM_SERIAL);
    }

    #[test]
    fn test_open_unknown_serial() {
        let result = backend().open(&InitParameters::live(8));
        assert!(matches!(result, Err(SensorError::DeviceNotFound(8))));
    }

    #[test]
    fn test_live_grab_and_retrieve() {
        let backend = backend();
        let params = InitParameters::live(7).with_fps(1000).with_depth_mode(DepthMode::Neural);
        let mut cam = backend.open(&params).unwrap();

        assert!(matches!(cam.retrieve_color(), Err(SensorError::NoFrame)));
        assert_eq!(cam.grab().unwrap(), GrabStatus::FrameReady);

        let color = cam.retrieve_color().unwrap();
        assert_eq!((color.width, color.height), (4, 3));
        assert!(color.is_consistent());

        let depth = cam.retrieve_depth().unwrap();
        assert!(depth.is_consistent());
        assert_eq!(cam.frame_count(), None);
    }

    #[test]
    fn test_depth_disabled() {
        let backend = backend();
        let mut cam = backend.open(&InitParameters::live(7).with_fps(1000)).unwrap();
        cam.grab().unwrap();
        assert!(matches!(cam.retrieve_depth(), Err(SensorError::DepthDisabled)));
    }

    #[test]
    fn test_injected_fault() {
        let backend = SimBackend::empty()
            .with_device(SimDevice::new(1, "faulty").with_frame_size(2, 2).with_grab_failure_after(2));
        let mut cam = backend.open(&InitParameters::live(1).with_fps(1000)).unwrap();
        assert!(cam.grab().is_ok());
        assert!(cam.grab().is_ok());
        assert!(matches!(cam.grab(), Err(SensorError::Grab(_))));
    }

    #[test]
    fn test_record_then_playback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1.dcap");
        let backend = backend();
        let stats = backend.stats();

        let mut cam = backend.open(&InitParameters::live(7).with_fps(1000)).unwrap();
        cam.enable_recording(&path, Codec::H265).unwrap();
        assert!(matches!(
            cam.enable_recording(&path, Codec::H265),
            Err(SensorError::AlreadyRecording)
        ));
        for _ in 0..5 {
            cam.grab().unwrap();
        }
        cam.disable_recording();
        cam.close();
        assert_eq!(stats.close_calls(), 1);

        let mut replay =
            backend.open(&InitParameters::playback(&path, DepthMode::Neural)).unwrap();
        assert_eq!(replay.frame_count(), Some(5));
        let mut frames = 0;
        while replay.grab().unwrap() == GrabStatus::FrameReady {
            frames += 1;
        }
        assert_eq!(frames, 5);
    }

    #[test]
    fn test_close_finalizes_active_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S2.dcap");
        let backend = backend();

        let mut cam = backend.open(&InitParameters::live(7).with_fps(1000)).unwrap();
        cam.enable_recording(&path, Codec::H264).unwrap();
        cam.grab().unwrap();
        cam.close();

        assert!(matches!(cam.grab(), Err(SensorError::Closed)));
        let reader = ContainerReader::open(&path).unwrap();
        assert_eq!(reader.frame_count(), Some(1));
        assert_eq!(reader.header().codec, Codec::H264);
    }

    #[test]
    fn test_playback_cannot_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S3.dcap");
        let header = ContainerHeader {
            codec: Codec::H265,
            width: 1,
            height: 1,
            fps: 30,
            camera_serial: 7,
            created_unix: 0,
        };
        ContainerWriter::create(&path, header).unwrap().finish().unwrap();

        let mut replay = backend().open(&InitParameters::playback(&path, DepthMode::None)).unwrap();
        assert!(matches!(
            replay.enable_recording(&dir.path().join("out.dcap"), Codec::H265),
            Err(SensorError::Unsupported(_))
        ));
        assert_eq!(replay.grab().unwrap(), GrabStatus::EndOfStream);
    }

    #[test]
    fn test_playback_open_failure() {
        let result = backend().open(&InitParameters::playback("/nonexistent/x.dcap", DepthMode::None));
        assert!(matches!(result, Err(SensorError::OpenFailed(_))));
    }
}
