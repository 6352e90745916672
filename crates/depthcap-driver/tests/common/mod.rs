//! 集成测试公共工具

#![allow(dead_code)]

use depthcap_driver::CaptureParams;
use depthcap_sensor::{Codec, ContainerHeader, ContainerWriter, FrameRecord, SimBackend, SimDevice};
use std::fs;
use std::path::{Path, PathBuf};

pub const TEST_SERIAL: u32 = 50918724;
pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 6;

/// 一台小尺寸虚拟相机，录制测试更快
pub fn sim_backend() -> SimBackend {
    SimBackend::empty().with_device(SimDevice::new(TEST_SERIAL, "SIM-Mini").with_frame_size(WIDTH, HEIGHT))
}

pub fn fast_params() -> CaptureParams {
    CaptureParams {
        fps: 100,
        depth: true,
        ..CaptureParams::default()
    }
}

pub fn header() -> ContainerHeader {
    ContainerHeader {
        codec: Codec::H265,
        width: WIDTH,
        height: HEIGHT,
        fps: 30,
        camera_serial: TEST_SERIAL,
        created_unix: 1_760_000_000,
    }
}

/// 第 `index` 帧：颜色随帧号变化，深度为 `index + 300` 毫米
pub fn frame(index: u64) -> FrameRecord {
    let pixels = (WIDTH * HEIGHT) as usize;
    let mut bgra = Vec::with_capacity(pixels * 4);
    for p in 0..pixels {
        bgra.extend_from_slice(&[(p as u64 + index) as u8, (index * 3) as u8, p as u8, 255]);
    }
    FrameRecord {
        timestamp_us: index * 33_333,
        bgra,
        depth_mm: vec![index as f32 + 300.0; pixels],
    }
}

/// 写入 `frames` 帧的完整容器
pub fn write_container(path: &Path, frames: u64) {
    write_frames(path, (0..frames).map(frame));
}

pub fn write_frames(path: &Path, frames: impl IntoIterator<Item = FrameRecord>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut writer = ContainerWriter::create(path, header()).unwrap();
    for record in frames {
        writer.append(&record).unwrap();
    }
    writer.finish().unwrap();
}

/// 目录下的文件名（排序）
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn raw_path(root: &Path, sample_id: &str) -> PathBuf {
    root.join("raw").join(format!("{sample_id}.dcap"))
}
