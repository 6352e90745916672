//! # `.dcap` 容器格式
//!
//! 录制与回放共用的流式容器。
//!
//! ```text
//! [MAGIC: 8 bytes]
//! [Version: 1 byte]
//! [Frame count: 8 bytes LE，0 表示未知（录制结束时回填）]
//! [Header length: 4 bytes LE]
//! [Header: bincode ContainerHeader]
//! [Frames: ([length: 4 bytes LE][bincode FrameRecord])*]
//! ```
//!
//! 帧逐条追加写入，录制中断时文件保留已写入的部分：
//! 帧计数为 0，读取端在记录边界处的 EOF 视为流结束，
//! 记录中途截断视为 [`SensorError::Corrupt`]。

use crate::{Codec, ColorImage, DepthMap, SensorError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// 容器文件魔数
pub const MAGIC: &[u8; 8] = b"DCAPV1\0\0";

/// 当前格式版本
pub const VERSION: u8 = 1;

/// 容器文件扩展名
pub const CONTAINER_EXT: &str = "dcap";

/// 帧计数字段偏移（魔数 + 版本）
const FRAME_COUNT_OFFSET: u64 = 9;

/// 编码后容器头的长度上限
const MAX_HEADER_LEN: u32 = 1024;

/// 容器头
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHeader {
    pub codec: Codec,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub camera_serial: u32,
    /// 创建时间（Unix 时间戳，秒）
    pub created_unix: u64,
}

impl ContainerHeader {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// 单条帧记录编码后的最大长度
    fn max_record_len(&self) -> u64 {
        // timestamp + 两个 Vec 长度前缀 + BGRA 平面 + f32 深度平面
        24 + 8 * self.pixel_count() as u64
    }
}

/// 单帧记录：左目 BGRA + 深度平面
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// 采集时间戳（微秒）
    pub timestamp_us: u64,
    pub bgra: Vec<u8>,
    pub depth_mm: Vec<f32>,
}

impl FrameRecord {
    pub fn color(&self, header: &ContainerHeader) -> ColorImage {
        ColorImage {
            width: header.width,
            height: header.height,
            data: self.bgra.clone(),
        }
    }

    pub fn depth(&self, header: &ContainerHeader) -> DepthMap {
        DepthMap {
            width: header.width,
            height: header.height,
            data: self.depth_mm.clone(),
        }
    }

    fn matches(&self, header: &ContainerHeader) -> bool {
        let pixels = header.pixel_count();
        self.bgra.len() == pixels * 4 && self.depth_mm.len() == pixels
    }
}

/// 流式写入器
pub struct ContainerWriter {
    writer: BufWriter<File>,
    header: ContainerHeader,
    frames: u64,
    path: PathBuf,
}

impl ContainerWriter {
    /// 创建容器文件并写入文件头
    pub fn create<P: AsRef<Path>>(path: P, header: ContainerHeader) -> Result<Self, SensorError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&[VERSION])?;
        writer.write_all(&0u64.to_le_bytes())?;

        let data = bincode::serialize(&header).map_err(|e| SensorError::Encode(e.to_string()))?;
        writer.write_all(&(data.len() as u32).to_le_bytes())?;
        writer.write_all(&data)?;

        Ok(Self {
            writer,
            header,
            frames: 0,
            path,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    /// 追加一帧
    pub fn append(&mut self, record: &FrameRecord) -> Result<(), SensorError> {
        if !record.matches(&self.header) {
            return Err(SensorError::Encode(format!(
                "frame planes do not match {}x{} header",
                self.header.width, self.header.height
            )));
        }

        let data = bincode::serialize(record).map_err(|e| SensorError::Encode(e.to_string()))?;
        self.writer.write_all(&(data.len() as u32).to_le_bytes())?;
        self.writer.write_all(&data)?;
        self.frames += 1;
        Ok(())
    }

    /// 刷新缓冲并回填帧计数，返回写入的帧数
    pub fn finish(self) -> Result<u64, SensorError> {
        let frames = self.frames;
        let mut file = self.writer.into_inner().map_err(|e| SensorError::Io(e.into_error()))?;
        file.seek(SeekFrom::Start(FRAME_COUNT_OFFSET))?;
        file.write_all(&frames.to_le_bytes())?;
        file.sync_all()?;
        Ok(frames)
    }
}

/// 顺序读取器
pub struct ContainerReader {
    reader: BufReader<File>,
    header: ContainerHeader,
    declared_frames: u64,
    frames_read: u64,
}

impl ContainerReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SensorError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        read_header_bytes(&mut reader, &mut magic)?;
        if &magic != MAGIC {
            return Err(SensorError::Corrupt("magic mismatch".into()));
        }

        let mut version = [0u8; 1];
        read_header_bytes(&mut reader, &mut version)?;
        if version[0] != VERSION {
            return Err(SensorError::UnsupportedVersion(version[0]));
        }

        let mut count = [0u8; 8];
        read_header_bytes(&mut reader, &mut count)?;

        let mut len = [0u8; 4];
        read_header_bytes(&mut reader, &mut len)?;
        let len = u32::from_le_bytes(len);
        if len > MAX_HEADER_LEN {
            return Err(SensorError::Corrupt(format!("header length {len} exceeds limit")));
        }
        let mut data = vec![0u8; len as usize];
        read_header_bytes(&mut reader, &mut data)?;

        let header: ContainerHeader = bincode::deserialize(&data)
            .map_err(|e| SensorError::Corrupt(format!("header: {e}")))?;

        Ok(Self {
            reader,
            header,
            declared_frames: u64::from_le_bytes(count),
            frames_read: 0,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// 文件头声明的总帧数（中断的录制为 `None`）
    pub fn frame_count(&self) -> Option<u64> {
        (self.declared_frames > 0).then_some(self.declared_frames)
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// 读取下一帧；在记录边界处到达 EOF 时返回 `None`
    pub fn next_frame(&mut self) -> Result<Option<FrameRecord>, SensorError> {
        let mut len = [0u8; 4];
        if !fill_or_eof(&mut self.reader, &mut len)? {
            return Ok(None);
        }

        let len = u32::from_le_bytes(len) as u64;
        if len > self.header.max_record_len() {
            return Err(SensorError::Corrupt(format!(
                "frame {} record length {len} exceeds limit",
                self.frames_read
            )));
        }

        let mut data = vec![0u8; len as usize];
        self.reader.read_exact(&mut data).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                SensorError::Corrupt(format!("frame {} truncated", self.frames_read))
            },
            _ => SensorError::Io(e),
        })?;

        let record: FrameRecord = bincode::deserialize(&data)
            .map_err(|e| SensorError::Corrupt(format!("frame {}: {e}", self.frames_read)))?;
        if !record.matches(&self.header) {
            return Err(SensorError::Corrupt(format!(
                "frame {} planes do not match header",
                self.frames_read
            )));
        }

        self.frames_read += 1;
        Ok(Some(record))
    }
}

fn read_header_bytes(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), SensorError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => SensorError::Corrupt("truncated header".into()),
        _ => SensorError::Io(e),
    })
}

/// 填满 `buf`；一个字节都没读到时返回 `Ok(false)`
fn fill_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool, SensorError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(SensorError::Corrupt("truncated frame length".into())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}
