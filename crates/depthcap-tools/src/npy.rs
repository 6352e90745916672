//! # `.npy` 数组读写
//!
//! 仅支持二维 little-endian f32（`<f4`，C 顺序），格式版本 1.0：
//!
//! ```text
//! [MAGIC: "\x93NUMPY"]
//! [Version: 1 byte major, 1 byte minor]
//! [Header length: 2 bytes LE]
//! [Header: Python dict 字面量，空格填充，以 '\n' 结尾，总长 64 字节对齐]
//! [Data: height * width * 4 bytes]
//! ```

use crate::ToolsError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// npy 魔数
pub const MAGIC: &[u8; 6] = b"\x93NUMPY";

const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;
const ALIGN: usize = 64;

/// 写入 `(height, width)` 的 f32 数组
pub fn write_f32<P: AsRef<Path>>(
    path: P,
    height: usize,
    width: usize,
    data: &[f32],
) -> Result<(), ToolsError> {
    if data.len() != height * width {
        return Err(ToolsError::Npy(format!(
            "data length {} does not match shape ({height}, {width})",
            data.len()
        )));
    }

    let mut header =
        format!("{{'descr': '<f4', 'fortran_order': False, 'shape': ({height}, {width}), }}");
    let unpadded = PREAMBLE_LEN + header.len() + 1;
    let padding = (ALIGN - unpadded % ALIGN) % ALIGN;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&(header.len() as u16).to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    for v in data {
        writer.write_all(&v.to_le_bytes())?;
    }
    writer.flush()?;

    Ok(())
}

/// 读取二维 f32 数组，返回 `((height, width), data)`
pub fn read_f32<P: AsRef<Path>>(path: P) -> Result<((usize, usize), Vec<f32>), ToolsError> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);

    let mut preamble = [0u8; PREAMBLE_LEN];
    reader.read_exact(&mut preamble)?;
    if &preamble[..MAGIC.len()] != MAGIC {
        return Err(ToolsError::Npy("magic mismatch".into()));
    }
    if preamble[6] != 1 {
        return Err(ToolsError::Npy(format!("unsupported version {}.{}", preamble[6], preamble[7])));
    }

    let header_len = u16::from_le_bytes([preamble[8], preamble[9]]) as usize;
    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8(header).map_err(|_| ToolsError::Npy("header is not utf-8".into()))?;

    if !header.contains("'descr': '<f4'") {
        return Err(ToolsError::Npy(format!("unsupported dtype in header: {}", header.trim())));
    }
    if !header.contains("'fortran_order': False") {
        return Err(ToolsError::Npy("fortran order not supported".into()));
    }
    let (height, width) = parse_shape(&header)?;

    let mut bytes = Vec::with_capacity(height * width * 4);
    reader.read_to_end(&mut bytes)?;
    if bytes.len() != height * width * 4 {
        return Err(ToolsError::Npy(format!(
            "expected {} data bytes, found {}",
            height * width * 4,
            bytes.len()
        )));
    }

    let data = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(((height, width), data))
}

fn parse_shape(header: &str) -> Result<(usize, usize), ToolsError> {
    let start = header
        .find("'shape': (")
        .ok_or_else(|| ToolsError::Npy("missing shape".into()))?
        + "'shape': (".len();
    let end = header[start..]
        .find(')')
        .ok_or_else(|| ToolsError::Npy("unterminated shape".into()))?
        + start;

    let dims: Vec<usize> = header[start..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| ToolsError::Npy(format!("bad dimension {s:?}"))))
        .collect::<Result<_, _>>()?;

    match dims.as_slice() {
        [h, w] => Ok((*h, *w)),
        _ => Err(ToolsError::Npy(format!("expected 2-D shape, found {dims:?}"))),
    }
}
