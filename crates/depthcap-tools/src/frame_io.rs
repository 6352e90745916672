//! # 彩色帧输出
//!
//! BGRA8 → RGB8（去掉 alpha），可选顺时针旋转 90°，写入无损 PNG。

use crate::ToolsError;
use depthcap_sensor::ColorImage;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{RgbImage, imageops};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 输出前的旋转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    /// 顺时针 90°（竖放相机）
    Clockwise90,
}

impl Rotation {
    pub fn apply(self, image: RgbImage) -> RgbImage {
        match self {
            Rotation::None => image,
            Rotation::Clockwise90 => imageops::rotate90(&image),
        }
    }
}

/// BGRA8 → RGB8
pub fn bgra_to_rgb(image: &ColorImage) -> Result<RgbImage, ToolsError> {
    if !image.is_consistent() {
        return Err(ToolsError::InvalidFrame(format!(
            "{} bytes for {}x{} BGRA image",
            image.data.len(),
            image.width,
            image.height
        )));
    }

    let mut rgb = Vec::with_capacity(image.pixel_count() * 3);
    for px in image.data.chunks_exact(4) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }

    RgbImage::from_raw(image.width, image.height, rgb)
        .ok_or_else(|| ToolsError::InvalidFrame("RGB buffer size mismatch".into()))
}

/// 写入 PNG
///
/// 固定压缩级别与过滤器，相同输入得到逐字节相同的文件。
pub fn write_png_lossless<P: AsRef<Path>>(path: P, image: &RgbImage) -> Result<(), ToolsError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    let encoder = PngEncoder::new_with_quality(&mut writer, CompressionType::Fast, FilterType::NoFilter);
    image.write_with_encoder(encoder)?;
    writer.flush()?;

    Ok(())
}
