//! # depthcap Tools - 共享数据结构和算法
//!
//! **依赖原则**: 只依赖 `depthcap-sensor` 的数据类型，不持有设备状态
//!
//! ## 包含模块
//!
//! - `layout` - 数据集目录布局（样本 ID → 文件路径）
//! - `sampling` - 抽帧与深度清洗（纯函数）
//! - `ledger` - `metadata.csv` 追加账本
//! - `label` - 每个样本的 JSON 标签
//! - `npy` - 二维 f32 数组读写
//! - `frame_io` - 彩色帧转换与 PNG 无损输出
//! - `orphans` - 无标签容器检测

pub mod frame_io;
pub mod label;
pub mod layout;
pub mod ledger;
pub mod npy;
pub mod orphans;
pub mod sampling;

use thiserror::Error;

// 重新导出常用类型
pub use frame_io::{Rotation, bgra_to_rgb, write_png_lossless};
pub use label::{CaptureInfo, SessionLabel};
pub use layout::{DatasetLayout, SessionPaths, sample_id_from_container, validate_sample_id};
pub use ledger::{LedgerRow, Measurement, MetadataLedger, RESERVED_COLUMNS, check_columns};
pub use orphans::{Orphan, find_orphans};
pub use sampling::{
    DEFAULT_MAX_DEPTH_MM, DEFAULT_STRIDE, INDEX_WIDTH, frame_stem, is_sampled, sampled_count,
    sanitize_depth, sanitize_value,
};

/// 工具层错误类型
#[derive(Error, Debug)]
pub enum ToolsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// 样本 ID 为空或不能作为单个路径分量
    #[error("Invalid sample id: {0:?}")]
    InvalidSampleId(String),

    /// 账本列名为空、重复或与固定列冲突
    #[error("Invalid ledger columns: {0}")]
    InvalidColumns(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid npy file: {0}")]
    Npy(String),
}
