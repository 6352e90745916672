//! # 元数据账本
//!
//! `metadata.csv`：每个完成的样本一行，只追加，不回读、不改写。
//! 每次追加都在单次调用内完成打开、加锁、写入、关闭。

use crate::ToolsError;
use fs4::fs_std::FileExt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 默认的容器路径列名
pub const DEFAULT_CONTAINER_COLUMN: &str = "container";

/// 固定列名；标签 JSON 还占用 `capture`
pub const RESERVED_COLUMNS: [&str; 3] = ["sample_id", "date", "capture"];

/// 检查测量字段与容器列能否组成无重复的表头
pub fn check_columns(fields: &[String], container_column: &str) -> Result<(), ToolsError> {
    let container_column = container_column.trim();
    if container_column.is_empty() {
        return Err(ToolsError::InvalidColumns("blank container column".into()));
    }
    if RESERVED_COLUMNS.contains(&container_column) {
        return Err(ToolsError::InvalidColumns(format!(
            "container column {container_column:?} is reserved"
        )));
    }

    for (i, field) in fields.iter().enumerate() {
        if field.trim().is_empty() {
            return Err(ToolsError::InvalidColumns(format!("blank field name {field:?}")));
        }
        if RESERVED_COLUMNS.contains(&field.as_str()) || field == container_column {
            return Err(ToolsError::InvalidColumns(format!("field name {field:?} is reserved")));
        }
        if fields[..i].contains(field) {
            return Err(ToolsError::InvalidColumns(format!("duplicate field {field:?}")));
        }
    }
    Ok(())
}

/// 操作员输入的单个测量值
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// 账本中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub sample_id: String,
    pub measurements: Vec<Measurement>,
    /// 采集日期 `YYYY-MM-DD`
    pub date: String,
    /// 相对数据集根目录的容器路径
    pub container: String,
}

/// 追加式 CSV 账本
#[derive(Debug, Clone)]
pub struct MetadataLedger {
    path: PathBuf,
    container_column: String,
}

impl MetadataLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            container_column: DEFAULT_CONTAINER_COLUMN.to_string(),
        }
    }

    pub fn with_container_column(mut self, column: impl Into<String>) -> Self {
        self.container_column = column.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn container_column(&self) -> &str {
        &self.container_column
    }

    /// 表头：`sample_id, <测量字段...>, date, <容器列>`
    pub fn header_for(&self, row: &LedgerRow) -> Vec<String> {
        let mut header = Vec::with_capacity(row.measurements.len() + 3);
        header.push("sample_id".to_string());
        header.extend(row.measurements.iter().map(|m| m.name.clone()));
        header.push("date".to_string());
        header.push(self.container_column.clone());
        header
    }

    /// 追加一行；文件为空时先写表头
    pub fn append(&self, row: &LedgerRow) -> Result<(), ToolsError> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        // 锁随文件关闭释放
        file.lock_exclusive()?;
        let is_new = file.metadata()?.len() == 0;

        {
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(&mut file);
            if is_new {
                writer.write_record(self.header_for(row))?;
            }
            writer.write_record(record_for(row))?;
            writer.flush()?;
        }
        file.flush()?;

        tracing::debug!("ledger row appended: {} -> {}", row.sample_id, self.path.display());
        Ok(())
    }
}

fn record_for(row: &LedgerRow) -> Vec<String> {
    let mut record = Vec::with_capacity(row.measurements.len() + 3);
    record.push(row.sample_id.clone());
    // `{:?}` 保证整数值也带小数点（12.0 而不是 12）
    record.extend(row.measurements.iter().map(|m| format!("{:?}", m.value)));
    record.push(row.date.clone());
    record.push(row.container.clone());
    record
}
