//! # 孤立容器检测
//!
//! 录制失败或被中断时，容器文件留在 `raw/` 下但没有标签。
//! 这里只做报告，从不删除任何文件。

use crate::ToolsError;
use crate::layout::{DatasetLayout, sample_id_from_container};
use std::path::PathBuf;

/// 没有对应标签的容器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub sample_id: String,
    pub container: PathBuf,
    pub size_bytes: u64,
}

/// 扫描 `raw/`，返回缺少 `labels/<sample_id>.json` 的容器
///
/// `raw/` 不存在时返回空列表。
pub fn find_orphans(layout: &DatasetLayout) -> Result<Vec<Orphan>, ToolsError> {
    if !layout.raw_dir().is_dir() {
        return Ok(Vec::new());
    }

    let mut orphans = Vec::new();
    for container in layout.discover_containers()? {
        let Some(sample_id) = sample_id_from_container(&container) else {
            continue;
        };
        let label = layout.labels_dir().join(format!("{sample_id}.json"));
        if !label.exists() {
            let size_bytes = container.metadata()?.len();
            orphans.push(Orphan {
                sample_id,
                container,
                size_bytes,
            });
        }
    }
    Ok(orphans)
}
