//! # 数据集布局
//!
//! ```text
//! <root>/raw/<sample_id>.dcap
//! <root>/labels/<sample_id>.json
//! <root>/metadata.csv
//! <root>/samples/<sample_id>/images/<index6>.png
//! <root>/samples/<sample_id>/depth/<index6>.npy
//! ```
//!
//! 样本是否已存在只看容器文件：`raw/<sample_id>.<ext>` 存在即视为占用。

use crate::ToolsError;
use crate::sampling::frame_stem;
use depthcap_sensor::CONTAINER_EXT;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const RAW_DIR: &str = "raw";
pub const LABELS_DIR: &str = "labels";
pub const SAMPLES_DIR: &str = "samples";
pub const IMAGES_DIR: &str = "images";
pub const DEPTH_DIR: &str = "depth";
pub const LEDGER_FILE: &str = "metadata.csv";

/// 数据集根目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
    container_ext: String,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            container_ext: CONTAINER_EXT.to_string(),
        }
    }

    pub fn with_container_ext(mut self, ext: impl Into<String>) -> Self {
        self.container_ext = ext.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn container_ext(&self) -> &str {
        &self.container_ext
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    pub fn labels_dir(&self) -> PathBuf {
        self.root.join(LABELS_DIR)
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.root.join(SAMPLES_DIR)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    /// 计算样本的全部产物路径
    pub fn session(&self, sample_id: &str) -> Result<SessionPaths, ToolsError> {
        let id = validate_sample_id(sample_id)?;
        let session_dir = self.samples_dir().join(id);

        Ok(SessionPaths {
            sample_id: id.to_string(),
            container: self.raw_dir().join(format!("{id}.{}", self.container_ext)),
            label: self.labels_dir().join(format!("{id}.json")),
            images_dir: session_dir.join(IMAGES_DIR),
            depth_dir: session_dir.join(DEPTH_DIR),
            session_dir,
        })
    }

    /// 容器相对根目录的路径（写入账本，始终使用 `/`）
    pub fn container_relative(&self, sample_id: &str) -> String {
        format!("{RAW_DIR}/{sample_id}.{}", self.container_ext)
    }

    /// 创建 `raw/` 和 `labels/`（已存在时不报错）
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.raw_dir())?;
        fs::create_dir_all(self.labels_dir())
    }

    /// 容器文件存在即视为已占用
    pub fn is_taken(&self, sample_id: &str) -> Result<bool, ToolsError> {
        Ok(self.session(sample_id)?.container.exists())
    }

    /// `raw/` 下所有容器文件，按路径排序
    ///
    /// 扩展名区分大小写，与 [`Self::is_taken`] 的判定一致。
    pub fn discover_containers(&self) -> Result<Vec<PathBuf>, ToolsError> {
        let mut containers = Vec::new();
        for entry in fs::read_dir(self.raw_dir())? {
            let path = entry?.path();
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == self.container_ext);
            if matches_ext && path.is_file() {
                containers.push(path);
            }
        }
        containers.sort();
        Ok(containers)
    }
}

/// 单个样本的产物路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub sample_id: String,
    pub container: PathBuf,
    pub label: PathBuf,
    pub session_dir: PathBuf,
    pub images_dir: PathBuf,
    pub depth_dir: PathBuf,
}

impl SessionPaths {
    /// 创建输出目录；`depth == false` 时不创建 `depth/`
    pub fn ensure_output_dirs(&self, depth: bool) -> io::Result<()> {
        fs::create_dir_all(&self.images_dir)?;
        if depth {
            fs::create_dir_all(&self.depth_dir)?;
        }
        Ok(())
    }

    pub fn image_path(&self, index: u64) -> PathBuf {
        self.images_dir.join(format!("{}.png", frame_stem(index)))
    }

    pub fn depth_path(&self, index: u64) -> PathBuf {
        self.depth_dir.join(format!("{}.npy", frame_stem(index)))
    }
}

/// 校验并去除首尾空白
///
/// 样本 ID 直接作为路径分量使用，拒绝空串、路径分隔符、`.`/`..` 和 NUL。
pub fn validate_sample_id(raw: &str) -> Result<&str, ToolsError> {
    let id = raw.trim();
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ToolsError::InvalidSampleId(raw.to_string()));
    }
    Ok(id)
}

/// 容器文件名去掉扩展名即样本 ID
pub fn sample_id_from_container(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}
