//! 批量抽帧
//!
//! 按文件名顺序逐个处理 `raw/` 下的容器，严格串行。
//! 打开失败或写文件失败只记录到报告中，继续处理下一个样本。

use crate::error::CaptureError;
use crate::extractor::{ExtractOptions, ExtractSummary, Extractor};
use depthcap_sensor::CameraBackend;
use depthcap_tools::{DatasetLayout, sample_id_from_container};
use std::path::PathBuf;

/// 处理失败的样本
#[derive(Debug)]
pub struct BatchFailure {
    pub sample_id: String,
    pub container: PathBuf,
    pub error: CaptureError,
}

/// 批量处理结果
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<ExtractSummary>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// 所有样本都完整回放且无失败
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty() && self.succeeded.iter().all(ExtractSummary::is_complete)
    }
}

/// 抽取数据集中的所有容器
///
/// `raw/` 不存在或其中没有容器时返回错误，其余错误均按样本记录。
pub fn extract_all<B: CameraBackend>(
    backend: &B,
    layout: &DatasetLayout,
    options: &ExtractOptions,
) -> Result<BatchReport, CaptureError> {
    options.validate()?;

    let raw_dir = layout.raw_dir();
    if !raw_dir.is_dir() {
        return Err(CaptureError::RawDirMissing(raw_dir));
    }

    let containers = layout.discover_containers()?;
    if containers.is_empty() {
        return Err(CaptureError::NoContainers {
            dir: raw_dir,
            ext: layout.container_ext().to_string(),
        });
    }
    tracing::info!("found {} containers in {}", containers.len(), raw_dir.display());

    let mut report = BatchReport::default();
    for container in containers {
        let Some(sample_id) = sample_id_from_container(&container) else {
            tracing::warn!("skipping {}: no usable file stem", container.display());
            continue;
        };

        let result = Extractor::open_for_replay(backend, &container, options.depth)
            .and_then(|extractor| extractor.extract(&sample_id, options, layout));

        match result {
            Ok(summary) => report.succeeded.push(summary),
            Err(error) => {
                tracing::warn!("{sample_id}: {error}");
                report.failed.push(BatchFailure {
                    sample_id,
                    container,
                    error,
                });
            },
        }
    }

    tracing::info!(
        "batch finished: {} extracted, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(report)
}
