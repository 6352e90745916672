//! 批量抽帧命令

use crate::config::CliConfig;
use anyhow::Result;
use clap::Args;
use depthcap_driver::{ExtractOptions, StopReason, extract_all};
use depthcap_sensor::CameraBackend;
use depthcap_tools::{DatasetLayout, Rotation};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct ExtractCommand {
    /// 数据集根目录（覆盖配置）
    pub root: Option<PathBuf>,

    /// 每 N 帧保存一帧
    #[arg(long)]
    pub stride: Option<u64>,

    /// 深度上限（毫米），超出的值置 0
    #[arg(long)]
    pub max_depth_mm: Option<f32>,

    /// 只输出彩色图像
    #[arg(long)]
    pub no_depth: bool,

    /// 彩色图像顺时针旋转 90°
    #[arg(long)]
    pub rotate_cw: bool,
}

impl ExtractCommand {
    pub fn options(&self, config: &CliConfig) -> ExtractOptions {
        let defaults = ExtractOptions::default();
        ExtractOptions {
            stride: self.stride.or(config.stride).unwrap_or(defaults.stride),
            max_depth_mm: self.max_depth_mm.or(config.max_depth_mm).unwrap_or(defaults.max_depth_mm),
            depth: !self.no_depth,
            rotation: if self.rotate_cw { Rotation::Clockwise90 } else { Rotation::None },
        }
    }

    pub fn execute<B: CameraBackend>(&self, backend: &B, config: &CliConfig) -> Result<ExitCode> {
        let layout = DatasetLayout::new(self.root.clone().unwrap_or_else(|| config.root()));
        let options = self.options(config);

        println!("⏳ 抽帧: {} (stride {}, 深度上限 {} mm)", layout.root().display(), options.stride, options.max_depth_mm);
        let report = extract_all(backend, &layout, &options)?;

        for summary in &report.succeeded {
            let note = match &summary.stop_reason {
                StopReason::ReplayError(msg) => format!(" ⚠️  回放中断: {msg}"),
                _ => String::new(),
            };
            println!(
                "✅ {}: {} 帧中保存 {} 帧 -> {}{note}",
                summary.sample_id,
                summary.frames_read,
                summary.frames_sampled,
                summary.images_dir.display()
            );
        }
        for failure in &report.failed {
            eprintln!("❌ {}: {}", failure.sample_id, failure.error);
        }

        println!("完成: {} 成功, {} 失败", report.succeeded.len(), report.failed.len());
        Ok(if report.failed.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}
