//! 列出没有标签的容器（录制失败或被中断）

use anyhow::Result;
use clap::Args;
use depthcap_tools::{DatasetLayout, find_orphans};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct OrphansCommand {
    /// 数据集根目录（覆盖配置）
    pub root: Option<PathBuf>,
}

impl OrphansCommand {
    pub fn execute(&self, default_root: PathBuf) -> Result<()> {
        let layout = DatasetLayout::new(self.root.clone().unwrap_or(default_root));
        let orphans = find_orphans(&layout)?;

        if orphans.is_empty() {
            println!("✅ 没有孤立容器");
            return Ok(());
        }

        println!("⚠️  {} 个容器没有标签（不会自动删除）:", orphans.len());
        for orphan in &orphans {
            println!(
                "  {:<16} {} ({} bytes)",
                orphan.sample_id,
                orphan.container.display(),
                orphan.size_bytes
            );
        }
        Ok(())
    }
}
