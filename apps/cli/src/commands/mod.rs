//! 命令定义和实现

pub mod config;
pub mod devices;
pub mod extract;
pub mod orphans;
pub mod record;

pub use config::ConfigCommand;
pub use devices::DevicesCommand;
pub use extract::ExtractCommand;
pub use orphans::OrphansCommand;
pub use record::RecordCommand;

use crate::config::{CliConfig, SIM_BACKEND};
use anyhow::{Result, bail};
use depthcap_sensor::SimBackend;

/// 按名称选择相机后端（命令行 > 配置）
pub fn select_backend(flag: Option<&str>, config: &CliConfig) -> Result<SimBackend> {
    match flag.unwrap_or(config.backend()) {
        SIM_BACKEND => Ok(SimBackend::default()),
        other => bail!("unsupported backend {other:?} (available: {SIM_BACKEND})"),
    }
}
