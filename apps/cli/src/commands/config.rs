//! 配置管理命令

use crate::config::{CliConfig, KEYS, config_file};
use anyhow::Result;
use clap::Subcommand;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 配置项名称
        key: String,
        /// 新值（measurement_fields 用逗号分隔）
        value: String,
    },

    /// 获取配置项
    Get {
        /// 配置项名称
        #[arg(default_value = "all")]
        key: String,
    },

    /// 打印配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Set { key, value } => {
                let mut config = CliConfig::load()?;
                config.set(&key, &value)?;
                let path = config.save()?;
                println!("✅ {key} = {} ({})", config.get(&key)?, path.display());
            },

            ConfigCommand::Get { key } => {
                let config = CliConfig::load()?;
                if key == "all" {
                    for key in KEYS {
                        println!("{key} = {}", config.get(key)?);
                    }
                } else {
                    println!("{}", config.get(&key)?);
                }
            },

            ConfigCommand::Path => println!("{}", config_file()?.display()),
        }
        Ok(())
    }
}
