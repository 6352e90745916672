//! # depthcap CLI
//!
//! 深度相机定长录制与批量抽帧工具。
//!
//! ```bash
//! # 配置默认数据集目录
//! depthcap-cli config set root /data/fruit
//!
//! # 录制（交互式输入样本 ID 与测量值）
//! depthcap-cli record --camera ZEDXMini_SN50918724 --depth
//!
//! # 每 20 帧抽取一帧彩色图 + 深度数组
//! depthcap-cli extract /data/fruit
//!
//! # 检查录制失败留下的容器
//! depthcap-cli orphans /data/fruit
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{
    ConfigCommand, DevicesCommand, ExtractCommand, OrphansCommand, RecordCommand, select_backend,
};
use config::{CliConfig, SIM_BACKEND};

/// depthcap CLI - 深度相机采集工具
#[derive(Parser, Debug)]
#[command(name = "depthcap-cli")]
#[command(about = "Timed depth-camera recording and deterministic frame extraction", long_about = None)]
#[command(version)]
struct Cli {
    /// 相机后端（覆盖配置，目前仅支持 sim）
    #[arg(long, global = true)]
    backend: Option<String>,

    /// 使用内置模拟相机（等同于 `--backend sim`）
    #[arg(long, global = true, conflicts_with = "backend")]
    sim: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 录制样本
    Record {
        #[command(flatten)]
        args: RecordCommand,
    },

    /// 从所有容器中抽帧
    Extract {
        #[command(flatten)]
        args: ExtractCommand,
    },

    /// 列出已连接的相机
    Devices {
        #[command(flatten)]
        args: DevicesCommand,
    },

    /// 列出没有标签的容器
    Orphans {
        #[command(flatten)]
        args: OrphansCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> ExitCode {
    // 日志输出到 stderr，stdout 只留给进度信息
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,depthcap=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let command = match cli.command {
        Commands::Config(cmd) => {
            cmd.execute()?;
            return Ok(ExitCode::SUCCESS);
        },
        other => other,
    };

    let config = CliConfig::load()?;
    let flag = if cli.sim { Some(SIM_BACKEND) } else { cli.backend.as_deref() };
    let backend = select_backend(flag, &config)?;
    tracing::debug!("config: {config:?}");

    match command {
        Commands::Record { args } => args.execute(&backend, &config),
        Commands::Extract { args } => args.execute(&backend, &config),
        Commands::Devices { args } => {
            args.execute(&backend)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Orphans { args } => {
            args.execute(config.root())?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Config(_) => Ok(ExitCode::SUCCESS),
    }
}
