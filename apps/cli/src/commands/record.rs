//! 录制命令
//!
//! 相机只打开一次，之后循环：输入样本 ID → 输入测量值 → 录制。
//! 样本 ID 留空退出；Ctrl-C 中断当前录制并以 130 退出。

use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::Args;
use depthcap_driver::{
    CameraSelector, CancelToken, CaptureError, CaptureParams, Recorder, normalize_duration,
};
use depthcap_sensor::{CameraBackend, Codec, DepthCamera, Resolution};
use depthcap_tools::{DatasetLayout, Measurement};
use inquire::{CustomType, InquireError, Text};
use std::path::PathBuf;
use std::process::ExitCode;

/// 被 Ctrl-C 中断时的退出码
const EXIT_INTERRUPTED: u8 = 130;

/// 录制命令参数
#[derive(Args, Debug)]
pub struct RecordCommand {
    /// 数据集根目录（覆盖配置）
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// 相机 ID（如 ZEDXMini_SN50918724）或序列号
    #[arg(long)]
    pub camera: Option<String>,

    /// 录制时长（秒），不指定时交互询问
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// 同时计算深度
    #[arg(long, conflicts_with = "no_depth")]
    pub depth: bool,

    /// 不计算深度（覆盖配置中的 `depth = true`）
    #[arg(long)]
    pub no_depth: bool,

    #[arg(long)]
    pub resolution: Option<Resolution>,

    #[arg(long)]
    pub fps: Option<u32>,

    #[arg(long)]
    pub codec: Option<Codec>,
}

/// 一次提示的结果
enum Prompted<T> {
    Value(T),
    /// 操作员选择退出（Esc）
    Quit,
    /// Ctrl-C
    Interrupted,
}

fn prompted<T>(result: Result<T, InquireError>) -> Result<Prompted<T>> {
    match result {
        Ok(value) => Ok(Prompted::Value(value)),
        Err(InquireError::OperationCanceled) => Ok(Prompted::Quit),
        Err(InquireError::OperationInterrupted) => Ok(Prompted::Interrupted),
        Err(e) => Err(e).context("prompt failed"),
    }
}

impl RecordCommand {
    pub fn capture_params(&self, config: &CliConfig) -> CaptureParams {
        let defaults = CaptureParams::default();
        CaptureParams {
            codec: self.codec.or(config.codec).unwrap_or(defaults.codec),
            depth: self.depth_flag().or(config.depth).unwrap_or(defaults.depth),
            resolution: self.resolution.or(config.resolution).unwrap_or(defaults.resolution),
            fps: self.fps.or(config.fps).unwrap_or(defaults.fps),
        }
    }

    fn depth_flag(&self) -> Option<bool> {
        match (self.depth, self.no_depth) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    pub fn selector(&self, config: &CliConfig) -> Result<CameraSelector> {
        let id = self.camera.as_deref().or(config.camera_id.as_deref()).unwrap_or("");
        Ok(id.parse()?)
    }

    pub fn execute<B: CameraBackend>(&self, backend: &B, config: &CliConfig) -> Result<ExitCode> {
        let root = self.root.clone().unwrap_or_else(|| config.root());
        let selector = self.selector(config)?;
        let params = self.capture_params(config);

        let cancel = CancelToken::new();
        let handler_token = cancel.clone();
        ctrlc::set_handler(move || handler_token.cancel()).context("failed to set signal handler")?;

        println!("⏳ 打开相机 ({selector})...");
        let mut recorder = Recorder::open(backend, &selector, params, DatasetLayout::new(&root))?
            .with_ledger_columns(config.measurement_fields(), config.container_column())?
            .with_cancel_token(cancel.clone());
        if cancel.is_cancelled() {
            eprintln!("⚠️  打开相机时被中断");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
        println!(
            "✅ 相机 SN{} 已打开: {} @ {} fps, {}, 深度 {}",
            recorder.serial(),
            params.resolution,
            params.fps,
            params.codec,
            if params.depth { "开" } else { "关" }
        );
        println!("   数据集: {}", root.display());

        let duration_s = match self.duration {
            Some(d) => normalize_duration(d)?,
            None => match ask_duration(config.duration_s())? {
                Prompted::Value(d) => d,
                Prompted::Quit => return Ok(ExitCode::SUCCESS),
                Prompted::Interrupted => return Ok(ExitCode::from(EXIT_INTERRUPTED)),
            },
        };

        session_loop(&mut recorder, duration_s)
    }
}

fn ask_duration(default: f64) -> Result<Prompted<f64>> {
    loop {
        let answer = CustomType::<f64>::new("录制时长（秒）:")
            .with_default(default)
            .with_error_message("请输入数字")
            .prompt();
        match prompted(answer)? {
            Prompted::Value(d) => match normalize_duration(d) {
                Ok(d) => return Ok(Prompted::Value(d)),
                Err(e) => eprintln!("❌ {e}"),
            },
            other => return Ok(other),
        }
    }
}

fn session_loop<C: DepthCamera>(recorder: &mut Recorder<C>, duration_s: f64) -> Result<ExitCode> {
    let fields = recorder.measurement_fields().to_vec();

    loop {
        let raw_id = match prompted(Text::new("样本 ID（留空退出）:").prompt())? {
            Prompted::Value(id) => id,
            Prompted::Quit => break,
            Prompted::Interrupted => return Ok(ExitCode::from(EXIT_INTERRUPTED)),
        };
        if raw_id.trim().is_empty() {
            break;
        }

        let sample_id = match recorder.check_sample_id(&raw_id) {
            Ok(id) => id,
            Err(e) if e.is_reprompt() => {
                eprintln!("❌ {e}");
                continue;
            },
            Err(e) => return Err(e.into()),
        };

        let mut measurements = Vec::with_capacity(fields.len());
        for field in &fields {
            let answer = CustomType::<f64>::new(&format!("{field}:"))
                .with_error_message("请输入数字")
                .prompt();
            match prompted(answer)? {
                Prompted::Value(v) => measurements.push(Measurement::new(field.clone(), v)),
                Prompted::Quit => break,
                Prompted::Interrupted => return Ok(ExitCode::from(EXIT_INTERRUPTED)),
            }
        }
        if measurements.len() != fields.len() {
            println!("已跳过 {sample_id}");
            continue;
        }

        println!("⏺  录制 {sample_id} ({duration_s} s)...");
        match recorder.record(&sample_id, duration_s, &measurements) {
            Ok(session) => println!("ok {} ({} 帧)", session.sample_id, session.frames_grabbed),
            Err(CaptureError::Cancelled { sample_id }) => {
                eprintln!("⚠️  {sample_id} 录制被中断，未写入元数据");
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            },
            Err(e) if !e.is_fatal() => eprintln!("❌ {e}"),
            Err(e) => return Err(e.into()),
        }
    }

    println!("👋 退出");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        record: RecordCommand,
    }

    fn parse(args: &[&str]) -> RecordCommand {
        let argv = std::iter::once("record").chain(args.iter().copied());
        Harness::parse_from(argv).record
    }

    #[test]
    fn test_depth_flags_override_config() {
        let mut config = CliConfig::default();
        assert!(!parse(&[]).capture_params(&config).depth);
        assert!(parse(&["--depth"]).capture_params(&config).depth);

        config.depth = Some(true);
        assert!(parse(&[]).capture_params(&config).depth);
        assert!(!parse(&["--no-depth"]).capture_params(&config).depth);

        assert!(Harness::try_parse_from(["record", "--depth", "--no-depth"]).is_err());
    }

    #[test]
    fn test_flags_take_precedence_over_config() {
        let mut config = CliConfig::default();
        config.set("fps", "15").unwrap();
        config.set("codec", "lossless").unwrap();

        let params = parse(&["--fps", "60"]).capture_params(&config);
        assert_eq!(params.fps, 60);
        assert_eq!(params.codec, Codec::Lossless);
    }
}
