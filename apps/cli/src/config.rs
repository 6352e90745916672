//! CLI 持久化配置
//!
//! `dirs::config_dir()/depthcap/config.toml`，可用 `DEPTHCAP_CONFIG` 指定其他路径。
//! 优先级：命令行参数 > 配置文件 > 内置默认值。

use anyhow::{Context, Result, anyhow, bail};
use depthcap_driver::{DEFAULT_DURATION_S, DEFAULT_MEASUREMENT_FIELDS};
use depthcap_sensor::{Codec, Resolution};
use depthcap_tools::ledger::DEFAULT_CONTAINER_COLUMN;
use depthcap_tools::{DEFAULT_MAX_DEPTH_MM, DEFAULT_STRIDE, check_columns};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// 覆盖配置文件路径的环境变量
pub const CONFIG_ENV: &str = "DEPTHCAP_CONFIG";

/// 默认数据集目录
pub const DEFAULT_ROOT: &str = "dataset";

/// 目前唯一的后端
pub const SIM_BACKEND: &str = "sim";

/// 可通过 `config set` 修改的键
pub const KEYS: [&str; 12] = [
    "root",
    "camera_id",
    "duration_s",
    "codec",
    "resolution",
    "fps",
    "depth",
    "measurement_fields",
    "container_column",
    "stride",
    "max_depth_mm",
    "backend",
];

pub fn config_file() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let mut path = dirs::config_dir().ok_or_else(|| anyhow!("cannot determine config directory"))?;
    path.push("depthcap");
    path.push("config.toml");
    Ok(path)
}

/// CLI 配置（所有字段可选，缺省时使用内置默认值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub root: Option<PathBuf>,
    pub camera_id: Option<String>,
    pub duration_s: Option<f64>,
    pub codec: Option<Codec>,
    pub resolution: Option<Resolution>,
    pub fps: Option<u32>,
    pub depth: Option<bool>,
    pub measurement_fields: Option<Vec<String>>,
    pub container_column: Option<String>,
    pub stride: Option<u64>,
    pub max_depth_mm: Option<f32>,
    pub backend: Option<String>,
}

impl CliConfig {
    /// 加载配置；文件不存在时返回默认配置
    pub fn load() -> Result<Self> {
        let path = config_file()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("malformed config file {}", path.display()))
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = config_file()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create config directory")?;
        }

        let content = format!("# depthcap CLI configuration\n\n{}", toml::to_string_pretty(self)?);
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// 按键名设置；值按字段类型解析
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "root" => self.root = Some(PathBuf::from(value)),
            "camera_id" => self.camera_id = Some(value.to_string()),
            "duration_s" => self.duration_s = Some(parse(key, value)?),
            "codec" => self.codec = Some(value.parse().map_err(|e: String| anyhow!(e))?),
            "resolution" => self.resolution = Some(value.parse().map_err(|e: String| anyhow!(e))?),
            "fps" => self.fps = Some(parse(key, value)?),
            "depth" => self.depth = Some(parse(key, value)?),
            "measurement_fields" => {
                let fields: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if fields.len() < 2 {
                    bail!("measurement_fields needs at least two comma-separated names");
                }
                check_columns(&fields, &self.container_column())?;
                self.measurement_fields = Some(fields);
            },
            "container_column" => {
                check_columns(&self.measurement_fields(), value)?;
                self.container_column = Some(value.to_string());
            },
            "stride" => self.stride = Some(parse(key, value)?),
            "max_depth_mm" => self.max_depth_mm = Some(parse(key, value)?),
            "backend" => {
                if value != SIM_BACKEND {
                    bail!("unsupported backend {value:?} (available: {SIM_BACKEND})");
                }
                self.backend = Some(value.to_string());
            },
            _ => bail!("unknown config key {key:?} (available: {})", KEYS.join(", ")),
        }
        Ok(())
    }

    /// 按键名读取（含默认值）
    pub fn get(&self, key: &str) -> Result<String> {
        Ok(match key {
            "root" => self.root().display().to_string(),
            "camera_id" => self.camera_id.clone().unwrap_or_default(),
            "duration_s" => self.duration_s().to_string(),
            "codec" => self.codec.unwrap_or_default().to_string(),
            "resolution" => self.resolution.unwrap_or_default().to_string(),
            "fps" => self.fps.unwrap_or(30).to_string(),
            "depth" => self.depth.unwrap_or(false).to_string(),
            "measurement_fields" => self.measurement_fields().join(","),
            "container_column" => self.container_column(),
            "stride" => self.stride.unwrap_or(DEFAULT_STRIDE).to_string(),
            "max_depth_mm" => self.max_depth_mm.unwrap_or(DEFAULT_MAX_DEPTH_MM).to_string(),
            "backend" => self.backend().to_string(),
            _ => bail!("unknown config key {key:?} (available: {})", KEYS.join(", ")),
        })
    }

    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT))
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s.unwrap_or(DEFAULT_DURATION_S)
    }

    pub fn measurement_fields(&self) -> Vec<String> {
        self.measurement_fields
            .clone()
            .unwrap_or_else(|| DEFAULT_MEASUREMENT_FIELDS.iter().map(|s| s.to_string()).collect())
    }

    pub fn container_column(&self) -> String {
        self.container_column
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTAINER_COLUMN.to_string())
    }

    pub fn backend(&self) -> &str {
        self.backend.as_deref().unwrap_or(SIM_BACKEND)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| anyhow!("invalid value {value:?} for {key}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.root(), PathBuf::from("dataset"));
        assert_eq!(config.duration_s(), 15.0);
        assert_eq!(config.measurement_fields(), vec!["weight_g", "caliber_mm"]);
        assert_eq!(config.container_column(), "container");
        assert_eq!(config.get("codec").unwrap(), "H265");
        assert_eq!(config.get("resolution").unwrap(), "HD1080");
        assert_eq!(config.get("stride").unwrap(), "20");
        assert_eq!(config.backend(), "sim");
    }

    #[test]
    fn test_set_and_toml_roundtrip() {
        let mut config = CliConfig::default();
        config.set("root", "/data/fruit").unwrap();
        config.set("codec", "lossless").unwrap();
        config.set("depth", "true").unwrap();
        config.set("measurement_fields", "mass_g, length_mm ,width_mm").unwrap();
        config.set("container_column", "svo2").unwrap();

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.codec, Some(Codec::Lossless));
        assert_eq!(parsed.measurement_fields(), vec!["mass_g", "length_mm", "width_mm"]);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = CliConfig::default();
        assert!(config.set("fps", "fast").is_err());
        assert!(config.set("codec", "mpeg2").is_err());
        assert!(config.set("measurement_fields", "only_one").is_err());
        assert!(config.set("backend", "zed").is_err());
        assert!(config.set("colour", "red").is_err());
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_set_rejects_reserved_columns() {
        let mut config = CliConfig::default();
        assert!(config.set("measurement_fields", "weight_g,date").is_err());
        assert!(config.set("measurement_fields", "sample_id,caliber_mm").is_err());
        assert!(config.set("measurement_fields", "weight_g,capture").is_err());
        assert!(config.set("measurement_fields", "weight_g,container").is_err());
        assert!(config.set("container_column", "weight_g").is_err());
        assert!(config.set("container_column", "date").is_err());
        assert_eq!(config, CliConfig::default());

        config.set("container_column", "svo2").unwrap();
        assert!(config.set("measurement_fields", "weight_g,svo2").is_err());
        config.set("measurement_fields", "weight_g,container").unwrap();
    }

    #[test]
    fn test_unknown_field_in_file_rejected() {
        assert!(toml::from_str::<CliConfig>("interface = \"can0\"").is_err());
        let partial: CliConfig = toml::from_str("stride = 10").unwrap();
        assert_eq!(partial.stride, Some(10));
        assert_eq!(partial.root, None);
    }
}
