//! # 样本标签（JSON）
//!
//! `labels/<sample_id>.json`：账本行的完整副本，外加 `capture` 采集参数。
//!
//! ```json
//! {
//!   "sample_id": "A1",
//!   "weight_g": 12.0,
//!   "caliber_mm": 27.5,
//!   "date": "2026-10-18",
//!   "container": "raw/A1.dcap",
//!   "capture": { "codec": "H265", "duration_s": 15.0, ... }
//! }
//! ```

use crate::ToolsError;
use crate::ledger::LedgerRow;
use depthcap_sensor::{Codec, DepthMode, Resolution};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// 采集参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureInfo {
    pub codec: Codec,
    pub duration_s: f64,
    pub depth_mode: DepthMode,
    pub resolution: Resolution,
    pub fps: u32,
    pub camera_serial: u32,
    pub frames_grabbed: u64,
}

/// 标签文件内容
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLabel {
    pub row: LedgerRow,
    /// 容器路径在 JSON 中的键名（与账本列名一致）
    pub container_key: String,
    pub capture: CaptureInfo,
}

impl SessionLabel {
    /// 按账本列顺序展开，`capture` 放在最后
    pub fn to_json(&self) -> Result<Value, ToolsError> {
        let mut map = Map::new();
        map.insert("sample_id".into(), Value::from(self.row.sample_id.clone()));
        for m in &self.row.measurements {
            map.insert(m.name.clone(), Value::from(m.value));
        }
        map.insert("date".into(), Value::from(self.row.date.clone()));
        map.insert(self.container_key.clone(), Value::from(self.row.container.clone()));
        map.insert("capture".into(), serde_json::to_value(&self.capture)?);
        Ok(Value::Object(map))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ToolsError> {
        let json = serde_json::to_string_pretty(&self.to_json()?)?;
        fs::write(path, json)?;
        Ok(())
    }
}
