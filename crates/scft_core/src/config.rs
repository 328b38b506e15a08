//! Run configuration loaded from JSON.
//!
//! ```json
//! {
//!   "iterator": { "max_itr": 100, "epsilon": 1e-8, "max_hist": 10 },
//!   "sweep": { "ns": 4, "base_file_name": "out/", "parameters": ["chi 0 1 4.0"] }
//! }
//! ```

use crate::error::Result;
use crate::iterator::AmSettings;
use crate::sweep::{SweepParameter, SweepSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default)]
    pub iterator: AmSettings,
    pub sweep: SweepSettings,
}

impl RunConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        // Parse parameter lines up front so a bad type token is reported as
        // such rather than as a generic JSON error.
        if let Some(lines) = value.pointer("/sweep/parameters").and_then(|v| v.as_array()) {
            for line in lines.iter().filter_map(|line| line.as_str()) {
                line.parse::<SweepParameter>()?;
            }
        }
        let config: RunConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.iterator.validate()?;
        self.sweep.validate()
    }
}
