use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const DEFAULT_ENDPOINT: &str = "https://opensheet.elk.sh";
pub const DEFAULT_SHEET_ID: &str = "1PwWhUZr7WDYCKRusbGpM5hPUinxM9mtSG6uVECSaiuI";
pub const DEFAULT_TAB_NAME: &str = "Mappings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_sheet_id")]
    pub sheet_id: String,
    #[serde(default = "default_tab_name")]
    pub tab_name: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            sheet_id: default_sheet_id(),
            tab_name: default_tab_name(),
        }
    }
}

impl ViewerConfig {
    /// Reads `config.json` from the data dir when present. The file is never
    /// created.
    pub fn load() -> Result<Self> {
        let Some(path) = config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path).context("read viewer config")?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse viewer config")
    }
}

pub fn config_path() -> Option<PathBuf> {
    base_data_dir().map(|dir| dir.join("config.json"))
}

pub fn log_path() -> Option<PathBuf> {
    let dir = base_data_dir()?;
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join("chaptermap.log"))
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_sheet_id() -> String {
    DEFAULT_SHEET_ID.to_string()
}

fn default_tab_name() -> String {
    DEFAULT_TAB_NAME.to_string()
}

fn base_data_dir() -> Option<PathBuf> {
    let base = BaseDirs::new()?;
    Some(base.data_local_dir().join("chaptermap"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = ViewerConfig::from_json(r#"{"tab_name": "Other tab"}"#).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.sheet_id, DEFAULT_SHEET_ID);
        assert_eq!(config.tab_name, "Other tab");
    }

    #[test]
    fn rejects_malformed_config() {
        let err = ViewerConfig::from_json("{").unwrap_err();
        assert!(err.to_string().contains("parse viewer config"));
    }
}
