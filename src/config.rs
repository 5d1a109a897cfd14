use crate::domain::{BelongingToView, FilterState, InsertType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub config_version: u32,
    pub document: Option<PathBuf>,
    pub keep_on_top: bool,
    pub log_level: String,
    pub default_belonging_to_view: BelongingToView,
    pub default_insert_type: InsertType,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: 1,
            document: None,
            keep_on_top: true,
            log_level: "info".to_string(),
            default_belonging_to_view: BelongingToView::All,
            default_insert_type: InsertType::All,
        }
    }
}

impl AppConfig {
    pub fn load_or_default() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let parsed = toml::from_str::<AppConfig>(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;

        Ok(parsed)
    }

    pub fn initial_filter(&self) -> FilterState {
        FilterState {
            belonging_to_view: self.default_belonging_to_view,
            insert_type: self.default_insert_type,
            search_text: String::new(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not resolve config directory")?;
    Ok(base.join("cadimport-tui").join("config.toml"))
}
