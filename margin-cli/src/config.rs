//! Runtime configuration from the environment and an optional `.env` file

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use margin_core::HighlightColor;

const DEFAULT_STORE_FILE: &str = "pages.json";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the store, exports and the log file
    pub data_dir: PathBuf,
    pub store_file: String,
    /// Color used for new highlights
    pub color: HighlightColor,
    /// `tracing` filter directives
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok(), dirs::home_dir())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, home: Option<PathBuf>) -> Result<Self> {
        let data_dir = match lookup("MARGIN_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => home.context("Could not find home directory")?.join(".margin"),
        };
        let color = match lookup("MARGIN_COLOR") {
            Some(value) => value
                .parse::<HighlightColor>()
                .map_err(|e: String| anyhow!(e))
                .context("Invalid MARGIN_COLOR")?,
            None => HighlightColor::default(),
        };

        Ok(Self {
            data_dir,
            store_file: lookup("MARGIN_STORE").unwrap_or_else(|| DEFAULT_STORE_FILE.to_string()),
            color,
            log_filter: lookup("MARGIN_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("margin.log")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}
