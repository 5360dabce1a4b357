use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use studyblock_core::SchedulerConfig;

use crate::state::ensure_studyblock_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub canvas: CanvasSection,
    pub calendar: CalendarSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSection {
    pub base_url: String,
    /// Falls back to `CANVAS_API_TOKEN`.
    pub token: Option<String>,
    pub upcoming_days: i64,
}

impl Default for CanvasSection {
    fn default() -> Self {
        Self {
            base_url: "https://canvas.instructure.com".to_string(),
            token: None,
            upcoming_days: 14,
        }
    }
}

impl CanvasSection {
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var("CANVAS_API_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    pub calendar_id: String,
    /// Prepended to every event summary.
    pub event_prefix: String,
    pub popup_reminder_minutes: u32,
    pub email_reminder_minutes: u32,
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            event_prefix: String::new(),
            popup_reminder_minutes: 15,
            email_reminder_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_studyblock_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Missing file means defaults. The scheduler section is validated here so a
/// bad value fails before any network work starts.
pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", p.display()))?;
    cfg.scheduler
        .validate()
        .with_context(|| format!("invalid [scheduler] in {}", p.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config) -> Result<PathBuf> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(p)
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let written = save_config(&Config::default())?;
    println!("Wrote {}", written.display());
    Ok(())
}
