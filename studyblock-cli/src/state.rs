use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use studyblock_core::PlanOutcome;

/// `$STUDYBLOCK_HOME`, else `~/.studyblock`.
pub fn studyblock_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("STUDYBLOCK_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".studyblock"))
}

pub fn ensure_studyblock_home() -> Result<PathBuf> {
    let dir = studyblock_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn last_plan_path() -> Result<PathBuf> {
    Ok(ensure_studyblock_home()?.join("last_plan.json"))
}

/// `plan --save`: keep the run around for inspection.
pub fn write_last_plan(outcome: &PlanOutcome) -> Result<PathBuf> {
    let p = last_plan_path()?;
    write_plan(&p, outcome)?;
    Ok(p)
}

fn write_plan(path: &Path, outcome: &PlanOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome)?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}
