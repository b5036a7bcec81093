use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$RECALL_HOME`, else `~/.recall`.
pub fn recall_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RECALL_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".recall"))
}

pub fn ensure_recall_home() -> Result<PathBuf> {
    let dir = recall_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn tasks_path() -> Result<PathBuf> {
    Ok(ensure_recall_home()?.join("tasks.json"))
}

pub fn outbox_path() -> Result<PathBuf> {
    Ok(ensure_recall_home()?.join("reminders.jsonl"))
}
