use anyhow::{Context, Result};
use recall_core::SchedulerConfig;
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_recall_home;

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_recall_home()?.join("config.toml"))
}

pub fn load_config() -> Result<SchedulerConfig> {
    load_config_from(&config_path()?)
}

/// Missing file means defaults; missing keys fall back per section.
pub fn load_config_from(p: &Path) -> Result<SchedulerConfig> {
    if !p.exists() {
        return Ok(SchedulerConfig::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    let cfg: SchedulerConfig = toml::from_str(&s).context("parse config.toml")?;
    cfg.schedule.tz().context("config.toml schedule.timezone")?;
    Ok(cfg)
}

pub fn save_config_to(p: &Path, cfg: &SchedulerConfig) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&p, &SchedulerConfig::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
