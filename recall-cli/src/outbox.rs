//! Local reminder outbox: one JSON intent per line. Delivery is someone
//! else's job; `recall reminders` shows what is queued.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use recall_core::{ReminderIntent, ReminderSink};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct OutboxSink {
    path: PathBuf,
}

impl OutboxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Unparseable lines are skipped.
    pub fn read_all(&self) -> Result<Vec<ReminderIntent>> {
        read_intents(&self.path)
    }
}

impl ReminderSink for OutboxSink {
    fn schedule_one_shot(&mut self, intent: ReminderIntent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(f, "{}", serde_json::to_string(&intent)?)?;
        tracing::debug!(task = %intent.task_id, key = %intent.dedupe_key, "reminder queued");
        Ok(())
    }

    fn cancel_for_task(&mut self, task_id: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let all = read_intents(&self.path)?;
        let before = all.len();
        let kept: Vec<&ReminderIntent> = all.iter().filter(|r| r.task_id != task_id).collect();
        let removed = before - kept.len();
        if removed == 0 {
            return Ok(());
        }

        let mut out = String::new();
        for r in kept {
            out.push_str(&serde_json::to_string(r)?);
            out.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, out).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        tracing::debug!(task = %task_id, removed, "reminders cancelled");
        Ok(())
    }
}

fn read_intents(path: &Path) -> Result<Vec<ReminderIntent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let f = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(v) = serde_json::from_str::<ReminderIntent>(&line) {
            rows.push(v);
        }
    }
    Ok(rows)
}

/// Print queued reminders in send order, local time.
pub fn print_outbox(sink: &OutboxSink, now: DateTime<Utc>, tz: Tz, limit: usize) -> Result<()> {
    let mut rows = sink.read_all()?;
    if rows.is_empty() {
        println!("No reminders queued.");
        return Ok(());
    }
    rows.sort_by_key(|r| r.send_at_utc);

    let due = rows.iter().filter(|r| r.send_at_utc <= now).count();
    println!("Outbox: {} total, {} due, {} upcoming\n", rows.len(), due, rows.len() - due);
    for (i, r) in rows.iter().take(limit).enumerate() {
        println!(
            "{}. [{:?}] {} at {} ({})",
            i + 1,
            r.kind,
            r.body,
            r.send_at_utc.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
            r.task_id
        );
    }
    Ok(())
}
