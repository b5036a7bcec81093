//! Task store seam.
//!
//! The store is external and untrusted: the core repairs whatever it loads
//! and only relies on read-your-writes between `put` and `get_all`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::task::Task;

pub trait TaskStore {
    fn get_all(&self) -> Result<Vec<Task>>;
    fn put(&mut self, task: &Task) -> Result<()>;
    fn delete(&mut self, id: &str) -> Result<()>;
}

/// Insertion-ordered in-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tasks: Vec<Task>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

impl TaskStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.clone())
    }

    fn put(&mut self, task: &Task) -> Result<()> {
        upsert(&mut self.tasks, task);
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.tasks.retain(|t| t.id != id);
        Ok(())
    }
}

/// JSON array on disk. A missing file is an empty store; writes go through a
/// sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<Task>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }

    fn write(&self, tasks: &[Task]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(tasks).context("serialize tasks")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }
}

impl TaskStore for JsonFileStore {
    fn get_all(&self) -> Result<Vec<Task>> {
        self.read()
    }

    fn put(&mut self, task: &Task) -> Result<()> {
        let mut tasks = self.read()?;
        upsert(&mut tasks, task);
        self.write(&tasks)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let mut tasks = self.read()?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() != before {
            self.write(&tasks)?;
        }
        Ok(())
    }
}

fn upsert(tasks: &mut Vec<Task>, task: &Task) {
    match tasks.iter_mut().find(|t| t.id == task.id) {
        Some(slot) => *slot = task.clone(),
        None => tasks.push(task.clone()),
    }
}
