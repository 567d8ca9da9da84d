//! Persistence for the task store.
//!
//! The store lives in a pretty-printed JSON document. Loading repairs
//! documents written by older versions (missing keys, a lagging watermark)
//! and rewrites them; anything it cannot make sense of is a storage error
//! and the invocation stops before touching the store.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{Task, TaskStore};
use crate::error::{IntoTodoError, Result, TodoError};

/// Temporary file suffix for atomic writes.
const TMP_SUFFIX: &str = ".tmp";

/// Lock file suffix for concurrent access prevention.
const LOCK_SUFFIX: &str = ".lock";

const TASK_STRING_KEYS: [&str; 3] = ["name", "code_pointer", "status"];

#[derive(Deserialize)]
struct StoreDocument {
    tasks: Vec<Task>,
    last_id: u64,
}

/// Handle on the JSON file backing a [`TaskStore`].
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store, creating an empty document if none exists yet.
    ///
    /// Missing keys are backfilled and the corrected document is written
    /// back before returning.
    pub fn load(&self) -> Result<TaskStore> {
        let Some(contents) = read_shared(&self.path)? else {
            let store = TaskStore::new();
            self.save(&store)?;
            info!("Initialized empty task store at {}", self.path.display());
            return Ok(store);
        };

        let mut doc: Value = serde_json::from_str(&contents).into_storage(&self.path)?;
        let mut repaired = backfill(&mut doc).map_err(|reason| {
            TodoError::storage_with_path(
                format!("{}: {}", self.path.display(), reason),
                self.path.clone(),
            )
        })?;

        let parsed: StoreDocument = serde_json::from_value(doc).into_storage(&self.path)?;
        check_unique_ids(&parsed.tasks).map_err(|reason| {
            TodoError::storage_with_path(
                format!("{}: {}", self.path.display(), reason),
                self.path.clone(),
            )
        })?;

        let stored_watermark = parsed.last_id;
        let store = TaskStore::from_parts(parsed.tasks, parsed.last_id);
        if store.last_id() != stored_watermark {
            warn!(
                "Watermark {} in {} lags behind stored ids; raised to {}",
                stored_watermark,
                self.path.display(),
                store.last_id()
            );
            repaired = true;
        }

        if repaired {
            self.save(&store)?;
            info!("Updated {} to include all required keys", self.path.display());
        }

        debug!(
            "Loaded {} tasks (last_id {}) from {}",
            store.len(),
            store.last_id(),
            self.path.display()
        );
        Ok(store)
    }

    /// Persist the store atomically.
    pub fn save(&self, store: &TaskStore) -> Result<()> {
        let json = serde_json::to_string_pretty(store)?;
        write_atomic(&self.path, &json)
    }
}

/// Fill in keys older documents may lack. Returns whether anything changed.
fn backfill(doc: &mut Value) -> std::result::Result<bool, String> {
    let Some(root) = doc.as_object_mut() else {
        return Err("expected a JSON object at the top level".to_string());
    };

    let mut changed = false;
    if !root.contains_key("tasks") {
        root.insert("tasks".to_string(), Value::Array(Vec::new()));
        changed = true;
    }
    if !root.contains_key("last_id") {
        root.insert("last_id".to_string(), Value::from(0u64));
        changed = true;
    }

    let mut watermark = root.get("last_id").and_then(Value::as_u64).unwrap_or(0);
    let Some(tasks) = root.get_mut("tasks").and_then(Value::as_array_mut) else {
        return Err("'tasks' must be an array".to_string());
    };

    let mut missing_ids = Vec::new();
    for (index, task) in tasks.iter_mut().enumerate() {
        let Some(fields) = task.as_object_mut() else {
            return Err(format!("task #{} is not an object", index + 1));
        };
        changed |= backfill_task(fields);
        match fields.get("id").and_then(Value::as_u64) {
            Some(id) => watermark = watermark.max(id),
            None if !fields.contains_key("id") => missing_ids.push(index),
            None => {}
        }
    }

    for index in &missing_ids {
        watermark = watermark
            .checked_add(1)
            .ok_or_else(|| "no task id left to assign".to_string())?;
        if let Some(fields) = tasks[*index].as_object_mut() {
            fields.insert("id".to_string(), Value::from(watermark));
        }
    }

    if !missing_ids.is_empty() {
        root.insert("last_id".to_string(), Value::from(watermark));
        changed = true;
    }

    Ok(changed)
}

fn backfill_task(fields: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    for key in TASK_STRING_KEYS {
        if !fields.contains_key(key) {
            fields.insert(key.to_string(), Value::String(String::new()));
            changed = true;
        }
    }
    changed
}

fn check_unique_ids(tasks: &[Task]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for task in tasks {
        if task.id.get() == 0 {
            return Err("task id 0 is not allowed".to_string());
        }
        if !seen.insert(task.id) {
            return Err(format!("duplicate task id {}", task.id));
        }
    }
    Ok(())
}

// ============================================================================
// Atomic file helpers
// ============================================================================

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Write `contents` to `path` via a temp file and rename, holding an
/// exclusive lock on `<path>.lock` for the duration.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).into_storage(parent)?;
        }
    }

    let lock_path = sibling(path, LOCK_SUFFIX);
    let lock_file = File::create(&lock_path).into_storage(&lock_path)?;
    FileExt::lock_exclusive(&lock_file).into_storage(&lock_path)?;

    let tmp_path = sibling(path, TMP_SUFFIX);
    let mut tmp_file = File::create(&tmp_path).into_storage(&tmp_path)?;
    tmp_file.write_all(contents.as_bytes()).into_storage(&tmp_path)?;
    tmp_file.sync_all().into_storage(&tmp_path)?;

    fs::rename(&tmp_path, path).into_storage(path)?;
    Ok(())
}

/// Read `path` under a shared lock. Returns `None` if the file is missing.
pub(crate) fn read_shared(path: &Path) -> Result<Option<String>> {
    let lock_path = sibling(path, LOCK_SUFFIX);
    let _lock = if lock_path.exists() {
        let lock_file = File::open(&lock_path).into_storage(&lock_path)?;
        FileExt::lock_shared(&lock_file).into_storage(&lock_path)?;
        Some(lock_file)
    } else {
        None
    };

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).into_storage(path),
    };

    let mut contents = String::new();
    file.read_to_string(&mut contents).into_storage(path)?;
    Ok(Some(contents))
}
