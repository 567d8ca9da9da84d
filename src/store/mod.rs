//! Task store with a monotonic id allocator.
//!
//! The store is the source of truth for every invocation: it is loaded once,
//! mutated by exactly one operation, and persisted before anything is sent
//! to the remote mirror.
//!
//! # Id allocation
//!
//! Ids come from the `last_id` watermark. Deleting or clearing tasks never
//! lowers the watermark, so an id is never handed out twice.
//!
//! # Example
//!
//! ```
//! use todo_sync::store::{TaskStatus, TaskStore, Transition};
//!
//! let mut store = TaskStore::new();
//! let id = store.add("Fix bug", "file.py:10").unwrap();
//! assert_eq!(id.get(), 1);
//!
//! assert_eq!(store.tick(id).unwrap(), Transition::Changed);
//! assert_eq!(store.tick(id).unwrap(), Transition::Unchanged);
//! assert_eq!(store.find(id).unwrap().status, TaskStatus::Done);
//! ```

pub mod persistence;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TodoError};

pub use persistence::StoreFile;

// ============================================================================
// Task Identity
// ============================================================================

/// Stable identifier of a task. Always `>= 1` for allocated tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TaskId {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .ok()
            .filter(|raw| *raw >= 1)
            .map(Self)
            .ok_or_else(|| TodoError::invalid_input(format!("'{s}' is not a task id")))
    }
}

// ============================================================================
// Task Status
// ============================================================================

/// Completion status of a task.
///
/// Persisted as `""` (pending) or `"DONE"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "")]
    Pending,
    #[serde(rename = "DONE")]
    Done,
}

impl TaskStatus {
    /// Label shown in the status column of the report.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status was flipped.
    Changed,
    /// The task already had the requested status.
    Unchanged,
}

// ============================================================================
// Task
// ============================================================================

/// A single tracked task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub code_pointer: String,
    pub status: TaskStatus,
}

impl Task {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

// ============================================================================
// Clear Target
// ============================================================================

/// Which tasks `clear` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    All,
    Pending,
    Done,
}

impl ClearTarget {
    fn matches(&self, task: &Task) -> bool {
        match self {
            ClearTarget::All => true,
            ClearTarget::Pending => task.status == TaskStatus::Pending,
            ClearTarget::Done => task.status == TaskStatus::Done,
        }
    }
}

impl FromStr for ClearTarget {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ClearTarget::All),
            "pending" => Ok(ClearTarget::Pending),
            "done" => Ok(ClearTarget::Done),
            other => Err(TodoError::invalid_input(format!(
                "invalid clear target '{other}'; valid targets are: all, pending, done"
            ))),
        }
    }
}

impl fmt::Display for ClearTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearTarget::All => write!(f, "all"),
            ClearTarget::Pending => write!(f, "pending"),
            ClearTarget::Done => write!(f, "done"),
        }
    }
}

// ============================================================================
// Task Store
// ============================================================================

/// Ordered collection of tasks plus the id watermark.
///
/// Tasks keep insertion order across every mutation: `delete` removes
/// without reordering and `edit` updates in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStore {
    tasks: Vec<Task>,
    last_id: u64,
}

impl TaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted parts.
    ///
    /// The watermark is raised to the highest stored id if it lags behind.
    #[must_use]
    pub fn from_parts(tasks: Vec<Task>, last_id: u64) -> Self {
        let max_id = tasks.iter().map(|t| t.id.get()).max().unwrap_or(0);
        Self {
            tasks,
            last_id: last_id.max(max_id),
        }
    }

    /// Highest id ever allocated.
    #[must_use]
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_done())
    }

    pub fn done(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.is_done())
    }

    /// Append a new pending task and return its freshly allocated id.
    ///
    /// Fails with `Storage` once the watermark has reached `u64::MAX`.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        code_pointer: impl Into<String>,
    ) -> Result<TaskId> {
        let next = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| TodoError::storage("task id space exhausted"))?;
        self.last_id = next;
        let id = TaskId(next);
        self.tasks.push(Task {
            id,
            name: name.into(),
            code_pointer: code_pointer.into(),
            status: TaskStatus::Pending,
        });
        Ok(id)
    }

    /// Mark a task as done.
    pub fn tick(&mut self, id: TaskId) -> Result<Transition> {
        self.set_status(id, TaskStatus::Done)
    }

    /// Mark a task as pending again.
    pub fn untick(&mut self, id: TaskId) -> Result<Transition> {
        self.set_status(id, TaskStatus::Pending)
    }

    /// Remove a task. The id is retired, not recycled.
    pub fn delete(&mut self, id: TaskId) -> Result<Task> {
        let index = self.position(id)?;
        Ok(self.tasks.remove(index))
    }

    /// Overwrite name and code pointer of a task in place.
    pub fn edit(
        &mut self,
        id: TaskId,
        name: impl Into<String>,
        code_pointer: impl Into<String>,
    ) -> Result<&Task> {
        let task = self.find_mut(id)?;
        task.name = name.into();
        task.code_pointer = code_pointer.into();
        Ok(task)
    }

    /// Remove every task matching `target` and return how many were removed.
    pub fn clear(&mut self, target: ClearTarget) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !target.matches(t));
        before - self.tasks.len()
    }

    #[must_use]
    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Like [`find`](Self::find) but reports a missing task as `NotFound`.
    pub fn get(&self, id: TaskId) -> Result<&Task> {
        self.find(id).ok_or(TodoError::NotFound { id: id.get() })
    }

    fn set_status(&mut self, id: TaskId, status: TaskStatus) -> Result<Transition> {
        let task = self.find_mut(id)?;
        if task.status == status {
            return Ok(Transition::Unchanged);
        }
        task.status = status;
        Ok(Transition::Changed)
    }

    fn find_mut(&mut self, id: TaskId) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TodoError::NotFound { id: id.get() })
    }

    fn position(&self, id: TaskId) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TodoError::NotFound { id: id.get() })
    }
}
