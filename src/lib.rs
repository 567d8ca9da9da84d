//! todo-sync - a personal task tracker with a chat mirror
//!
//! Tasks live in a local JSON store. After every change the store is
//! rendered into a fixed-width report, written to `todo.txt`, and pushed to
//! two Discord webhook messages: one listing pending tasks, one listing
//! finished ones.
//!
//! # Architecture
//!
//! - [`store`] - Task store, id allocation and JSON persistence
//! - [`report`] - Fixed-width rendering shared by the file and the mirror
//! - [`sync`] - Slot registry, webhook transport and the sync orchestrator
//! - [`config`] - File locations, remote settings and endpoint validation
//! - [`app`] - The per-invocation pipeline tying everything together
//! - [`error`] - Custom error types and exit codes
//! - [`testing`] - Test doubles and fixtures
//!
//! # Example
//!
//! ```rust,ignore
//! use todo_sync::{Paths, Workspace, CurlTransport};
//!
//! let mut workspace = Workspace::open(Paths::new("."), CurlTransport::new())?;
//! let added = workspace.add("Fix login bug", "auth.py:42").await?;
//! println!("Added task {}", added.value);
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod report;
pub mod store;
pub mod sync;
pub mod testing;

// Re-export commonly used types
pub use error::{IntoTodoError, Result, TodoError};

pub use app::{Applied, Mirror, Workspace};
pub use config::{validate_endpoint, Paths, RemoteConfig};
pub use report::{render, Report};
pub use store::{ClearTarget, StoreFile, Task, TaskId, TaskStatus, TaskStore, Transition};
pub use sync::{
    CurlTransport, IdSource, MessageId, PresetIds, PromptIdSource, Role, SlotRegistry,
    SyncOrchestrator, SyncState, SyncSummary, WebhookTransport,
};
