//! Custom error types for todo-sync.
//!
//! Every failure an invocation can hit maps onto one [`TodoError`] variant
//! with a stable message and exit code. Reported no-ops (ticking a task that
//! is already done) are not errors and never reach this module.

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::Role;

/// Main error type for todo-sync operations
#[derive(Error, Debug)]
pub enum TodoError {
    // =========================================================================
    // Task Errors
    // =========================================================================
    /// No task carries the requested id
    #[error("Task {id} not found")]
    NotFound { id: u64 },

    /// Malformed user input (endpoint, message id, clear target)
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Document unreadable or corrupt on load, or unwritable on save
    #[error("Storage error: {reason}")]
    Storage {
        reason: String,
        path: Option<PathBuf>,
    },

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// A remote create/edit call did not succeed
    #[error("Sync of {role} message failed{}: {message}", http_suffix(.status))]
    SyncFailed {
        role: Role,
        status: Option<u16>,
        message: String,
    },

    /// Sync attempted before setup completed
    #[error("Remote mirror is not configured; run `todo-sync setup <webhook-url>` first")]
    NotConfigured,

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TodoError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create an invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a storage error
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
            path: None,
        }
    }

    /// Create a storage error with path
    pub fn storage_with_path(reason: impl Into<String>, path: PathBuf) -> Self {
        Self::Storage {
            reason: reason.into(),
            path: Some(path),
        }
    }

    /// Create a sync failure for a role
    pub fn sync_failed(role: Role, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::SyncFailed {
            role,
            status,
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error came from the remote mirror rather than local state
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::SyncFailed { .. } | Self::NotConfigured)
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } => 2,
            Self::NotFound { .. } => 3,
            Self::Storage { .. } => 4,
            Self::SyncFailed { .. } => 5,
            Self::NotConfigured => 6,
            _ => 1,
        }
    }
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with HTTP {s}")).unwrap_or_default()
}

/// Type alias for todo-sync results
pub type Result<T> = std::result::Result<T, TodoError>;

/// Extension trait for converting foreign errors to TodoError
pub trait IntoTodoError<T> {
    fn into_storage(self, path: &std::path::Path) -> Result<T>;
    fn into_invalid_input(self) -> Result<T>;
}

impl<T, E: Into<anyhow::Error>> IntoTodoError<T> for std::result::Result<T, E> {
    fn into_storage(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| {
            TodoError::storage_with_path(
                format!("{}: {}", path.display(), e.into()),
                path.to_path_buf(),
            )
        })
    }

    fn into_invalid_input(self) -> Result<T> {
        self.map_err(|e| TodoError::invalid_input(e.into().to_string()))
    }
}
