//! Mirroring of the report into two Discord webhook messages.
//!
//! The mirror is made of two *slots*, one per [`Role`]. Each slot is an
//! existing chat message that gets edited in place whenever the local store
//! changes. The pieces are:
//!
//! - [`registry`] - which message id currently plays which role
//! - [`transport`] - the HTTP calls (create, edit) behind a trait
//! - [`confirm`] - where message ids come from after a create
//! - [`orchestrator`] - setup, sync and overflow on top of the above
//!
//! Webhook creates do not hand back a message id, so every create is a
//! two-phase affair: the orchestrator returns a [`PendingConfirmation`] and
//! the caller confirms it with the id it obtained out of band.

pub mod confirm;
pub mod orchestrator;
pub mod registry;
pub mod transport;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TodoError};

pub use confirm::{IdSource, PresetIds, PromptIdSource};
pub use orchestrator::{
    Confirmed, PendingConfirmation, Purpose, SyncOrchestrator, SyncState, SyncSummary,
};
pub use registry::SlotRegistry;
pub use transport::{CurlTransport, Delivery, WebhookTransport, DEFAULT_TIMEOUT_SECS};

/// Logical identity of a remote slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Pending,
    Done,
}

impl Role {
    /// Both roles in the order they are synced.
    pub const ALL: [Role; 2] = [Role::Pending, Role::Done];

    #[must_use]
    pub fn other(self) -> Role {
        match self {
            Role::Pending => Role::Done,
            Role::Done => Role::Pending,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Pending => write!(f, "PENDING"),
            Role::Done => write!(f, "DONE"),
        }
    }
}

/// Identifier of a Discord message (a snowflake: ASCII digits only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TodoError::invalid_input(format!(
                "'{raw}' is not a Discord message id (expected digits only)"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MessageId {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MessageId {
    type Error = TodoError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0
    }
}
