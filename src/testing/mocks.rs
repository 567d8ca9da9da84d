//! Mock implementations of the remote seams.
//!
//! These mocks stand in for the webhook and for the human who copies message
//! ids out of the chat client, so sync flows run deterministically and
//! without network access.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{Result, TodoError};
use crate::sync::{Delivery, IdSource, MessageId, PendingConfirmation, Role, WebhookTransport};

/// One request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Create {
        role: Role,
        endpoint: String,
        content: String,
    },
    Edit {
        role: Role,
        endpoint: String,
        message_id: MessageId,
        content: String,
    },
}

impl RemoteCall {
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::Create { role, .. } | Self::Edit { role, .. } => *role,
        }
    }
}

/// Recording webhook transport.
///
/// Answers 204 to edits and 200 to creates unless a status was scripted for
/// the role. Thread-safe for use in async contexts.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new().with_edit_status(Role::Done, 404);
/// // ... run a sync ...
/// assert_eq!(transport.calls().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: Mutex<Vec<RemoteCall>>,
    create_status: HashMap<Role, u16>,
    edit_status: HashMap<Role, u16>,
    unreachable: bool,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer creates for `role` with `status`.
    #[must_use]
    pub fn with_create_status(mut self, role: Role, status: u16) -> Self {
        self.create_status.insert(role, status);
        self
    }

    /// Answer edits of the `role` slot with `status`.
    #[must_use]
    pub fn with_edit_status(mut self, role: Role, status: u16) -> Self {
        self.edit_status.insert(role, status);
        self
    }

    /// Fail every request as if the host could not be reached.
    #[must_use]
    pub fn with_unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Every request made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, role: Role, call: RemoteCall, status: u16) -> Result<Delivery> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.unreachable {
            return Err(TodoError::sync_failed(role, None, "host unreachable"));
        }
        Ok(Delivery::new(status))
    }
}

#[async_trait]
impl WebhookTransport for MockTransport {
    async fn create(&self, role: Role, endpoint: &str, content: &str) -> Result<Delivery> {
        let status = self.create_status.get(&role).copied().unwrap_or(200);
        self.record(
            role,
            RemoteCall::Create {
                role,
                endpoint: endpoint.to_string(),
                content: content.to_string(),
            },
            status,
        )
    }

    async fn edit(
        &self,
        role: Role,
        endpoint: &str,
        message_id: &MessageId,
        content: &str,
    ) -> Result<Delivery> {
        let status = self.edit_status.get(&role).copied().unwrap_or(204);
        self.record(
            role,
            RemoteCall::Edit {
                role,
                endpoint: endpoint.to_string(),
                message_id: message_id.clone(),
                content: content.to_string(),
            },
            status,
        )
    }
}

/// Supplies ids from a fixed list, in order.
#[derive(Debug, Clone)]
pub struct ScriptedIds {
    ids: VecDeque<String>,
    asked: Vec<Role>,
}

impl ScriptedIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Roles that were asked for, in order.
    #[must_use]
    pub fn asked(&self) -> &[Role] {
        &self.asked
    }
}

impl IdSource for ScriptedIds {
    fn supply(&mut self, pending: &PendingConfirmation) -> Result<MessageId> {
        self.asked.push(pending.role());
        match self.ids.pop_front() {
            Some(raw) => MessageId::parse(&raw),
            None => Err(TodoError::invalid_input(format!(
                "no message ID supplied for the {} message",
                pending.role()
            ))),
        }
    }
}
