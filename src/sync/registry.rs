//! Which remote message currently plays which role.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MessageId, Role};
use crate::error::{Result, TodoError};

/// The two slot identifiers, keyed by role.
///
/// Serialized with the config keys `DISCORD_MESSAGE_ID` (pending) and
/// `DISCORD_DONE_MESSAGE_ID` (done). A message id is never held by both
/// roles at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRegistry {
    #[serde(
        rename = "DISCORD_MESSAGE_ID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pending: Option<MessageId>,

    #[serde(
        rename = "DISCORD_DONE_MESSAGE_ID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    done: Option<MessageId>,
}

impl SlotRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, role: Role) -> Option<&MessageId> {
        match role {
            Role::Pending => self.pending.as_ref(),
            Role::Done => self.done.as_ref(),
        }
    }

    /// Assign `id` to `role`.
    ///
    /// Fails with `InvalidInput` if the other role already holds `id`.
    pub fn set(&mut self, role: Role, id: MessageId) -> Result<()> {
        if self.get(role.other()) == Some(&id) {
            return Err(TodoError::invalid_input(format!(
                "message {id} is already the {} slot",
                role.other()
            )));
        }
        debug!("Assigning message {} to {} slot", id, role);
        *self.slot_mut(role) = Some(id);
        Ok(())
    }

    /// Exchange the identifiers of both roles.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.done);
    }

    /// Both roles have a slot.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.pending.is_some() && self.done.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.done = None;
    }

    /// Rotate the two slots after a new done message was created.
    ///
    /// The old pending slot is retired and returned, the old done slot takes
    /// the pending role and `new_id` becomes the done slot.
    pub fn rotate_for_overflow(&mut self, new_id: MessageId) -> Result<Option<MessageId>> {
        if self.pending.as_ref() == Some(&new_id) || self.done.as_ref() == Some(&new_id) {
            return Err(TodoError::invalid_input(format!(
                "message {new_id} is already in use as a slot"
            )));
        }
        let retired = self.pending.take();
        self.swap();
        self.done = Some(new_id);
        Ok(retired)
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<MessageId> {
        match role {
            Role::Pending => &mut self.pending,
            Role::Done => &mut self.done,
        }
    }
}
