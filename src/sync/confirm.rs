//! Sources of message ids for pending confirmations.
//!
//! After a webhook create the id of the new message has to come from
//! somewhere else: a human copying it from the chat client, or a flag on
//! the command line.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use super::{MessageId, PendingConfirmation, Role};
use crate::error::{Result, TodoError};

/// Supplies the id of a message that was just created.
pub trait IdSource {
    fn supply(&mut self, pending: &PendingConfirmation) -> Result<MessageId>;
}

/// Asks for each id on `output` and reads one line from `input`.
pub struct PromptIdSource<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptIdSource<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptIdSource<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on stdout and read from stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> IdSource for PromptIdSource<R, W> {
    fn supply(&mut self, pending: &PendingConfirmation) -> Result<MessageId> {
        write!(
            self.output,
            "Enter the message ID of the new {} message: ",
            pending.role()
        )?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(TodoError::invalid_input(format!(
                "no message ID supplied for the {} message",
                pending.role()
            )));
        }
        MessageId::parse(&line)
    }
}

/// Ids given up front, falling back to another source for the rest.
pub struct PresetIds<S> {
    ids: HashMap<Role, MessageId>,
    fallback: S,
}

impl<S: IdSource> PresetIds<S> {
    pub fn new(fallback: S) -> Self {
        Self {
            ids: HashMap::new(),
            fallback,
        }
    }

    #[must_use]
    pub fn with(mut self, role: Role, id: Option<MessageId>) -> Self {
        if let Some(id) = id {
            self.ids.insert(role, id);
        }
        self
    }
}

impl<S: IdSource> IdSource for PresetIds<S> {
    fn supply(&mut self, pending: &PendingConfirmation) -> Result<MessageId> {
        match self.ids.remove(&pending.role()) {
            Some(id) => Ok(id),
            None => self.fallback.supply(pending),
        }
    }
}
