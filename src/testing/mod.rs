//! Testing infrastructure for todo-sync.
//!
//! Test doubles for the remote seams and fixtures for working directories,
//! so the full command pipeline can be exercised without a network.
//!
//! - **Mocks**: [`MockTransport`] records webhook calls and can be scripted
//!   to fail per role; [`ScriptedIds`] hands out message ids in order.
//! - **Fixtures**: `TestFixture` builds a temporary working directory with
//!   a store and, optionally, remote settings (test-only).
//!
//! # Example
//!
//! ```rust,ignore
//! use todo_sync::testing::{MockTransport, ScriptedIds};
//! use todo_sync::sync::Role;
//!
//! let transport = MockTransport::new().with_edit_status(Role::Done, 404);
//! let mut ids = ScriptedIds::new(["111", "222"]);
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod mocks;

#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;
