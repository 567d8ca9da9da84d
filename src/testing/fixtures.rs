//! Test fixtures for creating reproducible working directories.

use std::path::Path;
use tempfile::TempDir;

use crate::config::{Paths, RemoteConfig};
use crate::store::{StoreFile, TaskStore};
use crate::sync::{MessageId, Role};

/// Webhook URL used by fixtures. Never contacted.
pub const FIXTURE_WEBHOOK: &str = "https://discord.com/api/webhooks/1000/fixture-token";

/// A temporary working directory.
///
/// Automatically cleans up when dropped.
pub struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    /// An empty directory with no store and no remote settings.
    ///
    /// # Panics
    ///
    /// Panics if temporary directory creation fails.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// A directory with a store holding two pending tasks and one done task.
    ///
    /// # Panics
    ///
    /// Panics if the store cannot be written.
    #[must_use]
    pub fn with_tasks() -> Self {
        let fixture = Self::empty();
        let mut store = TaskStore::new();
        store
            .add("Write parser", "src/parse.rs:10")
            .expect("Failed to add task");
        store
            .add("Fix login bug", "auth.py:42")
            .expect("Failed to add task");
        let done = store
            .add("Set up CI", ".github/workflows")
            .expect("Failed to add task");
        store.tick(done).expect("task was just added");
        fixture.write_store(&store);
        fixture
    }

    /// Like [`with_tasks`](Self::with_tasks) with remote slots 100 and 200.
    ///
    /// # Panics
    ///
    /// Panics if the config cannot be written.
    #[must_use]
    pub fn configured() -> Self {
        let fixture = Self::with_tasks();
        let mut config = RemoteConfig {
            webhook_url: Some(FIXTURE_WEBHOOK.to_string()),
            ..Default::default()
        };
        config
            .slots
            .set(Role::Pending, MessageId::parse("100").expect("valid id"))
            .expect("slot is free");
        config
            .slots
            .set(Role::Done, MessageId::parse("200").expect("valid id"))
            .expect("slot is free");
        config
            .save(&fixture.paths().remote_config())
            .expect("Failed to write remote config");
        fixture
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    #[must_use]
    pub fn paths(&self) -> Paths {
        Paths::new(self.path())
    }

    /// # Panics
    ///
    /// Panics if the store cannot be written.
    pub fn write_store(&self, store: &TaskStore) {
        StoreFile::new(self.paths().store())
            .save(store)
            .expect("Failed to write store");
    }

    /// # Panics
    ///
    /// Panics if the store cannot be read.
    #[must_use]
    pub fn read_store(&self) -> TaskStore {
        StoreFile::new(self.paths().store())
            .load()
            .expect("Failed to read store")
    }

    /// # Panics
    ///
    /// Panics if the report does not exist.
    #[must_use]
    pub fn read_report(&self) -> String {
        std::fs::read_to_string(self.paths().report()).expect("Failed to read todo.txt")
    }

    /// # Panics
    ///
    /// Panics if the config cannot be read.
    #[must_use]
    pub fn read_remote_config(&self) -> RemoteConfig {
        RemoteConfig::load(&self.paths().remote_config()).expect("Failed to read remote config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fixture_has_no_files() {
        let fixture = TestFixture::empty();
        assert!(!fixture.paths().store().exists());
        assert!(!fixture.paths().remote_config().exists());
    }

    #[test]
    fn test_with_tasks_fixture() {
        let fixture = TestFixture::with_tasks();
        let store = fixture.read_store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.done().count(), 1);
        assert_eq!(store.last_id(), 3);
    }

    #[test]
    fn test_configured_fixture() {
        let fixture = TestFixture::configured();
        assert!(fixture.read_remote_config().is_configured());
    }
}
