//! One invocation of the tracker, from load to sync.
//!
//! Every command follows the same pipeline: load the store and the remote
//! settings, apply exactly one operation, persist the store, render the
//! report, write `todo.txt`, and mirror both sections remotely. Local state
//! is always persisted before any remote call, so a failed sync never loses
//! a change.

use tracing::{debug, info, warn};

use crate::config::{Paths, RemoteConfig};
use crate::error::Result;
use crate::report::{render, write_report, Report};
use crate::store::{ClearTarget, StoreFile, Task, TaskId, TaskStore, Transition};
use crate::sync::{IdSource, MessageId, SyncOrchestrator, SyncState, SyncSummary, WebhookTransport};

/// What happened to the remote mirror after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mirror {
    /// Both messages were edited.
    Synced(SyncSummary),
    /// Setup has not been run; nothing was sent.
    Unconfigured,
    /// Syncing was switched off for this invocation.
    Disabled,
    /// The operation changed nothing, so nothing was persisted or sent.
    Unchanged,
}

/// Result of an operation together with the mirror outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<V> {
    pub value: V,
    pub mirror: Mirror,
}

/// The loaded working directory.
pub struct Workspace<T> {
    paths: Paths,
    store_file: StoreFile,
    store: TaskStore,
    orchestrator: SyncOrchestrator<T>,
    sync_enabled: bool,
    env_overrides: Vec<&'static str>,
}

impl<T: WebhookTransport> Workspace<T> {
    /// Load the store and the remote settings below `paths`.
    ///
    /// Environment variables override the remote settings file. A corrupt
    /// store aborts here, before any operation runs.
    pub fn open(paths: Paths, transport: T) -> Result<Self> {
        Self::open_with(paths, transport, |key| std::env::var(key).ok())
    }

    /// Like [`open`](Self::open), reading overrides from `lookup`.
    pub fn open_with(
        paths: Paths,
        transport: T,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let store_file = StoreFile::new(paths.store());
        let store = store_file.load()?;

        let mut config = RemoteConfig::load(&paths.remote_config())?;
        let env_overrides = config.apply_overrides(lookup)?;
        if !env_overrides.is_empty() {
            debug!("Remote settings overridden by {}", env_overrides.join(", "));
        }

        let mut workspace = Self::from_parts(paths, store, config, transport);
        workspace.env_overrides = env_overrides;
        Ok(workspace)
    }

    /// Assemble a workspace from already loaded parts.
    pub fn from_parts(paths: Paths, store: TaskStore, config: RemoteConfig, transport: T) -> Self {
        Self {
            store_file: StoreFile::new(paths.store()),
            paths,
            store,
            orchestrator: SyncOrchestrator::new(transport, config),
            sync_enabled: true,
            env_overrides: Vec::new(),
        }
    }

    /// Turn the automatic mirror after mutations on or off.
    #[must_use]
    pub fn with_sync(mut self, enabled: bool) -> Self {
        self.sync_enabled = enabled;
        self
    }

    #[must_use]
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    #[must_use]
    pub fn orchestrator(&self) -> &SyncOrchestrator<T> {
        &self.orchestrator
    }

    #[must_use]
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Environment variables that replaced values from the settings file.
    ///
    /// They keep winning on later invocations, so ids saved by setup or the
    /// overflow handler stay shadowed while these are set.
    #[must_use]
    pub fn env_overrides(&self) -> &[&'static str] {
        &self.env_overrides
    }

    // =========================================================================
    // Task operations
    // =========================================================================

    pub async fn add(&mut self, name: &str, code_pointer: &str) -> Result<Applied<TaskId>> {
        let id = self.store.add(name, code_pointer)?;
        info!("Added task {}", id);
        let mirror = self.commit().await?;
        Ok(Applied { value: id, mirror })
    }

    pub async fn tick(&mut self, id: TaskId) -> Result<Applied<Transition>> {
        let transition = self.store.tick(id)?;
        self.after_transition(transition).await
    }

    pub async fn untick(&mut self, id: TaskId) -> Result<Applied<Transition>> {
        let transition = self.store.untick(id)?;
        self.after_transition(transition).await
    }

    pub async fn delete(&mut self, id: TaskId) -> Result<Applied<Task>> {
        let removed = self.store.delete(id)?;
        info!("Deleted task {}", id);
        let mirror = self.commit().await?;
        Ok(Applied {
            value: removed,
            mirror,
        })
    }

    pub async fn edit(
        &mut self,
        id: TaskId,
        name: &str,
        code_pointer: &str,
    ) -> Result<Applied<Task>> {
        let task = self.store.edit(id, name, code_pointer)?.clone();
        info!("Edited task {}", id);
        let mirror = self.commit().await?;
        Ok(Applied { value: task, mirror })
    }

    pub async fn clear(&mut self, target: ClearTarget) -> Result<Applied<usize>> {
        let removed = self.store.clear(target);
        info!("Cleared {} {} task(s)", removed, target);
        let mirror = self.commit().await?;
        Ok(Applied {
            value: removed,
            mirror,
        })
    }

    /// Look up one task. Never touches files or the network.
    pub fn view(&self, id: TaskId) -> Result<&Task> {
        self.store.get(id)
    }

    /// Render every task, refresh `todo.txt` and mirror it.
    pub async fn list(&mut self) -> Result<Applied<Report>> {
        let report = self.publish()?;
        let mirror = self.mirror(&report).await?;
        Ok(Applied {
            value: report,
            mirror,
        })
    }

    // =========================================================================
    // Remote operations
    // =========================================================================

    /// Create both remote messages and store their ids.
    pub async fn setup(&mut self, endpoint: &str, ids: &mut impl IdSource) -> Result<()> {
        let report = self.publish()?;
        self.orchestrator.setup(endpoint, &report, ids).await?;
        self.save_remote_config()
    }

    /// Push the current report to both messages.
    ///
    /// Unlike the automatic mirror, an unconfigured workspace is an error.
    pub async fn sync(&mut self) -> Result<SyncSummary> {
        let report = self.publish()?;
        self.orchestrator.sync(&report).await
    }

    /// Start a new done message and rotate the slots.
    ///
    /// Returns the id that dropped out of the rotation.
    pub async fn create_done_message(
        &mut self,
        ids: &mut impl IdSource,
    ) -> Result<Option<MessageId>> {
        let report = render(&self.store);
        let retired = self.orchestrator.create_done_message(&report, ids).await?;
        self.save_remote_config()?;
        Ok(retired)
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    async fn after_transition(&mut self, transition: Transition) -> Result<Applied<Transition>> {
        let mirror = match transition {
            Transition::Changed => self.commit().await?,
            Transition::Unchanged => {
                debug!("Status unchanged; skipping save and sync");
                Mirror::Unchanged
            }
        };
        Ok(Applied {
            value: transition,
            mirror,
        })
    }

    /// Persist the store, publish the report and mirror it.
    async fn commit(&mut self) -> Result<Mirror> {
        self.store_file.save(&self.store)?;
        let report = self.publish()?;
        self.mirror(&report).await
    }

    fn publish(&self) -> Result<Report> {
        let report = render(&self.store);
        write_report(&self.paths.report(), &report)?;
        Ok(report)
    }

    async fn mirror(&self, report: &Report) -> Result<Mirror> {
        if !self.sync_enabled {
            debug!("Sync disabled for this invocation");
            return Ok(Mirror::Disabled);
        }
        if self.orchestrator.state() == SyncState::Unconfigured {
            info!("Remote mirror not configured; run `todo-sync setup` to enable it");
            return Ok(Mirror::Unconfigured);
        }
        let summary = self.orchestrator.sync(report).await?;
        Ok(Mirror::Synced(summary))
    }

    fn save_remote_config(&self) -> Result<()> {
        let path = self.paths.remote_config();
        self.orchestrator.config().save(&path)?;
        for var in &self.env_overrides {
            warn!(
                "{} is set and will override the value saved to {}",
                var,
                path.display()
            );
        }
        Ok(())
    }
}
