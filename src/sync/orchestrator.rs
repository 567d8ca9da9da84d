//! Setup, sync and overflow for the two remote slots.
//!
//! # States
//!
//! - `Unconfigured`: the webhook URL or either slot id is missing. Only
//!   setup is possible; sync fails with `NotConfigured` without touching
//!   the network.
//! - `Configured`: both slots are known and every sync edits them in place.
//!
//! # Two-phase creates
//!
//! Setup and overflow create new messages. The webhook does not report the
//! id of a created message, so each create yields a [`PendingConfirmation`]
//! that the caller settles with [`SyncOrchestrator::confirm`] once it knows
//! the id. Setup commits only when both of its confirmations are in, so a
//! half-finished setup never leaves the config pointing at one new and one
//! stale message.

use tracing::{debug, info, warn};

use super::{IdSource, MessageId, Role, SlotRegistry, WebhookTransport};
use crate::config::{validate_endpoint, RemoteConfig};
use crate::error::{Result, TodoError};
use crate::report::{code_block, exceeds_message_limit, Report};

/// Whether the mirror can be synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unconfigured,
    Configured,
}

/// Why a message was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// One of the two messages created by setup.
    Setup,
    /// The fresh done message created by the overflow handler.
    Overflow,
}

/// A created message whose id has not been supplied yet.
///
/// Only the orchestrator hands these out, one per successful create, and
/// confirming consumes it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a created message must be confirmed with its id"]
pub struct PendingConfirmation {
    role: Role,
    purpose: Purpose,
}

impl PendingConfirmation {
    pub(crate) fn new(role: Role, purpose: Purpose) -> Self {
        Self { role, purpose }
    }

    /// Role whose content the new message holds.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }
}

/// Result of [`SyncOrchestrator::confirm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmed {
    /// Setup is waiting for the other role's id.
    Staged,
    /// The config changed; persist it.
    Committed,
    /// Overflow rotation applied; carries the retired pending slot.
    Rotated { retired: Option<MessageId> },
}

/// What a successful sync edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub edited: Vec<(Role, MessageId)>,
}

#[derive(Debug)]
struct StagedSetup {
    endpoint: String,
    slots: SlotRegistry,
}

/// Drives the remote mirror for one invocation.
pub struct SyncOrchestrator<T> {
    transport: T,
    config: RemoteConfig,
    staged: Option<StagedSetup>,
    overflow_created: bool,
}

impl<T: WebhookTransport> SyncOrchestrator<T> {
    pub fn new(transport: T, config: RemoteConfig) -> Self {
        Self {
            transport,
            config,
            staged: None,
            overflow_created: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    #[must_use]
    pub fn into_config(self) -> RemoteConfig {
        self.config
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        if self.config.is_configured() {
            SyncState::Configured
        } else {
            SyncState::Unconfigured
        }
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Validate `endpoint`, create one message per role and stage a fresh
    /// slot registry. The pending message is created first.
    ///
    /// Works from either state; a configured mirror has its slots replaced
    /// once both confirmations arrive.
    pub async fn begin_setup(
        &mut self,
        endpoint: &str,
        report: &Report,
    ) -> Result<[PendingConfirmation; 2]> {
        validate_endpoint(endpoint)?;
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();

        for role in Role::ALL {
            self.create(role, &endpoint, report.section(role)).await?;
        }

        self.staged = Some(StagedSetup {
            endpoint,
            slots: SlotRegistry::new(),
        });
        Ok([
            PendingConfirmation::new(Role::Pending, Purpose::Setup),
            PendingConfirmation::new(Role::Done, Purpose::Setup),
        ])
    }

    /// Settle a pending confirmation with the id of the created message.
    ///
    /// An overflow confirmation needs a configured mirror and a create from
    /// [`begin_overflow`](Self::begin_overflow) that has not been settled yet.
    pub fn confirm(&mut self, pending: PendingConfirmation, id: MessageId) -> Result<Confirmed> {
        match pending.purpose {
            Purpose::Setup => self.confirm_setup(pending.role, id),
            Purpose::Overflow => {
                self.configured()?;
                if pending.role != Role::Done {
                    return Err(TodoError::invalid_input(
                        "overflow only ever creates a DONE message",
                    ));
                }
                if !self.overflow_created {
                    return Err(TodoError::invalid_input(
                        "no overflow message is awaiting its id",
                    ));
                }
                let retired = self.config.slots.rotate_for_overflow(id)?;
                self.overflow_created = false;
                info!(
                    "Rotated slots: PENDING={}, DONE={}",
                    display_slot(self.config.slots.get(Role::Pending)),
                    display_slot(self.config.slots.get(Role::Done))
                );
                Ok(Confirmed::Rotated { retired })
            }
        }
    }

    fn confirm_setup(&mut self, role: Role, id: MessageId) -> Result<Confirmed> {
        let Some(staged) = self.staged.as_mut() else {
            return Err(TodoError::invalid_input("no setup is in progress"));
        };
        staged.slots.set(role, id)?;

        if !staged.slots.is_configured() {
            return Ok(Confirmed::Staged);
        }

        if let Some(staged) = self.staged.take() {
            self.config.webhook_url = Some(staged.endpoint);
            self.config.slots = staged.slots;
            info!("Remote mirror configured");
        }
        Ok(Confirmed::Committed)
    }

    /// Run setup end to end, taking both ids from `ids`.
    pub async fn setup(
        &mut self,
        endpoint: &str,
        report: &Report,
        ids: &mut impl IdSource,
    ) -> Result<()> {
        let confirmations = self.begin_setup(endpoint, report).await?;
        for pending in confirmations {
            let id = ids.supply(&pending)?;
            self.confirm(pending, id)?;
        }
        Ok(())
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Edit both slots with the freshly rendered sections, pending first.
    ///
    /// Stops at the first failed edit. Edits that already went through stay
    /// in place.
    pub async fn sync(&self, report: &Report) -> Result<SyncSummary> {
        let (endpoint, slots) = self.configured()?;

        let mut edited = Vec::with_capacity(2);
        for role in Role::ALL {
            let Some(message_id) = slots.get(role) else {
                return Err(TodoError::NotConfigured);
            };
            let section = report.section(role);
            if exceeds_message_limit(section) {
                warn!(
                    "{} section exceeds the chat message limit; \
                     run `todo-sync create-done-message` or clear finished tasks",
                    role
                );
            }

            let delivery = self
                .transport
                .edit(role, endpoint, message_id, &code_block(section))
                .await?;
            if !delivery.is_success() {
                return Err(TodoError::sync_failed(
                    role,
                    Some(delivery.status),
                    format!("edit of message {message_id} was rejected"),
                ));
            }
            debug!("Edited {} message {}", role, message_id);
            edited.push((role, message_id.clone()));
        }

        Ok(SyncSummary { edited })
    }

    // =========================================================================
    // Overflow
    // =========================================================================

    /// Create a new message holding the done section.
    ///
    /// Confirming the returned handle rotates the slots. Nothing is re-synced;
    /// run [`sync`](Self::sync) afterwards to refresh both messages.
    pub async fn begin_overflow(&mut self, report: &Report) -> Result<PendingConfirmation> {
        let (endpoint, _) = self.configured()?;
        let endpoint = endpoint.to_string();
        self.create(Role::Done, &endpoint, report.section(Role::Done))
            .await?;
        self.overflow_created = true;
        Ok(PendingConfirmation::new(Role::Done, Purpose::Overflow))
    }

    /// Run the overflow handler end to end, taking the new id from `ids`.
    pub async fn create_done_message(
        &mut self,
        report: &Report,
        ids: &mut impl IdSource,
    ) -> Result<Option<MessageId>> {
        let pending = self.begin_overflow(report).await?;
        let id = ids.supply(&pending)?;
        match self.confirm(pending, id)? {
            Confirmed::Rotated { retired } => Ok(retired),
            _ => Ok(None),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Endpoint and slots of a configured mirror. A stored URL that does not
    /// look like a webhook is rejected before any request is made.
    fn configured(&self) -> Result<(&str, &SlotRegistry)> {
        match (&self.config.webhook_url, self.state()) {
            (Some(url), SyncState::Configured) => {
                validate_endpoint(url)?;
                Ok((url.trim(), &self.config.slots))
            }
            _ => Err(TodoError::NotConfigured),
        }
    }

    async fn create(&self, role: Role, endpoint: &str, section: &str) -> Result<()> {
        let delivery = self
            .transport
            .create(role, endpoint, &code_block(section))
            .await?;
        if !delivery.is_success() {
            return Err(TodoError::sync_failed(
                role,
                Some(delivery.status),
                "webhook rejected the new message",
            ));
        }
        debug!("Created new {} message", role);
        Ok(())
    }
}

fn display_slot(id: Option<&MessageId>) -> String {
    id.map_or_else(|| "-".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::render;
    use crate::store::TaskStore;
    use crate::testing::{MockTransport, RemoteCall, ScriptedIds};

    const URL: &str = "https://discord.com/api/webhooks/42/token";

    fn id(raw: &str) -> MessageId {
        MessageId::parse(raw).unwrap()
    }

    fn configured_config(pending: &str, done: &str) -> RemoteConfig {
        let mut config = RemoteConfig {
            webhook_url: Some(URL.to_string()),
            ..Default::default()
        };
        config.slots.set(Role::Pending, id(pending)).unwrap();
        config.slots.set(Role::Done, id(done)).unwrap();
        config
    }

    fn sample_report() -> Report {
        let mut store = TaskStore::new();
        store.add("open", "a.rs:1").unwrap();
        let done = store.add("finished", "b.rs:2").unwrap();
        store.tick(done).unwrap();
        render(&store)
    }

    // =========================================================================
    // Sync
    // =========================================================================

    #[tokio::test]
    async fn test_sync_unconfigured_makes_no_calls() {
        let orchestrator = SyncOrchestrator::new(MockTransport::new(), RemoteConfig::default());
        assert_eq!(orchestrator.state(), SyncState::Unconfigured);

        let result = orchestrator.sync(&sample_report()).await;
        assert!(matches!(result, Err(TodoError::NotConfigured)));
        assert!(orchestrator.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_sync_with_url_but_missing_slot_is_unconfigured() {
        let mut config = RemoteConfig {
            webhook_url: Some(URL.to_string()),
            ..Default::default()
        };
        config.slots.set(Role::Pending, id("1")).unwrap();
        let orchestrator = SyncOrchestrator::new(MockTransport::new(), config);

        assert!(matches!(
            orchestrator.sync(&sample_report()).await,
            Err(TodoError::NotConfigured)
        ));
        assert!(orchestrator.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_sync_rejects_invalid_stored_url_without_network() {
        for bad in ["--config=/etc/passwd", "https://example.com/api/webhooks/1/x"] {
            let mut config = configured_config("1", "2");
            config.webhook_url = Some(bad.to_string());
            let orchestrator = SyncOrchestrator::new(MockTransport::new(), config);

            let err = orchestrator.sync(&sample_report()).await.unwrap_err();
            assert!(matches!(err, TodoError::InvalidInput { .. }), "{bad}");
            assert!(orchestrator.transport().calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_sync_edits_both_slots_in_order() {
        let report = sample_report();
        let orchestrator =
            SyncOrchestrator::new(MockTransport::new(), configured_config("100", "200"));

        let summary = orchestrator.sync(&report).await.unwrap();
        assert_eq!(
            summary.edited,
            vec![(Role::Pending, id("100")), (Role::Done, id("200"))]
        );

        let calls = orchestrator.transport().calls();
        assert_eq!(
            calls,
            vec![
                RemoteCall::Edit {
                    role: Role::Pending,
                    endpoint: URL.to_string(),
                    message_id: id("100"),
                    content: code_block(&report.pending),
                },
                RemoteCall::Edit {
                    role: Role::Done,
                    endpoint: URL.to_string(),
                    message_id: id("200"),
                    content: code_block(&report.done),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_sync_stops_at_first_failed_edit() {
        let transport = MockTransport::new().with_edit_status(Role::Pending, 404);
        let orchestrator = SyncOrchestrator::new(transport, configured_config("1", "2"));

        let err = orchestrator.sync(&sample_report()).await.unwrap_err();
        assert!(matches!(
            err,
            TodoError::SyncFailed {
                role: Role::Pending,
                status: Some(404),
                ..
            }
        ));
        assert_eq!(orchestrator.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_keeps_earlier_edit_when_done_fails() {
        let transport = MockTransport::new().with_edit_status(Role::Done, 500);
        let orchestrator = SyncOrchestrator::new(transport, configured_config("1", "2"));

        let err = orchestrator.sync(&sample_report()).await.unwrap_err();
        assert!(matches!(err, TodoError::SyncFailed { role: Role::Done, .. }));
        assert_eq!(orchestrator.transport().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_surfaces_transport_errors() {
        let transport = MockTransport::new().with_unreachable();
        let orchestrator = SyncOrchestrator::new(transport, configured_config("1", "2"));

        let err = orchestrator.sync(&sample_report()).await.unwrap_err();
        assert!(matches!(
            err,
            TodoError::SyncFailed {
                role: Role::Pending,
                status: None,
                ..
            }
        ));
    }

    // =========================================================================
    // Setup
    // =========================================================================

    #[tokio::test]
    async fn test_setup_creates_both_and_commits() {
        let report = sample_report();
        let mut orchestrator = SyncOrchestrator::new(MockTransport::new(), RemoteConfig::default());
        let mut ids = ScriptedIds::new(["11", "22"]);

        orchestrator.setup(URL, &report, &mut ids).await.unwrap();

        assert_eq!(orchestrator.state(), SyncState::Configured);
        let config = orchestrator.config();
        assert_eq!(config.webhook_url.as_deref(), Some(URL));
        assert_eq!(config.slots.get(Role::Pending), Some(&id("11")));
        assert_eq!(config.slots.get(Role::Done), Some(&id("22")));

        assert_eq!(
            orchestrator.transport().calls(),
            vec![
                RemoteCall::Create {
                    role: Role::Pending,
                    endpoint: URL.to_string(),
                    content: code_block(&report.pending),
                },
                RemoteCall::Create {
                    role: Role::Done,
                    endpoint: URL.to_string(),
                    content: code_block(&report.done),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_setup_rejects_bad_endpoint_without_network() {
        let mut orchestrator = SyncOrchestrator::new(MockTransport::new(), RemoteConfig::default());
        let mut ids = ScriptedIds::new(["1", "2"]);

        let err = orchestrator
            .setup("https://example.com/hook", &sample_report(), &mut ids)
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::InvalidInput { .. }));
        assert!(orchestrator.transport().calls().is_empty());
        assert_eq!(orchestrator.state(), SyncState::Unconfigured);
    }

    #[tokio::test]
    async fn test_setup_over_existing_slots_overwrites_them() {
        let mut orchestrator =
            SyncOrchestrator::new(MockTransport::new(), configured_config("1", "2"));
        // new ids may even reuse the old ones in the other role
        let mut ids = ScriptedIds::new(["2", "3"]);

        orchestrator
            .setup(URL, &sample_report(), &mut ids)
            .await
            .unwrap();

        let slots = &orchestrator.config().slots;
        assert_eq!(slots.get(Role::Pending), Some(&id("2")));
        assert_eq!(slots.get(Role::Done), Some(&id("3")));
    }

    #[tokio::test]
    async fn test_two_phase_setup_commits_only_when_both_confirmed() {
        let mut orchestrator = SyncOrchestrator::new(MockTransport::new(), RemoteConfig::default());
        let [pending, done] = orchestrator
            .begin_setup(URL, &sample_report())
            .await
            .unwrap();

        assert_eq!(pending.role(), Role::Pending);
        assert_eq!(done.purpose(), Purpose::Setup);

        assert_eq!(orchestrator.confirm(done, id("8")).unwrap(), Confirmed::Staged);
        assert_eq!(orchestrator.state(), SyncState::Unconfigured);
        assert!(orchestrator.config().webhook_url.is_none());

        assert_eq!(
            orchestrator.confirm(pending, id("7")).unwrap(),
            Confirmed::Committed
        );
        assert_eq!(orchestrator.state(), SyncState::Configured);
    }

    #[tokio::test]
    async fn test_setup_confirm_rejects_duplicate_id() {
        let mut orchestrator = SyncOrchestrator::new(MockTransport::new(), RemoteConfig::default());
        let [pending, done] = orchestrator
            .begin_setup(URL, &sample_report())
            .await
            .unwrap();

        orchestrator.confirm(pending, id("5")).unwrap();
        let err = orchestrator.confirm(done, id("5")).unwrap_err();
        assert!(matches!(err, TodoError::InvalidInput { .. }));
        assert_eq!(orchestrator.state(), SyncState::Unconfigured);
    }

    #[tokio::test]
    async fn test_confirm_setup_without_begin_fails() {
        let mut orchestrator = SyncOrchestrator::new(MockTransport::new(), RemoteConfig::default());
        let stray = PendingConfirmation::new(Role::Pending, Purpose::Setup);
        assert!(orchestrator.confirm(stray, id("1")).is_err());
    }

    #[tokio::test]
    async fn test_setup_create_failure_leaves_config_untouched() {
        let transport = MockTransport::new().with_create_status(Role::Done, 401);
        let mut orchestrator = SyncOrchestrator::new(transport, configured_config("1", "2"));
        let mut ids = ScriptedIds::new(["3", "4"]);

        let err = orchestrator
            .setup(URL, &sample_report(), &mut ids)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TodoError::SyncFailed {
                role: Role::Done,
                status: Some(401),
                ..
            }
        ));
        assert_eq!(orchestrator.config(), &configured_config("1", "2"));
    }

    // =========================================================================
    // Overflow
    // =========================================================================

    #[tokio::test]
    async fn test_overflow_rotates_roles() {
        let report = sample_report();
        let mut orchestrator =
            SyncOrchestrator::new(MockTransport::new(), configured_config("1", "2"));
        let mut ids = ScriptedIds::new(["3"]);

        let retired = orchestrator
            .create_done_message(&report, &mut ids)
            .await
            .unwrap();

        assert_eq!(retired, Some(id("1")));
        let slots = &orchestrator.config().slots;
        assert_eq!(slots.get(Role::Pending), Some(&id("2")));
        assert_eq!(slots.get(Role::Done), Some(&id("3")));

        // only the create; no automatic re-sync
        assert_eq!(
            orchestrator.transport().calls(),
            vec![RemoteCall::Create {
                role: Role::Done,
                endpoint: URL.to_string(),
                content: code_block(&report.done),
            }]
        );
    }

    #[tokio::test]
    async fn test_overflow_requires_configuration() {
        let mut orchestrator = SyncOrchestrator::new(MockTransport::new(), RemoteConfig::default());
        let err = orchestrator.begin_overflow(&sample_report()).await.unwrap_err();
        assert!(matches!(err, TodoError::NotConfigured));
        assert!(orchestrator.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_overflow_rejects_invalid_stored_url_without_network() {
        let mut config = configured_config("1", "2");
        config.webhook_url = Some("-K/etc/passwd".to_string());
        let mut orchestrator = SyncOrchestrator::new(MockTransport::new(), config.clone());

        let err = orchestrator.begin_overflow(&sample_report()).await.unwrap_err();
        assert!(matches!(err, TodoError::InvalidInput { .. }));
        assert!(orchestrator.transport().calls().is_empty());
        assert_eq!(orchestrator.config(), &config);
    }

    #[tokio::test]
    async fn test_overflow_confirm_without_create_keeps_slots() {
        let mut orchestrator =
            SyncOrchestrator::new(MockTransport::new(), configured_config("1", "2"));
        let stray = PendingConfirmation::new(Role::Done, Purpose::Overflow);

        let err = orchestrator.confirm(stray, id("3")).unwrap_err();
        assert!(matches!(err, TodoError::InvalidInput { .. }));
        assert_eq!(orchestrator.config(), &configured_config("1", "2"));
    }

    #[tokio::test]
    async fn test_overflow_create_settles_only_once() {
        let mut orchestrator =
            SyncOrchestrator::new(MockTransport::new(), configured_config("1", "2"));
        let pending = orchestrator.begin_overflow(&sample_report()).await.unwrap();
        orchestrator.confirm(pending, id("3")).unwrap();

        let stray = PendingConfirmation::new(Role::Done, Purpose::Overflow);
        assert!(orchestrator.confirm(stray, id("4")).is_err());
        let slots = &orchestrator.config().slots;
        assert_eq!(slots.get(Role::Pending), Some(&id("2")));
        assert_eq!(slots.get(Role::Done), Some(&id("3")));
    }

    #[tokio::test]
    async fn test_overflow_confirm_on_unconfigured_mirror() {
        let mut orchestrator = SyncOrchestrator::new(MockTransport::new(), RemoteConfig::default());
        let stray = PendingConfirmation::new(Role::Done, Purpose::Overflow);

        let err = orchestrator.confirm(stray, id("3")).unwrap_err();
        assert!(matches!(err, TodoError::NotConfigured));
        assert_eq!(orchestrator.config(), &RemoteConfig::default());
    }

    #[tokio::test]
    async fn test_overflow_then_sync_addresses_new_assignment() {
        let report = sample_report();
        let mut orchestrator =
            SyncOrchestrator::new(MockTransport::new(), configured_config("1", "2"));
        let pending = orchestrator.begin_overflow(&report).await.unwrap();
        orchestrator.confirm(pending, id("3")).unwrap();

        let summary = orchestrator.sync(&report).await.unwrap();
        assert_eq!(
            summary.edited,
            vec![(Role::Pending, id("2")), (Role::Done, id("3"))]
        );
    }

    #[tokio::test]
    async fn test_overflow_create_failure_keeps_slots() {
        let transport = MockTransport::new().with_create_status(Role::Done, 429);
        let mut orchestrator = SyncOrchestrator::new(transport, configured_config("1", "2"));
        let mut ids = ScriptedIds::new(["3"]);

        assert!(orchestrator
            .create_done_message(&sample_report(), &mut ids)
            .await
            .is_err());
        assert_eq!(orchestrator.config(), &configured_config("1", "2"));
    }
}
