//! Configuration and file locations for todo-sync.
//!
//! Two kinds of state live next to each other in the working directory:
//!
//! - the task store (`todo.json`) and its rendered report (`todo.txt`)
//! - the remote mirror settings (`.todo/remote.json`), a flat key-value
//!   object holding the webhook URL and the two slot message ids
//!
//! The remote settings use the same keys as the environment variables that
//! can override them: `DISCORD_WEBHOOK_URL`, `DISCORD_MESSAGE_ID` and
//! `DISCORD_DONE_MESSAGE_ID`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{IntoTodoError, Result, TodoError};
use crate::store::persistence::{read_shared, write_atomic};
use crate::sync::{MessageId, Role, SlotRegistry};

/// Environment variable holding the webhook URL.
pub const WEBHOOK_URL_VAR: &str = "DISCORD_WEBHOOK_URL";

/// Environment variable holding the pending slot message id.
pub const PENDING_MESSAGE_VAR: &str = "DISCORD_MESSAGE_ID";

/// Environment variable holding the done slot message id.
pub const DONE_MESSAGE_VAR: &str = "DISCORD_DONE_MESSAGE_ID";

const WEBHOOK_PATTERN: &str =
    r"^https://(?:(?:ptb|canary)\.)?discord(?:app)?\.com/api/webhooks/\d+/[A-Za-z0-9_-]+/?$";

// ============================================================================
// Paths
// ============================================================================

/// Locations of every file an invocation touches.
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The JSON task store.
    #[must_use]
    pub fn store(&self) -> PathBuf {
        self.root.join("todo.json")
    }

    /// The rendered text report.
    #[must_use]
    pub fn report(&self) -> PathBuf {
        self.root.join("todo.txt")
    }

    /// The remote mirror settings.
    #[must_use]
    pub fn remote_config(&self) -> PathBuf {
        self.root.join(".todo").join("remote.json")
    }
}

// ============================================================================
// Remote Config
// ============================================================================

/// Settings of the remote mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(
        rename = "DISCORD_WEBHOOK_URL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub webhook_url: Option<String>,

    #[serde(flatten)]
    pub slots: SlotRegistry,
}

impl RemoteConfig {
    /// Load settings from `path`. A missing file yields the default
    /// (unconfigured) settings.
    pub fn load(path: &Path) -> Result<Self> {
        match read_shared(path)? {
            Some(contents) => {
                let config: RemoteConfig =
                    serde_json::from_str(&contents).into_storage(path)?;
                debug!("Loaded remote config from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Persist settings atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, &json)
    }

    /// Override values from the process environment.
    ///
    /// Returns the names of the variables that took effect.
    pub fn apply_env(&mut self) -> Result<Vec<&'static str>> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override values from `lookup`; empty values are ignored.
    ///
    /// Both slot ids are resolved before the pair is checked, so overrides
    /// may swap the ids stored in the file. Nothing changes on error.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<&'static str>> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut applied = Vec::new();

        let webhook_url = match get(WEBHOOK_URL_VAR) {
            Some(url) => {
                applied.push(WEBHOOK_URL_VAR);
                Some(url.trim().to_string())
            }
            None => self.webhook_url.clone(),
        };

        let mut slots = SlotRegistry::new();
        let keys = [
            (Role::Pending, PENDING_MESSAGE_VAR),
            (Role::Done, DONE_MESSAGE_VAR),
        ];
        for (role, key) in keys {
            let id = match get(key) {
                Some(raw) => {
                    applied.push(key);
                    Some(MessageId::parse(&raw)?)
                }
                None => self.slots.get(role).cloned(),
            };
            if let Some(id) = id {
                slots.set(role, id)?;
            }
        }

        self.webhook_url = webhook_url;
        self.slots = slots;
        Ok(applied)
    }

    /// Webhook URL and both slots are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some() && self.slots.is_configured()
    }
}

// ============================================================================
// Endpoint validation
// ============================================================================

fn webhook_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WEBHOOK_PATTERN).expect("webhook pattern is a valid regex"))
}

/// Check that `endpoint` looks like a Discord webhook URL.
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    if webhook_regex().is_match(endpoint.trim()) {
        Ok(())
    } else {
        Err(TodoError::invalid_input(format!(
            "'{endpoint}' is not a Discord webhook URL \
             (expected https://discord.com/api/webhooks/<id>/<token>)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const URL: &str = "https://discord.com/api/webhooks/123456/abc-DEF_789";

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_paths() {
        let paths = Paths::new("/home/user/proj");
        assert_eq!(paths.store(), PathBuf::from("/home/user/proj/todo.json"));
        assert_eq!(paths.report(), PathBuf::from("/home/user/proj/todo.txt"));
        assert_eq!(
            paths.remote_config(),
            PathBuf::from("/home/user/proj/.todo/remote.json")
        );
    }

    #[test]
    fn test_load_missing_is_unconfigured() {
        let temp = TempDir::new().unwrap();
        let config = RemoteConfig::load(&temp.path().join("remote.json")).unwrap();
        assert_eq!(config, RemoteConfig::default());
        assert!(!config.is_configured());
    }

    #[test]
    fn test_save_and_load_roundtrip_uses_flat_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".todo").join("remote.json");

        let mut config = RemoteConfig {
            webhook_url: Some(URL.to_string()),
            ..Default::default()
        };
        config.slots.set(Role::Pending, MessageId::parse("1").unwrap()).unwrap();
        config.slots.set(Role::Done, MessageId::parse("2").unwrap()).unwrap();
        config.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["DISCORD_WEBHOOK_URL"], URL);
        assert_eq!(raw["DISCORD_MESSAGE_ID"], "1");
        assert_eq!(raw["DISCORD_DONE_MESSAGE_ID"], "2");

        let loaded = RemoteConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.is_configured());
    }

    #[test]
    fn test_load_corrupt_is_storage_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("remote.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            RemoteConfig::load(&path),
            Err(TodoError::Storage { .. })
        ));

        std::fs::write(&path, r#"{"DISCORD_MESSAGE_ID": "abc"}"#).unwrap();
        assert!(matches!(
            RemoteConfig::load(&path),
            Err(TodoError::Storage { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RemoteConfig::default();
        config
            .apply_overrides(env(&[
                (WEBHOOK_URL_VAR, URL),
                (PENDING_MESSAGE_VAR, "10"),
                (DONE_MESSAGE_VAR, "20"),
            ]))
            .unwrap();

        assert!(config.is_configured());
        assert_eq!(config.webhook_url.as_deref(), Some(URL));
        assert_eq!(config.slots.get(Role::Done).unwrap().as_str(), "20");
    }

    #[test]
    fn test_env_overrides_ignore_empty_values() {
        let mut config = RemoteConfig {
            webhook_url: Some(URL.to_string()),
            ..Default::default()
        };
        config
            .apply_overrides(env(&[(WEBHOOK_URL_VAR, "  ")]))
            .unwrap();
        assert_eq!(config.webhook_url.as_deref(), Some(URL));
    }

    #[test]
    fn test_env_override_rejects_bad_message_id() {
        let mut config = RemoteConfig::default();
        let result = config.apply_overrides(env(&[(PENDING_MESSAGE_VAR, "latest")]));
        assert!(matches!(result, Err(TodoError::InvalidInput { .. })));
        assert_eq!(config, RemoteConfig::default());
    }

    #[test]
    fn test_env_overrides_may_swap_file_ids() {
        let mut config = RemoteConfig {
            webhook_url: Some(URL.to_string()),
            ..Default::default()
        };
        config.slots.set(Role::Pending, MessageId::parse("1").unwrap()).unwrap();
        config.slots.set(Role::Done, MessageId::parse("2").unwrap()).unwrap();

        let applied = config
            .apply_overrides(env(&[(PENDING_MESSAGE_VAR, "2"), (DONE_MESSAGE_VAR, "1")]))
            .unwrap();

        assert_eq!(applied, vec![PENDING_MESSAGE_VAR, DONE_MESSAGE_VAR]);
        assert_eq!(config.slots.get(Role::Pending).unwrap().as_str(), "2");
        assert_eq!(config.slots.get(Role::Done).unwrap().as_str(), "1");
    }

    #[test]
    fn test_env_override_rejects_id_shared_with_file_slot() {
        let mut config = RemoteConfig::default();
        config.slots.set(Role::Done, MessageId::parse("2").unwrap()).unwrap();
        let before = config.clone();

        let result = config.apply_overrides(env(&[(PENDING_MESSAGE_VAR, "2")]));
        assert!(matches!(result, Err(TodoError::InvalidInput { .. })));
        assert_eq!(config, before);
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint(URL).is_ok());
        assert!(validate_endpoint("https://discordapp.com/api/webhooks/1/x").is_ok());
        assert!(validate_endpoint("https://canary.discord.com/api/webhooks/1/x").is_ok());

        for bad in [
            "",
            "http://discord.com/api/webhooks/1/x",
            "https://example.com/api/webhooks/1/x",
            "https://discord.com/api/webhooks/abc/x",
            "https://discord.com/api/webhooks/1",
            "discord.com/api/webhooks/1/x",
            "--config=/etc/passwd",
        ] {
            assert!(
                matches!(validate_endpoint(bad), Err(TodoError::InvalidInput { .. })),
                "{bad} should be rejected"
            );
        }
    }
}
