//! Persisted settings consumed by the core.
//!
//! The core never writes settings; it re-reads a fresh [`AiSettings`] snapshot
//! at the start of every call so that key/endpoint changes made by the
//! embedding app take effect on the very next request.

use crate::backend::BackendKind;
use crate::mode::OptimizeMode;
use keyring::Entry;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Subscription tier forwarded to the builtin backend for quota attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }
}

/// Point-in-time snapshot of everything the core reads from persisted
/// settings. Cheap to clone; captured once per call and never re-read
/// mid-call.
#[derive(Debug, Clone, Default)]
pub struct AiSettings {
    pub backend: BackendKind,
    /// User-supplied key for the custom backend.
    pub api_key: Option<String>,
    /// Custom OpenAI-compatible endpoint; `None` means the public default.
    pub custom_endpoint: Option<String>,
    /// Model id for the custom backend; `None` means the crate default.
    pub model_id: Option<String>,
    /// Per-request timeout; `None` means the backend-kind default.
    pub timeout: Option<Duration>,
    pub plan: Plan,
    /// Per-mode system-prompt overrides maintained by the app.
    pub custom_preambles: HashMap<OptimizeMode, String>,
}

/// Read-only access to the externally-owned settings store.
///
/// Implementations must return the *latest* persisted state on every call;
/// the core deliberately holds no cache of its own.
pub trait SettingsSource: Send + Sync {
    fn snapshot(&self) -> AiSettings;
}

/// A fixed snapshot; convenient for tests and one-shot tools.
impl SettingsSource for AiSettings {
    fn snapshot(&self) -> AiSettings {
        self.clone()
    }
}

impl SettingsSource for Arc<dyn SettingsSource> {
    fn snapshot(&self) -> AiSettings {
        self.as_ref().snapshot()
    }
}

/// Settings store that the embedding app mutates and the core only reads.
///
/// Backed by `arc-swap` so that `update` is atomic with respect to concurrent
/// `snapshot` calls: an in-flight request keeps the snapshot it captured,
/// while the next request sees the new value.
#[derive(Default)]
pub struct SharedSettings {
    inner: arc_swap::ArcSwap<AiSettings>,
}

impl SharedSettings {
    pub fn new(settings: AiSettings) -> Self {
        Self {
            inner: arc_swap::ArcSwap::from_pointee(settings),
        }
    }

    /// Replace the persisted state wholesale.
    pub fn update(&self, settings: AiSettings) {
        self.inner.store(Arc::new(settings));
    }

    /// Apply an in-place edit (read-modify-write of the current snapshot).
    pub fn modify(&self, f: impl FnOnce(&mut AiSettings)) {
        let mut next = self.inner.load().as_ref().clone();
        f(&mut next);
        self.inner.store(Arc::new(next));
    }
}

impl SettingsSource for SharedSettings {
    fn snapshot(&self) -> AiSettings {
        self.inner.load().as_ref().clone()
    }
}

/// Settings source for headless use: credential from the OS keyring (falling
/// back to the environment), everything else from environment variables.
pub struct KeyringSettings {
    service: String,
}

impl KeyringSettings {
    pub const DEFAULT_SERVICE: &'static str = "promptcraft";

    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// 1. Try the OS keyring, 2. fall back to `PROMPTCRAFT_API_KEY`.
    fn stored_key(&self) -> Option<String> {
        if let Ok(entry) = Entry::new(&self.service, "api_key") {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }
        env::var("PROMPTCRAFT_API_KEY").ok()
    }
}

impl Default for KeyringSettings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SERVICE)
    }
}

impl SettingsSource for KeyringSettings {
    fn snapshot(&self) -> AiSettings {
        let backend = match env::var("PROMPTCRAFT_BACKEND").as_deref() {
            Ok("builtin") => BackendKind::Builtin,
            _ => BackendKind::Custom,
        };
        let plan = match env::var("PROMPTCRAFT_PLAN").as_deref() {
            Ok("pro") => Plan::Pro,
            _ => Plan::Free,
        };
        let timeout = env::var("PROMPTCRAFT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        AiSettings {
            backend,
            api_key: self.stored_key(),
            custom_endpoint: env::var("PROMPTCRAFT_BASE_URL").ok(),
            model_id: env::var("PROMPTCRAFT_MODEL").ok(),
            timeout,
            plan,
            custom_preambles: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_settings_updates_are_visible_to_later_snapshots() {
        let shared = SharedSettings::new(AiSettings {
            api_key: Some("sk-old".into()),
            ..AiSettings::default()
        });

        let before = shared.snapshot();
        shared.modify(|s| s.api_key = Some("sk-new".into()));
        let after = shared.snapshot();

        // The earlier snapshot is unaffected by the update.
        assert_eq!(before.api_key.as_deref(), Some("sk-old"));
        assert_eq!(after.api_key.as_deref(), Some("sk-new"));
    }
}
