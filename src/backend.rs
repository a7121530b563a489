//! Backend selection: turn the latest settings snapshot into an immutable
//! per-call [`BackendConfig`].

use crate::error::Error;
use crate::settings::{AiSettings, Plan};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

/// Public OpenAI-compatible default for the custom backend.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Model the builtin (service-operated) backend always uses.
pub const BUILTIN_MODEL: &str = "gpt-4o";

/// Default model for the custom backend when settings name none.
pub const DEFAULT_CUSTOM_MODEL: &str = "gpt-4";

const CUSTOM_TIMEOUT: Duration = Duration::from_secs(30);
const BUILTIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Which of the two interchangeable backend kinds is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Builtin,
    /// User-supplied key and (optionally) endpoint.
    #[default]
    Custom,
}

/// Immutable per-call backend snapshot.
///
/// Built fresh from settings on every call and owned by that call; a key or
/// endpoint change between two calls affects only the later one.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// `None` or empty means "not usable yet"; surfaced lazily by
    /// [`BackendConfig::ensure_usable`], not at selection time.
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub plan: Plan,
}

impl BackendConfig {
    /// Select the active backend from a settings snapshot.
    ///
    /// Pure and synchronous: no I/O, no failure. A missing credential is
    /// deferred to request time so mode switching in the UI never errors.
    pub fn select(settings: &AiSettings) -> BackendConfig {
        match settings.backend {
            BackendKind::Builtin => Self::builtin(settings),
            BackendKind::Custom => Self::custom(settings, settings.api_key.clone()),
        }
    }

    /// Service-operated backend: no user key, fixed model, server-side
    /// credential provisioned out of band.
    pub fn builtin(settings: &AiSettings) -> BackendConfig {
        let base_url = env::var("PROMPTCRAFT_BUILTIN_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());

        BackendConfig {
            kind: BackendKind::Builtin,
            base_url: normalize_base_url(&base_url),
            api_key: env::var("PROMPTCRAFT_BUILTIN_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            model: BUILTIN_MODEL.to_string(),
            timeout: settings.timeout.unwrap_or(BUILTIN_TIMEOUT),
            plan: settings.plan,
        }
    }

    /// User-configured backend over a given key (the key is a parameter so
    /// credential validation can probe a candidate key without persisting it).
    pub fn custom(settings: &AiSettings, api_key: Option<String>) -> BackendConfig {
        let base_url = settings
            .custom_endpoint
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(OPENAI_BASE_URL);

        BackendConfig {
            kind: BackendKind::Custom,
            base_url: normalize_base_url(base_url),
            api_key,
            model: settings
                .model_id
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CUSTOM_MODEL.to_string()),
            timeout: settings.timeout.unwrap_or(CUSTOM_TIMEOUT),
            plan: settings.plan,
        }
    }

    /// Request-time configuration check, run before any network I/O.
    pub fn ensure_usable(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(match self.kind {
                BackendKind::Builtin => Error::configuration(
                    "内置服务暂未配置，请在设置中切换到「自定义 API」模式并输入您的 API Key",
                ),
                BackendKind::Custom => {
                    Error::configuration("no API key configured for the custom backend")
                }
            });
        }
        if Url::parse(&self.base_url).is_err() {
            return Err(Error::configuration(format!(
                "invalid backend endpoint: {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Join a request path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Strip trailing slashes so path joins never produce `//`.
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
