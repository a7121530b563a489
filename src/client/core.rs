use crate::backend::BackendConfig;
use crate::client::cancel::{cancel_pair, CancelHandle, ControlledStream};
use crate::client::title;
use crate::error::{classify_status, Error};
use crate::mode::OptimizeMode;
use crate::pipeline;
use crate::settings::SettingsSource;
use crate::transport::{response_lines, HttpTransport};
use crate::wire::{
    AiModel, ChatPayload, ChatResponse, ModelList, CHAT_COMPLETIONS_PATH, MODELS_PATH,
    OPTIMIZE_TEMPERATURE,
};
use crate::{BoxStream, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The full service surface consumed by UI and storage collaborators.
///
/// Mirrors the shape collaborators need: a streaming optimize call, a
/// buffered one, credential validation, model enumeration, and infallible
/// title derivation.
#[async_trait]
pub trait OptimizeService: Send + Sync {
    /// Optimize in one buffered round trip.
    async fn optimize(&self, prompt: &str, mode: OptimizeMode) -> Result<String>;

    /// Optimize as a cancellable stream of text deltas in arrival order.
    async fn optimize_stream(
        &self,
        prompt: &str,
        mode: OptimizeMode,
    ) -> Result<(BoxStream<'static, String>, CancelHandle)>;

    /// Probe a candidate API key against the custom backend.
    async fn validate_api_key(&self, key: &str) -> bool;

    /// Enumerate models offered by the active backend.
    async fn list_models(&self) -> Result<Vec<AiModel>>;

    /// Derive a short title for completed content. Never fails observably:
    /// any remote failure falls back to a local deterministic title.
    async fn generate_title(&self, content: &str) -> String;
}

/// Stateless AI service over an externally-owned settings store.
///
/// Holds no per-call state: every call captures a fresh settings snapshot,
/// builds its own [`BackendConfig`] and connection, and discards both at
/// completion. Two concurrent calls share nothing but the settings source.
#[derive(Clone)]
pub struct AiService {
    settings: Arc<dyn SettingsSource>,
}

impl AiService {
    pub fn new(settings: Arc<dyn SettingsSource>) -> Self {
        Self { settings }
    }

    /// Derive a title on a detached task, decoupled from the primary call.
    ///
    /// The primary result is never delayed or invalidated by this: the task
    /// delivers through its own channel and the returned [`TitleTask`] can be
    /// aborted independently (e.g. when the primary call is cancelled).
    pub fn spawn_title(&self, content: String) -> TitleTask {
        let service = self.clone();
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let _ = tx.send(service.generate_title(&content).await);
        });
        TitleTask { rx, handle }
    }

    async fn remote_title(&self, content: &str) -> Result<String> {
        let snapshot = self.settings.snapshot();
        let config = BackendConfig::select(&snapshot);
        let model = title::title_model(&config).to_string();
        let transport = HttpTransport::new(config)?;
        let request_id = Uuid::new_v4().to_string();

        let payload = ChatPayload::new(
            model,
            title::TITLE_PREAMBLE,
            title::title_user_message(content),
            false,
            title::TITLE_TEMPERATURE,
        )
        .with_max_tokens(title::TITLE_MAX_TOKENS);

        let resp = transport
            .post_json(CHAT_COMPLETIONS_PATH, &payload, &request_id)
            .await?;
        let resp = checked(resp, &request_id).await?;

        let bytes = resp.bytes().await.map_err(Error::from_transport)?;
        let body: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|_| Error::InvalidResponse)?;
        let raw = body.content().ok_or(Error::EmptyResponse)?;
        Ok(title::clean_title(&raw))
    }

    async fn fetch_models(&self, config: BackendConfig) -> Result<Vec<AiModel>> {
        let transport = HttpTransport::new(config)?;
        let request_id = Uuid::new_v4().to_string();

        let resp = transport.get(MODELS_PATH, &request_id).await?;
        let resp = checked(resp, &request_id).await?;

        let bytes = resp.bytes().await.map_err(Error::from_transport)?;
        let list: ModelList = serde_json::from_slice(&bytes).map_err(|_| Error::InvalidResponse)?;
        Ok(list.data.into_iter().map(|m| AiModel::new(m.id)).collect())
    }
}

#[async_trait]
impl OptimizeService for AiService {
    async fn optimize(&self, prompt: &str, mode: OptimizeMode) -> Result<String> {
        let snapshot = self.settings.snapshot();
        let config = BackendConfig::select(&snapshot);
        let preamble = mode.effective_preamble(&snapshot.custom_preambles).to_string();
        let model = config.model.clone();
        let transport = HttpTransport::new(config)?;
        let request_id = Uuid::new_v4().to_string();
        let start = std::time::Instant::now();

        let payload = ChatPayload::new(model, preamble, prompt, false, OPTIMIZE_TEMPERATURE);
        let resp = transport
            .post_json(CHAT_COMPLETIONS_PATH, &payload, &request_id)
            .await?;
        let resp = checked(resp, &request_id).await?;

        let bytes = resp.bytes().await.map_err(Error::from_transport)?;
        let body: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|_| Error::InvalidResponse)?;
        let content = body.content().ok_or(Error::EmptyResponse)?;

        info!(
            request_id = request_id.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            chars = content.chars().count(),
            "optimize completed"
        );
        Ok(content)
    }

    async fn optimize_stream(
        &self,
        prompt: &str,
        mode: OptimizeMode,
    ) -> Result<(BoxStream<'static, String>, CancelHandle)> {
        let snapshot = self.settings.snapshot();
        let config = BackendConfig::select(&snapshot);
        let preamble = mode.effective_preamble(&snapshot.custom_preambles).to_string();
        let model = config.model.clone();
        let transport = HttpTransport::new(config)?;
        let request_id = Uuid::new_v4().to_string();
        let start = std::time::Instant::now();

        let payload = ChatPayload::new(model, preamble, prompt, true, OPTIMIZE_TEMPERATURE);
        let resp = transport
            .post_stream(CHAT_COMPLETIONS_PATH, &payload, &request_id)
            .await?;
        let resp = checked(resp, &request_id).await?;

        info!(
            request_id = request_id.as_str(),
            http_status = resp.status().as_u16(),
            connect_ms = start.elapsed().as_millis() as u64,
            "optimize stream started"
        );

        let deltas = pipeline::content_stream(response_lines(resp));
        let (handle, cancel_rx) = cancel_pair();
        let controlled = ControlledStream::new(deltas, Some(cancel_rx));

        Ok((Box::pin(controlled), handle))
    }

    async fn validate_api_key(&self, key: &str) -> bool {
        let snapshot = self.settings.snapshot();
        let config = BackendConfig::custom(&snapshot, Some(key.to_string()));
        match self.fetch_models(config).await {
            Ok(_) => true,
            Err(e) => {
                info!(error = %e, "API key validation failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<AiModel>> {
        let snapshot = self.settings.snapshot();
        let config = BackendConfig::select(&snapshot);
        match config.kind {
            // The builtin backend exposes a fixed menu; no remote call.
            crate::backend::BackendKind::Builtin => Ok(vec![
                AiModel::named("gpt-4o-mini", "GPT-4o Mini (免费)"),
                AiModel::named("gpt-4o", "GPT-4o (Pro)"),
            ]),
            crate::backend::BackendKind::Custom => self.fetch_models(config).await,
        }
    }

    async fn generate_title(&self, content: &str) -> String {
        match self.remote_title(content).await {
            Ok(t) if !t.is_empty() => t,
            Ok(_) => {
                warn!("remote title was empty; using local fallback");
                title::fallback_title(content)
            }
            Err(e) => {
                warn!(error = %e, "title generation failed; using local fallback");
                title::fallback_title(content)
            }
        }
    }
}

/// A detached title-derivation task.
pub struct TitleTask {
    rx: oneshot::Receiver<String>,
    handle: tokio::task::JoinHandle<()>,
}

impl TitleTask {
    /// Await the derived title. `None` only if the task was aborted.
    pub async fn title(self) -> Option<String> {
        self.rx.await.ok()
    }

    /// Cancel title derivation without affecting the primary result.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Shared status classification for both call paths.
///
/// Consumes the response on failure so the error body can be logged without
/// ever reaching the caller: the taxonomy depends on the status alone.
async fn checked(resp: reqwest::Response, request_id: &str) -> Result<reqwest::Response> {
    let status = resp.status().as_u16();
    match classify_status(status) {
        None => Ok(resp),
        Some(err) => {
            let body = resp.text().await.unwrap_or_default();
            info!(
                request_id = request_id,
                http_status = status,
                error = %err,
                "backend request failed"
            );
            debug!(body = body.as_str(), "error response body");
            Err(err)
        }
    }
}
