//! # promptcraft-ai
//!
//! 提示词优化核心：面向 OpenAI 兼容后端的流式补全客户端。
//!
//! Streaming completion core for prompt optimization. The crate submits
//! free-form text to one of two interchangeable OpenAI-compatible backends,
//! consumes the incrementally-delivered response, and reassembles it into a
//! coherent result plus a best-effort derived title.
//!
//! ## Overview
//!
//! - **Backend selection**: a fresh [`BackendConfig`] is built from the
//!   latest persisted settings on every call, so key/endpoint changes take
//!   effect on the very next request without restarting.
//! - **Streaming-first**: responses arrive as `data: <json>` frames
//!   terminated by a `data: [DONE]` sentinel; the parser is permissive on
//!   noise and strict on the sentinel and on well-formed frames.
//! - **Closed error taxonomy**: every observable failure is one
//!   [`Error`] variant, classified identically on the streaming and
//!   buffered paths.
//! - **Detached title derivation**: a secondary request that can never
//!   invalidate or delay the primary result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use promptcraft_ai::{AiService, AiSettings, OptimizeMode, OptimizeService};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> promptcraft_ai::Result<()> {
//!     let settings = AiSettings {
//!         api_key: Some("sk-...".into()),
//!         ..AiSettings::default()
//!     };
//!     let service = AiService::new(Arc::new(settings));
//!
//!     let (mut deltas, _cancel) = service
//!         .optimize_stream("帮我写一个周报", OptimizeMode::Concise)
//!         .await?;
//!
//!     let mut result = String::new();
//!     while let Some(delta) = deltas.next().await {
//!         result.push_str(&delta?);
//!     }
//!
//!     let title = service.generate_title(&result).await;
//!     println!("{title}: {result}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`settings`] | Read-only snapshots of the externally-owned settings store |
//! | [`backend`] | Backend kinds and per-call configuration selection |
//! | [`mode`] | Optimize modes and instruction preambles |
//! | [`wire`] | OpenAI-compatible request/response wire types |
//! | [`transport`] | HTTP transport and line reassembly |
//! | [`pipeline`] | Stream frame parsing (deltas, sentinel, noise) |
//! | [`client`] | Service facade, cancellation, title derivation |
//! | [`error`] | Closed error taxonomy and status classification |

pub mod backend;
pub mod client;
pub mod error;
pub mod mode;
pub mod pipeline;
pub mod settings;
pub mod transport;
pub mod wire;

// Re-export main types for convenience
pub use backend::{BackendConfig, BackendKind};
pub use client::{fallback_title, AiService, CancelHandle, OptimizeService, TitleTask};
pub use error::{classify_status, Error};
pub use mode::OptimizeMode;
pub use pipeline::StreamFrame;
pub use settings::{AiSettings, KeyringSettings, Plan, SettingsSource, SharedSettings};
pub use wire::AiModel;

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of fallible items
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;
