//! Client surface: the `AiService` facade, cancellation plumbing, and title
//! derivation.
//!
//! Developer-friendly goal: keep the public surface small and predictable.
//! Implementation details are split into submodules under `src/client/`.

pub mod cancel;
pub mod core;
pub mod title;

pub use cancel::{CancelHandle, ControlledStream};
pub use core::{AiService, OptimizeService, TitleTask};
pub use title::fallback_title;
