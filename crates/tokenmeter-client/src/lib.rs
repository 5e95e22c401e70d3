//! Client-side input controller and HTTP client for tokenmeter
//!
//! This crate owns the display-layer state machine: mutually exclusive
//! typed-text and uploaded-file input modes, debounced text analysis,
//! file classification with image previews, explicit file submission,
//! model selection, and the stale-response guard that keeps a superseded
//! request's late result from overwriting newer metrics.

pub mod api;
pub mod controller;
pub mod error;

pub use api::{CountApi, CountSummary, FileSubmission, HttpCountApi};
pub use controller::{AVAILABLE_MODELS, DisplayMetrics, InputController, SelectedFile};
pub use error::{ClientError, ClientResult};
