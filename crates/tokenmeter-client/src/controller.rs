//! The client input controller
//!
//! Owns the mutually exclusive typed-text / uploaded-file input modes and
//! the display metrics derived from counting responses. Text changes are
//! debounced: a count is dispatched only after a quiescence window with
//! no further edits, and a newer edit invalidates the previously
//! scheduled dispatch rather than merely racing it.
//!
//! Once dispatched, a request runs to completion - there is no abort
//! toward the gateway. Staleness is handled at apply time instead: every
//! dispatch carries a generation number and a response is applied only
//! while its generation is still the latest.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use tokenmeter_gateway::FileKind;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{CountApi, CountSummary, FileSubmission};
use crate::error::{ClientError, ClientResult};

/// The fixed model choices offered by the model dropdown
pub const AVAILABLE_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
];

/// Quiescence window before a text change dispatches a count
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Message shown for any failed counting request
const REQUEST_FAILED_MESSAGE: &str = "Failed to count tokens";

/// Metrics the display layer renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayMetrics {
    /// Primary vendor token count
    pub tokens: Option<u32>,
    /// Best-effort GPT tokenizer estimate
    pub gpt4o_tokens: Option<u32>,
    /// Best-effort gemini estimate
    pub gemini_tokens: Option<u32>,
    /// Character count of the current input
    pub chars: usize,
    /// User-visible error message, if the last request failed
    pub error: Option<String>,
}

/// A file chosen for counting, with its classification
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Bytes,
    pub kind: FileKind,
}

/// Mutable controller state behind one lock
struct ControllerState {
    text: String,
    file: Option<SelectedFile>,
    preview: Option<String>,
    model: String,
    metrics: DisplayMetrics,
    /// Generation of the newest dispatched (or scheduled) request
    generation: u64,
    /// The currently scheduled debounce timer, aborted by newer edits
    pending: Option<JoinHandle<()>>,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            text: String::new(),
            file: None,
            preview: None,
            model: AVAILABLE_MODELS
                .first()
                .map_or_else(String::new, ToString::to_string),
            metrics: DisplayMetrics::default(),
            generation: 0,
            pending: None,
        }
    }

    fn invalidate_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

/// The input controller
///
/// Cheap to clone; clones share the same state and API handle.
#[derive(Clone)]
pub struct InputController {
    api: Arc<dyn CountApi>,
    state: Arc<Mutex<ControllerState>>,
    debounce: Duration,
}

impl InputController {
    /// Create a controller over the given counting API
    pub fn new(api: Arc<dyn CountApi>) -> Self {
        Self::with_debounce(api, DEFAULT_DEBOUNCE)
    }

    /// Create a controller with a custom quiescence window
    pub fn with_debounce(api: Arc<dyn CountApi>, debounce: Duration) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(ControllerState::new())),
            debounce,
        }
    }

    /// Replace the typed text and schedule a debounced count
    ///
    /// Ignored while a file is selected - the input modes are mutually
    /// exclusive and file mode wins until [`Self::clear_file`].
    pub async fn set_text(&self, text: impl Into<String>) {
        let mut state = self.state.lock().await;
        if state.file.is_some() {
            debug!("Text input ignored while a file is selected");
            return;
        }

        state.text = text.into();
        state.invalidate_pending();
        let generation = state.next_generation();

        if state.text.trim().is_empty() {
            // Empty input is a local no-op: zeroed metrics, no request
            state.metrics = DisplayMetrics::default();
            return;
        }

        let text = state.text.clone();
        let model = state.model.clone();
        let chars = text.chars().count();
        let controller = self.clone();

        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(controller.debounce).await;
            // The quiescence window passed: from here the request runs to
            // completion, staleness is decided when the response lands
            let dispatch = controller.clone();
            let _detached: JoinHandle<()> = tokio::spawn(async move {
                let result = dispatch.api.count_text(&text, &model).await;
                dispatch.apply_result(generation, result, chars).await;
            });
        }));
    }

    /// Select a file for counting, clearing any typed text
    ///
    /// Classifies the file from its media type with a filename-suffix
    /// fallback. For images a preview is rendered asynchronously; preview
    /// failure never blocks counting.
    pub async fn select_file(&self, name: &str, media_type: Option<&str>, bytes: Bytes) {
        let kind = FileKind::classify(media_type, Some(name));
        let file = SelectedFile {
            name: name.to_string(),
            media_type: media_type.map(ToString::to_string),
            bytes,
            kind,
        };

        let mut state = self.state.lock().await;
        state.invalidate_pending();
        state.text.clear();
        state.preview = None;
        state.metrics = DisplayMetrics::default();

        if kind == FileKind::Image {
            let preview_file = file.clone();
            let controller = self.clone();
            let _preview: JoinHandle<()> = tokio::spawn(async move {
                match render_preview(&preview_file) {
                    Some(preview) => {
                        let mut state = controller.state.lock().await;
                        // Only attach if this file is still the selection
                        if state.file.as_ref().is_some_and(|f| f.name == preview_file.name) {
                            state.preview = Some(preview);
                        }
                    }
                    None => warn!(file = %preview_file.name, "Image preview unavailable"),
                }
            });
        }

        state.file = Some(file);
    }

    /// Explicitly submit the selected file for counting (no debounce)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoFileSelected` when no file is selected.
    /// Request failures are absorbed into the display metrics, not
    /// returned.
    pub async fn submit_file(&self) -> ClientResult<()> {
        let (submission, generation) = {
            let mut state = self.state.lock().await;
            let file = state.file.clone().ok_or(ClientError::NoFileSelected)?;
            state.invalidate_pending();
            let generation = state.next_generation();
            (
                FileSubmission {
                    bytes: file.bytes,
                    file_name: file.name,
                    media_type: file.media_type,
                    declared_kind: file.kind,
                    model: state.model.clone(),
                },
                generation,
            )
        };

        let result = self.api.count_file(submission).await;
        // File failures show zero chars - the decoded count is only known
        // server-side
        self.apply_result(generation, result, 0).await;
        Ok(())
    }

    /// Reset file, preview, and displayed metrics to the empty state
    pub async fn clear_file(&self) {
        let mut state = self.state.lock().await;
        state.invalidate_pending();
        state.file = None;
        state.preview = None;
        state.metrics = DisplayMetrics::default();
    }

    /// Choose the model used for the next submission
    ///
    /// Does not resubmit anything already selected or typed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::UnknownModel` for a model outside the fixed
    /// list.
    pub async fn set_model(&self, model: &str) -> ClientResult<()> {
        if !AVAILABLE_MODELS.contains(&model) {
            return Err(ClientError::UnknownModel(model.to_string()));
        }
        let mut state = self.state.lock().await;
        state.model = model.to_string();
        Ok(())
    }

    /// Apply a finished request's result, unless it has been superseded
    async fn apply_result(
        &self,
        generation: u64,
        result: ClientResult<CountSummary>,
        fallback_chars: usize,
    ) {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(
                generation,
                latest = state.generation,
                "Dropping stale counting response"
            );
            return;
        }

        state.metrics = match result {
            Ok(summary) => DisplayMetrics {
                tokens: summary.input_tokens,
                gpt4o_tokens: summary.gpt4o_tokens,
                gemini_tokens: summary.gemini_tokens,
                chars: summary.chars,
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Counting request failed");
                DisplayMetrics {
                    tokens: None,
                    gpt4o_tokens: None,
                    gemini_tokens: None,
                    chars: fallback_chars,
                    error: Some(REQUEST_FAILED_MESSAGE.to_string()),
                }
            }
        };
    }

    /// Current display metrics
    pub async fn metrics(&self) -> DisplayMetrics {
        self.state.lock().await.metrics.clone()
    }

    /// Current image preview, when one has been rendered
    pub async fn preview(&self) -> Option<String> {
        self.state.lock().await.preview.clone()
    }

    /// Currently selected model
    pub async fn model(&self) -> String {
        self.state.lock().await.model.clone()
    }

    /// Name of the currently selected file, if any
    pub async fn selected_file(&self) -> Option<String> {
        self.state.lock().await.file.as_ref().map(|f| f.name.clone())
    }

    /// Currently typed text
    pub async fn text(&self) -> String {
        self.state.lock().await.text.clone()
    }
}

/// Render an inline data-URL preview for an image file
///
/// Returns `None` for empty payloads; the caller treats that as a
/// non-fatal missing preview.
fn render_preview(file: &SelectedFile) -> Option<String> {
    if file.bytes.is_empty() {
        return None;
    }
    let media_type = file.media_type.as_deref().unwrap_or("image/jpeg");
    Some(format!(
        "data:{media_type};base64,{}",
        BASE64.encode(&file.bytes)
    ))
}
