//! Application state for Axum handlers
//!
//! Contains the counting service handle, initialized once at startup and
//! passed to all handlers via dependency injection - never ambient global
//! state.

use std::sync::Arc;

use tokenmeter_gateway::CountingService;

/// Type alias for the counting service handle
pub type CountingServiceHandle = Arc<dyn CountingService>;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// Normalization gateway performing the vendor dispatch
    pub counting: CountingServiceHandle,
}

impl AppState {
    /// Create new application state with all services
    #[must_use]
    pub fn new(counting: CountingServiceHandle) -> Self {
        Self { counting }
    }
}
