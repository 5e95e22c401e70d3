//! Application bootstrap and service initialization
//!
//! This module handles all service setup and dependency injection for the
//! API server. Configuration is validated exactly once here; a missing
//! primary vendor credential is fatal and the process refuses to start.

use std::sync::Arc;

use tokenmeter_common::ErrorContext;
use tokenmeter_config::{ApplicationConfig, Validate};
use tokenmeter_gateway::{CountingService, TokenGateway};
use tokenmeter_vendors::{AnthropicCounter, GeminiCounter, TiktokenEstimator, TokenEstimator};
use tracing::{info, warn};

use crate::AppState;

/// Bootstrap result type
pub type BootstrapResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load configuration from the environment and validate it
///
/// # Errors
///
/// Returns an error when validation fails - most notably when the
/// required primary vendor credential is absent.
pub fn load_config() -> BootstrapResult<ApplicationConfig> {
    let config = ApplicationConfig::from_env();
    config.validate()?;
    Ok(config)
}

/// Initialize the normalization gateway with all vendor handles
///
/// # Errors
///
/// Returns an error if the local tokenizer encoder fails to load.
pub fn setup_gateway(config: &ApplicationConfig) -> BootstrapResult<Arc<dyn CountingService>> {
    info!("Initializing vendor clients...");

    let primary = Arc::new(AnthropicCounter::new(
        &config.vendors.anthropic_base_url,
        &config.vendors.anthropic_api_key,
    ));

    let secondary = Arc::new(
        TiktokenEstimator::new(&config.vendors.gpt_model)
            .context("initializing local tokenizer")?,
    ) as Arc<dyn TokenEstimator>;

    let tertiary = match config.vendors.gemini_api_key.as_deref() {
        Some(key) => Some(Arc::new(GeminiCounter::new(
            &config.vendors.gemini_base_url,
            key,
            &config.vendors.gemini_model,
        )) as Arc<dyn TokenEstimator>),
        None => {
            warn!("Gemini credential absent - starting with the gemini estimate disabled");
            None
        }
    };

    let gateway = TokenGateway::new(
        primary,
        secondary,
        tertiary,
        config.vendors.default_model.clone(),
        config.gateway.clone(),
    );

    Ok(Arc::new(gateway))
}

/// Build the full application state
///
/// # Errors
///
/// Returns an error if any service fails to initialize.
pub fn setup_app_state(config: &ApplicationConfig) -> BootstrapResult<AppState> {
    let counting = setup_gateway(config)?;
    Ok(AppState::new(counting))
}
