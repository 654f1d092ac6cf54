//! Tracing subscriber setup.

use crate::error::TokenError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Name attached to the startup event
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit one JSON object per event instead of text
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Sets the service name.
    #[must_use]
    pub fn named(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Sets the fallback filter directive.
    #[must_use]
    pub fn level(mut self, directive: impl Into<String>) -> Self {
        self.log_level = directive.into();
        self
    }

    /// Switches between JSON and text output.
    #[must_use]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.json_output = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level. Call once at startup.
///
/// # Errors
///
/// Returns [`TokenError::Config`] if a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TokenError> {
    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = if config.json_output {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed
        .map_err(|e| TokenError::config(format!("Tracing subscriber already installed: {e}")))?;
    tracing::info!(service = %config.service_name, json = config.json_output, "Logging ready");
    Ok(())
}
