//! Tracing subscriber setup
//!
//! The banter crates only emit events. Applications that do not install their
//! own subscriber can call [`try_init_tracing_with_config`].

use crate::config::Environment;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose logs are capped at `warn` unless `RUST_LOG` says otherwise
const NOISY_DEPENDENCIES: [&str; 5] = ["hyper", "hyper_util", "reqwest", "rustls", "tungstenite"];

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for the banter crates when `RUST_LOG` is unset
    pub level: Level,
    pub json: bool,
    /// Log span open and close
    pub span_events: bool,
    pub file_line: bool,
    /// Include the event target (module path)
    pub target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            span_events: false,
            file_line: false,
            target: true,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            span_events: true,
            file_line: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn production() -> Self {
        Self {
            json: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Staging => Self::default(),
        }
    }

    /// Filter directives used when `RUST_LOG` is unset
    pub fn default_directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        let mut directives = vec![format!("info,banter={level}")];
        directives.extend(NOISY_DEPENDENCIES.iter().map(|krate| format!("{krate}=warn")));
        directives.join(",")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Install a subscriber with the default configuration
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

/// Install a subscriber for `config`
///
/// Fails instead of panicking when a global subscriber is already installed.
pub fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    let layer = fmt::layer()
        .with_target(config.target)
        .with_file(config.file_line)
        .with_line_number(config.file_line)
        .with_span_events(config.span_events());

    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = if config.json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };

    installed.map_err(|_| TracingError::AlreadyInitialized)
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
