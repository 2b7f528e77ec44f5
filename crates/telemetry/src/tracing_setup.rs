//! Tracing setup for structured logging.
//!
//! Logs always go to stderr: the binary's stdin/stdout carry the host-signal
//! stream.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the config provides a valid one.
pub const DEFAULT_FILTER: &str = "info";

/// Log output options exposed by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Directive string, e.g. "info" or "capture=debug,transmission=debug"
    pub filter: String,
    /// One JSON object per line instead of human-readable text
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            json: false,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Builds the config from raw `LOG_JSON` and `RUST_LOG` values.
    pub fn from_env_values(log_json: Option<&str>, rust_log: Option<&str>) -> Self {
        let json = log_json.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let filter = rust_log
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FILTER);

        Self::new().with_filter(filter).with_json(json)
    }

    /// Parsed filter; an unparsable directive string falls back to the
    /// default level.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Installs the global subscriber.
///
/// Returns false if one was already installed (embedding hosts and test
/// binaries may have set one).
pub fn init_tracing(config: TracingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let installed = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::info!(filter = %config.filter, json = config.json, "Tracing initialized");
    }
    installed
}

/// Initialize tracing from `LOG_JSON` and `RUST_LOG`.
pub fn init_tracing_from_env() -> bool {
    let log_json = std::env::var("LOG_JSON").ok();
    let rust_log = std::env::var("RUST_LOG").ok();

    init_tracing(TracingConfig::from_env_values(
        log_json.as_deref(),
        rust_log.as_deref(),
    ))
}
