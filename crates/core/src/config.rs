//! Pipeline settings.
//!
//! Settings are owned by the host's settings form; anything missing or invalid
//! falls back to a default and is reported as a configuration warning.

use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::error::Error;
use crate::events::Identity;
use crate::limits::REQUEST_TIMEOUT_MS;

/// Path segment swapped to reach the legacy collector endpoint.
pub const PROGRESS_PATH_SEGMENT: &str = "student-progress";
pub const LEGACY_PATH_SEGMENT: &str = "cell-monitor";

/// Load distribution window: delays fall in `[floor_ms, floor_ms + range_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LoadDistributionConfig {
    #[serde(default = "default_floor_ms")]
    pub floor_ms: u64,
    /// Must be non-zero
    #[serde(default = "default_range_ms")]
    #[validate(range(min = 1))]
    pub range_ms: u64,
}

fn default_floor_ms() -> u64 {
    200
}

fn default_range_ms() -> u64 {
    2000
}

impl Default for LoadDistributionConfig {
    fn default() -> Self {
        Self {
            floor_ms: default_floor_ms(),
            range_ms: default_range_ms(),
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// Collector endpoint (http or https)
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Total attempts per batch before giving up
    #[serde(default = "default_retry_attempts")]
    #[validate(range(min = 1, max = 10))]
    pub retry_attempts: u32,
    /// Surface delivery outcomes as transient notifications
    #[serde(default)]
    pub show_notifications: bool,
    /// Delay sends by a seeded pseudo-random amount
    #[serde(default = "default_true")]
    pub use_load_distribution: bool,
    /// Also send every event to the legacy endpoint
    #[serde(default)]
    pub mirror_legacy: bool,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 100, max = 120000))]
    pub request_timeout_ms: u64,
    #[serde(default)]
    #[validate(nested)]
    pub load_distribution: LoadDistributionConfig,

    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub user_name: String,
}

fn default_server_url() -> String {
    "http://localhost:3000/api/student-progress".to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_request_timeout_ms() -> u64 {
    REQUEST_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            retry_attempts: default_retry_attempts(),
            show_notifications: false,
            use_load_distribution: true,
            mirror_legacy: false,
            request_timeout_ms: default_request_timeout_ms(),
            load_distribution: LoadDistributionConfig::default(),
            email_address: String::new(),
            team_name: String::new(),
            user_name: String::new(),
        }
    }
}

impl Settings {
    pub fn identity(&self) -> Identity {
        Identity {
            email_address: self.email_address.clone(),
            team_name: self.team_name.clone(),
            user_name: self.user_name.clone(),
        }
    }

    /// Legacy endpoint: the progress path segment replaced by `cell-monitor`.
    pub fn legacy_url(&self) -> String {
        self.server_url
            .replace(PROGRESS_PATH_SEGMENT, LEGACY_PATH_SEGMENT)
    }

    /// Replaces invalid fields with defaults.
    ///
    /// Returns the usable settings and one configuration error per replaced
    /// field. Callers log these and keep running.
    pub fn sanitize(mut self) -> (Self, Vec<Error>) {
        let mut warnings = Vec::new();

        if !is_http_url(&self.server_url) {
            warnings.push(Error::configuration(
                "server_url",
                format!("invalid collector url {:?}, using default", self.server_url),
            ));
            self.server_url = default_server_url();
        }

        if let Err(errors) = self.validate() {
            let fields = errors.field_errors();

            if fields.contains_key("retry_attempts") {
                warnings.push(Error::configuration(
                    "retry_attempts",
                    format!("{} out of range 1..=10, using default", self.retry_attempts),
                ));
                self.retry_attempts = default_retry_attempts();
            }
            if fields.contains_key("request_timeout_ms") {
                warnings.push(Error::configuration(
                    "request_timeout_ms",
                    format!("{}ms out of range, using default", self.request_timeout_ms),
                ));
                self.request_timeout_ms = default_request_timeout_ms();
            }
            if self.load_distribution.validate().is_err() {
                warnings.push(Error::configuration(
                    "load_distribution",
                    "range_ms must be non-zero, using default window",
                ));
                self.load_distribution = LoadDistributionConfig::default();
            }
        }

        (self, warnings)
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}
