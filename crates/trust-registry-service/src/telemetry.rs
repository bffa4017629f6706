//! Structured logging for ingestion, resolution and scoring
//!
//! Installs a global `tracing` subscriber writing either human-readable or
//! JSON lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Subscriber settings, usually derived from the `[logging]` config section
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_format: bool,
    pub include_target: bool,
    pub include_thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_format: false,
            include_target: true,
            include_thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.include_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.include_thread_ids = enabled;
        self
    }

    /// `RUST_LOG` if set, else the configured level with SQLx statement noise capped at warn
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", self.log_level)))
    }
}

/// Install the subscriber with default settings, ignoring a prior install
pub fn init() {
    init_with_config(TelemetryConfig::default());
}

/// Install the subscriber, reporting on stderr if one is already set
///
/// ```rust,no_run
/// use trust_registry_service::telemetry::{init_with_config, TelemetryConfig};
///
/// init_with_config(TelemetryConfig::new().with_log_level("debug").with_json_format(true));
/// ```
pub fn init_with_config(config: TelemetryConfig) {
    if let Err(e) = try_init(config) {
        eprintln!("Logging was already set up: {}", e);
    }
}

pub fn try_init(config: TelemetryConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let json = config.json_format.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(config.include_target)
            .with_thread_ids(config.include_thread_ids)
    });
    let text = (!config.json_format).then(|| {
        fmt::layer()
            .with_target(config.include_target)
            .with_thread_ids(config.include_thread_ids)
    });

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(json)
        .with(text)
        .try_init()
}
