//! Configuration for the runtime-unit runner

use serde::{Deserialize, Serialize};

/// Main runner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Tick configuration
    #[serde(default)]
    pub ticks: TickConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Report configuration
    #[serde(default)]
    pub report: ReportConfig,

    /// Participant configuration
    #[serde(default)]
    pub participant: ParticipantConfig,
}

/// Tick configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Wall-clock length of one tick in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Stop driving after this many ticks (0 = unlimited)
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_ticks: default_max_ticks(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Output format of the final run report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Report configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
}

/// Participant configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Name of the console actor bound as participant; unset runs without one
    #[serde(default)]
    pub name: Option<String>,
}

// Default value helpers
fn default_interval_ms() -> u64 {
    50
}

fn default_max_ticks() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RunnerConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&RunnerConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables, e.g. RUNTIME_UNIT_TICKS__INTERVAL_MS
        builder = builder.add_source(
            config::Environment::with_prefix("RUNTIME_UNIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
