use crate::types::HistoryScope;
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `SMARTREACH__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub autofill: AutofillConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on concurrent per-recipient dispatch tasks, sized to the
    /// history-store and queue connection budgets.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default)]
    pub history_scope: HistoryScope,
    /// Landing link used when a campaign supplies none.
    #[serde(default = "default_link")]
    pub default_link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    /// Authoring timezone for organizations that do not set their own.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutofillConfig {
    /// Use a circular (vector) mean of open times instead of the linear
    /// mean. The linear mean mis-averages times that straddle midnight;
    /// this flag opts into the corrected behavior rather than silently
    /// substituting it.
    #[serde(default = "default_circular_mean")]
    pub circular_mean: bool,
}

// Default functions
fn default_node_id() -> String {
    "smartreach-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_max_workers() -> usize {
    8
}
fn default_link() -> String {
    "https://smartreachai.social".to_string()
}
fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}
fn default_circular_mean() -> bool {
    false
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            history_scope: HistoryScope::default(),
            default_link: default_link(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
        }
    }
}

impl Default for AutofillConfig {
    fn default() -> Self {
        Self {
            circular_mean: default_circular_mean(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            scheduler: SchedulerConfig::default(),
            window: WindowConfig::default(),
            autofill: AutofillConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SMARTREACH")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
