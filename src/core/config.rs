use crate::core::currency::{CurrencySpec, DisplaySettings};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_UPDATE_INTERVAL_MINUTES: f64 = 10.0;
pub const MIN_UPDATE_INTERVAL_MINUTES: f64 = 5.0;
pub const DEFAULT_RETRY_DELAY_SECONDS: f64 = 5.0;
pub const DEFAULT_MAX_LISTING_ATTEMPTS: u32 = 4;
pub const DEFAULT_MAX_DETAIL_ATTEMPTS: u32 = 2;
pub const DEFAULT_CONVERSION: &str = "USD";
pub const DEFAULT_CURRENCY_IDS: [i64; 3] = [1, 1027, 1592];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_version: String,
    pub listings_endpoint: String,
    pub ticker_endpoint: String,
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: "https://pro-api.coinmarketcap.com".to_string(),
            api_version: "v1".to_string(),
            listings_endpoint: "cryptocurrency/map".to_string(),
            ticker_endpoint: "cryptocurrency/quotes/latest".to_string(),
            api_key: None,
        }
    }
}

/// A table column, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Logo,
    Name,
    Symbol,
    Price,
    Change1h,
    Change24h,
    Change7d,
    Graph,
}

impl Column {
    pub fn title(&self) -> &'static str {
        match self {
            Column::Logo => "",
            Column::Name => "Currency",
            Column::Symbol => "Symbol",
            Column::Price => "Price",
            Column::Change1h => "Hour",
            Column::Change24h => "Day",
            Column::Change7d => "Week",
            Column::Graph => "Trend",
        }
    }
}

/// `true`/`false` toggles every header, a list enables headers by column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ColumnHeaders {
    Toggle(bool),
    Columns(Vec<Column>),
}

impl Default for ColumnHeaders {
    fn default() -> Self {
        ColumnHeaders::Columns(vec![Column::Symbol, Column::Price])
    }
}

impl ColumnHeaders {
    pub fn enabled(&self) -> bool {
        match self {
            ColumnHeaders::Toggle(on) => *on,
            ColumnHeaders::Columns(columns) => !columns.is_empty(),
        }
    }

    pub fn shows(&self, column: Column) -> bool {
        match self {
            ColumnHeaders::Toggle(on) => *on,
            ColumnHeaders::Columns(columns) => columns.contains(&column),
        }
    }
}

fn default_view() -> Vec<Column> {
    vec![Column::Name, Column::Symbol, Column::Price]
}

fn default_conversion() -> String {
    DEFAULT_CONVERSION.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Currencies to display, in display order.
    #[serde(default)]
    pub currencies: Option<Vec<CurrencySpec>>,
    /// Minutes between bulk updates.
    #[serde(default)]
    pub update_interval: Option<f64>,
    /// Seconds between detail fetch attempts.
    #[serde(default)]
    pub retry_delay: Option<f64>,
    #[serde(default = "default_conversion")]
    pub conversion: String,
    #[serde(default)]
    pub max_listing_attempts: Option<u32>,
    #[serde(default)]
    pub max_detail_attempts: Option<u32>,
    #[serde(default = "default_view")]
    pub view: Vec<Column>,
    #[serde(default)]
    pub show_column_headers: ColumnHeaders,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currencies: None,
            update_interval: None,
            retry_delay: None,
            conversion: default_conversion(),
            max_listing_attempts: None,
            max_detail_attempts: None,
            view: default_view(),
            show_column_headers: ColumnHeaders::default(),
            display: DisplaySettings::default(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Validated settings handed to a widget instance.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSettings {
    pub currencies: Vec<CurrencySpec>,
    pub update_interval: Duration,
    pub retry_delay: Duration,
    pub conversion: String,
    pub max_listing_attempts: u32,
    pub max_detail_attempts: u32,
    pub display: DisplaySettings,
    pub provider: ProviderConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "coinboard", "coinboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies defaults and floors. Out-of-range values fall back to their
    /// default instead of failing.
    pub fn settings(&self) -> WidgetSettings {
        let currencies = self.currencies.clone().unwrap_or_else(|| {
            DEFAULT_CURRENCY_IDS
                .iter()
                .map(|id| CurrencySpec::Id(*id))
                .collect()
        });

        let update_minutes = match self.update_interval {
            Some(minutes) if minutes >= MIN_UPDATE_INTERVAL_MINUTES => minutes,
            Some(minutes) => {
                warn!(
                    minutes,
                    "update_interval below {MIN_UPDATE_INTERVAL_MINUTES} minutes, using default"
                );
                DEFAULT_UPDATE_INTERVAL_MINUTES
            }
            None => DEFAULT_UPDATE_INTERVAL_MINUTES,
        };

        let retry_seconds = match self.retry_delay {
            Some(seconds) if seconds >= 0.0 => seconds,
            Some(seconds) => {
                warn!(seconds, "Negative retry_delay, using default");
                DEFAULT_RETRY_DELAY_SECONDS
            }
            None => DEFAULT_RETRY_DELAY_SECONDS,
        };

        let conversion = match self.conversion.trim() {
            "" => DEFAULT_CONVERSION.to_string(),
            code => code.to_uppercase(),
        };

        WidgetSettings {
            currencies,
            update_interval: Duration::from_secs_f64(update_minutes * 60.0),
            retry_delay: Duration::from_secs_f64(retry_seconds),
            conversion,
            max_listing_attempts: self
                .max_listing_attempts
                .unwrap_or(DEFAULT_MAX_LISTING_ATTEMPTS)
                .max(1),
            max_detail_attempts: self
                .max_detail_attempts
                .unwrap_or(DEFAULT_MAX_DETAIL_ATTEMPTS)
                .max(1),
            display: self.display.clone(),
            provider: self.provider.clone(),
        }
    }
}
