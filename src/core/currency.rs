//! Currency identity types: user specs, listing entries and tracked currencies

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A user-configured currency, given as an id, a name/symbol/slug, or a
/// mapping with optional id, name and display options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CurrencySpec {
    Id(i64),
    Name(String),
    Detailed(DetailedSpec),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DetailedSpec {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub display: DisplayOptions,
}

/// The canonical `{id?, name?}` shape a spec is matched with.
///
/// `name` is lower-cased; at least one of the two fields is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSpec {
    pub id: Option<u64>,
    pub name: Option<String>,
}

impl CurrencySpec {
    fn raw_id(&self) -> Option<i64> {
        match self {
            CurrencySpec::Id(id) => Some(*id),
            CurrencySpec::Name(_) => None,
            CurrencySpec::Detailed(d) => d.id,
        }
    }

    fn raw_name(&self) -> Option<&str> {
        match self {
            CurrencySpec::Id(_) => None,
            CurrencySpec::Name(name) => Some(name),
            CurrencySpec::Detailed(d) => d.name.as_deref(),
        }
    }

    /// Returns `None` when the spec carries neither a positive id nor a
    /// non-blank name.
    pub fn normalize(&self) -> Option<NormalizedSpec> {
        let id = self
            .raw_id()
            .and_then(|id| u64::try_from(id).ok())
            .filter(|id| *id > 0);
        let name = self
            .raw_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_lowercase);

        if id.is_none() && name.is_none() {
            return None;
        }
        Some(NormalizedSpec { id, name })
    }

    pub fn display_options(&self) -> DisplayOptions {
        match self {
            CurrencySpec::Detailed(d) => d.display.clone(),
            _ => DisplayOptions::default(),
        }
    }

    /// Original id and name, for diagnostics.
    pub fn identity(&self) -> (Option<i64>, Option<String>) {
        (self.raw_id(), self.raw_name().map(str::to_string))
    }
}

impl Display for CurrencySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.raw_id(), self.raw_name()) {
            (Some(id), Some(name)) => write!(f, "{id} ({name})"),
            (Some(id), None) => write!(f, "{id}"),
            (None, Some(name)) => write!(f, "{name}"),
            (None, None) => write!(f, "<empty>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoSize {
    Small,
    Medium,
    Large,
    XLarge,
}

impl LogoSize {
    pub fn pixels(&self) -> u32 {
        match self {
            LogoSize::Small => 16,
            LogoSize::Medium => 32,
            LogoSize::Large => 64,
            LogoSize::XLarge => 128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum GraphRange {
    #[serde(rename = "1d", alias = "1D")]
    OneDay,
    #[serde(rename = "7d", alias = "7D")]
    SevenDays,
    #[serde(rename = "30d", alias = "30D")]
    ThirtyDays,
}

impl Display for GraphRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                GraphRange::OneDay => "1d",
                GraphRange::SevenDays => "7d",
                GraphRange::ThirtyDays => "30d",
            }
        )
    }
}

/// Per-currency display options; unset fields fall back to the global
/// [`DisplaySettings`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DisplayOptions {
    #[serde(default)]
    pub logo_size: Option<LogoSize>,
    #[serde(default)]
    pub percent_change_colored: Option<bool>,
    #[serde(default)]
    pub significant_digits: Option<u32>,
    #[serde(default)]
    pub decimal_places: Option<u32>,
    #[serde(default)]
    pub show_currency_with_price: Option<bool>,
    #[serde(default)]
    pub graph_range: Option<GraphRange>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DisplaySettings {
    pub logo_size: LogoSize,
    pub percent_change_colored: bool,
    pub significant_digits: Option<u32>,
    pub decimal_places: u32,
    pub show_currency_with_price: bool,
    pub graph_range: GraphRange,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            logo_size: LogoSize::Medium,
            percent_change_colored: false,
            significant_digits: None,
            decimal_places: 2,
            show_currency_with_price: false,
            graph_range: GraphRange::SevenDays,
        }
    }
}

impl DisplayOptions {
    pub fn with_defaults(&self, defaults: &DisplaySettings) -> DisplaySettings {
        DisplaySettings {
            logo_size: self.logo_size.unwrap_or(defaults.logo_size),
            percent_change_colored: self
                .percent_change_colored
                .unwrap_or(defaults.percent_change_colored),
            significant_digits: self.significant_digits.or(defaults.significant_digits),
            decimal_places: self.decimal_places.unwrap_or(defaults.decimal_places),
            show_currency_with_price: self
                .show_currency_with_price
                .unwrap_or(defaults.show_currency_with_price),
            graph_range: self.graph_range.unwrap_or(defaults.graph_range),
        }
    }
}

/// One entry of the downloaded canonical listing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListingEntry {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    #[serde(alias = "website_slug")]
    pub slug: String,
}

/// A user spec matched against the listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackedCurrency {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    pub display: DisplaySettings,
}
