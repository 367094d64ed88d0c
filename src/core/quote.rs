//! Quote payloads returned by the ticker endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangePeriod {
    OneHour,
    OneDay,
    SevenDays,
}

impl ChangePeriod {
    fn field(&self) -> &'static str {
        match self {
            ChangePeriod::OneHour => "percent_change_1h",
            ChangePeriod::OneDay => "percent_change_24h",
            ChangePeriod::SevenDays => "percent_change_7d",
        }
    }
}

impl Display for ChangePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ChangePeriod::OneHour => "1h",
                ChangePeriod::OneDay => "24h",
                ChangePeriod::SevenDays => "7d",
            }
        )
    }
}

/// Detail data for one currency. Kept as raw JSON; only the price and
/// percent-change fields are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteData(Value);

impl QuoteData {
    pub fn new(value: Value) -> Self {
        QuoteData(value)
    }

    // Current payloads use `quote`, the v2 ticker used `quotes`.
    fn quote(&self, code: &str) -> Option<&Value> {
        let code = code.to_uppercase();
        self.0
            .get("quote")
            .or_else(|| self.0.get("quotes"))
            .and_then(|quotes| quotes.get(&code))
    }

    pub fn price(&self, code: &str) -> Option<f64> {
        self.quote(code)?.get("price")?.as_f64()
    }

    pub fn percent_change(&self, code: &str, period: ChangePeriod) -> Option<f64> {
        self.quote(code)?.get(period.field())?.as_f64()
    }
}
