//! Logo and sparkline image URLs.

use crate::core::currency::{GraphRange, LogoSize};

pub const LOGO_BASE_URL: &str = "https://s2.coinmarketcap.com/static/img/coins";
pub const GRAPH_BASE_URL: &str = "https://s3.coinmarketcap.com/generated/sparklines/web";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoOptions {
    pub size: LogoSize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOptions {
    pub range: GraphRange,
    pub conversion: String,
}

pub fn logo_url(id: u64, options: &LogoOptions) -> String {
    let pixels = options.size.pixels();
    format!("{LOGO_BASE_URL}/{pixels}x{pixels}/{id}.png")
}

pub fn graph_url(id: u64, options: &GraphOptions) -> String {
    format!(
        "{GRAPH_BASE_URL}/{}/{}/{id}.png",
        options.range,
        options.conversion.to_lowercase()
    )
}
