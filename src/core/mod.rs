//! Core pipeline: fetching, retrying, resolving and scheduling

pub mod config;
pub mod currency;
pub mod error;
pub mod fetch;
pub mod log;
pub mod quote;
pub mod resolver;
pub mod retry;
pub mod scheduler;

// Re-export main types for cleaner imports
pub use currency::{CurrencySpec, ListingEntry, TrackedCurrency};
pub use error::WidgetError;
pub use fetch::{FetchFailure, FetchOutcome, JsonFetcher};
pub use quote::QuoteData;
