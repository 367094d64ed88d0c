use crate::core::fetch::FetchFailure;
use thiserror::Error;

/// Failures that change what a widget shows. Single failed attempts stay
/// [`FetchFailure`]s inside the retry controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WidgetError {
    #[error("listing download failed after {attempts} attempts: {last}")]
    ListingExhausted { attempts: u32, last: FetchFailure },
    #[error("currency detail update failed after {attempts} attempts: {last}")]
    DetailExhausted { attempts: u32, last: FetchFailure },
    #[error("invalid currency (id: {id:?}, name: {name:?})")]
    UnresolvableCurrency {
        id: Option<i64>,
        name: Option<String>,
    },
}

impl WidgetError {
    /// Fatal errors stop the widget; everything else is retried or skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WidgetError::ListingExhausted { .. })
    }
}
