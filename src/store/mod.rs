//! In-memory store of the latest detail data per tracked currency

use crate::core::currency::TrackedCurrency;
use crate::core::quote::QuoteData;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyDataRecord {
    pub name: String,
    pub symbol: String,
    pub data: Option<QuoteData>,
    pub loaded: bool,
}

/// Records keyed by canonical currency id.
///
/// Records are created once by [`CurrencyDataStore::initialize`] and only
/// ever mutated by [`CurrencyDataStore::merge`]; nothing is removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyDataStore {
    records: HashMap<u64, CurrencyDataRecord>,
}

impl CurrencyDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unloaded record for every tracked id not yet in the store.
    pub fn initialize(&mut self, tracked: &[TrackedCurrency]) {
        for currency in tracked {
            self.records
                .entry(currency.id)
                .or_insert_with(|| CurrencyDataRecord {
                    name: currency.name.clone(),
                    symbol: currency.symbol.clone(),
                    data: None,
                    loaded: false,
                });
        }
        debug!(records = self.records.len(), "Initialized currency store");
    }

    /// Applies one detail response and returns how many records it updated.
    ///
    /// Ids missing from the response keep their previous data; ids that are
    /// not tracked are ignored.
    pub fn merge(&mut self, response: HashMap<u64, QuoteData>) -> usize {
        let mut updated = 0;
        for (id, data) in response {
            match self.records.get_mut(&id) {
                Some(record) => {
                    record.data = Some(data);
                    record.loaded = true;
                    updated += 1;
                }
                None => debug!(id, "Ignoring detail data for untracked currency"),
            }
        }
        updated
    }

    pub fn get(&self, id: u64) -> Option<&CurrencyDataRecord> {
        self.records.get(&id)
    }

    pub fn is_loaded(&self, id: u64) -> bool {
        self.get(id).is_some_and(|record| record.loaded)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.records.values().filter(|record| record.loaded).count()
    }

    pub fn records(&self) -> &HashMap<u64, CurrencyDataRecord> {
        &self.records
    }
}
