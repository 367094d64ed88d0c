//! Maps user currency specs onto the canonical listing.

use crate::core::currency::{
    CurrencySpec, DisplaySettings, ListingEntry, NormalizedSpec, TrackedCurrency,
};
use crate::core::error::WidgetError;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Resolution {
    /// Resolved currencies, in the order of the configured specs.
    pub tracked: Vec<TrackedCurrency>,
    /// One `UnresolvableCurrency` per spec that was dropped.
    pub dropped: Vec<WidgetError>,
}

impl Resolution {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Finds the listing entry a spec refers to.
///
/// An entry with the spec's id always wins. Otherwise the first entry whose
/// symbol, name or slug equals the spec's name is used, so listing order
/// breaks ties between name matches.
pub fn select_listing<'a>(
    listing: &'a [ListingEntry],
    spec: &NormalizedSpec,
) -> Option<&'a ListingEntry> {
    let by_id = spec
        .id
        .and_then(|id| listing.iter().find(|entry| entry.id == id));
    by_id.or_else(|| {
        let name = spec.name.as_deref()?;
        listing.iter().find(|entry| {
            entry.symbol.to_lowercase() == name
                || entry.name.to_lowercase() == name
                || entry.slug.to_lowercase() == name
        })
    })
}

pub fn resolve(
    listing: &[ListingEntry],
    specs: &[CurrencySpec],
    defaults: &DisplaySettings,
) -> Resolution {
    let mut resolution = Resolution::default();

    for spec in specs {
        let entry = spec
            .normalize()
            .and_then(|normalized| select_listing(listing, &normalized));

        match entry {
            Some(entry) => {
                debug!(spec = %spec, id = entry.id, "Resolved currency");
                resolution.tracked.push(TrackedCurrency {
                    id: entry.id,
                    name: entry.name.clone(),
                    symbol: entry.symbol.clone(),
                    slug: entry.slug.clone(),
                    display: spec.display_options().with_defaults(defaults),
                });
            }
            None => {
                let (id, name) = spec.identity();
                warn!(?id, ?name, "Invalid currency, dropping it");
                resolution
                    .dropped
                    .push(WidgetError::UnresolvableCurrency { id, name });
            }
        }
    }

    resolution
}
