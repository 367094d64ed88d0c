//! Renders a widget snapshot as a terminal table.

use super::ui;
use crate::core::config::{Column, ColumnHeaders};
use crate::core::currency::{DisplaySettings, TrackedCurrency};
use crate::core::quote::ChangePeriod;
use crate::providers::assets::{GraphOptions, LogoOptions, graph_url, logo_url};
use crate::store::CurrencyDataRecord;
use crate::widget::{WidgetSnapshot, WidgetStatus};
use comfy_table::Cell;

/// Formats a price with either a number of significant digits or a fixed
/// number of decimal places.
pub fn format_price(price: f64, display: &DisplaySettings, conversion: &str) -> String {
    let decimals = match display.significant_digits {
        Some(digits) if price != 0.0 => {
            let integer_digits = price.abs().log10().floor() as i64 + 1;
            (i64::from(digits) - integer_digits).max(0) as usize
        }
        _ => display.decimal_places as usize,
    };

    let mut text = format!("{price:.decimals$}");
    if display.show_currency_with_price {
        text.push(' ');
        text.push_str(conversion);
    }
    text
}

fn cell(
    column: Column,
    currency: &TrackedCurrency,
    record: &CurrencyDataRecord,
    conversion: &str,
) -> Cell {
    let display = &currency.display;
    let change = |period| {
        record
            .data
            .as_ref()
            .and_then(|data| data.percent_change(conversion, period))
            .map_or_else(ui::na_cell, |value| {
                ui::change_cell(value, display.percent_change_colored)
            })
    };

    match column {
        Column::Logo => Cell::new(logo_url(
            currency.id,
            &LogoOptions {
                size: display.logo_size,
            },
        )),
        Column::Name => Cell::new(&record.name),
        Column::Symbol => Cell::new(&record.symbol),
        Column::Price => record
            .data
            .as_ref()
            .and_then(|data| data.price(conversion))
            .map_or_else(ui::na_cell, |price| {
                ui::number_cell(format_price(price, display, conversion))
            }),
        Column::Change1h => change(ChangePeriod::OneHour),
        Column::Change24h => change(ChangePeriod::OneDay),
        Column::Change7d => change(ChangePeriod::SevenDays),
        Column::Graph => Cell::new(graph_url(
            currency.id,
            &GraphOptions {
                range: display.graph_range,
                conversion: conversion.to_string(),
            },
        )),
    }
}

pub fn render(snapshot: &WidgetSnapshot, view: &[Column], headers: &ColumnHeaders) -> String {
    match &snapshot.status {
        WidgetStatus::Loading => "Loading...".to_string(),
        WidgetStatus::Failed(message) => format!(
            "{}\nError: {}",
            ui::style_text("Unable to get data from CoinMarketCap", ui::StyleType::Error),
            message
        ),
        WidgetStatus::Ready => {
            let mut table = ui::new_styled_table();
            if headers.enabled() {
                table.set_header(view.iter().map(|column| {
                    ui::header_cell(if headers.shows(*column) {
                        column.title()
                    } else {
                        ""
                    })
                }));
            }

            for (currency, record) in snapshot.rows() {
                table.add_row(
                    view.iter()
                        .map(|column| cell(*column, currency, record, &snapshot.conversion)),
                );
            }

            let mut output = table.to_string();
            if let Some(updated) = snapshot.last_updated {
                output.push_str(&format!(
                    "\n{}",
                    ui::style_text(
                        &format!("Last updated {}", updated.format("%Y-%m-%d %H:%M:%S UTC")),
                        ui::StyleType::Subtle
                    )
                ));
            }
            if let Some(error) = &snapshot.last_error {
                output.push_str(&format!(
                    "\n{}",
                    ui::style_text(&format!("Update failed: {error}"), ui::StyleType::Error)
                ));
            }
            output
        }
    }
}
