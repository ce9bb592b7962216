use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use basket_core::models::ShoppingEntry;
use basket_core::receipt::format_quantity;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_shopping_table(entries: &[ShoppingEntry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "Ingredient")]
        ingredient: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "ID")]
        id: i64,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            ingredient: truncate(&e.ingredient, 35),
            quantity: format_quantity(e.quantity),
            source: e.source.to_string(),
            id: e.ingredient_id,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn format_cost(cost: f64) -> String {
    format!("{:.2}", no_neg_zero(cost))
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
