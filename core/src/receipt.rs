use std::fmt::Write as _;
use std::io;

use anyhow::Result;

use crate::models::{ShoppingEntry, Source};

/// Narrowest receipt we will lay out; anything smaller is clamped.
const MIN_WIDTH: usize = 24;

/// Render a shopping list as fixed-width text, one line per entry with the
/// quantity right-aligned. Manual and mixed entries carry a marker.
#[must_use]
pub fn format_receipt(entries: &[ShoppingEntry], width: usize) -> String {
    let width = width.max(MIN_WIDTH);
    let rule = "-".repeat(width);
    let mut out = String::new();

    let title = "SHOPPING LIST";
    let _ = writeln!(out, "{title:^width$}");
    let _ = writeln!(out, "{rule}");

    if entries.is_empty() {
        let _ = writeln!(out, "{:^width$}", "(empty)");
    }

    for entry in entries {
        let qty = format_quantity(entry.quantity);
        let marker = match entry.source {
            Source::Recipe => "",
            Source::Manual => " *",
            Source::Mixed => " +",
        };
        let label_width = width.saturating_sub(qty.len() + 1);
        let label = fit(&format!("{}{marker}", entry.ingredient), label_width);
        let _ = writeln!(out, "{label:<label_width$} {qty}");
    }

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{} item(s)", entries.len());
    let _ = writeln!(out, "* manual  + mixed");
    out
}

/// Quantities print without a trailing `.0` when whole.
#[must_use]
pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract().abs() < 1e-9 {
        format!("{quantity:.0}")
    } else {
        let s = format!("{quantity:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else if width <= 1 {
        s.chars().take(width).collect()
    } else {
        let truncated: String = s.chars().take(width - 1).collect();
        format!("{truncated}~")
    }
}

#[derive(serde::Serialize)]
struct CsvRow<'a> {
    ingredient: &'a str,
    quantity: f64,
    source: &'a str,
    ingredient_id: i64,
}

/// Write the list as CSV with a header row.
pub fn write_csv<W: io::Write>(entries: &[ShoppingEntry], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if entries.is_empty() {
        wtr.write_record(["ingredient", "quantity", "source", "ingredient_id"])?;
    }
    for entry in entries {
        wtr.serialize(CsvRow {
            ingredient: &entry.ingredient,
            quantity: entry.quantity,
            source: entry.source.as_str(),
            ingredient_id: entry.ingredient_id,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;


    fn entries() -> Vec<ShoppingEntry> {
        vec![
            ShoppingEntry {
                ingredient: "Flour".to_string(),
                quantity: 400.0,
                source: Source::Recipe,
                ingredient_id: 1,
            },
            ShoppingEntry {
                ingredient: "Egg".to_string(),
                quantity: 5.0,
                source: Source::Mixed,
                ingredient_id: 2,
            },
            ShoppingEntry {
                ingredient: "Extra virgin olive oil, cold pressed".to_string(),
                quantity: 0.25,
                source: Source::Manual,
                ingredient_id: 7,
            },
        ]
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(400.0), "400");
        assert_eq!(format_quantity(0.25), "0.25");
        assert_eq!(format_quantity(1.5), "1.5");
        assert_eq!(format_quantity(2.0 / 3.0), "0.67");
    }

    #[test]
    fn test_receipt_lines_fit_width() {
        let text = format_receipt(&entries(), 32);
        for line in text.lines() {
            assert!(line.chars().count() <= 32, "line too wide: {line:?}");
        }
        assert!(text.contains("Flour"));
        assert!(text.contains("Egg +"));
        assert!(text.lines().any(|l| l.ends_with(" 400")));
        assert!(text.contains("Extra virgin olive oil, co~"));
        assert!(text.contains("3 item(s)"));
    }

    #[test]
    fn test_receipt_clamps_tiny_width() {
        let text = format_receipt(&entries(), 4);
        assert_eq!(text.lines().nth(1).unwrap().len(), MIN_WIDTH);
        assert!(text.lines().all(|l| l.chars().count() <= MIN_WIDTH));
    }

    #[test]
    fn test_empty_receipt() {
        let text = format_receipt(&[], 30);
        assert!(text.contains("(empty)"));
        assert!(text.contains("0 item(s)"));
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        write_csv(&entries(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("ingredient,quantity,source,ingredient_id"));
        assert_eq!(lines.next(), Some("Flour,400.0,Recipe,1"));
        assert_eq!(lines.next(), Some("Egg,5.0,Mixed,2"));
        assert_eq!(
            lines.next(),
            Some("\"Extra virgin olive oil, cold pressed\",0.25,Manual,7")
        );
    }

    #[test]
    fn test_write_csv_empty_has_header() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "ingredient,quantity,source,ingredient_id\n"
        );
    }
}
