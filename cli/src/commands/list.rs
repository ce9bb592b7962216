use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use basket_core::models::{SelectedRecipe, ShoppingEntry};
use basket_core::receipt::{format_receipt, write_csv};

use super::Service;
use super::helpers::{format_cost, print_json, print_shopping_table};

const RECEIPT_WIDTH: usize = 32;

#[derive(Serialize)]
struct ListOutput<'a> {
    shopping_list: &'a [ShoppingEntry],
    selection: &'a [SelectedRecipe],
    estimated_cost: f64,
}

pub(crate) fn cmd_list(
    svc: &Service,
    csv_path: Option<&Path>,
    receipt: bool,
    json: bool,
) -> Result<()> {
    let list = svc.shopping_list();
    let session = svc.session();

    if let Some(path) = csv_path {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_csv(&list, file)?;
        if !json {
            eprintln!("Wrote {} row(s) to {}", list.len(), path.display());
        }
    }

    if json {
        return print_json(&ListOutput {
            shopping_list: &list,
            selection: session.selection().entries(),
            estimated_cost: session.selection_cost(),
        });
    }

    if receipt {
        print!("{}", format_receipt(&list, RECEIPT_WIDTH));
        return Ok(());
    }

    if list.is_empty() {
        println!("Shopping list is empty");
        println!("Select recipes with: basket select <recipe>");
        return Ok(());
    }

    print_shopping_table(&list);
    let selection = session.selection();
    if !selection.is_empty() {
        let recipes: Vec<String> = selection
            .entries()
            .iter()
            .map(|s| format!("{} x{}", s.recipe.name, s.effective_servings()))
            .collect();
        println!("Recipes: {}", recipes.join(", "));
        println!("Estimated cost: {}", format_cost(session.selection_cost()));
    }
    Ok(())
}

pub(crate) async fn cmd_print(svc: &Service, json: bool) -> Result<()> {
    let printed = svc.print().await?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "printed": printed.len() })
        );
    } else {
        print!("{}", format_receipt(&printed, RECEIPT_WIDTH));
        println!("Sent {} item(s) to the printer", printed.len());
    }
    Ok(())
}

pub(crate) async fn cmd_save(svc: &Service, json: bool) -> Result<()> {
    let saved = svc.save().await?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "saved": saved.len() })
        );
    } else {
        println!("Saved shopping list ({} item(s))", saved.len());
    }
    Ok(())
}
