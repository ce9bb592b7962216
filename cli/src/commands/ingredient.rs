use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use basket_core::models::{IngredientEdit, NewIngredient};

use super::Service;
use super::helpers::{format_cost, print_json, truncate};

pub(crate) fn cmd_ingredient_list(svc: &Service, search: Option<&str>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Cost/unit")]
        cost: String,
        #[tabled(rename = "Used by")]
        used_by: usize,
    }

    let catalog = svc.session().catalog();
    let needle = search.map(str::to_lowercase);
    let ingredients: Vec<_> = catalog
        .ingredients()
        .iter()
        .filter(|i| {
            needle
                .as_deref()
                .is_none_or(|n| i.ingredient_name.to_lowercase().contains(n))
        })
        .collect();

    if ingredients.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No ingredients found");
        }
        process::exit(2);
    }

    if json {
        return print_json(&ingredients);
    }

    let rows: Vec<IngredientRow> = ingredients
        .iter()
        .map(|i| IngredientRow {
            id: i.ingredient_id,
            name: truncate(&i.ingredient_name, 35),
            cost: i.cost_per_unit.map_or_else(|| "-".to_string(), format_cost),
            used_by: catalog.recipes_using(i.ingredient_id).len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) async fn cmd_ingredient_add(
    svc: &mut Service,
    name: &str,
    cost_per_unit: Option<f64>,
    json: bool,
) -> Result<()> {
    let ingredient = svc
        .add_ingredient(&NewIngredient {
            name: name.to_string(),
            cost_per_unit,
        })
        .await?;
    if json {
        print_json(&ingredient)?;
    } else {
        let id = ingredient.ingredient_id;
        let iname = &ingredient.ingredient_name;
        println!("Added ingredient: {iname} (id: {id})");
    }
    Ok(())
}

pub(crate) async fn cmd_ingredient_edit(
    svc: &mut Service,
    query: &str,
    edit: IngredientEdit,
    json: bool,
) -> Result<()> {
    if edit.name.is_none() && edit.cost_per_unit.is_none() {
        anyhow::bail!("Nothing to change. Pass --name or --cost");
    }
    let id = svc.session().catalog().resolve_ingredient(query)?.ingredient_id;
    let ingredient = svc.edit_ingredient(id, &edit).await?;
    if json {
        print_json(&ingredient)?;
    } else {
        let iname = &ingredient.ingredient_name;
        let cost = ingredient
            .cost_per_unit
            .map_or_else(|| "-".to_string(), format_cost);
        println!("Updated ingredient {id}: {iname} (cost/unit: {cost})");
    }
    Ok(())
}

pub(crate) async fn cmd_ingredient_delete(svc: &mut Service, query: &str, json: bool) -> Result<()> {
    let id = svc.session().catalog().resolve_ingredient(query)?.ingredient_id;
    let removed = svc.delete_ingredient(id).await?;
    if json {
        print_json(&removed)?;
    } else {
        let iname = &removed.ingredient_name;
        println!("Deleted ingredient: {iname}");
    }
    Ok(())
}
