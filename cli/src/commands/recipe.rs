use anyhow::{Context, Result};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use basket_core::models::{NewRecipe, RecipeEdit};
use basket_core::receipt::format_quantity;
use basket_core::service::ImportedIngredient;

use super::Service;
use super::helpers::{format_cost, json_error, print_json, truncate};

pub(crate) fn cmd_recipe_list(svc: &Service, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Prep")]
        prep: String,
        #[tabled(rename = "Servings")]
        servings: u32,
        #[tabled(rename = "Items")]
        items: usize,
        #[tabled(rename = "Cost/serving")]
        cost: String,
        #[tabled(rename = "Selected")]
        selected: String,
    }

    let summaries = svc.recipe_summaries();
    if summaries.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes in the catalog");
        }
        process::exit(2);
    }

    if json {
        return print_json(&summaries);
    }

    let rows: Vec<RecipeRow> = summaries
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            name: truncate(&r.name, 30),
            prep: r
                .prep_time_minutes
                .map_or_else(|| "-".to_string(), |m| format!("{m} min")),
            servings: r.servings,
            items: r.ingredient_count,
            cost: format_cost(r.cost),
            selected: if r.selected { "yes".into() } else { String::new() },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

#[derive(Serialize)]
struct RecipeLine {
    ingredient_id: i64,
    ingredient: String,
    quantity: f64,
    unit: String,
    cost: f64,
}

#[derive(Serialize)]
struct RecipeDetail<'a> {
    #[serde(flatten)]
    recipe: &'a basket_core::models::Recipe,
    ingredients: Vec<RecipeLine>,
    cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_servings: Option<u32>,
}

pub(crate) fn cmd_recipe_show(svc: &Service, query: &str, json: bool) -> Result<()> {
    let session = svc.session();
    let catalog = session.catalog();
    let recipe = catalog.resolve_recipe(query)?;
    let lookups = catalog.lookups();

    let ingredients: Vec<RecipeLine> = catalog
        .ingredients_for_recipe(recipe.id)
        .map(|ri| RecipeLine {
            ingredient_id: ri.ingredient_id,
            ingredient: lookups
                .names
                .get(&ri.ingredient_id)
                .cloned()
                .unwrap_or_else(|| format!("ingredient #{}", ri.ingredient_id)),
            quantity: ri.quantity,
            unit: ri.unit.clone(),
            cost: lookups.costs.get(&ri.ingredient_id).copied().unwrap_or(0.0) * ri.quantity,
        })
        .collect();

    let detail = RecipeDetail {
        recipe,
        cost: session.recipe_cost(recipe.id)?,
        selected_servings: session
            .selection()
            .get(recipe.id)
            .map(basket_core::models::SelectedRecipe::effective_servings),
        ingredients,
    };

    if json {
        return print_json(&detail);
    }

    let name = &recipe.name;
    let servings = recipe.servings;
    println!("=== {name} ===");
    match recipe.prep_time_minutes {
        Some(m) => println!("  Servings: {servings}  |  Prep: {m} min"),
        None => println!("  Servings: {servings}"),
    }
    if let Some(n) = detail.selected_servings {
        println!("  Selected for {n} serving(s)");
    }

    println!("\n  INGREDIENTS (per serving):");
    if detail.ingredients.is_empty() {
        println!("    (none)");
    }
    for line in &detail.ingredients {
        let qty = format_quantity(line.quantity);
        let unit = &line.unit;
        let iname = &line.ingredient;
        let cost = format_cost(line.cost);
        println!("    {iname}: {qty} {unit}  ({cost})");
    }
    println!("\n  COST PER SERVING: {}", format_cost(detail.cost));
    Ok(())
}

pub(crate) async fn cmd_recipe_add(
    svc: &mut Service,
    name: &str,
    prep_time_minutes: Option<u32>,
    servings: u32,
    json: bool,
) -> Result<()> {
    let recipe = svc
        .add_recipe(&NewRecipe {
            name: name.to_string(),
            prep_time_minutes,
            servings,
        })
        .await?;
    if json {
        print_json(&recipe)?;
    } else {
        let id = recipe.id;
        let rname = &recipe.name;
        println!("Created recipe: {rname} (id: {id}, servings: {servings})");
        println!("Add ingredients with: basket recipe set-ingredient \"{rname}\" <ingredient> <quantity>");
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_edit(
    svc: &mut Service,
    query: &str,
    edit: RecipeEdit,
    json: bool,
) -> Result<()> {
    if edit.name.is_none() && edit.prep_time_minutes.is_none() && edit.servings.is_none() {
        anyhow::bail!("Nothing to change. Pass --name, --prep-time or --servings");
    }
    let id = svc.session().catalog().resolve_recipe(query)?.id;
    let recipe = svc.edit_recipe(id, &edit).await?;
    if json {
        print_json(&recipe)?;
    } else {
        let rname = &recipe.name;
        println!("Updated recipe {id}: {rname}");
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_delete(svc: &mut Service, query: &str, json: bool) -> Result<()> {
    let id = svc.session().catalog().resolve_recipe(query)?.id;
    let removed = svc.delete_recipe(id).await?;
    if json {
        print_json(&removed)?;
    } else {
        let rname = &removed.name;
        println!("Deleted recipe: {rname}");
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_set_ingredient(
    svc: &mut Service,
    recipe_query: &str,
    ingredient_query: &str,
    quantity: f64,
    unit: &str,
    json: bool,
) -> Result<()> {
    let catalog = svc.session().catalog();
    let recipe = catalog.resolve_recipe(recipe_query)?;
    let ingredient = catalog.resolve_ingredient(ingredient_query)?;
    let (recipe_id, recipe_name) = (recipe.id, recipe.name.clone());
    let (ingredient_id, ingredient_name) =
        (ingredient.ingredient_id, ingredient.ingredient_name.clone());

    let row = svc
        .set_recipe_ingredient(recipe_id, ingredient_id, quantity, unit)
        .await?;
    if json {
        print_json(&row)?;
    } else {
        let qty = format_quantity(row.quantity);
        let unit = &row.unit;
        println!("{recipe_name}: {ingredient_name} set to {qty} {unit} per serving");
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_remove_ingredient(
    svc: &mut Service,
    recipe_query: &str,
    ingredient_query: &str,
    json: bool,
) -> Result<()> {
    let catalog = svc.session().catalog();
    let recipe = catalog.resolve_recipe(recipe_query)?;
    let ingredient = catalog.resolve_ingredient(ingredient_query)?;
    let (recipe_id, recipe_name) = (recipe.id, recipe.name.clone());
    let (ingredient_id, ingredient_name) =
        (ingredient.ingredient_id, ingredient.ingredient_name.clone());

    if svc.remove_recipe_ingredient(recipe_id, ingredient_id).await? {
        if json {
            println!(
                "{}",
                serde_json::json!({ "recipe_id": recipe_id, "removed": ingredient_id })
            );
        } else {
            println!("Removed {ingredient_name} from {recipe_name}");
        }
    } else {
        let msg = format!("'{ingredient_name}' is not an ingredient of '{recipe_name}'");
        if json {
            println!("{}", json_error(&msg));
        } else {
            eprintln!("{msg}");
        }
        process::exit(2);
    }
    Ok(())
}

/// A Cooklang file reduced to what the catalog can hold.
#[derive(Debug)]
pub(crate) struct ParsedRecipe {
    pub name: Option<String>,
    pub servings: Option<u32>,
    pub ingredients: Vec<ImportedIngredient>,
}

pub(crate) fn parse_cooklang(input: &str) -> Result<ParsedRecipe> {
    let (recipe_data, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let name = recipe_data.metadata.title().map(String::from);
    let servings = recipe_data
        .metadata
        .servings()
        .and_then(|s| s.as_number().map(u32::from));

    let converter = cooklang::Converter::default();
    let grouped = recipe_data.group_ingredients(&converter);
    let ingredients = grouped.iter().map(cooklang_line).collect();

    Ok(ParsedRecipe {
        name,
        servings,
        ingredients,
    })
}

impl ParsedRecipe {
    /// Scale whole-recipe amounts down to one serving. `batch` is the number
    /// of servings the file's amounts make.
    pub(crate) fn per_serving(&self, batch: u32) -> Vec<ImportedIngredient> {
        let batch = f64::from(batch.max(1));
        self.ingredients
            .iter()
            .map(|line| ImportedIngredient {
                quantity: line.quantity / batch,
                ..line.clone()
            })
            .collect()
    }
}

fn cooklang_line(gi: &cooklang::ingredient_list::GroupedIngredient<'_>) -> ImportedIngredient {
    // First quantity only; ranges use their start and text amounts count as one.
    let (quantity, unit) =
        gi.quantity
            .iter()
            .next()
            .map_or((1.0, String::new()), |qty: &cooklang::Quantity| {
                let value = match qty.value() {
                    cooklang::Value::Number(n) => n.value(),
                    cooklang::Value::Range { start, .. } => start.value(),
                    cooklang::Value::Text(t) => t.trim().parse::<f64>().unwrap_or(1.0),
                };
                let unit = qty.unit().map(String::from).unwrap_or_default();
                (value, unit)
            });

    ImportedIngredient {
        name: gi.ingredient.display_name().to_string(),
        quantity: if quantity.is_finite() && quantity > 0.0 {
            quantity
        } else {
            1.0
        },
        unit,
    }
}

pub(crate) async fn cmd_recipe_import(
    svc: &mut Service,
    file: &std::path::Path,
    name_override: Option<String>,
    servings_override: Option<u32>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let parsed = parse_cooklang(&input)?;

    let name = name_override
        .or(parsed.name.clone())
        .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
        .context("Could not determine recipe name. Use --name to specify one")?;
    let servings = servings_override.or(parsed.servings).unwrap_or(1);
    // Amounts in the file are for the servings it declares, not the override.
    let lines = parsed.per_serving(parsed.servings.or(servings_override).unwrap_or(1));

    let outcome = svc
        .import_recipe(
            &NewRecipe {
                name,
                prep_time_minutes: None,
                servings,
            },
            &lines,
        )
        .await?;

    if json {
        return print_json(&outcome);
    }

    let rname = &outcome.recipe.name;
    let count = outcome.rows.len();
    println!("Imported recipe: {rname} ({count} ingredients, {servings} servings)");
    if !outcome.created_ingredients.is_empty() {
        eprintln!("New ingredients added to the catalog (no cost set):");
        for ing in &outcome.created_ingredients {
            let iname = &ing.ingredient_name;
            eprintln!("  {iname}");
        }
    }
    Ok(())
}
