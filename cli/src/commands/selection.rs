use anyhow::Result;
use std::process;

use basket_core::receipt::format_quantity;

use super::Service;
use super::helpers::{json_error, print_json, print_shopping_table};

/// Show the list that results from the last change.
fn render(svc: &Service, json: bool) -> Result<()> {
    let list = svc.shopping_list();
    if json {
        return print_json(&list);
    }
    if list.is_empty() {
        println!("Shopping list is empty");
    } else {
        print_shopping_table(&list);
    }
    Ok(())
}

fn not_found(msg: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(msg));
    } else {
        eprintln!("{msg}");
    }
    process::exit(2);
}

pub(crate) fn cmd_select(
    svc: &mut Service,
    query: &str,
    servings: Option<u32>,
    json: bool,
) -> Result<()> {
    let recipe = svc.session().catalog().resolve_recipe(query)?;
    let (id, name) = (recipe.id, recipe.name.clone());
    let added = svc.select_with_servings(id, servings)?;
    if !json {
        if added {
            println!("Selected {name}");
        } else if servings.is_some() {
            println!("{name} was already selected; servings updated");
        } else {
            println!("{name} is already selected");
        }
    }
    render(svc, json)
}

pub(crate) fn cmd_deselect(svc: &mut Service, query: &str, json: bool) -> Result<()> {
    let recipe = svc.session().catalog().resolve_recipe(query)?;
    let (id, name) = (recipe.id, recipe.name.clone());
    if !svc.deselect(id) {
        not_found(&format!("{name} is not selected"), json);
    }
    if !json {
        println!("Deselected {name}");
    }
    render(svc, json)
}

pub(crate) fn cmd_servings(svc: &mut Service, query: &str, servings: u32, json: bool) -> Result<()> {
    let recipe = svc.session().catalog().resolve_recipe(query)?;
    let (id, name) = (recipe.id, recipe.name.clone());
    svc.set_selection_servings(id, servings)?;
    if !json {
        println!("{name}: {servings} serving(s)");
    }
    render(svc, json)
}

pub(crate) fn cmd_manual_add(svc: &mut Service, query: &str, json: bool) -> Result<()> {
    let ingredient = svc.session().catalog().resolve_ingredient(query)?;
    let id = ingredient.ingredient_id;
    let quantity = svc.add_manual(id)?;
    if !json {
        let name = &svc.session().catalog().ingredient(id)?.ingredient_name;
        println!("{name}: {} (manual)", format_quantity(quantity));
    }
    render(svc, json)
}

pub(crate) fn cmd_manual_sub(svc: &mut Service, query: &str, json: bool) -> Result<()> {
    let ingredient = svc.session().catalog().resolve_ingredient(query)?;
    let (id, name) = (ingredient.ingredient_id, ingredient.ingredient_name.clone());
    if svc.session().manual().get(id).is_none() {
        not_found(&format!("{name} is not on the manual list"), json);
    }
    let remaining = svc.subtract_manual(id);
    if !json {
        match remaining {
            Some(q) => println!("{name}: {} (manual)", format_quantity(q)),
            None => println!("Removed {name} from the manual list"),
        }
    }
    render(svc, json)
}

pub(crate) fn cmd_manual_remove(svc: &mut Service, query: &str, json: bool) -> Result<()> {
    let ingredient = svc.session().catalog().resolve_ingredient(query)?;
    let (id, name) = (ingredient.ingredient_id, ingredient.ingredient_name.clone());
    if !svc.remove_manual(id) {
        not_found(&format!("{name} is not on the manual list"), json);
    }
    if !json {
        println!("Removed {name} from the manual list");
    }
    render(svc, json)
}

pub(crate) fn cmd_clear(
    svc: &mut Service,
    manual_only: bool,
    selection_only: bool,
    json: bool,
) -> Result<()> {
    if !manual_only {
        svc.clear_selection();
    }
    if !selection_only {
        svc.clear_manual();
    }
    if !json {
        match (manual_only, selection_only) {
            (true, _) => println!("Cleared manual ingredients"),
            (_, true) => println!("Cleared recipe selection"),
            _ => println!("Cleared selection and manual ingredients"),
        }
    }
    render(svc, json)
}
