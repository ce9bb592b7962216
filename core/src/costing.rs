use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::models::{RecipeIngredient, RecipeSummary, SelectedRecipe};

/// Cost of one base serving of a recipe: Σ cost × quantity over its
/// associations. Ingredients missing from the cost lookup count as free.
#[must_use]
pub fn recipe_cost(
    recipe_id: i64,
    associations: &[RecipeIngredient],
    costs: &HashMap<i64, f64>,
) -> f64 {
    associations
        .iter()
        .filter(|ri| ri.recipe_id == recipe_id)
        .map(|ri| costs.get(&ri.ingredient_id).copied().unwrap_or(0.0) * ri.quantity)
        .sum()
}

/// Cost of everything currently selected, scaled by each entry's servings.
#[must_use]
pub fn selection_cost(
    selection: &[SelectedRecipe],
    associations: &[RecipeIngredient],
    costs: &HashMap<i64, f64>,
) -> f64 {
    selection
        .iter()
        .map(|s| recipe_cost(s.recipe.id, associations, costs) * f64::from(s.effective_servings()))
        .sum()
}

/// Every catalog recipe with its current cost, in catalog order.
#[must_use]
pub fn recipe_summaries(catalog: &Catalog, selection: &[SelectedRecipe]) -> Vec<RecipeSummary> {
    let costs = &catalog.lookups().costs;
    catalog
        .recipes()
        .iter()
        .map(|r| RecipeSummary {
            id: r.id,
            name: r.name.clone(),
            prep_time_minutes: r.prep_time_minutes,
            servings: r.servings,
            ingredient_count: catalog.ingredients_for_recipe(r.id).count(),
            cost: recipe_cost(r.id, catalog.recipe_ingredients(), costs),
            selected: selection.iter().any(|s| s.recipe.id == r.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogPayload, Ingredient, Recipe};

    fn row(recipe_id: i64, ingredient_id: i64, quantity: f64) -> RecipeIngredient {
        RecipeIngredient {
            recipe_id,
            ingredient_id,
            quantity,
            unit: String::new(),
        }
    }

    #[test]
    fn test_recipe_without_associations_costs_zero() {
        let costs = HashMap::from([(1, 2.5)]);
        let associations = vec![row(2, 1, 4.0)];
        assert_eq!(recipe_cost(1, &associations, &costs), 0.0);
        assert_eq!(recipe_cost(1, &[], &costs), 0.0);
    }

    #[test]
    fn test_recipe_cost_ignores_other_recipes() {
        let costs = HashMap::from([(1, 0.5), (2, 3.0)]);
        let associations = vec![row(1, 1, 4.0), row(2, 2, 100.0), row(1, 2, 2.0)];
        // 0.5 * 4 + 3 * 2
        assert!((recipe_cost(1, &associations, &costs) - 8.0).abs() < 1e-9);
        assert!((recipe_cost(2, &associations, &costs) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_recipe_cost_missing_cost_counts_as_zero() {
        let costs = HashMap::from([(1, 1.0)]);
        let associations = vec![row(1, 1, 2.0), row(1, 99, 50.0)];
        assert!((recipe_cost(1, &associations, &costs) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_selection_cost_scales_by_servings() {
        let recipe = Recipe {
            id: 1,
            name: "Soup".to_string(),
            prep_time_minutes: None,
            servings: 2,
        };
        let mut selected = SelectedRecipe::from_recipe(&recipe);
        selected.servings = Some(3);
        let costs = HashMap::from([(1, 0.5)]);
        let associations = vec![row(1, 1, 4.0)];
        assert!((selection_cost(&[selected], &associations, &costs) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_recipe_summaries_reflect_latest_costs() {
        let mut catalog = Catalog::from_payload(CatalogPayload {
            recipes: vec![Recipe {
                id: 1,
                name: "Soup".to_string(),
                prep_time_minutes: None,
                servings: 2,
            }],
            ingredients: vec![Ingredient {
                ingredient_id: 1,
                ingredient_name: "Flour".to_string(),
                cost_per_unit: Some(0.01),
            }],
            recipe_ingredients: vec![row(1, 1, 200.0)],
        });
        let summaries = recipe_summaries(&catalog, &[]);
        assert_eq!(summaries.len(), 1);
        assert!((summaries[0].cost - 2.0).abs() < 1e-9);
        assert_eq!(summaries[0].ingredient_count, 1);
        assert!(!summaries[0].selected);

        catalog
            .edit_ingredient(
                1,
                &crate::models::IngredientEdit {
                    name: None,
                    cost_per_unit: Some(0.02),
                },
            )
            .unwrap();
        let summaries = recipe_summaries(&catalog, &[]);
        assert!((summaries[0].cost - 4.0).abs() < 1e-9);
    }
}
