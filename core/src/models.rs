use serde::{Deserialize, Serialize};

use crate::error::ShoppingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
}

impl Ingredient {
    /// Cost per unit, treating a missing cost as free.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost_per_unit.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    #[serde(default, alias = "prep_time", skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(default = "default_servings")]
    pub servings: u32,
}

fn default_servings() -> u32 {
    1
}

/// One row of the recipe ↔ ingredient association. `quantity` is per base serving;
/// `unit` is a display label only and never takes part in arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientEdit {
    pub name: Option<String>,
    pub cost_per_unit: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    #[serde(default)]
    pub prep_time_minutes: Option<u32>,
    #[serde(default = "default_servings")]
    pub servings: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeEdit {
    pub name: Option<String>,
    pub prep_time_minutes: Option<u32>,
    pub servings: Option<u32>,
}

/// A recipe the user is shopping for. The captured record keeps the default
/// servings from selection time; `servings` is the user's override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRecipe {
    pub recipe: Recipe,
    #[serde(default)]
    pub servings: Option<u32>,
}

impl SelectedRecipe {
    #[must_use]
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            recipe: recipe.clone(),
            servings: Some(recipe.servings),
        }
    }

    /// Servings multiplier used by the shopping list (1 when unset).
    #[must_use]
    pub fn effective_servings(&self) -> u32 {
        self.servings.unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualIngredient {
    pub id: i64,
    pub name: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Recipe,
    Manual,
    Mixed,
}

impl Source {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recipe => "Recipe",
            Self::Manual => "Manual",
            Self::Mixed => "Mixed",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingEntry {
    pub ingredient: String,
    pub quantity: f64,
    pub source: Source,
    #[serde(rename = "ingredientId")]
    pub ingredient_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    pub servings: u32,
    pub ingredient_count: usize,
    pub cost: f64,
    pub selected: bool,
}

// --- Backend wire shapes ---

/// Body of the catalog load endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPayload {
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub recipe_ingredients: Vec<RecipeIngredient>,
}

/// Replaces the associations of a single recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientsUpdate {
    pub recipe_id: i64,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintRequest<'a> {
    pub shopping_list: &'a [ShoppingEntry],
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

// --- Validation ---

pub fn validate_name(kind: &str, name: &str) -> Result<String, ShoppingError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ShoppingError::Validation(format!("{kind} name must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub fn validate_cost(cost: Option<f64>) -> Result<Option<f64>, ShoppingError> {
    match cost {
        Some(c) if !c.is_finite() || c < 0.0 => Err(ShoppingError::Validation(format!(
            "cost_per_unit must be a non-negative number, got {c}"
        ))),
        other => Ok(other),
    }
}

pub fn validate_servings(servings: u32) -> Result<u32, ShoppingError> {
    if servings == 0 {
        return Err(ShoppingError::Validation(
            "servings must be at least 1".to_string(),
        ));
    }
    Ok(servings)
}

pub fn validate_quantity(quantity: f64) -> Result<f64, ShoppingError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(ShoppingError::Validation(format!(
            "quantity must be greater than 0, got {quantity}"
        )));
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_missing_cost_defaults_to_zero() {
        let json = r#"{"ingredient_id": 3, "ingredient_name": "Flour"}"#;
        let ing: Ingredient = serde_json::from_str(json).unwrap();
        assert_eq!(ing.cost_per_unit, None);
        assert_eq!(ing.cost(), 0.0);

        let json = r#"{"ingredient_id": 3, "ingredient_name": "Flour", "cost_per_unit": null}"#;
        let ing: Ingredient = serde_json::from_str(json).unwrap();
        assert_eq!(ing.cost(), 0.0);
    }

    #[test]
    fn test_recipe_defaults() {
        let recipe: Recipe = serde_json::from_str(r#"{"id": 1, "name": "Soup"}"#).unwrap();
        assert_eq!(recipe.servings, 1);
        assert!(recipe.prep_time_minutes.is_none());

        let recipe: Recipe =
            serde_json::from_str(r#"{"id": 1, "name": "Soup", "prep_time": 20, "servings": 4}"#)
                .unwrap();
        assert_eq!(recipe.prep_time_minutes, Some(20));
        assert_eq!(recipe.servings, 4);
    }

    #[test]
    fn test_catalog_payload_tolerates_missing_sections() {
        let payload: CatalogPayload = serde_json::from_str(r#"{"recipes": []}"#).unwrap();
        assert!(payload.ingredients.is_empty());
        assert!(payload.recipe_ingredients.is_empty());
    }

    #[test]
    fn test_shopping_entry_wire_shape() {
        let entry = ShoppingEntry {
            ingredient: "Salt".to_string(),
            quantity: 8.0,
            source: Source::Mixed,
            ingredient_id: 1,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["ingredient"], "Salt");
        assert_eq!(value["source"], "Mixed");
        assert_eq!(value["ingredientId"], 1);
    }

    #[test]
    fn test_print_response_without_error() {
        let resp: PrintResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(resp.success);
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_selected_recipe_effective_servings() {
        let recipe = Recipe {
            id: 1,
            name: "Soup".to_string(),
            prep_time_minutes: None,
            servings: 2,
        };
        let mut selected = SelectedRecipe::from_recipe(&recipe);
        assert_eq!(selected.effective_servings(), 2);
        selected.servings = None;
        assert_eq!(selected.effective_servings(), 1);
    }

    #[test]
    fn test_validate_cost() {
        assert!(validate_cost(None).is_ok());
        assert!(validate_cost(Some(0.0)).is_ok());
        assert!(validate_cost(Some(-0.5)).is_err());
        assert!(validate_cost(Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_validate_quantity_and_servings() {
        assert!(validate_quantity(0.5).is_ok());
        assert!(validate_quantity(0.0).is_err());
        assert!(validate_quantity(-2.0).is_err());
        assert!(validate_servings(1).is_ok());
        assert!(validate_servings(0).is_err());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("Recipe", "  Soup ").unwrap(), "Soup");
        assert!(validate_name("Recipe", "   ").is_err());
    }
}
