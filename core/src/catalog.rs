use std::collections::HashMap;

use crate::error::ShoppingError;
use crate::models::{
    CatalogPayload, Ingredient, IngredientEdit, NewIngredient, NewRecipe, Recipe, RecipeEdit,
    RecipeIngredient, validate_cost, validate_name, validate_quantity, validate_servings,
};

/// id → display name and id → cost maps derived from the ingredient list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lookups {
    pub names: HashMap<i64, String>,
    pub costs: HashMap<i64, f64>,
}

impl Lookups {
    #[must_use]
    pub fn rebuild(ingredients: &[Ingredient]) -> Self {
        let mut names = HashMap::with_capacity(ingredients.len());
        let mut costs = HashMap::with_capacity(ingredients.len());
        for ing in ingredients {
            names.insert(ing.ingredient_id, ing.ingredient_name.clone());
            costs.insert(ing.ingredient_id, ing.cost());
        }
        Self { names, costs }
    }
}

/// Recipes, ingredients and their associations, with lookups kept in step
/// with the ingredient list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    recipes: Vec<Recipe>,
    ingredients: Vec<Ingredient>,
    recipe_ingredients: Vec<RecipeIngredient>,
    lookups: Lookups,
}

impl Catalog {
    #[must_use]
    pub fn from_payload(payload: CatalogPayload) -> Self {
        let lookups = Lookups::rebuild(&payload.ingredients);
        Self {
            recipes: payload.recipes,
            ingredients: payload.ingredients,
            recipe_ingredients: payload.recipe_ingredients,
            lookups,
        }
    }

    #[must_use]
    pub fn to_payload(&self) -> CatalogPayload {
        CatalogPayload {
            recipes: self.recipes.clone(),
            ingredients: self.ingredients.clone(),
            recipe_ingredients: self.recipe_ingredients.clone(),
        }
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn recipe_ingredients(&self) -> &[RecipeIngredient] {
        &self.recipe_ingredients
    }

    pub fn lookups(&self) -> &Lookups {
        &self.lookups
    }

    fn rebuild_lookups(&mut self) {
        self.lookups = Lookups::rebuild(&self.ingredients);
    }

    // --- Lookups by id ---

    pub fn recipe(&self, id: i64) -> Result<&Recipe, ShoppingError> {
        self.recipes
            .iter()
            .find(|r| r.id == id)
            .ok_or(ShoppingError::RecipeNotFound(id))
    }

    pub fn ingredient(&self, id: i64) -> Result<&Ingredient, ShoppingError> {
        self.ingredients
            .iter()
            .find(|i| i.ingredient_id == id)
            .ok_or(ShoppingError::IngredientNotFound(id))
    }

    /// Associations of one recipe, in stored order.
    pub fn ingredients_for_recipe(&self, recipe_id: i64) -> impl Iterator<Item = &RecipeIngredient> {
        self.recipe_ingredients
            .iter()
            .filter(move |ri| ri.recipe_id == recipe_id)
    }

    /// Recipe ids that reference an ingredient, deduplicated in stored order.
    #[must_use]
    pub fn recipes_using(&self, ingredient_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for ri in &self.recipe_ingredients {
            if ri.ingredient_id == ingredient_id && !ids.contains(&ri.recipe_id) {
                ids.push(ri.recipe_id);
            }
        }
        ids
    }

    // --- Closed selection ---

    /// Resolve user input to a known ingredient: an id, or an exact
    /// case-insensitive display name that matches exactly one ingredient.
    pub fn resolve_ingredient(&self, query: &str) -> Result<&Ingredient, ShoppingError> {
        let query = query.trim();
        if let Ok(id) = query.parse::<i64>() {
            if let Ok(ing) = self.ingredient(id) {
                return Ok(ing);
            }
        }
        let matches: Vec<&Ingredient> = self
            .ingredients
            .iter()
            .filter(|i| i.ingredient_name.eq_ignore_ascii_case(query))
            .collect();
        match matches.as_slice() {
            [one] => Ok(*one),
            [] => Err(ShoppingError::Validation(format!(
                "No ingredient named '{query}'"
            ))),
            many => {
                let ids = many
                    .iter()
                    .map(|i| i.ingredient_id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ShoppingError::Validation(format!(
                    "Ingredient name '{query}' is ambiguous (ids {ids}); use an id"
                )))
            }
        }
    }

    pub fn resolve_recipe(&self, query: &str) -> Result<&Recipe, ShoppingError> {
        let query = query.trim();
        if let Ok(id) = query.parse::<i64>() {
            if let Ok(recipe) = self.recipe(id) {
                return Ok(recipe);
            }
        }
        let matches: Vec<&Recipe> = self
            .recipes
            .iter()
            .filter(|r| r.name.eq_ignore_ascii_case(query))
            .collect();
        match matches.as_slice() {
            [one] => Ok(*one),
            [] => Err(ShoppingError::Validation(format!(
                "No recipe named '{query}'"
            ))),
            _ => Err(ShoppingError::Validation(format!(
                "Recipe name '{query}' is ambiguous; use an id"
            ))),
        }
    }

    // --- Ingredients ---

    pub fn add_ingredient(&mut self, draft: &NewIngredient) -> Result<Ingredient, ShoppingError> {
        let name = validate_name("Ingredient", &draft.name)?;
        let cost_per_unit = validate_cost(draft.cost_per_unit)?;
        let ingredient_id = self
            .ingredients
            .iter()
            .map(|i| i.ingredient_id)
            .max()
            .map_or(1, |max| max + 1);
        let ingredient = Ingredient {
            ingredient_id,
            ingredient_name: name,
            cost_per_unit,
        };
        self.ingredients.push(ingredient.clone());
        self.rebuild_lookups();
        Ok(ingredient)
    }

    pub fn edit_ingredient(
        &mut self,
        id: i64,
        edit: &IngredientEdit,
    ) -> Result<Ingredient, ShoppingError> {
        let name = edit
            .name
            .as_deref()
            .map(|n| validate_name("Ingredient", n))
            .transpose()?;
        let cost = validate_cost(edit.cost_per_unit)?;

        let ingredient = self
            .ingredients
            .iter_mut()
            .find(|i| i.ingredient_id == id)
            .ok_or(ShoppingError::IngredientNotFound(id))?;
        if let Some(name) = name {
            ingredient.ingredient_name = name;
        }
        if let Some(cost) = cost {
            ingredient.cost_per_unit = Some(cost);
        }
        let updated = ingredient.clone();
        self.rebuild_lookups();
        Ok(updated)
    }

    /// Remove an ingredient. Refuses while any association still references it.
    pub fn delete_ingredient(&mut self, id: i64) -> Result<Ingredient, ShoppingError> {
        let position = self
            .ingredients
            .iter()
            .position(|i| i.ingredient_id == id)
            .ok_or(ShoppingError::IngredientNotFound(id))?;
        let recipe_ids = self.recipes_using(id);
        if !recipe_ids.is_empty() {
            return Err(ShoppingError::ReferentialIntegrity {
                ingredient_id: id,
                recipe_ids,
            });
        }
        let removed = self.ingredients.remove(position);
        self.rebuild_lookups();
        Ok(removed)
    }

    // --- Recipes ---

    pub fn add_recipe(&mut self, draft: &NewRecipe) -> Result<Recipe, ShoppingError> {
        let name = validate_name("Recipe", &draft.name)?;
        let servings = validate_servings(draft.servings)?;
        let id = self
            .recipes
            .iter()
            .map(|r| r.id)
            .max()
            .map_or(1, |max| max + 1);
        let recipe = Recipe {
            id,
            name,
            prep_time_minutes: draft.prep_time_minutes,
            servings,
        };
        self.recipes.push(recipe.clone());
        Ok(recipe)
    }

    pub fn edit_recipe(&mut self, id: i64, edit: &RecipeEdit) -> Result<Recipe, ShoppingError> {
        let name = edit
            .name
            .as_deref()
            .map(|n| validate_name("Recipe", n))
            .transpose()?;
        let servings = edit.servings.map(validate_servings).transpose()?;

        let recipe = self
            .recipes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(ShoppingError::RecipeNotFound(id))?;
        if let Some(name) = name {
            recipe.name = name;
        }
        if let Some(prep) = edit.prep_time_minutes {
            recipe.prep_time_minutes = Some(prep);
        }
        if let Some(servings) = servings {
            recipe.servings = servings;
        }
        Ok(recipe.clone())
    }

    /// Remove a recipe together with all of its associations.
    pub fn delete_recipe(&mut self, id: i64) -> Result<Recipe, ShoppingError> {
        let position = self
            .recipes
            .iter()
            .position(|r| r.id == id)
            .ok_or(ShoppingError::RecipeNotFound(id))?;
        let removed = self.recipes.remove(position);
        self.recipe_ingredients.retain(|ri| ri.recipe_id != id);
        Ok(removed)
    }

    // --- Associations ---

    /// Insert or update the association between a recipe and an ingredient.
    pub fn set_recipe_ingredient(
        &mut self,
        recipe_id: i64,
        ingredient_id: i64,
        quantity: f64,
        unit: &str,
    ) -> Result<RecipeIngredient, ShoppingError> {
        self.recipe(recipe_id)?;
        self.ingredient(ingredient_id)?;
        let quantity = validate_quantity(quantity)?;
        let unit = unit.trim().to_string();

        if let Some(existing) = self
            .recipe_ingredients
            .iter_mut()
            .find(|ri| ri.recipe_id == recipe_id && ri.ingredient_id == ingredient_id)
        {
            existing.quantity = quantity;
            existing.unit = unit;
            return Ok(existing.clone());
        }

        let row = RecipeIngredient {
            recipe_id,
            ingredient_id,
            quantity,
            unit,
        };
        self.recipe_ingredients.push(row.clone());
        Ok(row)
    }

    pub fn remove_recipe_ingredient(
        &mut self,
        recipe_id: i64,
        ingredient_id: i64,
    ) -> Result<bool, ShoppingError> {
        self.recipe(recipe_id)?;
        let before = self.recipe_ingredients.len();
        self.recipe_ingredients
            .retain(|ri| !(ri.recipe_id == recipe_id && ri.ingredient_id == ingredient_id));
        Ok(self.recipe_ingredients.len() < before)
    }

    /// Replace every association of one recipe. Rows are validated as a whole
    /// before anything changes.
    pub fn replace_recipe_ingredients(
        &mut self,
        recipe_id: i64,
        rows: &[RecipeIngredient],
    ) -> Result<Vec<RecipeIngredient>, ShoppingError> {
        self.recipe(recipe_id)?;
        let mut replacement = Vec::with_capacity(rows.len());
        for row in rows {
            self.ingredient(row.ingredient_id)?;
            replacement.push(RecipeIngredient {
                recipe_id,
                ingredient_id: row.ingredient_id,
                quantity: validate_quantity(row.quantity)?,
                unit: row.unit.trim().to_string(),
            });
        }
        self.recipe_ingredients.retain(|ri| ri.recipe_id != recipe_id);
        self.recipe_ingredients.extend(replacement.iter().cloned());
        Ok(replacement)
    }
}
