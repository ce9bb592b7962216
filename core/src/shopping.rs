use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ShoppingError;
use crate::models::{
    ManualIngredient, Recipe, RecipeIngredient, SelectedRecipe, ShoppingEntry, Source,
    validate_servings,
};

/// Recipes being shopped for, in the order they were selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(Vec<SelectedRecipe>);

impl Selection {
    #[must_use]
    pub fn new(entries: Vec<SelectedRecipe>) -> Self {
        let mut selection = Self::default();
        for entry in entries {
            if !selection.contains(entry.recipe.id) {
                selection.0.push(entry);
            }
        }
        selection
    }

    pub fn entries(&self) -> &[SelectedRecipe] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, recipe_id: i64) -> bool {
        self.0.iter().any(|s| s.recipe.id == recipe_id)
    }

    pub fn get(&self, recipe_id: i64) -> Option<&SelectedRecipe> {
        self.0.iter().find(|s| s.recipe.id == recipe_id)
    }

    /// Add a recipe with its current default servings. Returns false when it
    /// was already selected (nothing changes).
    pub fn select(&mut self, recipe: &Recipe) -> bool {
        if self.contains(recipe.id) {
            return false;
        }
        self.0.push(SelectedRecipe::from_recipe(recipe));
        true
    }

    pub fn deselect(&mut self, recipe_id: i64) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s.recipe.id != recipe_id);
        self.0.len() < before
    }

    /// Change the servings override of one selected recipe. The catalog
    /// recipe's default is never touched.
    pub fn set_servings(&mut self, recipe_id: i64, servings: u32) -> Result<(), ShoppingError> {
        let servings = validate_servings(servings)?;
        let entry = self
            .0
            .iter_mut()
            .find(|s| s.recipe.id == recipe_id)
            .ok_or(ShoppingError::RecipeNotSelected(recipe_id))?;
        entry.servings = Some(servings);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&SelectedRecipe) -> bool) {
        self.0.retain(keep);
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut SelectedRecipe> {
        self.0.iter_mut()
    }
}

/// Ingredients added to the list by hand, outside any recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualList(Vec<ManualIngredient>);

impl ManualList {
    /// Build from stored entries, dropping any with a non-positive quantity.
    #[must_use]
    pub fn new(entries: Vec<ManualIngredient>) -> Self {
        Self(entries.into_iter().filter(|m| m.quantity > 0.0).collect())
    }

    pub fn entries(&self) -> &[ManualIngredient] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, ingredient_id: i64) -> Option<&ManualIngredient> {
        self.0.iter().find(|m| m.id == ingredient_id)
    }

    /// Increment the entry for an ingredient, creating it at 1.
    pub fn add(&mut self, ingredient_id: i64, name: &str) -> f64 {
        if let Some(entry) = self.0.iter_mut().find(|m| m.id == ingredient_id) {
            entry.quantity += 1.0;
            return entry.quantity;
        }
        self.0.push(ManualIngredient {
            id: ingredient_id,
            name: name.to_string(),
            quantity: 1.0,
        });
        1.0
    }

    /// Decrement by one, removing the entry once it reaches zero. Returns the
    /// remaining quantity, or `None` if no entry is left.
    pub fn subtract(&mut self, ingredient_id: i64) -> Option<f64> {
        let position = self.0.iter().position(|m| m.id == ingredient_id)?;
        self.0[position].quantity -= 1.0;
        if self.0[position].quantity <= 0.0 {
            self.0.remove(position);
            return None;
        }
        Some(self.0[position].quantity)
    }

    pub fn remove(&mut self, ingredient_id: i64) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m.id != ingredient_id);
        self.0.len() < before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&ManualIngredient) -> bool) {
        self.0.retain(keep);
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut ManualIngredient> {
        self.0.iter_mut()
    }
}

/// Merge recipe-derived and manual quantities into one list keyed by
/// ingredient display name.
///
/// Entries come out in first-seen order: selected recipes in selection order
/// (each recipe's associations in stored order), then manual entries. Two
/// ingredient ids that share a display name collapse into a single entry; the
/// recorded `ingredient_id` is the first contributor's.
#[must_use]
pub fn compute_shopping_list(
    selection: &[SelectedRecipe],
    associations: &[RecipeIngredient],
    names: &HashMap<i64, String>,
    manual: &[ManualIngredient],
) -> Vec<ShoppingEntry> {
    let mut entries: Vec<ShoppingEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let mut merge = |name: String, ingredient_id: i64, quantity: f64, source: Source| {
        if let Some(&i) = index.get(&name) {
            let entry = &mut entries[i];
            entry.quantity += quantity;
            entry.source = Source::Mixed;
        } else {
            index.insert(name.clone(), entries.len());
            entries.push(ShoppingEntry {
                ingredient: name,
                quantity,
                source,
                ingredient_id,
            });
        }
    };

    for selected in selection {
        let servings = f64::from(selected.effective_servings());
        for ri in associations
            .iter()
            .filter(|ri| ri.recipe_id == selected.recipe.id)
        {
            let name = names.get(&ri.ingredient_id).cloned().unwrap_or_else(|| {
                tracing::warn!(
                    recipe_id = ri.recipe_id,
                    ingredient_id = ri.ingredient_id,
                    "association references an ingredient missing from the catalog"
                );
                format!("ingredient #{}", ri.ingredient_id)
            });
            merge(name, ri.ingredient_id, ri.quantity * servings, Source::Recipe);
        }
    }

    for m in manual {
        merge(m.name.clone(), m.id, m.quantity, Source::Manual);
    }

    entries
}
