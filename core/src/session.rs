use crate::catalog::Catalog;
use crate::costing;
use crate::error::ShoppingError;
use crate::models::{ManualIngredient, RecipeSummary, SelectedRecipe, ShoppingEntry};
use crate::shopping::{ManualList, Selection, compute_shopping_list};

/// The working set of one user session: the loaded catalog plus what is being
/// shopped for. Derived views are computed from it on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    catalog: Catalog,
    selection: Selection,
    manual: ManualList,
}

impl Session {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            selection: Selection::default(),
            manual: ManualList::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn manual(&self) -> &ManualList {
        &self.manual
    }

    /// Swap in a new catalog and bring the working set in line with it:
    /// selections of vanished recipes and manual entries of vanished
    /// ingredients are dropped, surviving selections get a fresh copy of the
    /// recipe record (their servings override is kept), and manual entries
    /// pick up renamed ingredients.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        self.reconcile();
    }

    /// Restore a previously saved working set against the current catalog.
    pub fn restore(&mut self, selection: Vec<SelectedRecipe>, manual: Vec<ManualIngredient>) {
        self.selection = Selection::new(selection);
        self.manual = ManualList::new(manual);
        self.reconcile();
    }

    fn reconcile(&mut self) {
        let catalog = &self.catalog;

        let before = self.selection.len();
        self.selection
            .retain(|s| catalog.recipe(s.recipe.id).is_ok());
        let dropped = before - self.selection.len();
        if dropped > 0 {
            tracing::info!(dropped, "dropped selections of recipes no longer in the catalog");
        }
        for entry in self.selection.entries_mut() {
            if let Ok(recipe) = catalog.recipe(entry.recipe.id) {
                entry.recipe = recipe.clone();
            }
        }

        self.manual.retain(|m| catalog.ingredient(m.id).is_ok());
        for entry in self.manual.entries_mut() {
            if let Some(name) = catalog.lookups().names.get(&entry.id) {
                entry.name.clone_from(name);
            }
        }
    }

    // --- Selection ---

    /// Select a catalog recipe. Returns false if it was already selected.
    pub fn select(&mut self, recipe_id: i64) -> Result<bool, ShoppingError> {
        let recipe = self.catalog.recipe(recipe_id)?;
        Ok(self.selection.select(recipe))
    }

    pub fn deselect(&mut self, recipe_id: i64) -> bool {
        self.selection.deselect(recipe_id)
    }

    pub fn set_selection_servings(
        &mut self,
        recipe_id: i64,
        servings: u32,
    ) -> Result<(), ShoppingError> {
        self.selection.set_servings(recipe_id, servings)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // --- Manual entries ---

    /// Add one unit of a catalog ingredient to the manual list.
    pub fn add_manual(&mut self, ingredient_id: i64) -> Result<f64, ShoppingError> {
        let ingredient = self.catalog.ingredient(ingredient_id)?;
        Ok(self
            .manual
            .add(ingredient.ingredient_id, &ingredient.ingredient_name))
    }

    pub fn subtract_manual(&mut self, ingredient_id: i64) -> Option<f64> {
        self.manual.subtract(ingredient_id)
    }

    pub fn remove_manual(&mut self, ingredient_id: i64) -> bool {
        self.manual.remove(ingredient_id)
    }

    pub fn clear_manual(&mut self) {
        self.manual.clear();
    }

    // --- Derived views ---

    #[must_use]
    pub fn shopping_list(&self) -> Vec<ShoppingEntry> {
        compute_shopping_list(
            self.selection.entries(),
            self.catalog.recipe_ingredients(),
            &self.catalog.lookups().names,
            self.manual.entries(),
        )
    }

    pub fn recipe_cost(&self, recipe_id: i64) -> Result<f64, ShoppingError> {
        self.catalog.recipe(recipe_id)?;
        Ok(costing::recipe_cost(
            recipe_id,
            self.catalog.recipe_ingredients(),
            &self.catalog.lookups().costs,
        ))
    }

    #[must_use]
    pub fn recipe_summaries(&self) -> Vec<RecipeSummary> {
        costing::recipe_summaries(&self.catalog, self.selection.entries())
    }

    #[must_use]
    pub fn selection_cost(&self) -> f64 {
        costing::selection_cost(
            self.selection.entries(),
            self.catalog.recipe_ingredients(),
            &self.catalog.lookups().costs,
        )
    }
}
