use std::future::Future;

use anyhow::Result;

use crate::catalog::Catalog;
use crate::error::ShoppingError;
use crate::models::{
    CatalogPayload, Ingredient, IngredientEdit, ManualIngredient, NewIngredient, NewRecipe,
    PrintResponse, Recipe, RecipeEdit, RecipeIngredient, RecipeIngredientsUpdate, RecipeSummary,
    SelectedRecipe, ShoppingEntry,
};
use crate::session::Session;

/// The remote service that owns the catalog and handles printing.
///
/// The CLI implements this over HTTP with reqwest; tests use in-memory fakes.
pub trait CatalogBackend: Send + Sync {
    fn load_catalog(&self) -> impl Future<Output = Result<CatalogPayload>> + Send;
    fn update_recipes(&self, recipes: &[Recipe]) -> impl Future<Output = Result<()>> + Send;
    fn replace_recipe_ingredients(
        &self,
        update: &RecipeIngredientsUpdate,
    ) -> impl Future<Output = Result<()>> + Send;
    fn update_ingredients(
        &self,
        ingredients: &[Ingredient],
    ) -> impl Future<Output = Result<()>> + Send;
    fn print_shopping_list(
        &self,
        list: &[ShoppingEntry],
    ) -> impl Future<Output = Result<PrintResponse>> + Send;
    fn save_shopping_list(&self, list: &[ShoppingEntry])
    -> impl Future<Output = Result<()>> + Send;
}

/// An ingredient line read from an external recipe source.
#[derive(Debug, Clone)]
pub struct ImportedIngredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportOutcome {
    pub recipe: Recipe,
    pub created_ingredients: Vec<Ingredient>,
    pub rows: Vec<RecipeIngredient>,
}

/// Applies user actions to a [`Session`], keeping the backend in step.
///
/// Catalog changes are made on a draft copy and only committed once the
/// backend has accepted them, so a failed request leaves the session as it
/// was. Selection and manual-list changes are local to the session.
pub struct ShoppingService<B> {
    backend: B,
    session: Session,
}

impl<B: CatalogBackend> ShoppingService<B> {
    /// Load the catalog from the backend and start an empty working set.
    pub async fn connect(backend: B) -> Result<Self, ShoppingError> {
        let payload = backend
            .load_catalog()
            .await
            .map_err(|e| ShoppingError::network(&e))?;
        tracing::debug!(
            recipes = payload.recipes.len(),
            ingredients = payload.ingredients.len(),
            associations = payload.recipe_ingredients.len(),
            "catalog loaded"
        );
        Ok(Self {
            backend,
            session: Session::new(Catalog::from_payload(payload)),
        })
    }

    pub fn with_session(backend: B, session: Session) -> Self {
        Self { backend, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Re-read the catalog, keeping the working set where it still applies.
    pub async fn reload(&mut self) -> Result<(), ShoppingError> {
        let payload = self
            .backend
            .load_catalog()
            .await
            .map_err(|e| ShoppingError::network(&e))?;
        self.session.replace_catalog(Catalog::from_payload(payload));
        Ok(())
    }

    pub fn restore(&mut self, selection: Vec<SelectedRecipe>, manual: Vec<ManualIngredient>) {
        self.session.restore(selection, manual);
    }

    // --- Backend pushes ---

    async fn push_ingredients(&self, draft: &Catalog) -> Result<(), ShoppingError> {
        self.backend
            .update_ingredients(draft.ingredients())
            .await
            .map_err(|e| ShoppingError::network(&e))
    }

    async fn push_recipes(&self, draft: &Catalog) -> Result<(), ShoppingError> {
        self.backend
            .update_recipes(draft.recipes())
            .await
            .map_err(|e| ShoppingError::network(&e))
    }

    async fn push_associations(&self, draft: &Catalog, recipe_id: i64) -> Result<(), ShoppingError> {
        let update = RecipeIngredientsUpdate {
            recipe_id,
            ingredients: draft.ingredients_for_recipe(recipe_id).cloned().collect(),
        };
        self.backend
            .replace_recipe_ingredients(&update)
            .await
            .map_err(|e| ShoppingError::network(&e))
    }

    fn commit(&mut self, draft: Catalog) {
        self.session.replace_catalog(draft);
    }

    // --- Ingredients ---

    pub async fn add_ingredient(
        &mut self,
        new: &NewIngredient,
    ) -> Result<Ingredient, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        let ingredient = draft.add_ingredient(new)?;
        self.push_ingredients(&draft).await?;
        self.commit(draft);
        tracing::info!(id = ingredient.ingredient_id, name = %ingredient.ingredient_name, "ingredient added");
        Ok(ingredient)
    }

    pub async fn edit_ingredient(
        &mut self,
        id: i64,
        edit: &IngredientEdit,
    ) -> Result<Ingredient, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        let ingredient = draft.edit_ingredient(id, edit)?;
        self.push_ingredients(&draft).await?;
        self.commit(draft);
        tracing::info!(id, "ingredient updated");
        Ok(ingredient)
    }

    /// Delete an ingredient no recipe uses. Manual entries for it are dropped.
    pub async fn delete_ingredient(&mut self, id: i64) -> Result<Ingredient, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        let removed = draft.delete_ingredient(id)?;
        self.push_ingredients(&draft).await?;
        self.commit(draft);
        tracing::info!(id, "ingredient deleted");
        Ok(removed)
    }

    // --- Recipes ---

    pub async fn add_recipe(&mut self, new: &NewRecipe) -> Result<Recipe, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        let recipe = draft.add_recipe(new)?;
        self.push_recipes(&draft).await?;
        self.commit(draft);
        tracing::info!(id = recipe.id, name = %recipe.name, "recipe added");
        Ok(recipe)
    }

    pub async fn edit_recipe(&mut self, id: i64, edit: &RecipeEdit) -> Result<Recipe, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        let recipe = draft.edit_recipe(id, edit)?;
        self.push_recipes(&draft).await?;
        self.commit(draft);
        tracing::info!(id, "recipe updated");
        Ok(recipe)
    }

    /// Delete a recipe, its associations and its selection entry.
    pub async fn delete_recipe(&mut self, id: i64) -> Result<Recipe, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        let removed = draft.delete_recipe(id)?;
        self.push_associations(&draft, id).await?;
        if let Err(e) = self.push_recipes(&draft).await {
            tracing::warn!(id, "recipe associations cleared remotely but recipe delete failed");
            return Err(e);
        }
        self.commit(draft);
        tracing::info!(id, "recipe deleted");
        Ok(removed)
    }

    // --- Associations ---

    pub async fn set_recipe_ingredient(
        &mut self,
        recipe_id: i64,
        ingredient_id: i64,
        quantity: f64,
        unit: &str,
    ) -> Result<RecipeIngredient, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        let row = draft.set_recipe_ingredient(recipe_id, ingredient_id, quantity, unit)?;
        self.push_associations(&draft, recipe_id).await?;
        self.commit(draft);
        Ok(row)
    }

    pub async fn remove_recipe_ingredient(
        &mut self,
        recipe_id: i64,
        ingredient_id: i64,
    ) -> Result<bool, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        if !draft.remove_recipe_ingredient(recipe_id, ingredient_id)? {
            return Ok(false);
        }
        self.push_associations(&draft, recipe_id).await?;
        self.commit(draft);
        Ok(true)
    }

    pub async fn replace_recipe_ingredients(
        &mut self,
        recipe_id: i64,
        rows: &[RecipeIngredient],
    ) -> Result<Vec<RecipeIngredient>, ShoppingError> {
        let mut draft = self.session.catalog().clone();
        let replaced = draft.replace_recipe_ingredients(recipe_id, rows)?;
        self.push_associations(&draft, recipe_id).await?;
        self.commit(draft);
        Ok(replaced)
    }

    /// Create a recipe from imported lines. Ingredients are matched by
    /// display name; unknown names become new, cost-less ingredients.
    pub async fn import_recipe(
        &mut self,
        new: &NewRecipe,
        lines: &[ImportedIngredient],
    ) -> Result<ImportOutcome, ShoppingError> {
        if lines.is_empty() {
            return Err(ShoppingError::Validation(
                "No ingredients found in recipe".to_string(),
            ));
        }

        let mut draft = self.session.catalog().clone();
        let mut created = Vec::new();
        // (ingredient id, summed quantity, unit of the first line)
        let mut resolved: Vec<(i64, f64, &str)> = Vec::with_capacity(lines.len());
        for line in lines {
            let existing = draft
                .ingredients()
                .iter()
                .find(|i| i.ingredient_name.eq_ignore_ascii_case(line.name.trim()))
                .map(|i| i.ingredient_id);
            let id = if let Some(id) = existing {
                id
            } else {
                let ingredient = draft.add_ingredient(&NewIngredient {
                    name: line.name.clone(),
                    cost_per_unit: None,
                })?;
                let id = ingredient.ingredient_id;
                created.push(ingredient);
                id
            };
            match resolved.iter_mut().find(|(seen, _, _)| *seen == id) {
                Some((_, quantity, _)) => *quantity += line.quantity,
                None => resolved.push((id, line.quantity, &line.unit)),
            }
        }

        let recipe = draft.add_recipe(new)?;
        for &(ingredient_id, quantity, unit) in &resolved {
            draft.set_recipe_ingredient(recipe.id, ingredient_id, quantity, unit)?;
        }

        if !created.is_empty() {
            self.push_ingredients(&draft).await?;
        }
        self.push_recipes(&draft).await?;
        self.push_associations(&draft, recipe.id).await?;

        let rows = draft.ingredients_for_recipe(recipe.id).cloned().collect();
        self.commit(draft);
        tracing::info!(id = recipe.id, created = created.len(), "recipe imported");
        Ok(ImportOutcome {
            recipe,
            created_ingredients: created,
            rows,
        })
    }

    // --- Selection and manual entries ---

    pub fn select(&mut self, recipe_id: i64) -> Result<bool, ShoppingError> {
        self.session.select(recipe_id)
    }

    /// Select a recipe and immediately set its servings override.
    pub fn select_with_servings(
        &mut self,
        recipe_id: i64,
        servings: Option<u32>,
    ) -> Result<bool, ShoppingError> {
        if let Some(servings) = servings {
            crate::models::validate_servings(servings)?;
        }
        let added = self.session.select(recipe_id)?;
        if let Some(servings) = servings {
            self.session.set_selection_servings(recipe_id, servings)?;
        }
        Ok(added)
    }

    pub fn deselect(&mut self, recipe_id: i64) -> bool {
        self.session.deselect(recipe_id)
    }

    pub fn set_selection_servings(
        &mut self,
        recipe_id: i64,
        servings: u32,
    ) -> Result<(), ShoppingError> {
        self.session.set_selection_servings(recipe_id, servings)
    }

    pub fn add_manual(&mut self, ingredient_id: i64) -> Result<f64, ShoppingError> {
        self.session.add_manual(ingredient_id)
    }

    pub fn subtract_manual(&mut self, ingredient_id: i64) -> Option<f64> {
        self.session.subtract_manual(ingredient_id)
    }

    pub fn remove_manual(&mut self, ingredient_id: i64) -> bool {
        self.session.remove_manual(ingredient_id)
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
    }

    pub fn clear_manual(&mut self) {
        self.session.clear_manual();
    }

    // --- Derived views ---

    #[must_use]
    pub fn shopping_list(&self) -> Vec<ShoppingEntry> {
        self.session.shopping_list()
    }

    #[must_use]
    pub fn recipe_summaries(&self) -> Vec<RecipeSummary> {
        self.session.recipe_summaries()
    }

    // --- Output ---

    /// Send the current shopping list to the backend printer.
    pub async fn print(&self) -> Result<Vec<ShoppingEntry>, ShoppingError> {
        let list = self.session.shopping_list();
        if list.is_empty() {
            return Err(ShoppingError::Validation(
                "Shopping list is empty; nothing to print".to_string(),
            ));
        }
        let response = self
            .backend
            .print_shopping_list(&list)
            .await
            .map_err(|e| ShoppingError::network(&e))?;
        if !response.success {
            return Err(ShoppingError::PrintRejected(
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        tracing::info!(entries = list.len(), "shopping list printed");
        Ok(list)
    }

    /// Store the current shopping list on the backend.
    pub async fn save(&self) -> Result<Vec<ShoppingEntry>, ShoppingError> {
        let list = self.session.shopping_list();
        self.backend
            .save_shopping_list(&list)
            .await
            .map_err(|e| ShoppingError::network(&e))?;
        tracing::info!(entries = list.len(), "shopping list saved");
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Recipes(usize),
        Associations(i64, usize),
        Ingredients(usize),
        Print(usize),
        Save(usize),
    }

    #[derive(Default)]
    struct FakeBackend {
        payload: CatalogPayload,
        fail: AtomicBool,
        fail_recipes: AtomicBool,
        reject_print: AtomicBool,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeBackend {
        fn record(&self, call: Call) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("backend returned 500 Internal Server Error");
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CatalogBackend for FakeBackend {
        async fn load_catalog(&self) -> Result<CatalogPayload> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("connection refused");
            }
            Ok(self.payload.clone())
        }

        async fn update_recipes(&self, recipes: &[Recipe]) -> Result<()> {
            if self.fail_recipes.load(Ordering::SeqCst) {
                anyhow::bail!("backend returned 503 Service Unavailable");
            }
            self.record(Call::Recipes(recipes.len()))
        }

        async fn replace_recipe_ingredients(&self, update: &RecipeIngredientsUpdate) -> Result<()> {
            self.record(Call::Associations(update.recipe_id, update.ingredients.len()))
        }

        async fn update_ingredients(&self, ingredients: &[Ingredient]) -> Result<()> {
            self.record(Call::Ingredients(ingredients.len()))
        }

        async fn print_shopping_list(&self, list: &[ShoppingEntry]) -> Result<PrintResponse> {
            self.record(Call::Print(list.len()))?;
            if self.reject_print.load(Ordering::SeqCst) {
                return Ok(PrintResponse {
                    success: false,
                    error: Some("Printer not found".to_string()),
                });
            }
            Ok(PrintResponse {
                success: true,
                error: None,
            })
        }

        async fn save_shopping_list(&self, list: &[ShoppingEntry]) -> Result<()> {
            self.record(Call::Save(list.len()))
        }
    }

    fn payload() -> CatalogPayload {
        CatalogPayload {
            recipes: vec![Recipe {
                id: 1,
                name: "Pancakes".to_string(),
                prep_time_minutes: Some(20),
                servings: 2,
            }],
            ingredients: vec![
                Ingredient {
                    ingredient_id: 1,
                    ingredient_name: "Flour".to_string(),
                    cost_per_unit: Some(0.002),
                },
                Ingredient {
                    ingredient_id: 2,
                    ingredient_name: "Milk".to_string(),
                    cost_per_unit: Some(0.001),
                },
                Ingredient {
                    ingredient_id: 3,
                    ingredient_name: "Jam".to_string(),
                    cost_per_unit: Some(3.5),
                },
            ],
            recipe_ingredients: vec![
                RecipeIngredient {
                    recipe_id: 1,
                    ingredient_id: 1,
                    quantity: 100.0,
                    unit: "g".to_string(),
                },
                RecipeIngredient {
                    recipe_id: 1,
                    ingredient_id: 2,
                    quantity: 150.0,
                    unit: "ml".to_string(),
                },
            ],
        }
    }

    async fn service() -> ShoppingService<FakeBackend> {
        ShoppingService::connect(FakeBackend {
            payload: payload(),
            ..FakeBackend::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_connect_failure_is_network_error() {
        let backend = FakeBackend::default();
        backend.fail.store(true, Ordering::SeqCst);
        let result = ShoppingService::connect(backend).await;
        assert!(matches!(result, Err(ShoppingError::Network(_))));
    }

    #[tokio::test]
    async fn test_add_ingredient_pushes_full_list() {
        let mut svc = service().await;
        let ing = svc
            .add_ingredient(&NewIngredient {
                name: "Butter".to_string(),
                cost_per_unit: Some(0.01),
            })
            .await
            .unwrap();
        assert_eq!(ing.ingredient_id, 4);
        assert_eq!(svc.backend().calls(), vec![Call::Ingredients(4)]);
        assert!(svc.session().catalog().ingredient(4).is_ok());
    }

    #[tokio::test]
    async fn test_failed_push_leaves_session_unchanged() {
        let mut svc = service().await;
        svc.select(1).unwrap();
        svc.add_manual(3).unwrap();
        let before = svc.session().clone();

        svc.backend().fail.store(true, Ordering::SeqCst);
        let err = svc
            .edit_ingredient(
                1,
                &IngredientEdit {
                    name: None,
                    cost_per_unit: Some(1.0),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShoppingError::Network(_)));
        assert!(svc.delete_recipe(1).await.is_err());
        assert!(svc.delete_ingredient(3).await.is_err());
        assert_eq!(svc.session(), &before);
    }

    #[tokio::test]
    async fn test_delete_referenced_ingredient_never_hits_backend() {
        let mut svc = service().await;
        let err = svc.delete_ingredient(1).await.unwrap_err();
        assert!(matches!(err, ShoppingError::ReferentialIntegrity { .. }));
        assert!(svc.backend().calls().is_empty());
        assert_eq!(svc.session().catalog().ingredients().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_ingredient_prunes_manual_entry() {
        let mut svc = service().await;
        svc.add_manual(3).unwrap();
        svc.delete_ingredient(3).await.unwrap();
        assert!(svc.session().manual().is_empty());
        assert!(svc.shopping_list().is_empty());
    }

    #[tokio::test]
    async fn test_delete_recipe_cascades() {
        let mut svc = service().await;
        svc.select(1).unwrap();
        svc.delete_recipe(1).await.unwrap();
        assert_eq!(
            svc.backend().calls(),
            vec![Call::Associations(1, 0), Call::Recipes(0)]
        );
        assert!(svc.session().selection().is_empty());
        assert!(svc.session().catalog().recipe_ingredients().is_empty());
        // Ingredients formerly used by the recipe can now be deleted.
        svc.delete_ingredient(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_recipe_keeps_session_when_recipe_push_fails() {
        let mut svc = service().await;
        svc.select(1).unwrap();
        let before = svc.session().clone();
        svc.backend().fail_recipes.store(true, Ordering::SeqCst);

        let result = svc.delete_recipe(1).await;
        assert!(matches!(result, Err(ShoppingError::Network(_))));
        // Associations went out before the recipe list was refused.
        assert_eq!(svc.backend().calls(), vec![Call::Associations(1, 0)]);
        assert_eq!(svc.session(), &before);
        assert_eq!(svc.shopping_list().len(), 2);
    }

    #[tokio::test]
    async fn test_edit_recipe_refreshes_selection_but_keeps_override() {
        let mut svc = service().await;
        svc.select_with_servings(1, Some(5)).unwrap();
        svc.edit_recipe(
            1,
            &RecipeEdit {
                name: Some("Crepes".to_string()),
                prep_time_minutes: None,
                servings: Some(4),
            },
        )
        .await
        .unwrap();
        let entry = svc.session().selection().get(1).unwrap();
        assert_eq!(entry.recipe.name, "Crepes");
        assert_eq!(entry.recipe.servings, 4);
        assert_eq!(entry.servings, Some(5));
    }

    #[tokio::test]
    async fn test_set_recipe_ingredient_pushes_recipe_rows() {
        let mut svc = service().await;
        svc.set_recipe_ingredient(1, 3, 1.0, "tbsp").await.unwrap();
        assert_eq!(svc.backend().calls(), vec![Call::Associations(1, 3)]);

        assert!(svc.remove_recipe_ingredient(1, 3).await.unwrap());
        assert!(!svc.remove_recipe_ingredient(1, 3).await.unwrap());
        assert_eq!(svc.backend().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_import_recipe_creates_missing_ingredients() {
        let mut svc = service().await;
        let outcome = svc
            .import_recipe(
                &NewRecipe {
                    name: "Jam Pancakes".to_string(),
                    prep_time_minutes: None,
                    servings: 2,
                },
                &[
                    ImportedIngredient {
                        name: "flour".to_string(),
                        quantity: 120.0,
                        unit: "g".to_string(),
                    },
                    ImportedIngredient {
                        name: "Sugar".to_string(),
                        quantity: 2.0,
                        unit: "tbsp".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcome.recipe.id, 2);
        assert_eq!(outcome.created_ingredients.len(), 1);
        assert_eq!(outcome.created_ingredients[0].ingredient_name, "Sugar");
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].ingredient_id, 1);
        assert_eq!(
            svc.backend().calls(),
            vec![
                Call::Ingredients(4),
                Call::Recipes(2),
                Call::Associations(2, 2)
            ]
        );
    }

    #[tokio::test]
    async fn test_import_recipe_sums_repeated_ingredient() {
        let mut svc = service().await;
        let outcome = svc
            .import_recipe(
                &NewRecipe {
                    name: "Double Crust".to_string(),
                    prep_time_minutes: None,
                    servings: 1,
                },
                &[
                    ImportedIngredient {
                        name: "Flour".to_string(),
                        quantity: 200.0,
                        unit: "g".to_string(),
                    },
                    ImportedIngredient {
                        name: "Butter".to_string(),
                        quantity: 50.0,
                        unit: "g".to_string(),
                    },
                    ImportedIngredient {
                        name: "flour".to_string(),
                        quantity: 30.0,
                        unit: "g".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcome.created_ingredients.len(), 1);
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].ingredient_id, 1);
        assert!((outcome.rows[0].quantity - 230.0).abs() < 1e-9);
        assert_eq!(outcome.rows[0].unit, "g");
        assert!((outcome.rows[1].quantity - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_import_recipe_requires_lines() {
        let mut svc = service().await;
        let err = svc
            .import_recipe(
                &NewRecipe {
                    name: "Air".to_string(),
                    prep_time_minutes: None,
                    servings: 1,
                },
                &[],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShoppingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_print_sends_current_list() {
        let mut svc = service().await;
        svc.select(1).unwrap();
        svc.add_manual(3).unwrap();
        let printed = svc.print().await.unwrap();
        assert_eq!(printed.len(), 3);
        assert_eq!(printed[2].source, Source::Manual);
        assert_eq!(svc.backend().calls(), vec![Call::Print(3)]);
    }

    #[tokio::test]
    async fn test_print_rejected_and_empty() {
        let mut svc = service().await;
        assert!(matches!(
            svc.print().await,
            Err(ShoppingError::Validation(_))
        ));

        svc.add_manual(3).unwrap();
        svc.backend().reject_print.store(true, Ordering::SeqCst);
        match svc.print().await {
            Err(ShoppingError::PrintRejected(msg)) => assert_eq!(msg, "Printer not found"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_sends_list() {
        let mut svc = service().await;
        svc.select(1).unwrap();
        svc.save().await.unwrap();
        assert_eq!(svc.backend().calls(), vec![Call::Save(2)]);
    }

    #[tokio::test]
    async fn test_reload_keeps_working_set() {
        let mut svc = service().await;
        svc.select_with_servings(1, Some(3)).unwrap();
        svc.add_manual(2).unwrap();
        svc.reload().await.unwrap();
        assert_eq!(svc.session().selection().get(1).unwrap().servings, Some(3));
        assert_eq!(svc.session().manual().entries().len(), 1);
    }
}
