use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShoppingError {
    #[error("backend request failed: {0}")]
    Network(String),
    #[error("print rejected by backend: {0}")]
    PrintRejected(String),
    #[error("ingredient {ingredient_id} is still used by recipe(s) {}", join_ids(.recipe_ids))]
    ReferentialIntegrity {
        ingredient_id: i64,
        recipe_ids: Vec<i64>,
    },
    #[error("{0}")]
    Validation(String),
    #[error("recipe {0} not found")]
    RecipeNotFound(i64),
    #[error("ingredient {0} not found")]
    IngredientNotFound(i64),
    #[error("recipe {0} is not selected")]
    RecipeNotSelected(i64),
}

impl ShoppingError {
    /// Wrap a backend failure, keeping the full context chain in the message.
    pub fn network(err: &anyhow::Error) -> Self {
        Self::Network(format!("{err:#}"))
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
