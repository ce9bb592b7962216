use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use basket_core::models::{
    CatalogPayload, Ingredient, PrintRequest, PrintResponse, Recipe, RecipeIngredientsUpdate,
    ShoppingEntry,
};
use basket_core::service::CatalogBackend;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Talks to the catalog/print service over its JSON endpoints.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "basket-cli/{} (shopping list)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach backend at {url}"))?
            .error_for_status()
            .with_context(|| format!("Backend rejected GET {path}"))?;
        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {path}"))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach backend at {url}"))?
            .error_for_status()
            .with_context(|| format!("Backend rejected POST {path}"))
    }
}

impl CatalogBackend for HttpBackend {
    async fn load_catalog(&self) -> Result<CatalogPayload> {
        self.get_json("/shopping/load").await
    }

    async fn update_recipes(&self, recipes: &[Recipe]) -> Result<()> {
        self.post("/shopping/recipes/update", recipes).await?;
        Ok(())
    }

    async fn replace_recipe_ingredients(&self, update: &RecipeIngredientsUpdate) -> Result<()> {
        self.post("/shopping/recipes/update", update).await?;
        Ok(())
    }

    async fn update_ingredients(&self, ingredients: &[Ingredient]) -> Result<()> {
        self.post("/shopping/ingredients/update", ingredients)
            .await?;
        Ok(())
    }

    async fn print_shopping_list(&self, list: &[ShoppingEntry]) -> Result<PrintResponse> {
        let resp = self
            .post("/shopping/print", &PrintRequest { shopping_list: list })
            .await?;
        resp.json()
            .await
            .context("Failed to parse print response")
    }

    async fn save_shopping_list(&self, list: &[ShoppingEntry]) -> Result<()> {
        self.post("/shopping/save", list).await?;
        Ok(())
    }
}
