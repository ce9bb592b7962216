use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use basket_core::error::ShoppingError;
use basket_core::models::{
    CatalogPayload, Ingredient, IngredientEdit, ManualIngredient, NewIngredient, NewRecipe,
    Recipe, RecipeEdit, RecipeIngredient, RecipeSummary, SelectedRecipe, ShoppingEntry,
};
use basket_core::service::{CatalogBackend, ShoppingService};
use basket_core::store::Store;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

struct AppState<B> {
    // Held across backend calls so each request's mutation runs to completion.
    service: Arc<tokio::sync::Mutex<ShoppingService<B>>>,
    store: Arc<Mutex<Store>>,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            store: Arc::clone(&self.store),
        }
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct SelectRequest {
    recipe_id: i64,
    servings: Option<u32>,
}

#[derive(Deserialize)]
struct ServingsRequest {
    servings: u32,
}

#[derive(Deserialize)]
struct AssociationRequest {
    quantity: f64,
    #[serde(default)]
    unit: String,
}

#[derive(Deserialize)]
struct AssociationRow {
    ingredient_id: i64,
    quantity: f64,
    #[serde(default)]
    unit: String,
}

#[derive(Serialize)]
struct ShoppingListResponse {
    shopping_list: Vec<ShoppingEntry>,
    estimated_cost: f64,
}

#[derive(Serialize)]
struct SelectionResponse {
    selection: Vec<SelectedRecipe>,
    estimated_cost: f64,
}

#[derive(Serialize)]
struct RecipeResponse {
    #[serde(flatten)]
    recipe: Recipe,
    ingredients: Vec<RecipeIngredient>,
    cost: f64,
}

#[derive(Serialize)]
struct OutputResponse {
    success: bool,
    items: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::BadGateway(msg) => {
                tracing::warn!(error = %msg, "backend request failed");
                (StatusCode::BAD_GATEWAY, msg)
            }
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<ShoppingError> for ApiError {
    fn from(err: ShoppingError) -> Self {
        let msg = err.to_string();
        match err {
            ShoppingError::Validation(_) => Self::BadRequest(msg),
            ShoppingError::RecipeNotFound(_)
            | ShoppingError::IngredientNotFound(_)
            | ShoppingError::RecipeNotSelected(_) => Self::NotFound(msg),
            ShoppingError::ReferentialIntegrity { .. } => Self::Conflict(msg),
            ShoppingError::Network(_) | ShoppingError::PrintRejected(_) => Self::BadGateway(msg),
        }
    }
}

// --- Middleware ---

async fn require_auth(
    State(api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(ref expected_key) = api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Helpers ---

/// Write the working set back after any change that may have touched it.
fn persist<B: CatalogBackend>(
    state: &AppState<B>,
    svc: &ShoppingService<B>,
) -> Result<(), ApiError> {
    let store = state
        .store
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let session = svc.session();
    store
        .save_working_set(session.selection().entries(), session.manual().entries())
        .context("failed to save working set")?;
    Ok(())
}

fn list_response<B: CatalogBackend>(svc: &ShoppingService<B>) -> Json<ShoppingListResponse> {
    Json(ShoppingListResponse {
        shopping_list: svc.shopping_list(),
        estimated_cost: svc.session().selection_cost(),
    })
}

// --- Catalog ---

async fn get_catalog<B: CatalogBackend>(State(state): State<AppState<B>>) -> Json<CatalogPayload> {
    let svc = state.service.lock().await;
    Json(svc.session().catalog().to_payload())
}

async fn reload_catalog<B: CatalogBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<CatalogPayload>, ApiError> {
    let mut svc = state.service.lock().await;
    svc.reload().await?;
    persist(&state, &svc)?;
    Ok(Json(svc.session().catalog().to_payload()))
}

// --- Recipes ---

async fn list_recipes<B: CatalogBackend>(
    State(state): State<AppState<B>>,
) -> Json<Vec<RecipeSummary>> {
    let svc = state.service.lock().await;
    Json(svc.recipe_summaries())
}

async fn create_recipe<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Json(req): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let mut svc = state.service.lock().await;
    let recipe = svc.add_recipe(&req).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let svc = state.service.lock().await;
    let session = svc.session();
    let catalog = session.catalog();
    let recipe = catalog.recipe(id)?.clone();
    Ok(Json(RecipeResponse {
        ingredients: catalog.ingredients_for_recipe(id).cloned().collect(),
        cost: session.recipe_cost(id)?,
        recipe,
    }))
}

async fn update_recipe<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
    Json(req): Json<RecipeEdit>,
) -> Result<Json<Recipe>, ApiError> {
    if req.name.is_none() && req.prep_time_minutes.is_none() && req.servings.is_none() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }
    let mut svc = state.service.lock().await;
    let recipe = svc.edit_recipe(id, &req).await?;
    persist(&state, &svc)?;
    Ok(Json(recipe))
}

async fn delete_recipe<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let mut svc = state.service.lock().await;
    svc.delete_recipe(id).await?;
    persist(&state, &svc)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_recipe_ingredients<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
    Json(rows): Json<Vec<AssociationRow>>,
) -> Result<Json<Vec<RecipeIngredient>>, ApiError> {
    let rows: Vec<RecipeIngredient> = rows
        .into_iter()
        .map(|r| RecipeIngredient {
            recipe_id: id,
            ingredient_id: r.ingredient_id,
            quantity: r.quantity,
            unit: r.unit,
        })
        .collect();
    let mut svc = state.service.lock().await;
    let replaced = svc.replace_recipe_ingredients(id, &rows).await?;
    Ok(Json(replaced))
}

async fn set_recipe_ingredient<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path((id, ingredient_id)): Path<(i64, i64)>,
    Json(req): Json<AssociationRequest>,
) -> Result<Json<RecipeIngredient>, ApiError> {
    let mut svc = state.service.lock().await;
    let row = svc
        .set_recipe_ingredient(id, ingredient_id, req.quantity, &req.unit)
        .await?;
    Ok(Json(row))
}

async fn remove_recipe_ingredient<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path((id, ingredient_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let mut svc = state.service.lock().await;
    if svc.remove_recipe_ingredient(id, ingredient_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "ingredient {ingredient_id} is not part of recipe {id}"
        )))
    }
}

// --- Ingredients ---

async fn list_ingredients<B: CatalogBackend>(
    State(state): State<AppState<B>>,
) -> Json<Vec<Ingredient>> {
    let svc = state.service.lock().await;
    Json(svc.session().catalog().ingredients().to_vec())
}

async fn create_ingredient<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Json(req): Json<NewIngredient>,
) -> Result<(StatusCode, Json<Ingredient>), ApiError> {
    let mut svc = state.service.lock().await;
    let ingredient = svc.add_ingredient(&req).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

async fn update_ingredient<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
    Json(req): Json<IngredientEdit>,
) -> Result<Json<Ingredient>, ApiError> {
    if req.name.is_none() && req.cost_per_unit.is_none() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }
    let mut svc = state.service.lock().await;
    let ingredient = svc.edit_ingredient(id, &req).await?;
    persist(&state, &svc)?;
    Ok(Json(ingredient))
}

async fn delete_ingredient<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let mut svc = state.service.lock().await;
    svc.delete_ingredient(id).await?;
    persist(&state, &svc)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Selection ---

async fn get_selection<B: CatalogBackend>(
    State(state): State<AppState<B>>,
) -> Json<SelectionResponse> {
    let svc = state.service.lock().await;
    let session = svc.session();
    Json(SelectionResponse {
        selection: session.selection().entries().to_vec(),
        estimated_cost: session.selection_cost(),
    })
}

async fn add_selection<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<ShoppingListResponse>, ApiError> {
    let mut svc = state.service.lock().await;
    svc.select_with_servings(req.recipe_id, req.servings)?;
    persist(&state, &svc)?;
    Ok(list_response(&svc))
}

async fn set_selection_servings<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(recipe_id): Path<i64>,
    Json(req): Json<ServingsRequest>,
) -> Result<Json<ShoppingListResponse>, ApiError> {
    let mut svc = state.service.lock().await;
    svc.set_selection_servings(recipe_id, req.servings)?;
    persist(&state, &svc)?;
    Ok(list_response(&svc))
}

async fn remove_selection<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<ShoppingListResponse>, ApiError> {
    let mut svc = state.service.lock().await;
    if !svc.deselect(recipe_id) {
        return Err(ShoppingError::RecipeNotSelected(recipe_id).into());
    }
    persist(&state, &svc)?;
    Ok(list_response(&svc))
}

// --- Manual ingredients ---

async fn get_manual<B: CatalogBackend>(
    State(state): State<AppState<B>>,
) -> Json<Vec<ManualIngredient>> {
    let svc = state.service.lock().await;
    Json(svc.session().manual().entries().to_vec())
}

async fn add_manual<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(ingredient_id): Path<i64>,
) -> Result<Json<ShoppingListResponse>, ApiError> {
    let mut svc = state.service.lock().await;
    svc.add_manual(ingredient_id)?;
    persist(&state, &svc)?;
    Ok(list_response(&svc))
}

async fn subtract_manual<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(ingredient_id): Path<i64>,
) -> Result<Json<ShoppingListResponse>, ApiError> {
    let mut svc = state.service.lock().await;
    if svc.session().manual().get(ingredient_id).is_none() {
        return Err(ApiError::NotFound(format!(
            "ingredient {ingredient_id} is not on the manual list"
        )));
    }
    svc.subtract_manual(ingredient_id);
    persist(&state, &svc)?;
    Ok(list_response(&svc))
}

async fn remove_manual<B: CatalogBackend>(
    State(state): State<AppState<B>>,
    Path(ingredient_id): Path<i64>,
) -> Result<Json<ShoppingListResponse>, ApiError> {
    let mut svc = state.service.lock().await;
    if !svc.remove_manual(ingredient_id) {
        return Err(ApiError::NotFound(format!(
            "ingredient {ingredient_id} is not on the manual list"
        )));
    }
    persist(&state, &svc)?;
    Ok(list_response(&svc))
}

// --- Shopping list ---

async fn get_shopping_list<B: CatalogBackend>(
    State(state): State<AppState<B>>,
) -> Json<ShoppingListResponse> {
    let svc = state.service.lock().await;
    list_response(&svc)
}

async fn print_shopping_list<B: CatalogBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<OutputResponse>, ApiError> {
    let svc = state.service.lock().await;
    let printed = svc.print().await?;
    Ok(Json(OutputResponse {
        success: true,
        items: printed.len(),
    }))
}

async fn save_shopping_list<B: CatalogBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<OutputResponse>, ApiError> {
    let svc = state.service.lock().await;
    let saved = svc.save().await?;
    Ok(Json(OutputResponse {
        success: true,
        items: saved.len(),
    }))
}

// --- Router ---

fn build_router<B: CatalogBackend + 'static>(
    state: AppState<B>,
    api_key: Option<String>,
) -> Router {
    Router::new()
        .route("/api/catalog", get(get_catalog::<B>))
        .route("/api/catalog/reload", post(reload_catalog::<B>))
        .route(
            "/api/recipes",
            get(list_recipes::<B>).post(create_recipe::<B>),
        )
        .route(
            "/api/recipes/{id}",
            get(get_recipe::<B>)
                .put(update_recipe::<B>)
                .delete(delete_recipe::<B>),
        )
        .route(
            "/api/recipes/{id}/ingredients",
            put(replace_recipe_ingredients::<B>),
        )
        .route(
            "/api/recipes/{id}/ingredients/{ingredient_id}",
            put(set_recipe_ingredient::<B>).delete(remove_recipe_ingredient::<B>),
        )
        .route(
            "/api/ingredients",
            get(list_ingredients::<B>).post(create_ingredient::<B>),
        )
        .route(
            "/api/ingredients/{id}",
            put(update_ingredient::<B>).delete(delete_ingredient::<B>),
        )
        .route(
            "/api/selection",
            get(get_selection::<B>).post(add_selection::<B>),
        )
        .route(
            "/api/selection/{recipe_id}",
            put(set_selection_servings::<B>).delete(remove_selection::<B>),
        )
        .route("/api/manual", get(get_manual::<B>))
        .route(
            "/api/manual/{ingredient_id}",
            post(add_manual::<B>).delete(remove_manual::<B>),
        )
        .route(
            "/api/manual/{ingredient_id}/subtract",
            post(subtract_manual::<B>),
        )
        .route("/api/shopping-list", get(get_shopping_list::<B>))
        .route(
            "/api/shopping-list/print",
            post(print_shopping_list::<B>),
        )
        .route("/api/shopping-list/save", post(save_shopping_list::<B>))
        .route_layer(middleware::from_fn_with_state(api_key, require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of a key, or all stars when it is too short to reveal any.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn start_server<B: CatalogBackend + 'static>(
    service: ShoppingService<B>,
    store: Store,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(tokio::sync::Mutex::new(service)),
        store: Arc::new(Mutex::new(store)),
    };

    if let Some(ref key) = api_key {
        if new_api_key {
            eprintln!("Generated new API key: {key}");
            eprintln!("Include in requests: Authorization: Bearer {key}");
        } else {
            eprintln!(
                "API key: {} (see api_key file in data directory)",
                mask_key(key)
            );
        }
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let app = build_router(state, api_key);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
