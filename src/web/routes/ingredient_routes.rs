use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;
use validator::Validate;

use crate::db::services as db_services;
use crate::web::models::{CreateIngredientRequest, IngredientQuery, IngredientResponse, Viewer};
use crate::web::{AppError, AppState, JsonBody};

pub fn create_ingredients_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_ingredients_handler).post(create_ingredient_handler))
        .route("/{id}", get(get_ingredient_handler))
}

async fn list_ingredients_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<IngredientResponse>>, AppError> {
    let ingredients = db_services::list_ingredients(&app_state.db_pool, query.name.as_deref()).await?;
    Ok(Json(ingredients.into_iter().map(IngredientResponse::from).collect()))
}

async fn get_ingredient_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<IngredientResponse>, AppError> {
    let ingredient = db_services::get_ingredient(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ingredient with ID {id} not found")))?;
    Ok(Json(ingredient.into()))
}

async fn create_ingredient_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    WithRejection(Json(payload), _): JsonBody<CreateIngredientRequest>,
) -> Result<(StatusCode, Json<IngredientResponse>), AppError> {
    viewer.require()?;
    payload.validate()?;
    let ingredient =
        db_services::create_ingredient(&app_state.db_pool, &payload.name, &payload.measurement_unit).await?;
    Ok((StatusCode::CREATED, Json(ingredient.into())))
}
