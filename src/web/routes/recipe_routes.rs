use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{Query, WithRejection};
use std::sync::Arc;
use validator::Validate;

use crate::db::services::{
    self as db_services, NewRecipe, RecipeChanges, RecipeError, RecipeFilter, RecipeList,
    RelationError,
};
use crate::web::models::{
    CreateRecipeRequest, RecipeQuery, RecipeResponse, RecipeShortResponse, UpdateRecipeRequest,
    Viewer, query_flag,
};
use crate::web::{AppError, AppState, JsonBody};

pub fn recipe_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route("/{id}", get(get_recipe).patch(update_recipe).delete(delete_recipe))
        .route("/{id}/favorite", post(add_favorite).delete(remove_favorite))
        .route("/{id}/shopping_cart", post(add_to_cart).delete(remove_from_cart))
}

async fn list_recipes(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<RecipeQuery>,
) -> Result<Json<Vec<RecipeResponse>>, AppError> {
    let filter = RecipeFilter {
        tags: query.tags,
        author_id: query.author,
        only_favorited: query_flag(query.is_favorited.as_deref()),
        only_in_shopping_cart: query_flag(query.is_in_shopping_cart.as_deref()),
    };
    let recipes = db_services::list_recipes(&app_state.db_pool, viewer.id(), &filter).await?;
    let responses = db_services::recipe_details(&app_state.db_pool, viewer.id(), recipes).await?;
    Ok(Json(responses))
}

async fn create_recipe(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    WithRejection(Json(payload), _): JsonBody<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), AppError> {
    let user = viewer.require()?;
    payload.validate()?;

    let recipe = db_services::create_recipe(
        &app_state.db_pool,
        NewRecipe {
            author_id: user.id,
            name: payload.name,
            image: payload.image,
            text: payload.text,
            cooking_time: payload.cooking_time,
            tags: payload.tags,
            ingredients: payload.ingredients,
        },
    )
    .await?;
    let response = db_services::recipe_detail(&app_state.db_pool, Some(user.id), recipe).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_recipe(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> Result<Json<RecipeResponse>, AppError> {
    let recipe = db_services::get_recipe(&app_state.db_pool, id).await?;
    let response = db_services::recipe_detail(&app_state.db_pool, viewer.id(), recipe).await?;
    Ok(Json(response))
}

async fn update_recipe(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    WithRejection(Json(payload), _): JsonBody<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    let user = viewer.require()?;
    payload.validate()?;

    let changes = RecipeChanges {
        name: payload.name,
        image: payload.image,
        text: payload.text,
        cooking_time: payload.cooking_time,
        tags: payload.tags,
        ingredients: payload.ingredients,
    };
    let recipe = db_services::update_recipe(&app_state.db_pool, id, user.id, changes).await?;
    let response = db_services::recipe_detail(&app_state.db_pool, Some(user.id), recipe).await?;
    Ok(Json(response))
}

async fn delete_recipe(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let user = viewer.require()?;
    db_services::delete_recipe(&app_state.db_pool, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_favorite(
    state: State<Arc<AppState>>,
    viewer: Extension<Viewer>,
    id: Path<i32>,
) -> Result<(StatusCode, Json<RecipeShortResponse>), AppError> {
    add_to_list(state, viewer, id, RecipeList::Favorites).await
}

async fn remove_favorite(
    state: State<Arc<AppState>>,
    viewer: Extension<Viewer>,
    id: Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_from_list(state, viewer, id, RecipeList::Favorites).await
}

async fn add_to_cart(
    state: State<Arc<AppState>>,
    viewer: Extension<Viewer>,
    id: Path<i32>,
) -> Result<(StatusCode, Json<RecipeShortResponse>), AppError> {
    add_to_list(state, viewer, id, RecipeList::ShoppingCart).await
}

async fn remove_from_cart(
    state: State<Arc<AppState>>,
    viewer: Extension<Viewer>,
    id: Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_from_list(state, viewer, id, RecipeList::ShoppingCart).await
}

async fn add_to_list(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    list: RecipeList,
) -> Result<(StatusCode, Json<RecipeShortResponse>), AppError> {
    let user = viewer.require()?;
    let recipe = db_services::add_to_recipe_list(&app_state.db_pool, list, user.id, id).await?;
    Ok((StatusCode::CREATED, Json(RecipeShortResponse::from(&recipe))))
}

async fn remove_from_list(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    list: RecipeList,
) -> Result<StatusCode, AppError> {
    let user = viewer.require()?;
    db_services::remove_from_recipe_list(&app_state.db_pool, list, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_shopping_cart(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, AppError> {
    let user = viewer.require()?;
    let items = db_services::shopping_list_for_user(&app_state.db_pool, user.id).await?;
    let body = db_services::render_shopping_list(&items);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"shopping_list.txt\""),
        ],
        body,
    ))
}

impl From<RecipeError> for AppError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::DbErr(e) => AppError::DatabaseError(e.to_string()),
            RecipeError::NotFound(id) => AppError::NotFound(format!("Recipe with ID {id} not found")),
            RecipeError::Forbidden => {
                AppError::Forbidden("You do not have permission to perform this action.".to_string())
            }
            RecipeError::UnknownTags(ids) => AppError::field("tags", format!("Unknown tag ids: {ids:?}")),
            RecipeError::UnknownIngredients(ids) => {
                AppError::field("ingredients", format!("Unknown ingredient ids: {ids:?}"))
            }
        }
    }
}

impl From<RelationError> for AppError {
    fn from(err: RelationError) -> Self {
        match err {
            RelationError::DbErr(e) => AppError::DatabaseError(e.to_string()),
            RelationError::RecipeNotFound(id) => AppError::NotFound(format!("Recipe with ID {id} not found")),
            RelationError::UserNotFound(id) => AppError::NotFound(format!("User with ID {id} not found")),
            RelationError::AlreadyExists(msg) => AppError::Conflict(msg.to_string()),
            RelationError::NotFound(msg) => AppError::NotFound(msg.to_string()),
            RelationError::SelfSubscription => AppError::InvalidInput("You cannot subscribe to yourself.".to_string()),
        }
    }
}
