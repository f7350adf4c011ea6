use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;
use validator::Validate;

use crate::db::services::{self as db_services, is_unique_violation};
use crate::web::models::{CreateTagRequest, TagResponse, Viewer};
use crate::web::{AppError, AppState, JsonBody};

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tags_handler).post(create_tag_handler))
        .route("/{id}", get(get_tag_handler))
}

async fn list_tags_handler(State(app_state): State<Arc<AppState>>) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = db_services::list_tags(&app_state.db_pool).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

async fn get_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<TagResponse>, AppError> {
    let tag = db_services::get_tag(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tag with ID {id} not found")))?;
    Ok(Json(tag.into()))
}

async fn create_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    WithRejection(Json(payload), _): JsonBody<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), AppError> {
    viewer.require()?;
    payload.validate()?;

    let tag = db_services::create_tag(
        &app_state.db_pool,
        &payload.name,
        payload.color.as_deref(),
        payload.slug.as_deref(),
    )
    .await
    .map_err(|db_err| {
        if is_unique_violation(&db_err) {
            AppError::Conflict("A tag with this name or slug already exists.".to_string())
        } else {
            db_err.into()
        }
    })?;

    Ok((StatusCode::CREATED, Json(tag.into())))
}
