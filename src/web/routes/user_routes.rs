use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;
use validator::Validate;

use crate::db::services as db_services;
use crate::services::auth_service;
use crate::web::models::{
    RegisterRequest, SetPasswordRequest, SubscriptionQuery, SubscriptionResponse, UserResponse,
    Viewer,
};
use crate::web::{AppError, AppState, JsonBody};

pub fn create_user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(register_user))
        .route("/me", get(me))
        .route("/set_password", post(set_password))
        .route("/subscriptions", get(list_subscriptions))
        .route("/{id}", get(get_user))
        .route("/{id}/subscribe", post(subscribe).delete(unsubscribe))
}

async fn register_user(
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.validate()?;
    let user = auth_service::register_user(&app_state.db_pool, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = db_services::list_users(&app_state.db_pool).await?;
    let responses = db_services::user_responses(&app_state.db_pool, viewer.id(), users).await?;
    Ok(Json(responses))
}

async fn get_user(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let user = db_services::get_user_by_id(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with ID {id} not found")))?;
    let response = db_services::user_response(&app_state.db_pool, viewer.id(), user).await?;
    Ok(Json(response))
}

async fn me(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<UserResponse>, AppError> {
    let auth_user = viewer.require()?;
    let user = db_services::get_user_by_id(&app_state.db_pool, auth_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with ID {} not found", auth_user.id)))?;
    Ok(Json(UserResponse::from_model(user, false)))
}

async fn set_password(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    WithRejection(Json(payload), _): JsonBody<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    let auth_user = viewer.require()?;
    payload.validate()?;
    auth_service::change_password(&app_state.db_pool, auth_user.id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subscriptions(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<Vec<SubscriptionResponse>>, AppError> {
    let auth_user = viewer.require()?;
    let subscriptions =
        db_services::list_subscriptions(&app_state.db_pool, auth_user.id, query.recipes_limit).await?;
    Ok(Json(subscriptions))
}

async fn subscribe(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let auth_user = viewer.require()?;
    let author = db_services::subscribe(&app_state.db_pool, auth_user.id, id).await?;
    let response = db_services::subscription_responses(&app_state.db_pool, vec![author], query.recipes_limit)
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("Subscription response was empty".to_string()))?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn unsubscribe(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let auth_user = viewer.require()?;
    db_services::unsubscribe(&app_state.db_pool, auth_user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
