use axum::{
    Json, Router,
    extract::{Extension, State},
    http::{Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar, SameSite},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::config::ServerConfig;
use crate::services::auth_service;
use crate::web::{
    middleware::auth,
    models::{LoginRequest, Viewer},
    routes::*,
};

pub use crate::web::error::AppError;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

/// JSON request body whose rejections are reported as `AppError` (400).
pub type JsonBody<T> = WithRejection<Json<T>, AppError>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub config: Arc<ServerConfig>,
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(payload), _): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login_response =
        auth_service::login_user(&app_state.db_pool, payload, &app_state.config.jwt_secret).await?;

    let auth_cookie = Cookie::build(("token", login_response.auth_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();

    Ok((jar.add(auth_cookie), Json(login_response)))
}

/// Tokens are stateless, so logging out only drops the cookie.
async fn logout_handler(
    Extension(viewer): Extension<Viewer>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    viewer.require()?;
    let jar = jar.remove(Cookie::build("token").path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(db_pool: DatabaseConnection, config: Arc<ServerConfig>) -> Router {
    let app_state = Arc::new(AppState { db_pool, config });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/api/auth/token/login", post(login_handler))
        .route("/api/auth/token/logout", post(logout_handler))
        .nest("/api/users", user_routes::create_user_router())
        .nest("/api/tags", tag_routes::create_tags_router())
        .nest("/api/ingredients", ingredient_routes::create_ingredients_router())
        .nest("/api/recipes", recipe_routes::recipe_routes())
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::identify))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
