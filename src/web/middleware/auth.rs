use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::sync::Arc;
use tracing::warn;

use crate::db::services as db_services;
use crate::web::models::{AuthenticatedUser, Claims, Viewer};
use crate::web::{AppState, error::AppError};

/// Identifies the caller on every request and stores a `Viewer` extension.
///
/// No token means an anonymous viewer; handlers that need a user call
/// `Viewer::require`. A token that is present but does not verify, or that
/// names a user who no longer exists, is rejected with 401 right here.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let viewer = match extract_token(req.headers(), &jar) {
        None => Viewer(None),
        Some(token) => {
            let token_data = decode::<Claims>(
                &token,
                &DecodingKey::from_secret(state.config.jwt_secret.as_ref()),
                &Validation::default(),
            )
            .map_err(|e| {
                warn!(error = ?e, "JWT decoding error during identification.");
                AppError::Unauthorized("Invalid token.".to_string())
            })?;

            let user = db_services::get_user_by_id(&state.db_pool, token_data.claims.user_id)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Invalid token.".to_string()))?;

            Viewer(Some(AuthenticatedUser {
                id: user.id,
                email: user.email,
            }))
        }
    };

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}

/// Authorization header first (`Bearer` or `Token` scheme), then the `token` cookie.
fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("Token "))
        })
        .map(|token| token.trim().to_string())
        .or_else(|| jar.get("token").map(|c| c.value().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token_schemes() {
        let jar = CookieJar::new();
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers, &jar), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_token(&headers, &jar).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token xyz"));
        assert_eq!(extract_token(&headers, &jar).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_extract_token_falls_back_to_cookie() {
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new("token", "from-cookie"));
        let headers = HeaderMap::new();
        assert_eq!(extract_token(&headers, &jar).as_deref(), Some("from-cookie"));
    }
}
