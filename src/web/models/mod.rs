use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::web::error::AppError;

pub mod catalog_models;
pub mod recipe_models;
pub mod user_models;

pub use catalog_models::*;
pub use recipe_models::*;
pub use user_models::*;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters."))]
    pub username: String,
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub new_password: String,
    pub current_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub auth_token: String,
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // email
    pub user_id: i32,
    pub exp: usize,
}

/// Struct to hold authenticated user details.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub email: String,
}

/// Whoever is making the request, inserted by the identification middleware
/// on every request. Anonymous when no token was sent.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthenticatedUser>);

impl Viewer {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(|user| user.id)
    }

    /// The authenticated user, or 401 for anonymous requests.
    pub fn require(self) -> Result<AuthenticatedUser, AppError> {
        self.0.ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })
    }
}
