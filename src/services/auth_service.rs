use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::db::entities::user;
use crate::db::services::{self as db_services, NewUser, is_unique_violation};
use crate::web::error::AppError;
use crate::web::models::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, SetPasswordRequest, UserResponse,
};

#[cfg(not(test))]
const PASSWORD_HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const PASSWORD_HASH_COST: u32 = 4;

const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Registers a user. The payload is expected to be validated already.
pub async fn register_user(pool: &DatabaseConnection, req: RegisterRequest) -> Result<UserResponse, AppError> {
    if db_services::get_user_by_email(pool, &req.email).await?.is_some() {
        return Err(AppError::Conflict("A user with that email already exists.".to_string()));
    }
    if db_services::get_user_by_username(pool, &req.username).await?.is_some() {
        return Err(AppError::Conflict("A user with that username already exists.".to_string()));
    }

    let password_hash = hash(&req.password, PASSWORD_HASH_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let new_user = NewUser {
        email: req.email,
        username: req.username,
        first_name: req.first_name,
        last_name: req.last_name,
        password_hash,
    };
    let user = match db_services::create_user(pool, new_user).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("A user with that email or username already exists.".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, "User registered.");
    Ok(UserResponse::from_model(user, false))
}

pub async fn login_user(pool: &DatabaseConnection, req: LoginRequest, jwt_secret: &str) -> Result<LoginResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput("Email and password are required.".to_string()));
    }

    let user = db_services::get_user_by_email(pool, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

/// Replaces the password after checking the current one.
pub async fn change_password(pool: &DatabaseConnection, user_id: i32, req: SetPasswordRequest) -> Result<(), AppError> {
    let user = db_services::get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with ID {user_id} not found")))?;

    let valid_password = verify(&req.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::field("current_password", "Invalid password."));
    }

    let password_hash = hash(&req.new_password, PASSWORD_HASH_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;
    db_services::update_password_hash(pool, user.id, password_hash).await?;

    info!(user_id, "Password changed.");
    Ok(())
}

pub fn create_jwt_for_user(user: &user::Model, jwt_secret: &str) -> Result<LoginResponse, AppError> {
    let expiration = (Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let auth_token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_ref()))
        .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse { auth_token })
}
