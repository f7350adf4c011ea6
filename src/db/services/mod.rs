//! The `services` module provides a high-level API for interacting with the database.
//! Every function takes the connection (or an open transaction) it should run on;
//! nothing here holds on to a session of its own.

pub mod ingredient_service;
pub mod recipe_service;
pub mod relation_service;
pub mod shopping_list_service;
pub mod tag_service;
pub mod user_service;

pub use ingredient_service::*;
pub use recipe_service::*;
pub use relation_service::*;
pub use shopping_list_service::*;
pub use tag_service::*;
pub use user_service::*;

use sea_orm::{DbErr, SqlErr};

/// True when the store rejected a write because of a unique or primary key
/// constraint, e.g. when two requests insert the same pair concurrently.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
