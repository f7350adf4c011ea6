//! Bulk loading of the ingredient catalogue from a JSON dump.

use std::path::{Path, PathBuf};

use sea_orm::{DatabaseConnection, DbErr};
use tracing::info;

use crate::db::services::{NewIngredient, import_ingredients};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse ingredient list: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

/// Parses a JSON array of `{"name": ..., "measurement_unit": ...}` objects.
pub fn parse_ingredients(contents: &str) -> Result<Vec<NewIngredient>, ImportError> {
    Ok(serde_json::from_str(contents)?)
}

/// Reads the file and stores every ingredient in one transaction. Returns the
/// number of ingredients loaded.
pub async fn load_ingredients_file(db: &DatabaseConnection, path: &Path) -> Result<usize, ImportError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ingredients = parse_ingredients(&contents)?;
    info!(path = %path.display(), count = ingredients.len(), "Loading ingredients.");
    Ok(import_ingredients(db, ingredients).await?)
}
