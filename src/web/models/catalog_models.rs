//! Tags and ingredients: request payloads and response shapes.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::db::entities::{ingredient, tag};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(tag: tag::Model) -> Self {
        TagResponse {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 200, message = "Tag name must be 1-200 characters."))]
    pub name: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
}

fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let digits = color.strip_prefix('#').unwrap_or_default();
    if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(());
    }
    let mut err = ValidationError::new("hex_color");
    err.message = Some("Expecting a color in #RRGGBB form.".into());
    Err(err)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(ingredient: ingredient::Model) -> Self {
        IngredientResponse {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIngredientRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub measurement_unit: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct IngredientQuery {
    /// Case-insensitive name prefix.
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_validation() {
        assert!(validate_hex_color("#ffffff").is_ok());
        assert!(validate_hex_color("#E26C2D").is_ok());
        assert!(validate_hex_color("ffffff").is_err());
        assert!(validate_hex_color("#fff").is_err());
        assert!(validate_hex_color("#gggggg").is_err());
    }
}
