use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::db::entities::recipe;
use crate::web::models::{TagResponse, UserResponse};

const POSITIVE_ERROR: &str = "Expecting a positive number.";

// --- Request payloads ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeRequest {
    #[validate(
        length(min = 1, message = "Minimum one ingredient required."),
        custom(function = "validate_ingredient_amounts")
    )]
    pub ingredients: Vec<IngredientAmount>,
    #[validate(length(min = 1, message = "Minimum one tag required."))]
    pub tags: Vec<i32>,
    pub image: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[validate(range(min = 1, message = "Expecting cooking_time as positive number."))]
    pub cooking_time: i32,
}

/// Partial update; supplied tag and ingredient lists replace the stored ones.
#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateRecipeRequest {
    #[validate(
        length(min = 1, message = "Minimum one ingredient required."),
        custom(function = "validate_ingredient_amounts")
    )]
    pub ingredients: Option<Vec<IngredientAmount>>,
    #[validate(length(min = 1, message = "Minimum one tag required."))]
    pub tags: Option<Vec<i32>>,
    pub image: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub text: Option<String>,
    #[validate(range(min = 1, message = "Expecting cooking_time as positive number."))]
    pub cooking_time: Option<i32>,
}

#[allow(clippy::ptr_arg)]
fn validate_ingredient_amounts(ingredients: &Vec<IngredientAmount>) -> Result<(), ValidationError> {
    if ingredients.iter().any(|item| item.amount < 1) {
        let mut err = ValidationError::new("amount");
        err.message = Some(POSITIVE_ERROR.into());
        return Err(err);
    }
    let mut seen = HashSet::new();
    if !ingredients.iter().all(|item| seen.insert(item.id)) {
        let mut err = ValidationError::new("duplicate");
        err.message = Some("Ingredients must not repeat.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Default)]
pub struct RecipeQuery {
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<i32>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

/// Query-string booleans arrive as `1`/`0` or `true`/`false`.
pub fn query_flag(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True"))
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeShortResponse {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<&recipe::Model> for RecipeShortResponse {
    fn from(recipe: &recipe::Model) -> Self {
        RecipeShortResponse {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cooking_time: i32, tags: Vec<i32>, ingredients: Vec<IngredientAmount>) -> CreateRecipeRequest {
        CreateRecipeRequest {
            ingredients,
            tags,
            image: None,
            name: "Soup".to_string(),
            text: "Boil water".to_string(),
            cooking_time,
        }
    }

    fn salt(amount: i32) -> IngredientAmount {
        IngredientAmount { id: 1, amount }
    }

    #[test]
    fn test_cooking_time_must_be_positive() {
        assert!(request(0, vec![1], vec![salt(5)]).validate().is_err());
        assert!(request(1, vec![1], vec![salt(5)]).validate().is_ok());
    }

    #[test]
    fn test_tags_and_ingredients_required() {
        let errors = request(5, vec![], vec![]).validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("tags"));
        assert!(fields.contains_key("ingredients"));
    }

    #[test]
    fn test_ingredient_amounts() {
        assert!(request(5, vec![1], vec![salt(0)]).validate().is_err());
        assert!(request(5, vec![1], vec![salt(1), salt(2)]).validate().is_err());
        let distinct = vec![salt(1), IngredientAmount { id: 2, amount: 3 }];
        assert!(request(5, vec![1], distinct).validate().is_ok());
    }

    #[test]
    fn test_partial_update_validates_supplied_fields_only() {
        assert!(UpdateRecipeRequest::default().validate().is_ok());
        let update = UpdateRecipeRequest {
            tags: Some(vec![]),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        let update = UpdateRecipeRequest {
            cooking_time: Some(0),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_query_flag() {
        assert!(query_flag(Some("1")));
        assert!(query_flag(Some("true")));
        assert!(!query_flag(Some("0")));
        assert!(!query_flag(None));
    }
}
