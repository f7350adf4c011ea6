//! Per-user relations: favorites, the shopping cart and author subscriptions.
//!
//! Each relation is a pair stored under a composite primary key, so the store
//! itself rejects duplicates. The checks here turn the common cases into
//! readable errors; a duplicate that slips past them (two concurrent ADDs) is
//! still reported as `AlreadyExists` through the unique-violation mapping.

use std::collections::HashSet;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, Set};
use tracing::info;

use crate::db::entities::{
    favorite_recipe,
    prelude::{FavoriteRecipe, Recipe, ShoppingCart, Subscription, User},
    recipe, shopping_cart, subscription, user,
};
use crate::db::services::is_unique_violation;

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Recipe not found: {0}")]
    RecipeNotFound(i32),
    #[error("User not found: {0}")]
    UserNotFound(i32),
    #[error("{0}")]
    AlreadyExists(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("You cannot subscribe to yourself.")]
    SelfSubscription,
}

/// The two per-user recipe lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn already_exists(self) -> &'static str {
        match self {
            RecipeList::Favorites => "Already in favorites",
            RecipeList::ShoppingCart => "Already in shopping cart",
        }
    }

    fn not_found(self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is not in favorites",
            RecipeList::ShoppingCart => "Recipe is not in shopping cart",
        }
    }
}

/// Adds the recipe to one of the user's lists and returns the recipe.
pub async fn add_to_recipe_list<C: ConnectionTrait>(
    db: &C,
    list: RecipeList,
    user_id: i32,
    recipe_id: i32,
) -> Result<recipe::Model, RelationError> {
    let recipe = Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(RelationError::RecipeNotFound(recipe_id))?;

    if recipe_list_contains(db, list, user_id, recipe_id).await? {
        return Err(RelationError::AlreadyExists(list.already_exists()));
    }

    let inserted = match list {
        RecipeList::Favorites => {
            FavoriteRecipe::insert(favorite_recipe::ActiveModel {
                user_id: Set(user_id),
                recipe_id: Set(recipe_id),
            })
            .exec_without_returning(db)
            .await
        }
        RecipeList::ShoppingCart => {
            ShoppingCart::insert(shopping_cart::ActiveModel {
                user_id: Set(user_id),
                recipe_id: Set(recipe_id),
            })
            .exec_without_returning(db)
            .await
        }
    };
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(RelationError::AlreadyExists(list.already_exists()));
        }
        Err(e) => return Err(e.into()),
    }

    info!(user_id, recipe_id, ?list, "Recipe added to list.");
    Ok(recipe)
}

/// Removes the recipe from one of the user's lists.
pub async fn remove_from_recipe_list<C: ConnectionTrait>(
    db: &C,
    list: RecipeList,
    user_id: i32,
    recipe_id: i32,
) -> Result<(), RelationError> {
    if Recipe::find_by_id(recipe_id).one(db).await?.is_none() {
        return Err(RelationError::RecipeNotFound(recipe_id));
    }

    let result = match list {
        RecipeList::Favorites => FavoriteRecipe::delete_by_id((user_id, recipe_id)).exec(db).await?,
        RecipeList::ShoppingCart => ShoppingCart::delete_by_id((user_id, recipe_id)).exec(db).await?,
    };
    if result.rows_affected == 0 {
        return Err(RelationError::NotFound(list.not_found()));
    }

    info!(user_id, recipe_id, ?list, "Recipe removed from list.");
    Ok(())
}

pub async fn recipe_list_contains<C: ConnectionTrait>(
    db: &C,
    list: RecipeList,
    user_id: i32,
    recipe_id: i32,
) -> Result<bool, DbErr> {
    let found = match list {
        RecipeList::Favorites => FavoriteRecipe::find_by_id((user_id, recipe_id)).one(db).await?.is_some(),
        RecipeList::ShoppingCart => ShoppingCart::find_by_id((user_id, recipe_id)).one(db).await?.is_some(),
    };
    Ok(found)
}

/// Which of `recipe_ids` are on the viewer's list. Empty for anonymous viewers.
pub async fn recipe_ids_in_list<C: ConnectionTrait>(
    db: &C,
    list: RecipeList,
    viewer_id: Option<i32>,
    recipe_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    let Some(user_id) = viewer_id else {
        return Ok(HashSet::new());
    };
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let ids: Vec<i32> = match list {
        RecipeList::Favorites => {
            FavoriteRecipe::find()
                .select_only()
                .column(favorite_recipe::Column::RecipeId)
                .filter(favorite_recipe::Column::UserId.eq(user_id))
                .filter(favorite_recipe::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                .into_tuple()
                .all(db)
                .await?
        }
        RecipeList::ShoppingCart => {
            ShoppingCart::find()
                .select_only()
                .column(shopping_cart::Column::RecipeId)
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                .into_tuple()
                .all(db)
                .await?
        }
    };
    Ok(ids.into_iter().collect())
}

/// Makes `user_id` follow `author_id` and returns the author.
pub async fn subscribe<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    author_id: i32,
) -> Result<user::Model, RelationError> {
    let author = User::find_by_id(author_id)
        .one(db)
        .await?
        .ok_or(RelationError::UserNotFound(author_id))?;

    if user_id == author_id {
        return Err(RelationError::SelfSubscription);
    }
    if Subscription::find_by_id((user_id, author_id)).one(db).await?.is_some() {
        return Err(RelationError::AlreadyExists("Already subscribed"));
    }

    let inserted = Subscription::insert(subscription::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
    })
    .exec_without_returning(db)
    .await;
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(RelationError::AlreadyExists("Already subscribed"));
        }
        Err(e) => return Err(e.into()),
    }

    info!(user_id, author_id, "User subscribed to author.");
    Ok(author)
}

pub async fn unsubscribe<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    author_id: i32,
) -> Result<(), RelationError> {
    if User::find_by_id(author_id).one(db).await?.is_none() {
        return Err(RelationError::UserNotFound(author_id));
    }
    let result = Subscription::delete_by_id((user_id, author_id)).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(RelationError::NotFound("Not subscribed to this author"));
    }
    info!(user_id, author_id, "User unsubscribed from author.");
    Ok(())
}
