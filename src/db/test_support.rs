//! Helpers shared by the database-backed tests.

use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};

use crate::db::entities::prelude::{IngredientRecipe, ShoppingCart, Subscription};
use crate::db::entities::{
    ingredient, ingredient_recipe, recipe, shopping_cart, subscription, tag, user,
};
use crate::db::schema;

/// Fresh in-memory SQLite database with every table created.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    // A single connection, otherwise every pooled connection sees its own
    // empty in-memory database.
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    schema::create_tables(&db).await.unwrap();
    db
}

pub async fn insert_user(db: &DatabaseConnection, username: &str) -> user::Model {
    user::ActiveModel {
        email: Set(format!("{username}@example.com")),
        username: Set(username.to_string()),
        first_name: Set("First".to_string()),
        last_name: Set("Last".to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_ingredient(db: &DatabaseConnection, name: &str, unit: &str) -> ingredient::Model {
    ingredient::ActiveModel {
        name: Set(name.to_string()),
        measurement_unit: Set(unit.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_tag(db: &DatabaseConnection, name: &str) -> tag::Model {
    tag::ActiveModel {
        name: Set(name.to_string()),
        color: Set(tag::DEFAULT_COLOR.to_string()),
        slug: Set(name.to_lowercase()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Bare recipe row without tags or ingredients.
pub async fn insert_recipe(db: &DatabaseConnection, author_id: i32, name: &str) -> recipe::Model {
    recipe::ActiveModel {
        author_id: Set(author_id),
        name: Set(name.to_string()),
        image: Set(None),
        text: Set(format!("How to cook {name}")),
        cooking_time: Set(10),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn link_subscription(db: &DatabaseConnection, user_id: i32, author_id: i32) {
    Subscription::insert(subscription::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
    })
    .exec_without_returning(db)
    .await
    .unwrap();
}

pub async fn link_ingredient(db: &DatabaseConnection, recipe_id: i32, ingredient_id: i32, amount: i32) {
    IngredientRecipe::insert(ingredient_recipe::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(ingredient_id),
        amount: Set(amount),
    })
    .exec_without_returning(db)
    .await
    .unwrap();
}

pub async fn put_in_cart(db: &DatabaseConnection, user_id: i32, recipe_id: i32) {
    ShoppingCart::insert(shopping_cart::ActiveModel {
        user_id: Set(user_id),
        recipe_id: Set(recipe_id),
    })
    .exec_without_returning(db)
    .await
    .unwrap();
}
