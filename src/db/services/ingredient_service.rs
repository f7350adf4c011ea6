use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::{Expr, Func},
};
use serde::Deserialize;
use tracing::info;

use crate::db::entities::{ingredient, prelude::Ingredient};

/// One entry of an ingredient dump.
#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

pub async fn create_ingredient<C: ConnectionTrait>(
    db: &C,
    name: &str,
    measurement_unit: &str,
) -> Result<ingredient::Model, DbErr> {
    ingredient::ActiveModel {
        name: Set(name.to_string()),
        measurement_unit: Set(measurement_unit.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Lists ingredients ordered by name, optionally restricted to names starting
/// with `name_prefix` (case-insensitive).
pub async fn list_ingredients<C: ConnectionTrait>(
    db: &C,
    name_prefix: Option<&str>,
) -> Result<Vec<ingredient::Model>, DbErr> {
    let mut query = Ingredient::find();
    if let Some(prefix) = name_prefix.map(str::trim).filter(|p| !p.is_empty()) {
        let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(ingredient::Column::Name)))
                .like(sea_orm::sea_query::LikeExpr::new(pattern).escape('\\')),
        );
    }
    query
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::Id)
        .all(db)
        .await
}

pub async fn get_ingredient<C: ConnectionTrait>(
    db: &C,
    ingredient_id: i32,
) -> Result<Option<ingredient::Model>, DbErr> {
    Ingredient::find_by_id(ingredient_id).one(db).await
}

/// Returns the ids among `ingredient_ids` that have no ingredient row.
pub async fn missing_ingredient_ids<C: ConnectionTrait>(
    db: &C,
    ingredient_ids: &[i32],
) -> Result<Vec<i32>, DbErr> {
    let found: Vec<i32> = Ingredient::find()
        .filter(ingredient::Column::Id.is_in(ingredient_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();
    Ok(ingredient_ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect())
}

/// Inserts a batch of ingredients in one transaction and returns how many
/// were stored.
pub async fn import_ingredients(
    db: &DatabaseConnection,
    ingredients: Vec<NewIngredient>,
) -> Result<usize, DbErr> {
    if ingredients.is_empty() {
        return Ok(0);
    }
    let count = ingredients.len();
    let models = ingredients
        .into_iter()
        .map(|item| ingredient::ActiveModel {
            name: Set(item.name),
            measurement_unit: Set(item.measurement_unit),
            ..Default::default()
        });

    let txn = db.begin().await?;
    Ingredient::insert_many(models).exec_without_returning(&txn).await?;
    txn.commit().await?;

    info!(count, "Imported ingredients.");
    Ok(count)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
