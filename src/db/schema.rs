//! Creates the tables described by the entities when they are missing.
//!
//! This is a bootstrap for fresh databases (and the in-memory databases used
//! by the tests), not a migration system: existing tables are left untouched.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::debug;

use crate::db::entities::prelude::*;

pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    // Referenced tables first so foreign keys resolve on Postgres.
    create_table(db, User).await?;
    create_table(db, Ingredient).await?;
    create_table(db, Tag).await?;
    create_table(db, Recipe).await?;
    create_table(db, RecipeTag).await?;
    create_table(db, IngredientRecipe).await?;
    create_table(db, FavoriteRecipe).await?;
    create_table(db, ShoppingCart).await?;
    create_table(db, Subscription).await?;
    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();

    debug!(table = entity.table_name(), "Ensuring table exists.");
    db.execute(backend.build(&statement)).await?;
    Ok(())
}
