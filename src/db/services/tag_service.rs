use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::db::entities::{prelude::Tag, tag};

// --- Tag Service Functions ---

/// Creates a new tag. A missing slug is derived from the name.
pub async fn create_tag<C: ConnectionTrait>(
    db: &C,
    name: &str,
    color: Option<&str>,
    slug: Option<&str>,
) -> Result<tag::Model, DbErr> {
    let slug = match slug {
        Some(slug) => slug.to_string(),
        None => slugify(name),
    };
    tag::ActiveModel {
        name: Set(name.to_string()),
        color: Set(color.unwrap_or(tag::DEFAULT_COLOR).to_lowercase()),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Retrieves all tags ordered by name.
pub async fn list_tags<C: ConnectionTrait>(db: &C) -> Result<Vec<tag::Model>, DbErr> {
    Tag::find().order_by_asc(tag::Column::Name).all(db).await
}

pub async fn get_tag<C: ConnectionTrait>(db: &C, tag_id: i32) -> Result<Option<tag::Model>, DbErr> {
    Tag::find_by_id(tag_id).one(db).await
}

/// Returns the ids among `tag_ids` that have no tag row.
pub async fn missing_tag_ids<C: ConnectionTrait>(db: &C, tag_ids: &[i32]) -> Result<Vec<i32>, DbErr> {
    let found: Vec<i32> = Tag::find()
        .filter(tag::Column::Id.is_in(tag_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    Ok(tag_ids.iter().copied().filter(|id| !found.contains(id)).collect())
}

/// Lowercases the name and collapses every run of non-alphanumerics into `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
