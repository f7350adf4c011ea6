use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    JoinType, QueryFilter, QueryOrder, QuerySelect, QueryTrait, RelationTrait, Set,
    TransactionTrait,
    sea_query::{Expr, Func},
};
use tracing::info;

use crate::db::entities::{
    favorite_recipe, ingredient, ingredient_recipe,
    prelude::{FavoriteRecipe, Ingredient, IngredientRecipe, Recipe, RecipeTag, ShoppingCart, Tag, User},
    recipe, recipe_tag, shopping_cart, tag, user,
};
use crate::db::services::{
    RecipeList, missing_ingredient_ids, missing_tag_ids, recipe_ids_in_list, user_responses,
};
use crate::web::models::{IngredientAmount, RecipeIngredientResponse, RecipeResponse, TagResponse};

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Recipe not found: {0}")]
    NotFound(i32),
    #[error("Only the author may change this recipe")]
    Forbidden,
    #[error("Unknown tags: {0:?}")]
    UnknownTags(Vec<i32>),
    #[error("Unknown ingredients: {0:?}")]
    UnknownIngredients(Vec<i32>),
}

pub struct NewRecipe {
    pub author_id: i32,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub tags: Option<Vec<i32>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

#[derive(Debug, Default, Clone)]
pub struct RecipeFilter {
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub author_id: Option<i32>,
    pub only_favorited: bool,
    pub only_in_shopping_cart: bool,
}

/// Creates the recipe with its tags and ingredient amounts in one transaction.
pub async fn create_recipe(db: &DatabaseConnection, new: NewRecipe) -> Result<recipe::Model, RecipeError> {
    let tags = dedup_ids(&new.tags);

    let txn = db.begin().await?;
    ensure_references_exist(&txn, &tags, &new.ingredients).await?;

    let recipe = recipe::ActiveModel {
        author_id: Set(new.author_id),
        name: Set(new.name),
        image: Set(new.image),
        text: Set(new.text),
        cooking_time: Set(new.cooking_time),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    replace_tags(&txn, recipe.id, &tags).await?;
    replace_ingredients(&txn, recipe.id, &new.ingredients).await?;
    txn.commit().await?;

    info!(recipe_id = recipe.id, author_id = recipe.author_id, "Recipe created.");
    Ok(recipe)
}

/// Applies a partial update. Only the author may update a recipe.
pub async fn update_recipe(
    db: &DatabaseConnection,
    recipe_id: i32,
    user_id: i32,
    changes: RecipeChanges,
) -> Result<recipe::Model, RecipeError> {
    let txn = db.begin().await?;
    let recipe = Recipe::find_by_id(recipe_id)
        .one(&txn)
        .await?
        .ok_or(RecipeError::NotFound(recipe_id))?;
    if recipe.author_id != user_id {
        return Err(RecipeError::Forbidden);
    }

    let tags = changes.tags.as_deref().map(dedup_ids);
    ensure_references_exist(
        &txn,
        tags.as_deref().unwrap_or_default(),
        changes.ingredients.as_deref().unwrap_or_default(),
    )
    .await?;

    let mut active: recipe::ActiveModel = recipe.clone().into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(image) = changes.image {
        active.image = Set(Some(image));
    }
    if let Some(text) = changes.text {
        active.text = Set(text);
    }
    if let Some(cooking_time) = changes.cooking_time {
        active.cooking_time = Set(cooking_time);
    }
    let recipe = if active.is_changed() {
        active.update(&txn).await?
    } else {
        recipe
    };

    if let Some(tags) = tags {
        replace_tags(&txn, recipe.id, &tags).await?;
    }
    if let Some(ingredients) = changes.ingredients {
        replace_ingredients(&txn, recipe.id, &ingredients).await?;
    }
    txn.commit().await?;

    info!(recipe_id = recipe.id, "Recipe updated.");
    Ok(recipe)
}

/// Deletes the recipe. Tags, ingredient amounts, favorites and cart entries
/// go with it through the cascading foreign keys.
pub async fn delete_recipe<C: ConnectionTrait>(db: &C, recipe_id: i32, user_id: i32) -> Result<(), RecipeError> {
    let recipe = Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(RecipeError::NotFound(recipe_id))?;
    if recipe.author_id != user_id {
        return Err(RecipeError::Forbidden);
    }
    Recipe::delete_by_id(recipe.id).exec(db).await?;
    info!(recipe_id, "Recipe deleted.");
    Ok(())
}

pub async fn get_recipe<C: ConnectionTrait>(db: &C, recipe_id: i32) -> Result<recipe::Model, RecipeError> {
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(RecipeError::NotFound(recipe_id))
}

/// Recipes matching `filter`, newest first. The favorite and cart filters
/// refer to the viewer's lists, so an anonymous viewer gets nothing back.
pub async fn list_recipes<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    filter: &RecipeFilter,
) -> Result<Vec<recipe::Model>, DbErr> {
    let mut query = Recipe::find();

    if !filter.tags.is_empty() {
        let tagged = RecipeTag::find()
            .select_only()
            .column(recipe_tag::Column::RecipeId)
            .join(JoinType::InnerJoin, recipe_tag::Relation::Tag.def())
            // Slugs match case-insensitively.
            .filter(
                Expr::expr(Func::lower(Expr::col((tag::Entity, tag::Column::Slug))))
                    .is_in(filter.tags.iter().map(|slug| slug.to_lowercase())),
            )
            .into_query();
        query = query.filter(recipe::Column::Id.in_subquery(tagged));
    }
    if let Some(author_id) = filter.author_id {
        query = query.filter(recipe::Column::AuthorId.eq(author_id));
    }
    if filter.only_favorited || filter.only_in_shopping_cart {
        let Some(user_id) = viewer_id else {
            return Ok(Vec::new());
        };
        if filter.only_favorited {
            let favorites = FavoriteRecipe::find()
                .select_only()
                .column(favorite_recipe::Column::RecipeId)
                .filter(favorite_recipe::Column::UserId.eq(user_id))
                .into_query();
            query = query.filter(recipe::Column::Id.in_subquery(favorites));
        }
        if filter.only_in_shopping_cart {
            let cart = ShoppingCart::find()
                .select_only()
                .column(shopping_cart::Column::RecipeId)
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .into_query();
            query = query.filter(recipe::Column::Id.in_subquery(cart));
        }
    }

    query.order_by_desc(recipe::Column::Id).all(db).await
}

/// Full presentation form of `recipes` for the viewer. Each relation is
/// loaded with one query for the whole batch.
pub async fn recipe_details<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    recipes: Vec<recipe::Model>,
) -> Result<Vec<RecipeResponse>, DbErr> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
    let author_ids = dedup_ids(&recipes.iter().map(|r| r.author_id).collect::<Vec<_>>());

    let (authors, tag_rows, ingredient_rows, favorited, in_cart) = futures::try_join!(
        User::find()
            .filter(user::Column::Id.is_in(author_ids))
            .all(db),
        RecipeTag::find()
            .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.iter().copied()))
            .find_also_related(Tag)
            .order_by_asc(tag::Column::Name)
            .all(db),
        IngredientRecipe::find()
            .filter(ingredient_recipe::Column::RecipeId.is_in(recipe_ids.iter().copied()))
            .find_also_related(Ingredient)
            .order_by_asc(ingredient::Column::Name)
            .all(db),
        recipe_ids_in_list(db, RecipeList::Favorites, viewer_id, &recipe_ids),
        recipe_ids_in_list(db, RecipeList::ShoppingCart, viewer_id, &recipe_ids),
    )?;

    let authors: HashMap<i32, _> = user_responses(db, viewer_id, authors)
        .await?
        .into_iter()
        .map(|author| (author.id, author))
        .collect();

    let mut tags_by_recipe: HashMap<i32, Vec<TagResponse>> = HashMap::new();
    for (link, tag) in tag_rows {
        if let Some(tag) = tag {
            tags_by_recipe.entry(link.recipe_id).or_default().push(tag.into());
        }
    }

    let mut ingredients_by_recipe: HashMap<i32, Vec<RecipeIngredientResponse>> = HashMap::new();
    for (link, ingredient) in ingredient_rows {
        if let Some(ingredient) = ingredient {
            ingredients_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(RecipeIngredientResponse {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: link.amount,
                });
        }
    }

    let mut responses = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
            DbErr::RecordNotFound(format!("author {} of recipe {}", recipe.author_id, recipe.id))
        })?;
        responses.push(RecipeResponse {
            id: recipe.id,
            tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
            author,
            ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
            is_favorited: favorited.contains(&recipe.id),
            is_in_shopping_cart: in_cart.contains(&recipe.id),
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        });
    }
    Ok(responses)
}

pub async fn recipe_detail<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    recipe: recipe::Model,
) -> Result<RecipeResponse, DbErr> {
    let recipe_id = recipe.id;
    recipe_details(db, viewer_id, vec![recipe])
        .await?
        .pop()
        .ok_or_else(|| DbErr::RecordNotFound(format!("recipe {recipe_id}")))
}

async fn ensure_references_exist<C: ConnectionTrait>(
    db: &C,
    tag_ids: &[i32],
    ingredients: &[IngredientAmount],
) -> Result<(), RecipeError> {
    if !tag_ids.is_empty() {
        let missing = missing_tag_ids(db, tag_ids).await?;
        if !missing.is_empty() {
            return Err(RecipeError::UnknownTags(missing));
        }
    }
    if !ingredients.is_empty() {
        let ids: Vec<i32> = ingredients.iter().map(|i| i.id).collect();
        let missing = missing_ingredient_ids(db, &ids).await?;
        if !missing.is_empty() {
            return Err(RecipeError::UnknownIngredients(missing));
        }
    }
    Ok(())
}

async fn replace_tags<C: ConnectionTrait>(db: &C, recipe_id: i32, tag_ids: &[i32]) -> Result<(), DbErr> {
    RecipeTag::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    if tag_ids.is_empty() {
        return Ok(());
    }
    let links = tag_ids.iter().map(|&tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    });
    RecipeTag::insert_many(links).exec_without_returning(db).await?;
    Ok(())
}

async fn replace_ingredients<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    ingredients: &[IngredientAmount],
) -> Result<(), DbErr> {
    IngredientRecipe::delete_many()
        .filter(ingredient_recipe::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    if ingredients.is_empty() {
        return Ok(());
    }
    let links = ingredients.iter().map(|item| ingredient_recipe::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(item.id),
        amount: Set(item.amount),
    });
    IngredientRecipe::insert_many(links).exec_without_returning(db).await?;
    Ok(())
}

/// Drops repeated ids, keeping first occurrences in order.
fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::prelude::Subscription;
    use crate::db::services::{RecipeList, add_to_recipe_list, create_tag};
    use crate::db::test_support::{
        insert_ingredient, insert_tag, insert_user, link_subscription, put_in_cart, setup_db,
    };
    use sea_orm::PaginatorTrait;

    fn new_recipe(author_id: i32, tags: Vec<i32>, ingredients: Vec<IngredientAmount>) -> NewRecipe {
        NewRecipe {
            author_id,
            name: "Omelette".to_string(),
            image: None,
            text: "Beat the eggs".to_string(),
            cooking_time: 1,
            tags,
            ingredients,
        }
    }

    fn amount(id: i32, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    #[tokio::test]
    async fn test_stored_tag_set_equals_input_set() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let breakfast = insert_tag(&db, "Breakfast").await;
        let quick = insert_tag(&db, "Quick").await;
        let eggs = insert_ingredient(&db, "Eggs", "pcs").await;

        let recipe = create_recipe(
            &db,
            new_recipe(alice.id, vec![quick.id, breakfast.id, quick.id], vec![amount(eggs.id, 2)]),
        )
        .await
        .unwrap();
        assert_eq!(recipe.cooking_time, 1);

        let detail = recipe_detail(&db, None, recipe).await.unwrap();
        let tag_ids: HashSet<i32> = detail.tags.iter().map(|t| t.id).collect();
        assert_eq!(tag_ids, HashSet::from([breakfast.id, quick.id]));
        assert_eq!(detail.tags.len(), 2);
        assert_eq!(detail.ingredients.len(), 1);
        assert_eq!(detail.ingredients[0].name, "Eggs");
        assert_eq!(detail.ingredients[0].amount, 2);
        assert_eq!(detail.author.id, alice.id);
        assert!(!detail.is_favorited);
        assert!(!detail.is_in_shopping_cart);
    }

    #[tokio::test]
    async fn test_unknown_references_are_rejected_without_side_effects() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let tag = insert_tag(&db, "Lunch").await;
        let eggs = insert_ingredient(&db, "Eggs", "pcs").await;

        let err = create_recipe(&db, new_recipe(alice.id, vec![tag.id + 50], vec![amount(eggs.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeError::UnknownTags(ref ids) if ids == &vec![tag.id + 50]));

        let err = create_recipe(&db, new_recipe(alice.id, vec![tag.id], vec![amount(999, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeError::UnknownIngredients(_)));

        assert_eq!(Recipe::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_dependent_rows() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let tag = insert_tag(&db, "Dinner").await;
        let eggs = insert_ingredient(&db, "Eggs", "pcs").await;
        let recipe = create_recipe(&db, new_recipe(alice.id, vec![tag.id], vec![amount(eggs.id, 3)]))
            .await
            .unwrap();
        add_to_recipe_list(&db, RecipeList::Favorites, bob.id, recipe.id).await.unwrap();
        put_in_cart(&db, bob.id, recipe.id).await;
        link_subscription(&db, bob.id, alice.id).await;

        delete_recipe(&db, recipe.id, alice.id).await.unwrap();

        assert_eq!(Recipe::find().count(&db).await.unwrap(), 0);
        assert_eq!(RecipeTag::find().count(&db).await.unwrap(), 0);
        assert_eq!(IngredientRecipe::find().count(&db).await.unwrap(), 0);
        assert_eq!(FavoriteRecipe::find().count(&db).await.unwrap(), 0);
        assert_eq!(ShoppingCart::find().count(&db).await.unwrap(), 0);
        // Tags, ingredients and subscriptions are not owned by the recipe.
        assert_eq!(Tag::find().count(&db).await.unwrap(), 1);
        assert_eq!(Ingredient::find().count(&db).await.unwrap(), 1);
        assert_eq!(Subscription::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_only_author_may_mutate() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let tag = insert_tag(&db, "Dinner").await;
        let eggs = insert_ingredient(&db, "Eggs", "pcs").await;
        let recipe = create_recipe(&db, new_recipe(alice.id, vec![tag.id], vec![amount(eggs.id, 3)]))
            .await
            .unwrap();

        let changes = RecipeChanges {
            name: Some("Bob's omelette".to_string()),
            ..Default::default()
        };
        let err = update_recipe(&db, recipe.id, bob.id, changes).await.unwrap_err();
        assert!(matches!(err, RecipeError::Forbidden));
        let err = delete_recipe(&db, recipe.id, bob.id).await.unwrap_err();
        assert!(matches!(err, RecipeError::Forbidden));
        let err = delete_recipe(&db, recipe.id + 1, alice.id).await.unwrap_err();
        assert!(matches!(err, RecipeError::NotFound(_)));

        assert_eq!(get_recipe(&db, recipe.id).await.unwrap().name, "Omelette");
    }

    #[tokio::test]
    async fn test_partial_update_replaces_supplied_sets() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let dinner = insert_tag(&db, "Dinner").await;
        let lunch = insert_tag(&db, "Lunch").await;
        let eggs = insert_ingredient(&db, "Eggs", "pcs").await;
        let milk = insert_ingredient(&db, "Milk", "ml").await;
        let recipe = create_recipe(&db, new_recipe(alice.id, vec![dinner.id], vec![amount(eggs.id, 3)]))
            .await
            .unwrap();

        let changes = RecipeChanges {
            cooking_time: Some(15),
            tags: Some(vec![lunch.id]),
            ..Default::default()
        };
        let updated = update_recipe(&db, recipe.id, alice.id, changes).await.unwrap();
        assert_eq!(updated.cooking_time, 15);
        assert_eq!(updated.name, "Omelette");

        let detail = recipe_detail(&db, None, updated).await.unwrap();
        assert_eq!(detail.tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![lunch.id]);
        // Ingredients were not supplied, so they stay.
        assert_eq!(detail.ingredients.len(), 1);

        let changes = RecipeChanges {
            ingredients: Some(vec![amount(milk.id, 200)]),
            ..Default::default()
        };
        let updated = update_recipe(&db, recipe.id, alice.id, changes).await.unwrap();
        let detail = recipe_detail(&db, None, updated).await.unwrap();
        assert_eq!(detail.ingredients.len(), 1);
        assert_eq!(detail.ingredients[0].id, milk.id);
        assert_eq!(detail.ingredients[0].amount, 200);
    }

    #[tokio::test]
    async fn test_tag_filter_ignores_slug_case() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let breakfast = create_tag(&db, "Breakfast", None, Some("BreakFast")).await.unwrap();
        let eggs = insert_ingredient(&db, "Eggs", "pcs").await;
        let recipe = create_recipe(&db, new_recipe(alice.id, vec![breakfast.id], vec![amount(eggs.id, 2)]))
            .await
            .unwrap();

        for slug in ["breakfast", "BREAKFAST", "BreakFast"] {
            let filter = RecipeFilter {
                tags: vec![slug.to_string()],
                ..Default::default()
            };
            let found = list_recipes(&db, None, &filter).await.unwrap();
            assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![recipe.id], "slug {slug}");
        }
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let dinner = insert_tag(&db, "Dinner").await;
        let lunch = insert_tag(&db, "Lunch").await;
        let eggs = insert_ingredient(&db, "Eggs", "pcs").await;
        let first = create_recipe(&db, new_recipe(alice.id, vec![dinner.id], vec![amount(eggs.id, 1)]))
            .await
            .unwrap();
        let second = create_recipe(&db, new_recipe(bob.id, vec![lunch.id], vec![amount(eggs.id, 1)]))
            .await
            .unwrap();
        add_to_recipe_list(&db, RecipeList::Favorites, alice.id, second.id).await.unwrap();

        let ids = |recipes: Vec<recipe::Model>| recipes.into_iter().map(|r| r.id).collect::<Vec<_>>();

        let all = list_recipes(&db, None, &RecipeFilter::default()).await.unwrap();
        assert_eq!(ids(all), vec![second.id, first.id]);

        let by_tag = RecipeFilter {
            tags: vec!["dinner".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(list_recipes(&db, None, &by_tag).await.unwrap()), vec![first.id]);

        let by_author = RecipeFilter {
            author_id: Some(bob.id),
            ..Default::default()
        };
        assert_eq!(ids(list_recipes(&db, None, &by_author).await.unwrap()), vec![second.id]);

        let favorited = RecipeFilter {
            only_favorited: true,
            ..Default::default()
        };
        assert_eq!(
            ids(list_recipes(&db, Some(alice.id), &favorited).await.unwrap()),
            vec![second.id]
        );
        assert!(list_recipes(&db, None, &favorited).await.unwrap().is_empty());

        let details = recipe_details(&db, Some(alice.id), vec![second.clone(), first.clone()])
            .await
            .unwrap();
        assert!(details[0].is_favorited);
        assert!(!details[1].is_favorited);
    }
}
