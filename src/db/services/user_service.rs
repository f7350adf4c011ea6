use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, Unchanged,
};

use crate::db::entities::{
    prelude::{Recipe, Subscription, User},
    recipe, subscription, user,
};
use crate::web::models::{RecipeShortResponse, SubscriptionResponse, UserResponse};

// --- User Service Functions ---

pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Creates a new user.
pub async fn create_user<C: ConnectionTrait>(db: &C, new_user: NewUser) -> Result<user::Model, DbErr> {
    user::ActiveModel {
        email: Set(new_user.email),
        username: Set(new_user.username),
        first_name: Set(new_user.first_name),
        last_name: Set(new_user.last_name),
        password_hash: Set(new_user.password_hash),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update_password_hash<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    password_hash: String,
) -> Result<user::Model, DbErr> {
    user::ActiveModel {
        id: Unchanged(user_id),
        password_hash: Set(password_hash),
        ..Default::default()
    }
    .update(db)
    .await
}

/// Retrieves a user by their ID.
pub async fn get_user_by_id<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<user::Model>, DbErr> {
    User::find_by_id(user_id).one(db).await
}

/// Retrieves a user by their email.
pub async fn get_user_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<user::Model>, DbErr> {
    User::find().filter(user::Column::Email.eq(email)).one(db).await
}

pub async fn get_user_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<Option<user::Model>, DbErr> {
    User::find().filter(user::Column::Username.eq(username)).one(db).await
}

/// All users, newest first.
pub async fn list_users<C: ConnectionTrait>(db: &C) -> Result<Vec<user::Model>, DbErr> {
    User::find().order_by_desc(user::Column::Id).all(db).await
}

/// Which of `author_ids` the viewer follows. Empty for anonymous viewers.
pub async fn followed_author_ids<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    author_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    let Some(viewer_id) = viewer_id else {
        return Ok(HashSet::new());
    };
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let ids: Vec<i32> = Subscription::find()
        .select_only()
        .column(subscription::Column::AuthorId)
        .filter(subscription::Column::UserId.eq(viewer_id))
        .filter(subscription::Column::AuthorId.is_in(author_ids.iter().copied()))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Maps users to their response form with `is_subscribed` filled in for the viewer.
pub async fn user_responses<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    users: Vec<user::Model>,
) -> Result<Vec<UserResponse>, DbErr> {
    let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    let followed = followed_author_ids(db, viewer_id, &ids).await?;
    Ok(users
        .into_iter()
        .map(|u| {
            let is_subscribed = followed.contains(&u.id);
            UserResponse::from_model(u, is_subscribed)
        })
        .collect())
}

pub async fn user_response<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    user: user::Model,
) -> Result<UserResponse, DbErr> {
    let mut responses = user_responses(db, viewer_id, vec![user]).await?;
    responses
        .pop()
        .ok_or_else(|| DbErr::Custom("user response mapping produced no rows".to_string()))
}

/// Authors followed by `user_id`, newest first, each with their recipes
/// (newest first, at most `recipes_limit` of them) and their total recipe count.
pub async fn list_subscriptions<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    recipes_limit: Option<u64>,
) -> Result<Vec<SubscriptionResponse>, DbErr> {
    let authors = User::find()
        .join_rev(JoinType::InnerJoin, subscription::Relation::Author.def())
        .filter(subscription::Column::UserId.eq(user_id))
        .order_by_desc(user::Column::Id)
        .all(db)
        .await?;

    subscription_responses(db, authors, recipes_limit).await
}

/// Subscription form of the given authors, as seen by one of their followers.
pub async fn subscription_responses<C: ConnectionTrait>(
    db: &C,
    authors: Vec<user::Model>,
    recipes_limit: Option<u64>,
) -> Result<Vec<SubscriptionResponse>, DbErr> {
    if authors.is_empty() {
        return Ok(Vec::new());
    }
    let author_ids: Vec<i32> = authors.iter().map(|a| a.id).collect();
    let recipes = Recipe::find()
        .filter(recipe::Column::AuthorId.is_in(author_ids))
        .order_by_desc(recipe::Column::Id)
        .all(db)
        .await?;

    let mut recipes_by_author: HashMap<i32, Vec<recipe::Model>> = HashMap::new();
    for recipe in recipes {
        recipes_by_author.entry(recipe.author_id).or_default().push(recipe);
    }

    let limit = recipes_limit.map(|l| l as usize);
    Ok(authors
        .into_iter()
        .map(|author| {
            let recipes = recipes_by_author.remove(&author.id).unwrap_or_default();
            let recipes_count = recipes.len() as u64;
            let shown = limit.unwrap_or(recipes.len());
            SubscriptionResponse {
                user: UserResponse::from_model(author, true),
                recipes: recipes.iter().take(shown).map(RecipeShortResponse::from).collect(),
                recipes_count,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::prelude::{IngredientRecipe, ShoppingCart};
    use crate::db::test_support::{
        insert_ingredient, insert_recipe, insert_user, link_ingredient, link_subscription, put_in_cart,
        setup_db,
    };
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_lookup_by_email_and_username() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        assert_eq!(get_user_by_email(&db, "alice@example.com").await.unwrap(), Some(alice.clone()));
        assert_eq!(get_user_by_username(&db, "alice").await.unwrap(), Some(alice.clone()));
        assert_eq!(get_user_by_id(&db, alice.id).await.unwrap(), Some(alice));
        assert!(get_user_by_email(&db, "nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_is_subscribed_depends_on_viewer() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        link_subscription(&db, alice.id, bob.id).await;

        let as_alice = user_response(&db, Some(alice.id), bob.clone()).await.unwrap();
        assert!(as_alice.is_subscribed);
        let as_anonymous = user_response(&db, None, bob.clone()).await.unwrap();
        assert!(!as_anonymous.is_subscribed);
        let as_bob = user_response(&db, Some(bob.id), alice).await.unwrap();
        assert!(!as_bob.is_subscribed);
    }

    #[tokio::test]
    async fn test_recipes_limit_truncates_list_but_not_count() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        for name in ["Borscht", "Pelmeni", "Syrniki"] {
            insert_recipe(&db, bob.id, name).await;
        }
        link_subscription(&db, alice.id, bob.id).await;

        let limited = list_subscriptions(&db, alice.id, Some(2)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].user.id, bob.id);
        assert!(limited[0].user.is_subscribed);
        assert_eq!(limited[0].recipes.len(), 2);
        assert_eq!(limited[0].recipes[0].name, "Syrniki");
        assert_eq!(limited[0].recipes_count, 3);

        let unlimited = list_subscriptions(&db, alice.id, None).await.unwrap();
        assert_eq!(unlimited[0].recipes.len(), 3);
        assert_eq!(unlimited[0].recipes_count, 3);

        assert!(list_subscriptions(&db, bob.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_owned_rows() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let carol = insert_user(&db, "carol").await;
        let salt = insert_ingredient(&db, "Salt", "g").await;
        let soup = insert_recipe(&db, alice.id, "Soup").await;
        link_ingredient(&db, soup.id, salt.id, 5).await;
        put_in_cart(&db, alice.id, soup.id).await;
        put_in_cart(&db, bob.id, soup.id).await;
        // Alice on both sides of a subscription.
        link_subscription(&db, alice.id, bob.id).await;
        link_subscription(&db, bob.id, alice.id).await;
        link_subscription(&db, carol.id, bob.id).await;

        User::delete_by_id(alice.id).exec(&db).await.unwrap();

        assert_eq!(Recipe::find().count(&db).await.unwrap(), 0);
        assert_eq!(IngredientRecipe::find().count(&db).await.unwrap(), 0);
        assert_eq!(ShoppingCart::find().count(&db).await.unwrap(), 0);
        let remaining = Subscription::find().all(&db).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!((remaining[0].user_id, remaining[0].author_id), (carol.id, bob.id));
        assert_eq!(User::find().count(&db).await.unwrap(), 2);
    }
}
