use std::fmt::Write as _;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, RelationTrait,
};

use crate::db::entities::{
    ingredient, ingredient_recipe,
    prelude::{IngredientRecipe, ShoppingCart},
    shopping_cart,
};

/// One aggregated line of a shopping list.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Sums ingredient amounts over every recipe in the user's cart, grouped by
/// ingredient name and unit, ordered by name then unit.
pub async fn shopping_list_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<ShoppingListItem>, DbErr> {
    let cart = ShoppingCart::find()
        .select_only()
        .column(shopping_cart::Column::RecipeId)
        .filter(shopping_cart::Column::UserId.eq(user_id))
        .into_query();

    IngredientRecipe::find()
        .select_only()
        .column_as(ingredient::Column::Name, "name")
        .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
        .column_as(ingredient_recipe::Column::Amount.sum(), "total_amount")
        .join(JoinType::InnerJoin, ingredient_recipe::Relation::Ingredient.def())
        .filter(ingredient_recipe::Column::RecipeId.in_subquery(cart))
        .group_by(ingredient::Column::Name)
        .group_by(ingredient::Column::MeasurementUnit)
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::MeasurementUnit)
        .into_model::<ShoppingListItem>()
        .all(db)
        .await
}

/// Plain-text rendering: one `name(unit) - total` line per item.
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let mut out = String::new();
    for item in items {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}({}) - {}", item.name, item.measurement_unit, item.total_amount);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{
        insert_ingredient, insert_recipe, insert_user, link_ingredient, put_in_cart, setup_db,
    };

    #[tokio::test]
    async fn test_amounts_are_summed_across_cart() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let salt = insert_ingredient(&db, "Salt", "g").await;
        let soup = insert_recipe(&db, alice.id, "Soup").await;
        let stew = insert_recipe(&db, alice.id, "Stew").await;
        link_ingredient(&db, soup.id, salt.id, 5).await;
        link_ingredient(&db, stew.id, salt.id, 10).await;
        put_in_cart(&db, alice.id, soup.id).await;
        put_in_cart(&db, alice.id, stew.id).await;

        let items = shopping_list_for_user(&db, alice.id).await.unwrap();
        assert_eq!(
            items,
            vec![ShoppingListItem {
                name: "Salt".to_string(),
                measurement_unit: "g".to_string(),
                total_amount: 15,
            }]
        );
        assert_eq!(render_shopping_list(&items), "Salt(g) - 15\n");
    }

    #[tokio::test]
    async fn test_empty_cart_renders_empty_document() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let salt = insert_ingredient(&db, "Salt", "g").await;
        let soup = insert_recipe(&db, bob.id, "Soup").await;
        link_ingredient(&db, soup.id, salt.id, 5).await;
        // Bob's cart does not leak into Alice's list.
        put_in_cart(&db, bob.id, soup.id).await;

        let items = shopping_list_for_user(&db, alice.id).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(render_shopping_list(&items), "");
    }

    #[tokio::test]
    async fn test_units_are_kept_apart_and_sorted() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice").await;
        let sugar_g = insert_ingredient(&db, "Sugar", "g").await;
        let sugar_spoon = insert_ingredient(&db, "Sugar", "tbsp").await;
        let eggs = insert_ingredient(&db, "Eggs", "pcs").await;
        let cake = insert_recipe(&db, alice.id, "Cake").await;
        link_ingredient(&db, cake.id, sugar_spoon.id, 2).await;
        link_ingredient(&db, cake.id, sugar_g.id, 200).await;
        link_ingredient(&db, cake.id, eggs.id, 3).await;
        put_in_cart(&db, alice.id, cake.id).await;

        let items = shopping_list_for_user(&db, alice.id).await.unwrap();
        assert_eq!(
            render_shopping_list(&items),
            "Eggs(pcs) - 3\nSugar(g) - 200\nSugar(tbsp) - 2\n"
        );
    }
}
