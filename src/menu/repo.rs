use anyhow::Context;
use async_trait::async_trait;

use crate::menu::repo_types::{FoodCategory, MenuItem, MenuItemUpdate, NewMenuItem};
use crate::store::PgStore;

#[async_trait]
pub trait MenuRepo: Send + Sync {
    async fn find_category_by_name(&self, name: &str) -> anyhow::Result<Option<FoodCategory>>;
    async fn list_categories(&self) -> anyhow::Result<Vec<FoodCategory>>;
    async fn list_menu_items(&self) -> anyhow::Result<Vec<MenuItem>>;
    async fn list_menu_items_by_category(&self, category_id: i64) -> anyhow::Result<Vec<MenuItem>>;
    async fn find_menu_item(&self, id: i64) -> anyhow::Result<Option<MenuItem>>;
    async fn find_menu_item_by_name(&self, name: &str) -> anyhow::Result<Option<MenuItem>>;
    async fn create_menu_item(&self, item: NewMenuItem) -> anyhow::Result<MenuItem>;
    async fn update_menu_item(
        &self,
        id: i64,
        update: MenuItemUpdate,
    ) -> anyhow::Result<Option<MenuItem>>;
    async fn delete_menu_item(&self, id: i64) -> anyhow::Result<bool>;
}

const MENU_ITEM_SELECT: &str = r#"
    SELECT m.id, m.name, m.description, m.price, m.category_id, c.name AS category,
           m.availability_status, m.dietary_restriction, m.spice_level,
           m.regional_preference, m.is_sweet
      FROM menu_items m
      JOIN food_categories c ON c.id = m.category_id
"#;

#[async_trait]
impl MenuRepo for PgStore {
    async fn find_category_by_name(&self, name: &str) -> anyhow::Result<Option<FoodCategory>> {
        let row = sqlx::query_as::<_, FoodCategory>(
            "SELECT id, name FROM food_categories WHERE lower(name) = lower($1)",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await
        .context("find category by name")?;
        Ok(row)
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<FoodCategory>> {
        let rows = sqlx::query_as::<_, FoodCategory>("SELECT id, name FROM food_categories ORDER BY id")
            .fetch_all(&self.db)
            .await
            .context("list categories")?;
        Ok(rows)
    }

    async fn list_menu_items(&self) -> anyhow::Result<Vec<MenuItem>> {
        let rows = sqlx::query_as::<_, MenuItem>(&format!("{MENU_ITEM_SELECT} ORDER BY m.id"))
            .fetch_all(&self.db)
            .await
            .context("list menu items")?;
        Ok(rows)
    }

    async fn list_menu_items_by_category(&self, category_id: i64) -> anyhow::Result<Vec<MenuItem>> {
        let rows = sqlx::query_as::<_, MenuItem>(&format!(
            "{MENU_ITEM_SELECT} WHERE m.category_id = $1 ORDER BY m.id"
        ))
        .bind(category_id)
        .fetch_all(&self.db)
        .await
        .context("list menu items by category")?;
        Ok(rows)
    }

    async fn find_menu_item(&self, id: i64) -> anyhow::Result<Option<MenuItem>> {
        let row = sqlx::query_as::<_, MenuItem>(&format!("{MENU_ITEM_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find menu item")?;
        Ok(row)
    }

    async fn find_menu_item_by_name(&self, name: &str) -> anyhow::Result<Option<MenuItem>> {
        let row = sqlx::query_as::<_, MenuItem>(&format!(
            "{MENU_ITEM_SELECT} WHERE lower(m.name) = lower($1)"
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await
        .context("find menu item by name")?;
        Ok(row)
    }

    async fn create_menu_item(&self, item: NewMenuItem) -> anyhow::Result<MenuItem> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO menu_items (name, description, price, category_id, availability_status,
                                    dietary_restriction, spice_level, regional_preference, is_sweet)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.category_id)
        .bind(item.availability_status)
        .bind(item.dietary_restriction)
        .bind(item.spice_level)
        .bind(item.regional_preference)
        .bind(item.is_sweet)
        .fetch_one(&self.db)
        .await
        .context("insert menu item")?;

        self.find_menu_item(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("menu item {id} vanished after insert"))
    }

    async fn update_menu_item(
        &self,
        id: i64,
        update: MenuItemUpdate,
    ) -> anyhow::Result<Option<MenuItem>> {
        let result = sqlx::query(
            r#"
            UPDATE menu_items
               SET description         = COALESCE($2, description),
                   price               = COALESCE($3, price),
                   category_id         = COALESCE($4, category_id),
                   availability_status = COALESCE($5, availability_status),
                   dietary_restriction = COALESCE($6, dietary_restriction),
                   spice_level         = COALESCE($7, spice_level),
                   regional_preference = COALESCE($8, regional_preference),
                   is_sweet            = COALESCE($9, is_sweet)
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.description)
        .bind(update.price)
        .bind(update.category_id)
        .bind(update.availability_status)
        .bind(update.dietary_restriction)
        .bind(update.spice_level)
        .bind(update.regional_preference)
        .bind(update.is_sweet)
        .execute(&self.db)
        .await
        .context("update menu item")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_menu_item(id).await
    }

    async fn delete_menu_item(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete menu item")?;
        Ok(result.rows_affected() > 0)
    }
}
