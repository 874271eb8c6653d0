use tracing::{info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::menu::dto::MenuItemDetails;
use crate::menu::repo_types::{FoodCategory, MenuItem, MenuItemUpdate, NewMenuItem};
use crate::state::AppState;

pub async fn list_menu_items(st: &AppState) -> ServiceResult<Vec<MenuItem>> {
    Ok(st.store.list_menu_items().await?)
}

pub async fn get_menu_item(st: &AppState, id: i64) -> ServiceResult<MenuItem> {
    st.store
        .find_menu_item(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Menu item {id}")))
}

/// Resolves a category by name; unknown names are a retryable input error.
pub async fn resolve_category(st: &AppState, name: &str) -> ServiceResult<FoodCategory> {
    if let Some(category) = st.store.find_category_by_name(name.trim()).await? {
        return Ok(category);
    }
    let names: Vec<String> = st
        .store
        .list_categories()
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    Err(ServiceError::invalid(format!(
        "Category {:?} not found. Available categories: {}.",
        name.trim(),
        names.join(", ")
    )))
}

#[instrument(skip(st))]
pub async fn add_menu_item(st: &AppState, details: MenuItemDetails) -> ServiceResult<MenuItem> {
    if st.store.find_menu_item_by_name(&details.name).await?.is_some() {
        warn!(name = %details.name, "menu item name taken");
        return Err(ServiceError::invalid(format!(
            "A menu item named {} already exists. Please enter different details:",
            details.name
        )));
    }
    let category = resolve_category(st, &details.category).await?;
    let item = st
        .store
        .create_menu_item(NewMenuItem {
            name: details.name,
            description: details.description,
            price: details.price,
            category_id: category.id,
            availability_status: true,
            dietary_restriction: details.dietary_restriction,
            spice_level: details.spice_level,
            regional_preference: details.regional_preference,
            is_sweet: details.is_sweet,
        })
        .await?;
    info!(menu_item_id = item.id, name = %item.name, category = %item.category, "menu item added");
    Ok(item)
}

#[instrument(skip(st, update))]
pub async fn update_menu_item(
    st: &AppState,
    id: i64,
    update: MenuItemUpdate,
) -> ServiceResult<MenuItem> {
    let item = st
        .store
        .update_menu_item(id, update)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Menu item {id}")))?;
    info!(menu_item_id = item.id, "menu item updated");
    Ok(item)
}

#[instrument(skip(st))]
pub async fn delete_menu_item(st: &AppState, id: i64) -> ServiceResult<()> {
    if !st.store.delete_menu_item(id).await? {
        return Err(ServiceError::not_found(format!("Menu item {id}")));
    }
    info!(menu_item_id = id, "menu item deleted");
    Ok(())
}
