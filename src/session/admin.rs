use crate::auth::services::{add_user, check_new_username, role_names};
use crate::error::{ServiceError, ServiceResult};
use crate::menu::dto::{parse_availability, parse_id, MenuItemDetails, ADD_MENU_ITEM_FORMAT};
use crate::menu::repo_types::MenuItemUpdate;
use crate::menu::services::{
    add_menu_item, delete_menu_item, get_menu_item, list_menu_items, resolve_category,
    update_menu_item,
};
use crate::session::render;
use crate::session::state::{keeps_value, SessionState, UpdateField};
use crate::session::Reply;
use crate::state::AppState;
use crate::surveys::services::{change_availability, discard_list};

pub(super) async fn command(
    st: &AppState,
    input: &str,
    out: &mut Reply,
) -> ServiceResult<SessionState> {
    match input {
        "1" => {
            out.push("Enter username for the new user:");
            Ok(SessionState::AddUserUsername)
        }
        "2" => {
            out.push(format!(
                "Enter menu item details in the format: {ADD_MENU_ITEM_FORMAT}"
            ));
            Ok(SessionState::AddMenuItemDetails)
        }
        "3" => {
            let items = list_menu_items(st).await?;
            if items.is_empty() {
                out.push("No menu items found.");
            } else {
                out.push(render::menu_items(&items));
            }
            Ok(SessionState::Authenticated)
        }
        "4" => {
            out.push("Enter the ID of the menu item to update:");
            Ok(SessionState::UpdateMenuItemId)
        }
        "5" => {
            out.push("Enter the ID of the menu item to delete:");
            Ok(SessionState::DeleteMenuItemId)
        }
        "6" => {
            let candidates = discard_list(st).await?;
            if candidates.is_empty() {
                out.push("No menu items qualify for the discard list.");
            } else {
                out.push("Discard Menu Item List:");
                out.push(render::discard_list(&candidates));
            }
            Ok(SessionState::Authenticated)
        }
        "7" => {
            out.push("Enter the menu item ID and availability, e.g. 12,false:");
            Ok(SessionState::ChangeAvailability)
        }
        _ => {
            out.push("Unknown command.");
            Ok(SessionState::Authenticated)
        }
    }
}

pub(super) async fn input(
    st: &AppState,
    state: SessionState,
    input: &str,
    out: &mut Reply,
) -> ServiceResult<SessionState> {
    match state {
        SessionState::AddUserUsername => {
            check_new_username(st, input).await?;
            out.push(format!("Enter password for the new user {input}:"));
            Ok(SessionState::AddUserPassword {
                username: input.to_string(),
            })
        }
        SessionState::AddUserPassword { username } => {
            if input.is_empty() {
                return Err(ServiceError::invalid(format!(
                    "Password must not be empty. Enter password for the new user {username}:"
                )));
            }
            let roles = role_names(st).await?;
            out.push(format!(
                "Enter role for the new user {username}. Available roles: {roles}:"
            ));
            Ok(SessionState::AddUserRole {
                username,
                password: input.to_string(),
            })
        }
        SessionState::AddUserRole { username, password } => {
            let user = add_user(st, &username, &password, input).await?;
            out.push(format!("User {} added successfully.", user.username));
            Ok(SessionState::Authenticated)
        }
        SessionState::AddMenuItemDetails => {
            let details = MenuItemDetails::parse(input).map_err(|e| {
                ServiceError::invalid(format!("{e} Please enter the menu item details again:"))
            })?;
            let item = add_menu_item(st, details).await?;
            out.push(format!(
                "Menu item {} added successfully with ID {}.",
                item.name, item.id
            ));
            Ok(SessionState::Authenticated)
        }
        SessionState::UpdateMenuItemId => {
            let id = parse_id(input).map_err(ServiceError::invalid)?;
            let item = get_menu_item(st, id).await?;
            let field = UpdateField::Description;
            out.push(format!("Updating {} (ID {}).", item.name, item.id));
            out.push(field.prompt(&item));
            Ok(SessionState::UpdateMenuItem {
                item,
                field,
                draft: MenuItemUpdate::default(),
            })
        }
        SessionState::UpdateMenuItem {
            item,
            field,
            mut draft,
        } => {
            if !keeps_value(input) {
                if field == UpdateField::Category {
                    draft.category_id = Some(resolve_category(st, input).await?.id);
                } else {
                    field
                        .apply(input, &mut draft)
                        .map_err(|e| ServiceError::invalid(format!("{e} {}", field.prompt(&item))))?;
                }
            }
            if let Some(next) = field.next() {
                out.push(next.prompt(&item));
                return Ok(SessionState::UpdateMenuItem {
                    item,
                    field: next,
                    draft,
                });
            }
            if draft == MenuItemUpdate::default() {
                out.push(format!("No changes made to {}.", item.name));
            } else {
                let updated = update_menu_item(st, item.id, draft).await?;
                out.push(format!("Menu item {} updated successfully.", updated.name));
            }
            Ok(SessionState::Authenticated)
        }
        SessionState::DeleteMenuItemId => {
            let id = parse_id(input).map_err(ServiceError::invalid)?;
            delete_menu_item(st, id).await?;
            out.push(format!("Menu item {id} deleted successfully."));
            Ok(SessionState::Authenticated)
        }
        SessionState::ChangeAvailability => {
            let (id, available) = parse_availability(input).map_err(ServiceError::invalid)?;
            let change = change_availability(st, id, available).await?;
            out.push(format!(
                "Menu item {} availability changed to {}.",
                change.menu_item.name, change.menu_item.availability_status
            ));
            if let Some(discarded) = change.discarded {
                out.push(format!(
                    "{} was discarded. Employees can answer survey {} until {}.",
                    change.menu_item.name,
                    discarded.id,
                    st.calendar.day_of(discarded.expires_at)
                ));
            }
            Ok(SessionState::Authenticated)
        }
        other => Ok(other),
    }
}
