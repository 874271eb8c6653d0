use tracing::{debug, info, warn};

use crate::auth::repo_types::{RoleKind, User};
use crate::error::ServiceResult;
use crate::notifications::repo_types::Notification;
use crate::state::AppState;

pub const MENU_ROLLED_OUT: &str =
    "Menu items have been rolled out for today. Please cast your vote!";
pub const MENU_FINALIZED: &str = "Today's menu has been finalized. Check the prepared items!";

/// Fire-and-forget broadcast to every member of `role`; expires at end of day.
pub async fn notify_role(st: &AppState, role: RoleKind, content: &str) -> ServiceResult<()> {
    let Some(role_row) = st.store.find_role_by_name(role.name()).await? else {
        warn!(role = role.name(), "notification target role missing");
        return Ok(());
    };
    let now = st.calendar.now();
    let expiry = st.calendar.end_of_day(st.calendar.day_of(now));
    let n = st
        .store
        .create_notification(content, role_row.id, now, expiry)
        .await?;
    info!(notification_id = n.id, role = role.name(), "notification created");
    Ok(())
}

/// Notifications created since the user's last logout and not yet expired.
pub async fn unread_for(st: &AppState, user: &User) -> ServiceResult<Vec<Notification>> {
    let rows = st
        .store
        .list_notifications_for_role(user.role_id, user.logout_time, st.calendar.now())
        .await?;
    debug!(user_id = user.id, count = rows.len(), "notifications loaded");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::{add_user, logout};

    #[tokio::test]
    async fn role_members_see_notifications_until_they_log_out() {
        let st = AppState::fake();
        let employee = add_user(&st, "anu", "pw", "Employee").await.unwrap();
        let chef = add_user(&st, "bala", "pw", "Chef").await.unwrap();

        notify_role(&st, RoleKind::Employee, MENU_ROLLED_OUT).await.unwrap();

        let seen = unread_for(&st, &employee).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].content, MENU_ROLLED_OUT);
        assert!(unread_for(&st, &chef).await.unwrap().is_empty());

        logout(&st, &employee).await.unwrap();
        let reloaded = st.store.find_user_by_username("anu").await.unwrap().unwrap();
        assert!(unread_for(&st, &reloaded).await.unwrap().is_empty());
    }
}
