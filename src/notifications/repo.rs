use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;

use crate::notifications::repo_types::Notification;
use crate::store::PgStore;

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn create_notification(
        &self,
        content: &str,
        role_id: i64,
        created_at: OffsetDateTime,
        expiry_date: OffsetDateTime,
    ) -> anyhow::Result<Notification>;

    /// Notifications for a role created after `since` (all when `None`)
    /// and still unexpired at `now`.
    async fn list_notifications_for_role(
        &self,
        role_id: i64,
        since: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<Notification>>;
}

#[async_trait]
impl NotificationRepo for PgStore {
    async fn create_notification(
        &self,
        content: &str,
        role_id: i64,
        created_at: OffsetDateTime,
        expiry_date: OffsetDateTime,
    ) -> anyhow::Result<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (content, role_id, created_at, expiry_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, content, role_id, created_at, expiry_date
            "#,
        )
        .bind(content)
        .bind(role_id)
        .bind(created_at)
        .bind(expiry_date)
        .fetch_one(&self.db)
        .await
        .context("insert notification")?;
        Ok(row)
    }

    async fn list_notifications_for_role(
        &self,
        role_id: i64,
        since: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, content, role_id, created_at, expiry_date
              FROM notifications
             WHERE role_id = $1
               AND ($2::timestamptz IS NULL OR created_at > $2)
               AND expiry_date > $3
             ORDER BY created_at ASC
            "#,
        )
        .bind(role_id)
        .bind(since)
        .bind(now)
        .fetch_all(&self.db)
        .await
        .context("list notifications for role")?;
        Ok(rows)
    }
}
