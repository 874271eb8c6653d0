use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;

use crate::auth::repo_types::{Role, User};
use crate::store::PgStore;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role_id: i64,
    ) -> anyhow::Result<User>;
    async fn find_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>>;
    async fn list_roles(&self) -> anyhow::Result<Vec<Role>>;
    async fn record_login(&self, user_id: i64, at: OffsetDateTime) -> anyhow::Result<()>;
    async fn record_logout(&self, user_id: i64, at: OffsetDateTime) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = r#"
    u.id, u.username, u.password_hash, u.role_id, r.name AS role,
    u.last_login_time, u.logout_time
"#;

#[async_trait]
impl UserRepo for PgStore {
    /// Find a user (with role name) by username.
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.username = $1
            "#
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    /// Create a new user with an already hashed password.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role_id: i64,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            WITH inserted AS (
                INSERT INTO users (username, password_hash, role_id)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT {USER_COLUMNS}
            FROM inserted u
            JOIN roles r ON r.id = u.role_id
            "#
        ))
        .bind(username)
        .bind(password_hash)
        .bind(role_id)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn find_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.db)
            .await
            .context("find role by name")?;
        Ok(role)
    }

    async fn list_roles(&self) -> anyhow::Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.db)
            .await
            .context("list roles")?;
        Ok(roles)
    }

    async fn record_login(&self, user_id: i64, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login_time = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.db)
            .await
            .context("record login")?;
        Ok(())
    }

    async fn record_logout(&self, user_id: i64, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET logout_time = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.db)
            .await
            .context("record logout")?;
        Ok(())
    }
}
