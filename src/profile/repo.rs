use anyhow::Context;
use async_trait::async_trait;

use crate::profile::repo_types::{UserProfileQuestion, UserProfileResponse};
use crate::store::PgStore;

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn list_profile_questions(&self) -> anyhow::Result<Vec<UserProfileQuestion>>;
    async fn list_profile_responses(&self, user_id: i64) -> anyhow::Result<Vec<UserProfileResponse>>;

    /// Inserts or replaces the user's answer to `question_id`.
    async fn save_profile_response(
        &self,
        user_id: i64,
        question_id: i64,
        response: &str,
    ) -> anyhow::Result<UserProfileResponse>;
}

#[async_trait]
impl ProfileRepo for PgStore {
    async fn list_profile_questions(&self) -> anyhow::Result<Vec<UserProfileQuestion>> {
        let rows = sqlx::query_as::<_, UserProfileQuestion>(
            r#"
            SELECT id, topic, question_text, options
              FROM user_profile_questions
             ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list profile questions")?;
        Ok(rows)
    }

    async fn list_profile_responses(&self, user_id: i64) -> anyhow::Result<Vec<UserProfileResponse>> {
        let rows = sqlx::query_as::<_, UserProfileResponse>(
            r#"
            SELECT id, user_id, question_id, response
              FROM user_profile_responses
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list profile responses")?;
        Ok(rows)
    }

    async fn save_profile_response(
        &self,
        user_id: i64,
        question_id: i64,
        response: &str,
    ) -> anyhow::Result<UserProfileResponse> {
        let row = sqlx::query_as::<_, UserProfileResponse>(
            r#"
            INSERT INTO user_profile_responses (user_id, question_id, response)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, question_id) DO UPDATE SET response = EXCLUDED.response
            RETURNING id, user_id, question_id, response
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .bind(response)
        .fetch_one(&self.db)
        .await
        .context("upsert profile response")?;
        Ok(row)
    }
}
