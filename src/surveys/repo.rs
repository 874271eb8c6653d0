use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;

use crate::store::PgStore;
use crate::surveys::repo_types::{DiscardedMenuItem, FeedbackForm, Question};

#[async_trait]
pub trait SurveyRepo: Send + Sync {
    /// Stores the discarded item together with its questions, in order.
    async fn insert_discarded(
        &self,
        menu_item_id: i64,
        created_at: OffsetDateTime,
        expires_at: OffsetDateTime,
        questions: &[String],
    ) -> anyhow::Result<(DiscardedMenuItem, Vec<Question>)>;

    async fn find_active_discarded_for_item(
        &self,
        menu_item_id: i64,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<DiscardedMenuItem>>;

    async fn list_active_discarded(&self, now: OffsetDateTime) -> anyhow::Result<Vec<DiscardedMenuItem>>;
    async fn find_discarded(&self, id: i64) -> anyhow::Result<Option<DiscardedMenuItem>>;
    async fn list_questions(&self, discarded_id: i64) -> anyhow::Result<Vec<Question>>;

    /// Discarded items for which `user_id` has submitted answers.
    async fn list_answered_discarded_ids(&self, user_id: i64) -> anyhow::Result<Vec<i64>>;

    /// One form per `(question_id, response)`, written atomically.
    async fn insert_feedback_forms(
        &self,
        user_id: i64,
        discarded_id: i64,
        answers: &[(i64, String)],
    ) -> anyhow::Result<Vec<FeedbackForm>>;
}

async fn insert_question_tx(
    tx: &mut Transaction<'_, Postgres>,
    discarded_id: i64,
    position: i32,
    text: &str,
) -> anyhow::Result<Question> {
    let row = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (discarded_menu_item_id, position, question_text)
        VALUES ($1, $2, $3)
        RETURNING id, discarded_menu_item_id, position, question_text
        "#,
    )
    .bind(discarded_id)
    .bind(position)
    .bind(text)
    .fetch_one(&mut **tx)
    .await
    .context("insert survey question")?;
    Ok(row)
}

#[async_trait]
impl SurveyRepo for PgStore {
    async fn insert_discarded(
        &self,
        menu_item_id: i64,
        created_at: OffsetDateTime,
        expires_at: OffsetDateTime,
        questions: &[String],
    ) -> anyhow::Result<(DiscardedMenuItem, Vec<Question>)> {
        let mut tx = self.db.begin().await.context("begin discard")?;
        let discarded = sqlx::query_as::<_, DiscardedMenuItem>(
            r#"
            INSERT INTO discarded_menu_items (menu_item_id, created_at, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, menu_item_id, created_at, expires_at
            "#,
        )
        .bind(menu_item_id)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .context("insert discarded menu item")?;

        let mut rows = Vec::with_capacity(questions.len());
        for (position, text) in questions.iter().enumerate() {
            rows.push(insert_question_tx(&mut tx, discarded.id, position as i32, text).await?);
        }
        tx.commit().await.context("commit discard")?;
        Ok((discarded, rows))
    }

    async fn find_active_discarded_for_item(
        &self,
        menu_item_id: i64,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<DiscardedMenuItem>> {
        let row = sqlx::query_as::<_, DiscardedMenuItem>(
            r#"
            SELECT id, menu_item_id, created_at, expires_at
              FROM discarded_menu_items
             WHERE menu_item_id = $1 AND expires_at > $2
             ORDER BY id DESC
             LIMIT 1
            "#,
        )
        .bind(menu_item_id)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("find active discarded item")?;
        Ok(row)
    }

    async fn list_active_discarded(&self, now: OffsetDateTime) -> anyhow::Result<Vec<DiscardedMenuItem>> {
        let rows = sqlx::query_as::<_, DiscardedMenuItem>(
            r#"
            SELECT id, menu_item_id, created_at, expires_at
              FROM discarded_menu_items
             WHERE expires_at > $1
             ORDER BY id
            "#,
        )
        .bind(now)
        .fetch_all(&self.db)
        .await
        .context("list active discarded items")?;
        Ok(rows)
    }

    async fn find_discarded(&self, id: i64) -> anyhow::Result<Option<DiscardedMenuItem>> {
        let row = sqlx::query_as::<_, DiscardedMenuItem>(
            r#"
            SELECT id, menu_item_id, created_at, expires_at
              FROM discarded_menu_items
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find discarded item")?;
        Ok(row)
    }

    async fn list_questions(&self, discarded_id: i64) -> anyhow::Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, discarded_menu_item_id, position, question_text
              FROM questions
             WHERE discarded_menu_item_id = $1
             ORDER BY position
            "#,
        )
        .bind(discarded_id)
        .fetch_all(&self.db)
        .await
        .context("list survey questions")?;
        Ok(rows)
    }

    async fn list_answered_discarded_ids(&self, user_id: i64) -> anyhow::Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT discarded_menu_item_id
              FROM feedback_forms
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list answered surveys")?;
        Ok(ids)
    }

    async fn insert_feedback_forms(
        &self,
        user_id: i64,
        discarded_id: i64,
        answers: &[(i64, String)],
    ) -> anyhow::Result<Vec<FeedbackForm>> {
        let mut tx = self.db.begin().await.context("begin survey answers")?;
        let mut rows = Vec::with_capacity(answers.len());
        for (question_id, response) in answers {
            let row = sqlx::query_as::<_, FeedbackForm>(
                r#"
                INSERT INTO feedback_forms (user_id, discarded_menu_item_id, question_id, response)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, question_id) DO NOTHING
                RETURNING id, user_id, discarded_menu_item_id, question_id, response
                "#,
            )
            .bind(user_id)
            .bind(discarded_id)
            .bind(question_id)
            .bind(response)
            .fetch_optional(&mut *tx)
            .await
            .context("insert feedback form")?;
            rows.extend(row);
        }
        tx.commit().await.context("commit survey answers")?;
        Ok(rows)
    }
}
