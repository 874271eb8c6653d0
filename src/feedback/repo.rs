use anyhow::Context;
use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::feedback::repo_types::{Feedback, NewFeedback, SentimentScore, Vote};
use crate::menu::repo_types::Meal;
use crate::store::PgStore;

#[async_trait]
pub trait FeedbackRepo: Send + Sync {
    async fn find_vote(&self, user_id: i64, meal: Meal, day: Date) -> anyhow::Result<Option<Vote>>;

    /// Conditional insert keyed on (user, meal, day); `None` when a vote exists.
    async fn insert_vote(
        &self,
        user_id: i64,
        selected_recommendation_id: i64,
        meal: Meal,
        day: Date,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vote>>;

    async fn list_votes(&self, day: Date) -> anyhow::Result<Vec<Vote>>;
    async fn insert_feedback(&self, feedback: NewFeedback) -> anyhow::Result<Feedback>;
    async fn list_ratings(&self, menu_item_id: i64) -> anyhow::Result<Vec<i32>>;
    async fn find_sentiment(&self, menu_item_id: i64) -> anyhow::Result<Option<SentimentScore>>;

    /// Replaces the item's score (creating the row when absent).
    async fn save_sentiment(
        &self,
        menu_item_id: i64,
        score: f64,
        at: OffsetDateTime,
    ) -> anyhow::Result<SentimentScore>;
}

#[async_trait]
impl FeedbackRepo for PgStore {
    async fn find_vote(&self, user_id: i64, meal: Meal, day: Date) -> anyhow::Result<Option<Vote>> {
        let row = sqlx::query_as::<_, Vote>(
            r#"
            SELECT id, user_id, selected_recommendation_id, meal, day, created_at
              FROM votes
             WHERE user_id = $1 AND meal = $2 AND day = $3
            "#,
        )
        .bind(user_id)
        .bind(meal)
        .bind(day)
        .fetch_optional(&self.db)
        .await
        .context("find vote")?;
        Ok(row)
    }

    async fn insert_vote(
        &self,
        user_id: i64,
        selected_recommendation_id: i64,
        meal: Meal,
        day: Date,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vote>> {
        let row = sqlx::query_as::<_, Vote>(
            r#"
            INSERT INTO votes (user_id, selected_recommendation_id, meal, day, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, meal, day) DO NOTHING
            RETURNING id, user_id, selected_recommendation_id, meal, day, created_at
            "#,
        )
        .bind(user_id)
        .bind(selected_recommendation_id)
        .bind(meal)
        .bind(day)
        .bind(at)
        .fetch_optional(&self.db)
        .await
        .context("insert vote")?;
        Ok(row)
    }

    async fn list_votes(&self, day: Date) -> anyhow::Result<Vec<Vote>> {
        let rows = sqlx::query_as::<_, Vote>(
            r#"
            SELECT id, user_id, selected_recommendation_id, meal, day, created_at
              FROM votes
             WHERE day = $1
            "#,
        )
        .bind(day)
        .fetch_all(&self.db)
        .await
        .context("list votes by day")?;
        Ok(rows)
    }

    async fn insert_feedback(&self, feedback: NewFeedback) -> anyhow::Result<Feedback> {
        let row = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (user_id, menu_item_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, menu_item_id, rating, comment, created_at
            "#,
        )
        .bind(feedback.user_id)
        .bind(feedback.menu_item_id)
        .bind(feedback.rating)
        .bind(&feedback.comment)
        .bind(feedback.created_at)
        .fetch_one(&self.db)
        .await
        .context("insert feedback")?;
        Ok(row)
    }

    async fn list_ratings(&self, menu_item_id: i64) -> anyhow::Result<Vec<i32>> {
        let rows: Vec<(i32,)> = sqlx::query_as("SELECT rating FROM feedback WHERE menu_item_id = $1")
            .bind(menu_item_id)
            .fetch_all(&self.db)
            .await
            .context("list ratings")?;
        Ok(rows.into_iter().map(|(r,)| r).collect())
    }

    async fn find_sentiment(&self, menu_item_id: i64) -> anyhow::Result<Option<SentimentScore>> {
        let row = sqlx::query_as::<_, SentimentScore>(
            "SELECT id, menu_item_id, score, updated_at FROM sentiment_scores WHERE menu_item_id = $1",
        )
        .bind(menu_item_id)
        .fetch_optional(&self.db)
        .await
        .context("find sentiment score")?;
        Ok(row)
    }

    async fn save_sentiment(
        &self,
        menu_item_id: i64,
        score: f64,
        at: OffsetDateTime,
    ) -> anyhow::Result<SentimentScore> {
        let row = sqlx::query_as::<_, SentimentScore>(
            r#"
            INSERT INTO sentiment_scores (menu_item_id, score, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (menu_item_id) DO UPDATE
               SET score = EXCLUDED.score, updated_at = EXCLUDED.updated_at
            RETURNING id, menu_item_id, score, updated_at
            "#,
        )
        .bind(menu_item_id)
        .bind(score)
        .bind(at)
        .fetch_one(&self.db)
        .await
        .context("save sentiment score")?;
        Ok(row)
    }
}
