use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::{Date, OffsetDateTime};

use crate::menu::repo_types::Meal;
use crate::recommendations::repo_types::{FinalSelection, Recommendation, SelectedRecommendation};
use crate::store::{BatchKind, PgStore};

#[async_trait]
pub trait RecommendationRepo: Send + Sync {
    async fn list_recommendations(&self, day: Date) -> anyhow::Result<Vec<Recommendation>>;

    /// Writes the day's recommendation batch unless one was already claimed;
    /// `None` means another writer got there first.
    async fn insert_recommendation_batch(
        &self,
        day: Date,
        picks: &[(Meal, i64)],
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vec<Recommendation>>>;

    async fn list_selected(&self, day: Date) -> anyhow::Result<Vec<SelectedRecommendation>>;
    async fn find_selected(&self, id: i64) -> anyhow::Result<Option<SelectedRecommendation>>;

    /// Same claim semantics as `insert_recommendation_batch`.
    async fn insert_selected_batch(
        &self,
        day: Date,
        picks: &[(Meal, i64)],
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vec<SelectedRecommendation>>>;

    async fn list_final_selections(&self, day: Date) -> anyhow::Result<Vec<FinalSelection>>;

    /// `None` when the meal already has a final selection for `day`.
    async fn insert_final_selection(
        &self,
        selected_recommendation_id: i64,
        meal: Meal,
        day: Date,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<FinalSelection>>;
}

/// Claims `(kind, day)` inside `tx`. False when the claim already exists and
/// still has rows; a claim emptied by menu item deletes is taken over.
async fn claim_batch_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: BatchKind,
    day: Date,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO daily_batches (kind, day)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(kind.as_str())
    .bind(day)
    .execute(&mut **tx)
    .await
    .context("claim daily batch")?;
    if result.rows_affected() == 1 {
        return Ok(true);
    }

    // Serializes takeovers: a second writer waits here, then sees the rows.
    sqlx::query("SELECT 1 FROM daily_batches WHERE kind = $1 AND day = $2 FOR UPDATE")
        .bind(kind.as_str())
        .bind(day)
        .execute(&mut **tx)
        .await
        .context("lock daily batch claim")?;
    let table = match kind {
        BatchKind::Recommendation => "recommendations",
        BatchKind::Selection => "selected_recommendations",
    };
    let (has_rows,): (bool,) =
        sqlx::query_as(&format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE day = $1)"))
            .bind(day)
            .fetch_one(&mut **tx)
            .await
            .context("check daily batch rows")?;
    Ok(!has_rows)
}

#[async_trait]
impl RecommendationRepo for PgStore {
    async fn list_recommendations(&self, day: Date) -> anyhow::Result<Vec<Recommendation>> {
        let rows = sqlx::query_as::<_, Recommendation>(
            r#"
            SELECT id, menu_item_id, meal, day, created_at
              FROM recommendations
             WHERE day = $1
             ORDER BY meal, id
            "#,
        )
        .bind(day)
        .fetch_all(&self.db)
        .await
        .context("list recommendations by day")?;
        Ok(rows)
    }

    async fn insert_recommendation_batch(
        &self,
        day: Date,
        picks: &[(Meal, i64)],
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vec<Recommendation>>> {
        let mut tx = self.db.begin().await.context("begin recommendation batch")?;
        if !claim_batch_tx(&mut tx, BatchKind::Recommendation, day).await? {
            tx.rollback().await.ok();
            return Ok(None);
        }
        let mut rows = Vec::with_capacity(picks.len());
        for (meal, menu_item_id) in picks {
            let row = sqlx::query_as::<_, Recommendation>(
                r#"
                INSERT INTO recommendations (menu_item_id, meal, day, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, menu_item_id, meal, day, created_at
                "#,
            )
            .bind(menu_item_id)
            .bind(meal)
            .bind(day)
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .context("insert recommendation")?;
            rows.push(row);
        }
        tx.commit().await.context("commit recommendation batch")?;
        Ok(Some(rows))
    }

    async fn list_selected(&self, day: Date) -> anyhow::Result<Vec<SelectedRecommendation>> {
        let rows = sqlx::query_as::<_, SelectedRecommendation>(
            r#"
            SELECT id, menu_item_id, meal, day, created_at
              FROM selected_recommendations
             WHERE day = $1
             ORDER BY meal, id
            "#,
        )
        .bind(day)
        .fetch_all(&self.db)
        .await
        .context("list selected recommendations by day")?;
        Ok(rows)
    }

    async fn find_selected(&self, id: i64) -> anyhow::Result<Option<SelectedRecommendation>> {
        let row = sqlx::query_as::<_, SelectedRecommendation>(
            r#"
            SELECT id, menu_item_id, meal, day, created_at
              FROM selected_recommendations
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find selected recommendation")?;
        Ok(row)
    }

    async fn insert_selected_batch(
        &self,
        day: Date,
        picks: &[(Meal, i64)],
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vec<SelectedRecommendation>>> {
        let mut tx = self.db.begin().await.context("begin selection batch")?;
        if !claim_batch_tx(&mut tx, BatchKind::Selection, day).await? {
            tx.rollback().await.ok();
            return Ok(None);
        }
        let mut rows = Vec::with_capacity(picks.len());
        for (meal, menu_item_id) in picks {
            let row = sqlx::query_as::<_, SelectedRecommendation>(
                r#"
                INSERT INTO selected_recommendations (menu_item_id, meal, day, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, menu_item_id, meal, day, created_at
                "#,
            )
            .bind(menu_item_id)
            .bind(meal)
            .bind(day)
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .context("insert selected recommendation")?;
            rows.push(row);
        }
        tx.commit().await.context("commit selection batch")?;
        Ok(Some(rows))
    }

    async fn list_final_selections(&self, day: Date) -> anyhow::Result<Vec<FinalSelection>> {
        let rows = sqlx::query_as::<_, FinalSelection>(
            r#"
            SELECT id, selected_recommendation_id, meal, day, created_at
              FROM final_selections
             WHERE day = $1
             ORDER BY meal
            "#,
        )
        .bind(day)
        .fetch_all(&self.db)
        .await
        .context("list final selections by day")?;
        Ok(rows)
    }

    async fn insert_final_selection(
        &self,
        selected_recommendation_id: i64,
        meal: Meal,
        day: Date,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<FinalSelection>> {
        let row = sqlx::query_as::<_, FinalSelection>(
            r#"
            INSERT INTO final_selections (selected_recommendation_id, meal, day, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (meal, day) DO NOTHING
            RETURNING id, selected_recommendation_id, meal, day, created_at
            "#,
        )
        .bind(selected_recommendation_id)
        .bind(meal)
        .bind(day)
        .bind(at)
        .fetch_optional(&self.db)
        .await
        .context("insert final selection")?;
        Ok(row)
    }
}
