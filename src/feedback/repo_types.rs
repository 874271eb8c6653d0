use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::menu::repo_types::Meal;

/// At most one per (user, meal, day), enforced by the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vote {
    pub id: i64,
    pub user_id: i64,
    pub selected_recommendation_id: i64,
    pub meal: Meal,
    pub day: Date,
    pub created_at: OffsetDateTime,
}

/// Append-only rating + comment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    pub menu_item_id: i64,
    pub rating: i32,
    pub comment: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub user_id: i64,
    pub menu_item_id: i64,
    pub rating: i32,
    pub comment: String,
    pub created_at: OffsetDateTime,
}

/// One row per menu item, overwritten on each new feedback.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SentimentScore {
    pub id: i64,
    pub menu_item_id: i64,
    pub score: f64,
    pub updated_at: OffsetDateTime,
}
