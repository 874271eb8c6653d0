use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::menu::repo_types::MenuItem;

/// Item taken off the menu while flagged for discard; open for surveys until `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiscardedMenuItem {
    pub id: i64,
    pub menu_item_id: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl DiscardedMenuItem {
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub discarded_menu_item_id: i64,
    pub position: i32,
    pub question_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackForm {
    pub id: i64,
    pub user_id: i64,
    pub discarded_menu_item_id: i64,
    pub question_id: i64,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct Survey {
    pub discarded: DiscardedMenuItem,
    pub menu_item_name: String,
}

#[derive(Debug, Clone)]
pub struct DiscardCandidate {
    pub menu_item: MenuItem,
    pub avg_rating: f64,
    pub sentiment_score: f64,
}
