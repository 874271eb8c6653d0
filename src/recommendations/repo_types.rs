use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::menu::repo_types::{Meal, MenuItem};

/// System-generated candidate for a meal on a day. Scores are not stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recommendation {
    pub id: i64,
    pub menu_item_id: i64,
    pub meal: Meal,
    pub day: Date,
    pub created_at: OffsetDateTime,
}

/// A candidate the chef rolled out to employees.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SelectedRecommendation {
    pub id: i64,
    pub menu_item_id: i64,
    pub meal: Meal,
    pub day: Date,
    pub created_at: OffsetDateTime,
}

/// What the chef commits to cook; at most one per meal per day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FinalSelection {
    pub id: i64,
    pub selected_recommendation_id: i64,
    pub meal: Meal,
    pub day: Date,
    pub created_at: OffsetDateTime,
}

/// Menu item with freshly computed scores, tagged with the meal it serves.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub menu_item: MenuItem,
    pub avg_rating: f64,
    pub sentiment_score: f64,
    pub meal: Meal,
}

#[derive(Debug, Clone)]
pub struct SelectedItem {
    pub selection: SelectedRecommendation,
    pub menu_item: MenuItem,
}

#[derive(Debug, Clone)]
pub struct PreparedItem {
    pub final_selection: FinalSelection,
    pub menu_item: MenuItem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteTally {
    pub selected_recommendation_id: i64,
    pub menu_item_name: String,
    pub meal: Meal,
    pub votes: usize,
}

impl AsRef<MenuItem> for SelectedItem {
    fn as_ref(&self) -> &MenuItem {
        &self.menu_item
    }
}

impl AsRef<MenuItem> for PreparedItem {
    fn as_ref(&self) -> &MenuItem {
        &self.menu_item
    }
}
