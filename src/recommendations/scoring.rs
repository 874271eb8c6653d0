//! Scoring primitives shared by the generator and the discard list.

use std::cmp::Ordering;

use crate::error::ServiceResult;
use crate::menu::repo_types::Meal;
use crate::recommendations::repo_types::ScoredItem;
use crate::state::AppState;

pub const DISCARD_RATING_CEILING: f64 = 2.0;
pub const DISCARD_SENTIMENT_CEILING: f64 = 25.0;

/// Arithmetic mean, 0 when there are no ratings.
pub fn mean_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64
}

/// Running sentiment update: the new classifier output is averaged with the
/// stored value, not with the full history.
pub fn blend_sentiment(existing: Option<f64>, incoming: f64) -> f64 {
    match existing {
        Some(old) => (old + incoming) / 2.0,
        None => incoming,
    }
}

/// Zero on either axis means "no data yet" and never flags an item.
pub fn is_discard_candidate(avg_rating: f64, sentiment_score: f64) -> bool {
    avg_rating > 0.0
        && avg_rating < DISCARD_RATING_CEILING
        && sentiment_score > 0.0
        && sentiment_score < DISCARD_SENTIMENT_CEILING
}

/// Stable descending sort on `(avg_rating, sentiment_score)`, first `n`,
/// each tagged with `meal`.
pub fn top_items(mut items: Vec<ScoredItem>, n: usize, meal: Meal) -> Vec<ScoredItem> {
    items.sort_by(|a, b| {
        b.avg_rating
            .partial_cmp(&a.avg_rating)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.sentiment_score
                    .partial_cmp(&a.sentiment_score)
                    .unwrap_or(Ordering::Equal)
            })
    });
    items.truncate(n);
    for item in &mut items {
        item.meal = meal;
    }
    items
}

/// Recomputed from every feedback row on each call.
pub async fn average_rating(st: &AppState, menu_item_id: i64) -> ServiceResult<f64> {
    let ratings = st.store.list_ratings(menu_item_id).await?;
    Ok(mean_rating(&ratings))
}

pub async fn sentiment_aggregate(st: &AppState, menu_item_id: i64) -> ServiceResult<f64> {
    Ok(st
        .store
        .find_sentiment(menu_item_id)
        .await?
        .map(|s| s.score)
        .unwrap_or(0.0))
}

pub async fn scores_for(st: &AppState, menu_item_id: i64) -> ServiceResult<(f64, f64)> {
    Ok((
        average_rating(st, menu_item_id).await?,
        sentiment_aggregate(st, menu_item_id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::repo_types::{DietaryRestriction, MenuItem, RegionalPreference, SpiceLevel};

    fn scored(id: i64, avg: f64, sentiment: f64) -> ScoredItem {
        ScoredItem {
            menu_item: MenuItem {
                id,
                name: format!("item-{id}"),
                description: String::new(),
                price: 10.0,
                category_id: 1,
                category: "Breakfast".into(),
                availability_status: true,
                dietary_restriction: DietaryRestriction::Vegetarian,
                spice_level: SpiceLevel::Medium,
                regional_preference: RegionalPreference::Other,
                is_sweet: false,
            },
            avg_rating: avg,
            sentiment_score: sentiment,
            meal: Meal::Breakfast,
        }
    }

    #[test]
    fn mean_of_no_ratings_is_zero() {
        assert_eq!(mean_rating(&[]), 0.0);
        assert_eq!(mean_rating(&[1, 2]), 1.5);
    }

    #[test]
    fn sentiment_blend_averages_with_previous_value() {
        assert_eq!(blend_sentiment(Some(40.0), 80.0), 60.0);
        assert_eq!(blend_sentiment(None, 80.0), 80.0);
    }

    #[test]
    fn discard_classification() {
        assert!(is_discard_candidate(1.5, 10.0));
        assert!(!is_discard_candidate(0.0, 10.0));
        assert!(!is_discard_candidate(1.5, 0.0));
        assert!(!is_discard_candidate(2.0, 10.0));
        assert!(!is_discard_candidate(1.0, 25.0));
    }

    #[test]
    fn top_items_orders_by_rating_then_sentiment_stably() {
        let items = vec![
            scored(1, 3.0, 50.0),
            scored(2, 4.0, 10.0),
            scored(3, 4.0, 90.0),
            scored(4, 3.0, 50.0),
        ];
        let top = top_items(items, 3, Meal::Dinner);
        let ids: Vec<i64> = top.iter().map(|s| s.menu_item.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert!(top.iter().all(|s| s.meal == Meal::Dinner));
    }

    #[test]
    fn top_items_keeps_original_order_on_full_ties() {
        let items = vec![scored(7, 0.0, 0.0), scored(5, 0.0, 0.0), scored(6, 0.0, 0.0)];
        let ids: Vec<i64> = top_items(items, 2, Meal::Lunch)
            .iter()
            .map(|s| s.menu_item.id)
            .collect();
        assert_eq!(ids, vec![7, 5]);
    }
}
