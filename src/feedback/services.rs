use tracing::{info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::feedback::repo_types::NewFeedback;
use crate::menu::dto::parse_id;
use crate::menu::repo_types::Meal;
use crate::recommendations::scoring::blend_sentiment;
use crate::state::AppState;

#[derive(Debug)]
pub enum VoteOutcome {
    Cast,
    AlreadyVoted,
}

#[derive(Debug)]
pub enum FeedbackOutcome {
    /// `sentiment` is the item's new aggregate, `None` if classification failed.
    Recorded { sentiment: Option<f64> },
    RatingOutOfRange,
}

/// `Meal,SelectedRecommendationId`
pub fn parse_vote_input(line: &str) -> Result<(Meal, i64), String> {
    let (meal, id) = line
        .split_once(',')
        .ok_or_else(|| "Please use the format \"Meal,SelectedRecommendationId\".".to_string())?;
    let meal = meal.trim().parse::<Meal>()?;
    Ok((meal, parse_id(id)?))
}

/// `menuItemId;rating;comment`, the comment may itself contain `;`.
pub fn parse_feedback_input(line: &str) -> Result<(i64, i32, String), String> {
    let mut parts = line.splitn(3, ';');
    let (Some(id), Some(rating), Some(comment)) = (parts.next(), parts.next(), parts.next()) else {
        return Err("Please use the format \"menuItemId;rating;comment\".".into());
    };
    let id = parse_id(id)?;
    let rating = rating
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("Invalid rating {:?}. Enter a whole number.", rating.trim()))?;
    Ok((id, rating, comment.trim().to_string()))
}

#[instrument(skip(st))]
pub async fn cast_vote(
    st: &AppState,
    user_id: i64,
    selected_recommendation_id: i64,
    meal: Meal,
) -> ServiceResult<VoteOutcome> {
    let today = st.calendar.today();
    if st.store.find_vote(user_id, meal, today).await?.is_some() {
        info!("vote already cast");
        return Ok(VoteOutcome::AlreadyVoted);
    }

    let selected = st
        .store
        .find_selected(selected_recommendation_id)
        .await?
        .ok_or_else(|| {
            ServiceError::not_found(format!("Selected recommendation {selected_recommendation_id}"))
        })?;
    if selected.day != today || selected.meal != meal {
        return Err(ServiceError::invalid(format!(
            "Item {selected_recommendation_id} is not on today's {meal} list. Please enter Meal,SelectedRecommendationId:"
        )));
    }

    match st
        .store
        .insert_vote(user_id, selected.id, meal, today, st.calendar.now())
        .await?
    {
        Some(vote) => {
            info!(vote_id = vote.id, "vote cast");
            Ok(VoteOutcome::Cast)
        }
        // Lost the race against a concurrent vote from the same user.
        None => Ok(VoteOutcome::AlreadyVoted),
    }
}

#[instrument(skip(st, comment))]
pub async fn give_feedback(
    st: &AppState,
    user_id: i64,
    menu_item_id: i64,
    rating: i32,
    comment: &str,
) -> ServiceResult<FeedbackOutcome> {
    if !(1..=5).contains(&rating) {
        warn!("rating out of range");
        return Ok(FeedbackOutcome::RatingOutOfRange);
    }
    st.store
        .find_menu_item(menu_item_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Menu item {menu_item_id}")))?;

    // Wait for the classifier before writing anything.
    let model = st.sentiment.model().await?;

    let now = st.calendar.now();
    let feedback = st
        .store
        .insert_feedback(NewFeedback {
            user_id,
            menu_item_id,
            rating,
            comment: comment.to_string(),
            created_at: now,
        })
        .await?;
    info!(feedback_id = feedback.id, "feedback recorded");

    let incoming = match model.classify(comment).await {
        Ok(r) => r.to_score(),
        Err(e) => {
            warn!(feedback_id = feedback.id, error = %format!("{e:#}"), "sentiment classification failed; score unchanged");
            return Ok(FeedbackOutcome::Recorded { sentiment: None });
        }
    };
    let existing = st.store.find_sentiment(menu_item_id).await?.map(|s| s.score);
    let blended = blend_sentiment(existing, incoming);
    st.store.save_sentiment(menu_item_id, blended, now).await?;
    info!(incoming, blended, "sentiment updated");

    Ok(FeedbackOutcome::Recorded { sentiment: Some(blended) })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::feedback::sentiment::testing::ScriptedSentiment;
    use crate::feedback::sentiment::{SentimentClassifier, SentimentModel, StarRating};
    use crate::menu::dto::MenuItemDetails;
    use crate::menu::services::add_menu_item;

    async fn item(st: &AppState, line: &str) -> i64 {
        add_menu_item(st, MenuItemDetails::parse(line).unwrap())
            .await
            .unwrap()
            .id
    }

    #[test]
    fn input_parsers() {
        assert_eq!(parse_vote_input("lunch, 4").unwrap(), (Meal::Lunch, 4));
        assert!(parse_vote_input("Brunch,4").is_err());
        assert!(parse_vote_input("Lunch").is_err());

        let (id, rating, comment) = parse_feedback_input("3;5;Great; would eat again, twice").unwrap();
        assert_eq!((id, rating), (3, 5));
        assert_eq!(comment, "Great; would eat again, twice");
        assert!(parse_feedback_input("3;five;ok").is_err());
        assert!(parse_feedback_input("3;5").is_err());
    }

    #[tokio::test]
    async fn only_first_vote_per_meal_counts() {
        let st = AppState::fake();
        let idli = item(&st, "Idli|Steamed|20|Breakfast").await;
        let today = st.calendar.today();
        let batch = st
            .store
            .insert_selected_batch(today, &[(Meal::Breakfast, idli)], st.calendar.now())
            .await
            .unwrap()
            .unwrap();
        let sr = batch[0].id;

        assert!(matches!(
            cast_vote(&st, 7, sr, Meal::Breakfast).await.unwrap(),
            VoteOutcome::Cast
        ));
        assert!(matches!(
            cast_vote(&st, 7, sr, Meal::Breakfast).await.unwrap(),
            VoteOutcome::AlreadyVoted
        ));
        assert!(matches!(
            cast_vote(&st, 8, sr, Meal::Breakfast).await.unwrap(),
            VoteOutcome::Cast
        ));

        let votes = st.store.list_votes(today).await.unwrap();
        assert_eq!(votes.iter().filter(|v| v.user_id == 7).count(), 1);
        assert_eq!(votes.len(), 2);
    }

    #[tokio::test]
    async fn vote_must_match_meal_and_exist() {
        let st = AppState::fake();
        let idli = item(&st, "Idli|Steamed|20|Breakfast").await;
        let batch = st
            .store
            .insert_selected_batch(st.calendar.today(), &[(Meal::Breakfast, idli)], st.calendar.now())
            .await
            .unwrap()
            .unwrap();

        let wrong_meal = cast_vote(&st, 1, batch[0].id, Meal::Dinner).await.unwrap_err();
        assert!(matches!(wrong_meal, ServiceError::Invalid(_)));
        let missing = cast_vote(&st, 1, 999, Meal::Dinner).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn ratings_outside_one_to_five_persist_nothing() {
        let st = AppState::fake();
        let dosa = item(&st, "Dosa|Crispy|40|Breakfast").await;

        for rating in [0, 6] {
            assert!(matches!(
                give_feedback(&st, 1, dosa, rating, "meh").await.unwrap(),
                FeedbackOutcome::RatingOutOfRange
            ));
        }
        assert!(st.store.list_ratings(dosa).await.unwrap().is_empty());

        for rating in [1, 5] {
            assert!(matches!(
                give_feedback(&st, 1, dosa, rating, "fine").await.unwrap(),
                FeedbackOutcome::Recorded { .. }
            ));
        }
        assert_eq!(st.store.list_ratings(dosa).await.unwrap(), vec![1, 5]);
    }

    #[tokio::test]
    async fn sentiment_is_averaged_with_previous_value() {
        let st = AppState::fake_with_sentiment(ScriptedSentiment::new([40.0, 80.0], 50.0));
        let thali = item(&st, "Thali|Full meal|120|Lunch").await;

        give_feedback(&st, 1, thali, 2, "too salty").await.unwrap();
        assert_eq!(st.store.find_sentiment(thali).await.unwrap().unwrap().score, 40.0);

        let outcome = give_feedback(&st, 2, thali, 5, "loved it").await.unwrap();
        let FeedbackOutcome::Recorded { sentiment, .. } = outcome else {
            panic!("feedback should be recorded");
        };
        assert_eq!(sentiment, Some(60.0));
        assert_eq!(st.store.find_sentiment(thali).await.unwrap().unwrap().score, 60.0);
    }

    #[tokio::test]
    async fn unavailable_classifier_leaves_no_feedback() {
        let mut st = AppState::fake();
        st.sentiment = SentimentClassifier::initialize(|| async {
            Err::<Arc<dyn SentimentModel>, _>(anyhow::anyhow!("model offline"))
        });
        let dosa = item(&st, "Dosa|Crispy|40|Breakfast").await;

        let err = give_feedback(&st, 1, dosa, 4, "nice").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(st.store.list_ratings(dosa).await.unwrap().is_empty());
    }

    struct Flaky;

    #[async_trait]
    impl SentimentModel for Flaky {
        async fn classify(&self, _text: &str) -> anyhow::Result<StarRating> {
            anyhow::bail!("timeout")
        }
    }

    #[tokio::test]
    async fn failed_classification_keeps_feedback() {
        let st = AppState::fake_with_sentiment(Arc::new(Flaky));
        let dosa = item(&st, "Dosa|Crispy|40|Breakfast").await;

        let outcome = give_feedback(&st, 1, dosa, 3, "ok").await.unwrap();
        assert!(matches!(outcome, FeedbackOutcome::Recorded { sentiment: None, .. }));
        assert_eq!(st.store.list_ratings(dosa).await.unwrap(), vec![3]);
        assert!(st.store.find_sentiment(dosa).await.unwrap().is_none());
    }
}
