use time::Duration;
use tracing::{info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::menu::repo_types::{MenuItem, MenuItemUpdate};
use crate::recommendations::scoring::{is_discard_candidate, scores_for};
use crate::state::AppState;
use crate::surveys::repo_types::{DiscardCandidate, DiscardedMenuItem, Question, Survey};

pub const SURVEY_LIFETIME: Duration = Duration::days(7);

#[derive(Debug)]
pub struct AvailabilityChange {
    pub menu_item: MenuItem,
    /// Set when turning the item off opened a new survey.
    pub discarded: Option<DiscardedMenuItem>,
}

pub fn survey_questions(item_name: &str) -> Vec<String> {
    vec![
        format!("What didn't you like about {item_name}?"),
        format!("How would you like {item_name} to taste?"),
        "Share your mom's recipe.".to_string(),
    ]
}

/// Items whose current scores flag them for discard.
pub async fn discard_list(st: &AppState) -> ServiceResult<Vec<DiscardCandidate>> {
    let mut out = Vec::new();
    for menu_item in st.store.list_menu_items().await? {
        let (avg_rating, sentiment_score) = scores_for(st, menu_item.id).await?;
        if is_discard_candidate(avg_rating, sentiment_score) {
            out.push(DiscardCandidate {
                menu_item,
                avg_rating,
                sentiment_score,
            });
        }
    }
    Ok(out)
}

#[instrument(skip(st))]
pub async fn change_availability(
    st: &AppState,
    menu_item_id: i64,
    available: bool,
) -> ServiceResult<AvailabilityChange> {
    let not_found = || ServiceError::not_found(format!("Menu item {menu_item_id}"));
    st.store.find_menu_item(menu_item_id).await?.ok_or_else(not_found)?;

    // Scores are taken before the toggle so the decision reflects the item as it was.
    let (avg_rating, sentiment_score) = scores_for(st, menu_item_id).await?;
    let menu_item = st
        .store
        .update_menu_item(
            menu_item_id,
            MenuItemUpdate {
                availability_status: Some(available),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(not_found)?;
    info!(available, "availability changed");

    if available || !is_discard_candidate(avg_rating, sentiment_score) {
        return Ok(AvailabilityChange {
            menu_item,
            discarded: None,
        });
    }

    let now = st.calendar.now();
    if let Some(open) = st.store.find_active_discarded_for_item(menu_item_id, now).await? {
        info!(discarded_id = open.id, "survey already open for item");
        return Ok(AvailabilityChange {
            menu_item,
            discarded: None,
        });
    }
    let (discarded, questions) = st
        .store
        .insert_discarded(
            menu_item_id,
            now,
            now + SURVEY_LIFETIME,
            &survey_questions(&menu_item.name),
        )
        .await?;
    info!(
        discarded_id = discarded.id,
        questions = questions.len(),
        avg_rating,
        sentiment_score,
        "menu item discarded; survey opened"
    );
    Ok(AvailabilityChange {
        menu_item,
        discarded: Some(discarded),
    })
}

/// Open surveys `user_id` has not answered yet.
pub async fn get_surveys(st: &AppState, user_id: i64) -> ServiceResult<Vec<Survey>> {
    let answered = st.store.list_answered_discarded_ids(user_id).await?;
    let mut out = Vec::new();
    for discarded in st.store.list_active_discarded(st.calendar.now()).await? {
        if answered.contains(&discarded.id) {
            continue;
        }
        let Some(item) = st.store.find_menu_item(discarded.menu_item_id).await? else {
            continue;
        };
        out.push(Survey {
            discarded,
            menu_item_name: item.name,
        });
    }
    Ok(out)
}

/// Questions of an open survey the user may still answer.
pub async fn open_survey(
    st: &AppState,
    user_id: i64,
    discarded_id: i64,
) -> ServiceResult<Vec<Question>> {
    let discarded = st
        .store
        .find_discarded(discarded_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Survey {discarded_id}")))?;
    if !discarded.is_active(st.calendar.now()) {
        return Err(ServiceError::Rejected(format!(
            "Survey {discarded_id} has expired."
        )));
    }
    if st
        .store
        .list_answered_discarded_ids(user_id)
        .await?
        .contains(&discarded_id)
    {
        return Err(ServiceError::Rejected(format!(
            "You have already completed survey {discarded_id}."
        )));
    }
    let questions = st.store.list_questions(discarded_id).await?;
    if questions.is_empty() {
        warn!(discarded_id, "survey has no questions");
        return Err(ServiceError::not_found(format!("Questions for survey {discarded_id}")));
    }
    Ok(questions)
}

#[instrument(skip(st, answers))]
pub async fn submit_survey(
    st: &AppState,
    user_id: i64,
    discarded_id: i64,
    answers: &[(i64, String)],
) -> ServiceResult<usize> {
    let forms = st
        .store
        .insert_feedback_forms(user_id, discarded_id, answers)
        .await?;
    info!(answers = forms.len(), "survey answered");
    Ok(forms.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::sentiment::testing::ScriptedSentiment;
    use crate::feedback::services::give_feedback;
    use crate::menu::dto::MenuItemDetails;
    use crate::menu::services::add_menu_item;

    async fn disliked_item(st: &AppState) -> i64 {
        let id = add_menu_item(st, MenuItemDetails::parse("Bitter Gourd|Fried|60|Lunch").unwrap())
            .await
            .unwrap()
            .id;
        give_feedback(st, 1, id, 1, "awful").await.unwrap();
        id
    }

    #[tokio::test]
    async fn discard_creates_survey_once() {
        let st = AppState::fake_with_sentiment(ScriptedSentiment::new([15.0], 15.0));
        let id = disliked_item(&st).await;
        assert_eq!(discard_list(&st).await.unwrap().len(), 1);

        let change = change_availability(&st, id, false).await.unwrap();
        assert!(!change.menu_item.availability_status);
        let discarded = change.discarded.expect("survey opened");
        let questions = st.store.list_questions(discarded.id).await.unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].question_text, "What didn't you like about Bitter Gourd?");
        assert_eq!(discarded.expires_at - discarded.created_at, SURVEY_LIFETIME);

        let again = change_availability(&st, id, false).await.unwrap();
        assert!(again.discarded.is_none());
        assert_eq!(st.store.list_active_discarded(st.calendar.now()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn enabling_or_unflagged_items_open_no_survey() {
        let st = AppState::fake_with_sentiment(ScriptedSentiment::new([90.0], 90.0));
        let id = disliked_item(&st).await;
        assert!(change_availability(&st, id, false).await.unwrap().discarded.is_none());
        assert!(change_availability(&st, id, true).await.unwrap().discarded.is_none());
        assert!(matches!(
            change_availability(&st, 404, false).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn answered_surveys_disappear_for_that_user_only() {
        let st = AppState::fake_with_sentiment(ScriptedSentiment::new([15.0], 15.0));
        let id = disliked_item(&st).await;
        let discarded = change_availability(&st, id, false).await.unwrap().discarded.unwrap();

        let questions = open_survey(&st, 10, discarded.id).await.unwrap();
        let answers: Vec<(i64, String)> = questions
            .iter()
            .map(|q| (q.id, format!("answer {}", q.position)))
            .collect();
        assert_eq!(submit_survey(&st, 10, discarded.id, &answers).await.unwrap(), 3);
        assert_eq!(st.store.list_answered_discarded_ids(10).await.unwrap(), vec![discarded.id]);

        assert!(get_surveys(&st, 10).await.unwrap().is_empty());
        assert_eq!(get_surveys(&st, 11).await.unwrap().len(), 1);
        assert!(matches!(
            open_survey(&st, 10, discarded.id).await,
            Err(ServiceError::Rejected(_))
        ));
    }
}
