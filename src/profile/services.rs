use std::cmp::Reverse;

use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::menu::repo_types::{DietaryRestriction, MenuItem, RegionalPreference, SpiceLevel};
use crate::profile::repo_types::{ProfileTopic, UserProfileQuestion, UserProfileResponse};
use crate::state::AppState;

/// A user's stated preferences; unanswered topics never match.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Preferences {
    pub diet: Option<DietaryRestriction>,
    pub spice: Option<SpiceLevel>,
    pub region: Option<RegionalPreference>,
    pub sweet_tooth: Option<bool>,
}

impl Preferences {
    pub fn from_responses(
        questions: &[UserProfileQuestion],
        responses: &[UserProfileResponse],
    ) -> Self {
        let mut prefs = Self::default();
        for response in responses {
            let Some(question) = questions.iter().find(|q| q.id == response.question_id) else {
                continue;
            };
            let answer = response.response.as_str();
            match question.topic {
                ProfileTopic::Diet => prefs.diet = answer.parse().ok(),
                ProfileTopic::Spice => prefs.spice = answer.parse().ok(),
                ProfileTopic::Region => prefs.region = answer.parse().ok(),
                ProfileTopic::SweetTooth => {
                    prefs.sweet_tooth = Some(answer.eq_ignore_ascii_case("yes"))
                }
            }
        }
        prefs
    }

    pub fn match_count(&self, item: &MenuItem) -> usize {
        [
            self.diet == Some(item.dietary_restriction),
            self.spice == Some(item.spice_level),
            self.region == Some(item.regional_preference),
            self.sweet_tooth == Some(item.is_sweet),
        ]
        .into_iter()
        .filter(|m| *m)
        .count()
    }
}

pub async fn profile_questions(st: &AppState) -> ServiceResult<Vec<UserProfileQuestion>> {
    Ok(st.store.list_profile_questions().await?)
}

pub async fn preferences_for(st: &AppState, user_id: i64) -> ServiceResult<Preferences> {
    let questions = st.store.list_profile_questions().await?;
    let responses = st.store.list_profile_responses(user_id).await?;
    Ok(Preferences::from_responses(&questions, &responses))
}

/// Validates `answer` against the question's options and stores it.
pub async fn answer_profile_question(
    st: &AppState,
    user_id: i64,
    question: &UserProfileQuestion,
    answer: &str,
) -> ServiceResult<UserProfileResponse> {
    let option = question.option(answer).ok_or_else(|| {
        ServiceError::invalid(format!(
            "Please choose one of: {}.",
            question.options.join(", ")
        ))
    })?;
    let saved = st
        .store
        .save_profile_response(user_id, question.id, option)
        .await?;
    info!(user_id, topic = ?question.topic, "profile answer saved");
    Ok(saved)
}

/// Orders `items` by how many of the user's preferences each one matches,
/// best first; equal matches keep their incoming order.
pub async fn recommend_menu_items<T: AsRef<MenuItem>>(
    st: &AppState,
    user_id: i64,
    mut items: Vec<T>,
) -> ServiceResult<Vec<T>> {
    let prefs = preferences_for(st, user_id).await?;
    if prefs == Preferences::default() {
        return Ok(items);
    }
    items.sort_by_key(|item| Reverse(prefs.match_count(item.as_ref())));
    debug!(user_id, count = items.len(), "items ranked for profile");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::dto::MenuItemDetails;
    use crate::menu::services::add_menu_item;

    async fn answer(st: &AppState, user_id: i64, topic: ProfileTopic, text: &str) {
        let questions = profile_questions(st).await.unwrap();
        let q = questions.iter().find(|q| q.topic == topic).unwrap();
        answer_profile_question(st, user_id, q, text).await.unwrap();
    }

    #[tokio::test]
    async fn answers_must_be_listed_options() {
        let st = AppState::fake();
        let questions = profile_questions(&st).await.unwrap();
        assert_eq!(questions.len(), 4);
        let spice = questions.iter().find(|q| q.topic == ProfileTopic::Spice).unwrap();

        let err = answer_profile_question(&st, 1, spice, "Volcanic").await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));

        let saved = answer_profile_question(&st, 1, spice, "high").await.unwrap();
        assert_eq!(saved.response, "High");
        let replaced = answer_profile_question(&st, 1, spice, "Low").await.unwrap();
        assert_eq!(replaced.response, "Low");
        assert_eq!(st.store.list_profile_responses(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn items_are_ranked_by_matching_preferences() {
        let st = AppState::fake();
        let mild = add_menu_item(&st, MenuItemDetails::parse("Khichdi|Mild|50|Lunch").unwrap())
            .await
            .unwrap();
        let hot = add_menu_item(
            &st,
            MenuItemDetails::parse("Chettinad|Hot|150|Lunch|Non-Vegetarian|High|South Indian|false")
                .unwrap(),
        )
        .await
        .unwrap();
        let sweet = add_menu_item(
            &st,
            MenuItemDetails::parse("Payasam|Sweet|40|Lunch|Vegetarian|Low|South Indian|true").unwrap(),
        )
        .await
        .unwrap();

        // No profile keeps the incoming order.
        let unranked = recommend_menu_items(&st, 5, vec![mild.clone(), hot.clone(), sweet.clone()])
            .await
            .unwrap();
        assert_eq!(
            unranked.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![mild.id, hot.id, sweet.id]
        );

        answer(&st, 5, ProfileTopic::Diet, "Non-Vegetarian").await;
        answer(&st, 5, ProfileTopic::Spice, "High").await;
        answer(&st, 5, ProfileTopic::Region, "South Indian").await;
        answer(&st, 5, ProfileTopic::SweetTooth, "No").await;

        let ranked = recommend_menu_items(&st, 5, vec![mild.clone(), sweet.clone(), hot.clone()])
            .await
            .unwrap();
        assert_eq!(
            ranked.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![hot.id, mild.id, sweet.id]
        );
    }
}
