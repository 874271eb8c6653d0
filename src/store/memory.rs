//! In-process store with the same seed data and uniqueness rules as the
//! Postgres schema. Backs `STORAGE_BACKEND=memory` and the test suite.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::Mutex;

use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{Role, User};
use crate::feedback::repo::FeedbackRepo;
use crate::feedback::repo_types::{Feedback, NewFeedback, SentimentScore, Vote};
use crate::menu::repo::MenuRepo;
use crate::menu::repo_types::{FoodCategory, Meal, MenuItem, MenuItemUpdate, NewMenuItem};
use crate::notifications::repo::NotificationRepo;
use crate::notifications::repo_types::Notification;
use crate::profile::repo::ProfileRepo;
use crate::profile::repo_types::{ProfileTopic, UserProfileQuestion, UserProfileResponse};
use crate::recommendations::repo::RecommendationRepo;
use crate::recommendations::repo_types::{FinalSelection, Recommendation, SelectedRecommendation};
use crate::store::BatchKind;
use crate::surveys::repo::SurveyRepo;
use crate::surveys::repo_types::{DiscardedMenuItem, FeedbackForm, Question};

#[derive(Default)]
struct Tables {
    sequences: HashMap<&'static str, i64>,
    roles: Vec<Role>,
    users: Vec<User>,
    categories: Vec<FoodCategory>,
    menu_items: Vec<MenuItem>,
    batches: HashSet<(BatchKind, Date)>,
    recommendations: Vec<Recommendation>,
    selected: Vec<SelectedRecommendation>,
    final_selections: Vec<FinalSelection>,
    votes: Vec<Vote>,
    feedback: Vec<Feedback>,
    sentiment: Vec<SentimentScore>,
    discarded: Vec<DiscardedMenuItem>,
    questions: Vec<Question>,
    forms: Vec<FeedbackForm>,
    profile_questions: Vec<UserProfileQuestion>,
    profile_responses: Vec<UserProfileResponse>,
    notifications: Vec<Notification>,
}

impl Tables {
    /// Per-table BIGSERIAL equivalent, starting at 1.
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn seeded() -> Self {
        let mut t = Self::default();
        for name in ["Admin", "Chef", "Employee"] {
            let id = t.next_id("roles");
            t.roles.push(Role {
                id,
                name: name.to_string(),
            });
        }
        for meal in Meal::ALL {
            let id = t.next_id("food_categories");
            t.categories.push(FoodCategory {
                id,
                name: meal.as_str().to_string(),
            });
        }
        let profile: [(ProfileTopic, &str, &[&str]); 4] = [
            (
                ProfileTopic::Diet,
                "Please select one",
                &["Vegetarian", "Non-Vegetarian", "Eggetarian"],
            ),
            (
                ProfileTopic::Spice,
                "Please select your spice level",
                &["High", "Medium", "Low"],
            ),
            (
                ProfileTopic::Region,
                "What do you prefer most?",
                &["North Indian", "South Indian", "Other"],
            ),
            (ProfileTopic::SweetTooth, "Do you have a sweet tooth?", &["Yes", "No"]),
        ];
        for (topic, text, options) in profile {
            let id = t.next_id("user_profile_questions");
            t.profile_questions.push(UserProfileQuestion {
                id,
                topic,
                question_text: text.to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
            });
        }
        t
    }

    /// Claims a daily batch; false when already claimed. A claim whose rows
    /// were all cascaded away is taken over.
    fn claim(&mut self, kind: BatchKind, day: Date) -> bool {
        if self.batches.insert((kind, day)) {
            return true;
        }
        match kind {
            BatchKind::Recommendation => !self.recommendations.iter().any(|r| r.day == day),
            BatchKind::Selection => !self.selected.iter().any(|r| r.day == day),
        }
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::seeded()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role_id: i64,
    ) -> anyhow::Result<User> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.username == username) {
            anyhow::bail!("insert user: username {username:?} already exists");
        }
        let role = t
            .roles
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.name.clone())
            .ok_or_else(|| anyhow::anyhow!("insert user: unknown role {role_id}"))?;
        let id = t.next_id("users");
        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role_id,
            role,
            last_login_time: None,
            logout_time: None,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        let t = self.tables.lock().await;
        Ok(t.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> anyhow::Result<Vec<Role>> {
        Ok(self.tables.lock().await.roles.clone())
    }

    async fn record_login(&self, user_id: i64, at: OffsetDateTime) -> anyhow::Result<()> {
        let mut t = self.tables.lock().await;
        if let Some(u) = t.users.iter_mut().find(|u| u.id == user_id) {
            u.last_login_time = Some(at);
        }
        Ok(())
    }

    async fn record_logout(&self, user_id: i64, at: OffsetDateTime) -> anyhow::Result<()> {
        let mut t = self.tables.lock().await;
        if let Some(u) = t.users.iter_mut().find(|u| u.id == user_id) {
            u.logout_time = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationRepo for MemoryStore {
    async fn create_notification(
        &self,
        content: &str,
        role_id: i64,
        created_at: OffsetDateTime,
        expiry_date: OffsetDateTime,
    ) -> anyhow::Result<Notification> {
        let mut t = self.tables.lock().await;
        let id = t.next_id("notifications");
        let n = Notification {
            id,
            content: content.to_string(),
            role_id,
            created_at,
            expiry_date,
        };
        t.notifications.push(n.clone());
        Ok(n)
    }

    async fn list_notifications_for_role(
        &self,
        role_id: i64,
        since: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<Notification>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Notification> = t
            .notifications
            .iter()
            .filter(|n| n.role_id == role_id)
            .filter(|n| since.map_or(true, |s| n.created_at > s))
            .filter(|n| n.expiry_date > now)
            .cloned()
            .collect();
        rows.sort_by_key(|n| n.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl MenuRepo for MemoryStore {
    async fn find_category_by_name(&self, name: &str) -> anyhow::Result<Option<FoodCategory>> {
        let t = self.tables.lock().await;
        Ok(t
            .categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<FoodCategory>> {
        Ok(self.tables.lock().await.categories.clone())
    }

    async fn list_menu_items(&self) -> anyhow::Result<Vec<MenuItem>> {
        Ok(self.tables.lock().await.menu_items.clone())
    }

    async fn list_menu_items_by_category(&self, category_id: i64) -> anyhow::Result<Vec<MenuItem>> {
        let t = self.tables.lock().await;
        Ok(t
            .menu_items
            .iter()
            .filter(|m| m.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn find_menu_item(&self, id: i64) -> anyhow::Result<Option<MenuItem>> {
        let t = self.tables.lock().await;
        Ok(t.menu_items.iter().find(|m| m.id == id).cloned())
    }

    async fn find_menu_item_by_name(&self, name: &str) -> anyhow::Result<Option<MenuItem>> {
        let t = self.tables.lock().await;
        Ok(t
            .menu_items
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn create_menu_item(&self, item: NewMenuItem) -> anyhow::Result<MenuItem> {
        let mut t = self.tables.lock().await;
        if t.menu_items.iter().any(|m| m.name == item.name) {
            anyhow::bail!("insert menu item: name {:?} already exists", item.name);
        }
        let category = t
            .categories
            .iter()
            .find(|c| c.id == item.category_id)
            .map(|c| c.name.clone())
            .ok_or_else(|| anyhow::anyhow!("insert menu item: unknown category {}", item.category_id))?;
        let id = t.next_id("menu_items");
        let row = MenuItem {
            id,
            name: item.name,
            description: item.description,
            price: item.price,
            category_id: item.category_id,
            category,
            availability_status: item.availability_status,
            dietary_restriction: item.dietary_restriction,
            spice_level: item.spice_level,
            regional_preference: item.regional_preference,
            is_sweet: item.is_sweet,
        };
        t.menu_items.push(row.clone());
        Ok(row)
    }

    async fn update_menu_item(
        &self,
        id: i64,
        update: MenuItemUpdate,
    ) -> anyhow::Result<Option<MenuItem>> {
        let mut t = self.tables.lock().await;
        let category = match update.category_id {
            Some(cid) => Some(
                t.categories
                    .iter()
                    .find(|c| c.id == cid)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| anyhow::anyhow!("update menu item: unknown category {cid}"))?,
            ),
            None => None,
        };
        let Some(m) = t.menu_items.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if let Some(v) = update.description {
            m.description = v;
        }
        if let Some(v) = update.price {
            m.price = v;
        }
        if let (Some(cid), Some(name)) = (update.category_id, category) {
            m.category_id = cid;
            m.category = name;
        }
        if let Some(v) = update.availability_status {
            m.availability_status = v;
        }
        if let Some(v) = update.dietary_restriction {
            m.dietary_restriction = v;
        }
        if let Some(v) = update.spice_level {
            m.spice_level = v;
        }
        if let Some(v) = update.regional_preference {
            m.regional_preference = v;
        }
        if let Some(v) = update.is_sweet {
            m.is_sweet = v;
        }
        Ok(Some(m.clone()))
    }

    async fn delete_menu_item(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().await;
        let before = t.menu_items.len();
        t.menu_items.retain(|m| m.id != id);
        if t.menu_items.len() == before {
            return Ok(false);
        }

        // Mirror the ON DELETE CASCADE chains of the schema.
        t.recommendations.retain(|r| r.menu_item_id != id);
        let gone_selected: HashSet<i64> = t
            .selected
            .iter()
            .filter(|r| r.menu_item_id == id)
            .map(|r| r.id)
            .collect();
        t.selected.retain(|r| r.menu_item_id != id);
        t.final_selections
            .retain(|f| !gone_selected.contains(&f.selected_recommendation_id));
        t.votes
            .retain(|v| !gone_selected.contains(&v.selected_recommendation_id));
        t.feedback.retain(|f| f.menu_item_id != id);
        t.sentiment.retain(|s| s.menu_item_id != id);
        let gone_discarded: HashSet<i64> = t
            .discarded
            .iter()
            .filter(|d| d.menu_item_id == id)
            .map(|d| d.id)
            .collect();
        t.discarded.retain(|d| d.menu_item_id != id);
        t.questions
            .retain(|q| !gone_discarded.contains(&q.discarded_menu_item_id));
        t.forms
            .retain(|f| !gone_discarded.contains(&f.discarded_menu_item_id));
        Ok(true)
    }
}

#[async_trait]
impl RecommendationRepo for MemoryStore {
    async fn list_recommendations(&self, day: Date) -> anyhow::Result<Vec<Recommendation>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Recommendation> =
            t.recommendations.iter().filter(|r| r.day == day).cloned().collect();
        rows.sort_by_key(|r| (r.meal, r.id));
        Ok(rows)
    }

    async fn insert_recommendation_batch(
        &self,
        day: Date,
        picks: &[(Meal, i64)],
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vec<Recommendation>>> {
        let mut t = self.tables.lock().await;
        if !t.claim(BatchKind::Recommendation, day) {
            return Ok(None);
        }
        let mut rows = Vec::with_capacity(picks.len());
        for (meal, menu_item_id) in picks {
            let id = t.next_id("recommendations");
            rows.push(Recommendation {
                id,
                menu_item_id: *menu_item_id,
                meal: *meal,
                day,
                created_at: at,
            });
        }
        t.recommendations.extend(rows.iter().cloned());
        Ok(Some(rows))
    }

    async fn list_selected(&self, day: Date) -> anyhow::Result<Vec<SelectedRecommendation>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<SelectedRecommendation> =
            t.selected.iter().filter(|r| r.day == day).cloned().collect();
        rows.sort_by_key(|r| (r.meal, r.id));
        Ok(rows)
    }

    async fn find_selected(&self, id: i64) -> anyhow::Result<Option<SelectedRecommendation>> {
        let t = self.tables.lock().await;
        Ok(t.selected.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_selected_batch(
        &self,
        day: Date,
        picks: &[(Meal, i64)],
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vec<SelectedRecommendation>>> {
        let mut t = self.tables.lock().await;
        if !t.claim(BatchKind::Selection, day) {
            return Ok(None);
        }
        let mut rows = Vec::with_capacity(picks.len());
        for (meal, menu_item_id) in picks {
            let id = t.next_id("selected_recommendations");
            rows.push(SelectedRecommendation {
                id,
                menu_item_id: *menu_item_id,
                meal: *meal,
                day,
                created_at: at,
            });
        }
        t.selected.extend(rows.iter().cloned());
        Ok(Some(rows))
    }

    async fn list_final_selections(&self, day: Date) -> anyhow::Result<Vec<FinalSelection>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<FinalSelection> =
            t.final_selections.iter().filter(|f| f.day == day).cloned().collect();
        rows.sort_by_key(|f| f.meal);
        Ok(rows)
    }

    async fn insert_final_selection(
        &self,
        selected_recommendation_id: i64,
        meal: Meal,
        day: Date,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<FinalSelection>> {
        let mut t = self.tables.lock().await;
        if t.final_selections.iter().any(|f| f.meal == meal && f.day == day) {
            return Ok(None);
        }
        let id = t.next_id("final_selections");
        let row = FinalSelection {
            id,
            selected_recommendation_id,
            meal,
            day,
            created_at: at,
        };
        t.final_selections.push(row.clone());
        Ok(Some(row))
    }
}

#[async_trait]
impl FeedbackRepo for MemoryStore {
    async fn find_vote(&self, user_id: i64, meal: Meal, day: Date) -> anyhow::Result<Option<Vote>> {
        let t = self.tables.lock().await;
        Ok(t
            .votes
            .iter()
            .find(|v| v.user_id == user_id && v.meal == meal && v.day == day)
            .cloned())
    }

    async fn insert_vote(
        &self,
        user_id: i64,
        selected_recommendation_id: i64,
        meal: Meal,
        day: Date,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Vote>> {
        let mut t = self.tables.lock().await;
        if t
            .votes
            .iter()
            .any(|v| v.user_id == user_id && v.meal == meal && v.day == day)
        {
            return Ok(None);
        }
        let id = t.next_id("votes");
        let vote = Vote {
            id,
            user_id,
            selected_recommendation_id,
            meal,
            day,
            created_at: at,
        };
        t.votes.push(vote.clone());
        Ok(Some(vote))
    }

    async fn list_votes(&self, day: Date) -> anyhow::Result<Vec<Vote>> {
        let t = self.tables.lock().await;
        Ok(t.votes.iter().filter(|v| v.day == day).cloned().collect())
    }

    async fn insert_feedback(&self, feedback: NewFeedback) -> anyhow::Result<Feedback> {
        let mut t = self.tables.lock().await;
        let id = t.next_id("feedback");
        let row = Feedback {
            id,
            user_id: feedback.user_id,
            menu_item_id: feedback.menu_item_id,
            rating: feedback.rating,
            comment: feedback.comment,
            created_at: feedback.created_at,
        };
        t.feedback.push(row.clone());
        Ok(row)
    }

    async fn list_ratings(&self, menu_item_id: i64) -> anyhow::Result<Vec<i32>> {
        let t = self.tables.lock().await;
        Ok(t
            .feedback
            .iter()
            .filter(|f| f.menu_item_id == menu_item_id)
            .map(|f| f.rating)
            .collect())
    }

    async fn find_sentiment(&self, menu_item_id: i64) -> anyhow::Result<Option<SentimentScore>> {
        let t = self.tables.lock().await;
        Ok(t
            .sentiment
            .iter()
            .find(|s| s.menu_item_id == menu_item_id)
            .cloned())
    }

    async fn save_sentiment(
        &self,
        menu_item_id: i64,
        score: f64,
        at: OffsetDateTime,
    ) -> anyhow::Result<SentimentScore> {
        let mut t = self.tables.lock().await;
        if let Some(row) = t.sentiment.iter_mut().find(|s| s.menu_item_id == menu_item_id) {
            row.score = score;
            row.updated_at = at;
            return Ok(row.clone());
        }
        let id = t.next_id("sentiment_scores");
        let row = SentimentScore {
            id,
            menu_item_id,
            score,
            updated_at: at,
        };
        t.sentiment.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl SurveyRepo for MemoryStore {
    async fn insert_discarded(
        &self,
        menu_item_id: i64,
        created_at: OffsetDateTime,
        expires_at: OffsetDateTime,
        questions: &[String],
    ) -> anyhow::Result<(DiscardedMenuItem, Vec<Question>)> {
        let mut t = self.tables.lock().await;
        let id = t.next_id("discarded_menu_items");
        let discarded = DiscardedMenuItem {
            id,
            menu_item_id,
            created_at,
            expires_at,
        };
        let mut rows = Vec::with_capacity(questions.len());
        for (position, text) in questions.iter().enumerate() {
            let qid = t.next_id("questions");
            rows.push(Question {
                id: qid,
                discarded_menu_item_id: id,
                position: position as i32,
                question_text: text.clone(),
            });
        }
        t.discarded.push(discarded.clone());
        t.questions.extend(rows.iter().cloned());
        Ok((discarded, rows))
    }

    async fn find_active_discarded_for_item(
        &self,
        menu_item_id: i64,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<DiscardedMenuItem>> {
        let t = self.tables.lock().await;
        Ok(t
            .discarded
            .iter()
            .rev()
            .find(|d| d.menu_item_id == menu_item_id && d.is_active(now))
            .cloned())
    }

    async fn list_active_discarded(&self, now: OffsetDateTime) -> anyhow::Result<Vec<DiscardedMenuItem>> {
        let t = self.tables.lock().await;
        Ok(t.discarded.iter().filter(|d| d.is_active(now)).cloned().collect())
    }

    async fn find_discarded(&self, id: i64) -> anyhow::Result<Option<DiscardedMenuItem>> {
        let t = self.tables.lock().await;
        Ok(t.discarded.iter().find(|d| d.id == id).cloned())
    }

    async fn list_questions(&self, discarded_id: i64) -> anyhow::Result<Vec<Question>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Question> = t
            .questions
            .iter()
            .filter(|q| q.discarded_menu_item_id == discarded_id)
            .cloned()
            .collect();
        rows.sort_by_key(|q| q.position);
        Ok(rows)
    }

    async fn list_answered_discarded_ids(&self, user_id: i64) -> anyhow::Result<Vec<i64>> {
        let t = self.tables.lock().await;
        let mut ids: Vec<i64> = t
            .forms
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.discarded_menu_item_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn insert_feedback_forms(
        &self,
        user_id: i64,
        discarded_id: i64,
        answers: &[(i64, String)],
    ) -> anyhow::Result<Vec<FeedbackForm>> {
        let mut t = self.tables.lock().await;
        let mut rows = Vec::with_capacity(answers.len());
        for (question_id, response) in answers {
            let taken = t
                .forms
                .iter()
                .any(|f| f.user_id == user_id && f.question_id == *question_id);
            if taken {
                continue;
            }
            let id = t.next_id("feedback_forms");
            let form = FeedbackForm {
                id,
                user_id,
                discarded_menu_item_id: discarded_id,
                question_id: *question_id,
                response: response.clone(),
            };
            t.forms.push(form.clone());
            rows.push(form);
        }
        Ok(rows)
    }
}

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn list_profile_questions(&self) -> anyhow::Result<Vec<UserProfileQuestion>> {
        Ok(self.tables.lock().await.profile_questions.clone())
    }

    async fn list_profile_responses(&self, user_id: i64) -> anyhow::Result<Vec<UserProfileResponse>> {
        let t = self.tables.lock().await;
        Ok(t
            .profile_responses
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_profile_response(
        &self,
        user_id: i64,
        question_id: i64,
        response: &str,
    ) -> anyhow::Result<UserProfileResponse> {
        let mut t = self.tables.lock().await;
        if let Some(row) = t
            .profile_responses
            .iter_mut()
            .find(|r| r.user_id == user_id && r.question_id == question_id)
        {
            row.response = response.to_string();
            return Ok(row.clone());
        }
        let id = t.next_id("user_profile_responses");
        let row = UserProfileResponse {
            id,
            user_id,
            question_id,
            response: response.to_string(),
        };
        t.profile_responses.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::menu::repo_types::{DietaryRestriction, RegionalPreference, SpiceLevel};

    #[tokio::test]
    async fn seed_matches_migration() {
        let store = MemoryStore::new();
        let roles: Vec<String> = store.list_roles().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(roles, vec!["Admin", "Chef", "Employee"]);
        assert!(store.find_category_by_name("dinner").await.unwrap().is_some());
        assert_eq!(store.list_profile_questions().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn daily_batches_are_claimed_once() {
        let store = MemoryStore::new();
        let day = date!(2024 - 06 - 01);
        let at = datetime!(2024-06-01 09:00 UTC);
        let first = store
            .insert_recommendation_batch(day, &[(Meal::Lunch, 1)], at)
            .await
            .unwrap();
        assert_eq!(first.unwrap().len(), 1);
        let second = store
            .insert_recommendation_batch(day, &[(Meal::Lunch, 2)], at)
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(store.list_recommendations(day).await.unwrap().len(), 1);

        // Selection claims are independent of recommendation claims.
        assert!(store
            .insert_selected_batch(day, &[(Meal::Lunch, 1)], at)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn claim_emptied_by_item_delete_can_be_taken_again() {
        let store = MemoryStore::new();
        let day = date!(2024 - 06 - 01);
        let at = datetime!(2024-06-01 09:00 UTC);
        let lunch = store.find_category_by_name("Lunch").await.unwrap().unwrap();
        let item = store
            .create_menu_item(NewMenuItem {
                name: "Rajma".into(),
                description: "Beans".into(),
                price: 90.0,
                category_id: lunch.id,
                availability_status: true,
                dietary_restriction: DietaryRestriction::Vegetarian,
                spice_level: SpiceLevel::Medium,
                regional_preference: RegionalPreference::NorthIndian,
                is_sweet: false,
            })
            .await
            .unwrap();

        assert!(store
            .insert_recommendation_batch(day, &[(Meal::Lunch, item.id)], at)
            .await
            .unwrap()
            .is_some());
        assert!(store.delete_menu_item(item.id).await.unwrap());
        assert!(store.list_recommendations(day).await.unwrap().is_empty());

        let again = store
            .insert_recommendation_batch(day, &[(Meal::Lunch, 7)], at)
            .await
            .unwrap()
            .expect("stale claim is reusable");
        assert_eq!(again[0].menu_item_id, 7);
        assert!(store
            .insert_recommendation_batch(day, &[(Meal::Lunch, 8)], at)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn final_selection_is_unique_per_meal_and_day() {
        let store = MemoryStore::new();
        let day = date!(2024 - 06 - 01);
        let at = datetime!(2024-06-01 09:00 UTC);
        assert!(store.insert_final_selection(1, Meal::Dinner, day, at).await.unwrap().is_some());
        assert!(store.insert_final_selection(2, Meal::Dinner, day, at).await.unwrap().is_none());
        assert!(store
            .insert_final_selection(2, Meal::Dinner, date!(2024 - 06 - 02), at)
            .await
            .unwrap()
            .is_some());
    }
}
