use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which menu attribute a profile question maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "profile_topic", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProfileTopic {
    Diet,
    Spice,
    Region,
    SweetTooth,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfileQuestion {
    pub id: i64,
    pub topic: ProfileTopic,
    pub question_text: String,
    pub options: Vec<String>,
}

impl UserProfileQuestion {
    /// Case-insensitive lookup returning the option as stored.
    pub fn option(&self, answer: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.eq_ignore_ascii_case(answer.trim()))
            .map(String::as_str)
    }

    pub fn prompt(&self) -> String {
        format!("{} ({})", self.question_text, self.options.join(", "))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfileResponse {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub response: String,
}
