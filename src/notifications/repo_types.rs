use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Role-wide message, visible until the end of the day it was created.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub content: String,
    pub role_id: i64,
    pub created_at: OffsetDateTime,
    pub expiry_date: OffsetDateTime,
}
