//! Persistence seams. Each domain module declares its repository trait next
//! to its row types; `Store` is the union the application state holds.

pub mod memory;

use sqlx::PgPool;

use crate::auth::repo::UserRepo;
use crate::feedback::repo::FeedbackRepo;
use crate::menu::repo::MenuRepo;
use crate::notifications::repo::NotificationRepo;
use crate::profile::repo::ProfileRepo;
use crate::recommendations::repo::RecommendationRepo;
use crate::surveys::repo::SurveyRepo;

pub use memory::MemoryStore;

pub trait Store:
    UserRepo
    + NotificationRepo
    + MenuRepo
    + RecommendationRepo
    + FeedbackRepo
    + SurveyRepo
    + ProfileRepo
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: UserRepo
        + NotificationRepo
        + MenuRepo
        + RecommendationRepo
        + FeedbackRepo
        + SurveyRepo
        + ProfileRepo
        + Send
        + Sync
{
}

/// Postgres-backed store. Query implementations live in each domain's `repo.rs`.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Kinds of once-per-day batches claimed in `daily_batches`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    Recommendation,
    Selection,
}

impl BatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recommendation => "recommendation",
            Self::Selection => "selection",
        }
    }
}
