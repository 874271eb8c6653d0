use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::auth::services::ensure_bootstrap_admin;
use crate::calendar::Calendar;
use crate::config::{AppConfig, StorageBackend};
use crate::feedback::sentiment::{HttpSentimentModel, SentimentClassifier, SentimentModel};
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub calendar: Calendar,
    pub sentiment: SentimentClassifier,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn Store> = match config.storage {
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres backend")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                Arc::new(PgStore::new(db))
            }
            StorageBackend::Memory => {
                info!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        // Model warm-up runs in the background; consumers await readiness.
        let sentiment_cfg = config.sentiment.clone();
        let sentiment = SentimentClassifier::initialize(move || {
            let cfg = sentiment_cfg.clone();
            async move {
                let model = HttpSentimentModel::connect(&cfg).await?;
                Ok(Arc::new(model) as Arc<dyn SentimentModel>)
            }
        });

        let state = Self::from_parts(store, config, sentiment);
        if let Some(admin) = &state.config.bootstrap_admin {
            ensure_bootstrap_admin(&state, admin).await?;
        }
        Ok(state)
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        sentiment: SentimentClassifier,
    ) -> Self {
        Self {
            store,
            calendar: Calendar::new(config.utc_offset),
            config,
            sentiment,
        }
    }

    /// In-memory state with a classifier that scores every comment 50.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::feedback::sentiment::testing::ScriptedSentiment;
        Self::fake_with_sentiment(ScriptedSentiment::new(Vec::new(), 50.0))
    }

    #[cfg(test)]
    pub fn fake_with_sentiment(model: Arc<dyn SentimentModel>) -> Self {
        use crate::config::SentimentConfig;

        let config = Arc::new(AppConfig {
            storage: StorageBackend::Memory,
            database_url: None,
            top_item_count: 2,
            utc_offset: time::UtcOffset::UTC,
            sentiment: SentimentConfig {
                api_url: None,
                api_token: None,
            },
            bootstrap_admin: None,
        });
        Self::from_parts(
            Arc::new(MemoryStore::new()),
            config,
            SentimentClassifier::ready(model),
        )
    }
}
