use anyhow::Context;
use serde::Deserialize;
use time::{macros::format_description, UtcOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentimentConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub top_item_count: usize,
    pub utc_offset: UtcOffset,
    pub sentiment: SentimentConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}"),
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required for the postgres backend");
        }

        let top_item_count = match std::env::var("TOP_ITEM_COUNT") {
            Ok(v) => v.parse::<usize>().context("parse TOP_ITEM_COUNT")?,
            Err(_) => 2,
        };
        let utc_offset = match std::env::var("CAFETERIA_UTC_OFFSET") {
            Ok(v) => parse_offset(&v)?,
            Err(_) => UtcOffset::UTC,
        };

        let sentiment = SentimentConfig {
            api_url: std::env::var("SENTIMENT_API_URL").ok(),
            api_token: std::env::var("SENTIMENT_API_TOKEN").ok(),
        };

        let bootstrap_admin = match (
            std::env::var("ADMIN_USERNAME").ok(),
            std::env::var("ADMIN_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
            _ => None,
        };

        Ok(Self {
            storage,
            database_url,
            top_item_count,
            utc_offset,
            sentiment,
            bootstrap_admin,
        })
    }
}

/// Parses `+HH:MM` / `-HH:MM`.
pub fn parse_offset(raw: &str) -> anyhow::Result<UtcOffset> {
    let format = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(raw.trim(), &format)
        .with_context(|| format!("parse CAFETERIA_UTC_OFFSET {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_offsets() {
        assert_eq!(parse_offset("+05:30").unwrap(), UtcOffset::from_hms(5, 30, 0).unwrap());
        assert_eq!(parse_offset("-03:00").unwrap(), UtcOffset::from_hms(-3, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage_offset() {
        assert!(parse_offset("IST").is_err());
    }
}
