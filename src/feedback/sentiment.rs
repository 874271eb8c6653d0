use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::SentimentConfig;
use crate::error::{ServiceError, ServiceResult};

/// Star classification of a comment as produced by the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarRating {
    pub stars: u8,
    pub confidence: f64,
}

impl StarRating {
    /// Maps onto 0..=100: each star is a 20-point band, confidence places
    /// the score inside the band. Rounded to two decimals.
    pub fn to_score(self) -> f64 {
        let stars = self.stars.clamp(1, 5);
        let base = f64::from(stars - 1) * 20.0;
        let scaled = base + self.confidence.clamp(0.0, 1.0) * 20.0;
        (scaled * 100.0).round() / 100.0
    }
}

#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn classify(&self, text: &str) -> anyhow::Result<StarRating>;
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl ClassifyResponse {
    fn best(self) -> Option<LabelScore> {
        let labels = match self {
            Self::Nested(outer) => outer.into_iter().flatten().collect::<Vec<_>>(),
            Self::Flat(labels) => labels,
        };
        labels
            .into_iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// "4 stars" -> 4
fn parse_stars(label: &str) -> Option<u8> {
    let digit = label.trim().chars().next()?.to_digit(10)?;
    u8::try_from(digit).ok().filter(|d| (1..=5).contains(d))
}

/// Text-classification endpoint speaking the Hugging Face inference shape
/// (`{"inputs": ...}` in, `[[{label, score}]]` out) for a 1-5 star model.
pub struct HttpSentimentModel {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpSentimentModel {
    pub async fn connect(cfg: &SentimentConfig) -> anyhow::Result<Self> {
        let url = cfg
            .api_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("SENTIMENT_API_URL is not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build sentiment http client")?;
        let model = Self {
            client,
            url,
            token: cfg.api_token.clone(),
        };
        // Hosted models load lazily; the first request also proves the endpoint works.
        let warmup = model.classify("The food was good.").await?;
        debug!(stars = warmup.stars, "sentiment warm-up classified");
        Ok(model)
    }
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    async fn classify(&self, text: &str) -> anyhow::Result<StarRating> {
        let mut req = self.client.post(&self.url).json(&ClassifyRequest { inputs: text });
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .context("sentiment request")?
            .error_for_status()
            .context("sentiment response status")?
            .json::<ClassifyResponse>()
            .await
            .context("decode sentiment response")?;
        let best = resp
            .best()
            .ok_or_else(|| anyhow::anyhow!("sentiment model returned no labels"))?;
        let stars = parse_stars(&best.label)
            .ok_or_else(|| anyhow::anyhow!("unexpected sentiment label {:?}", best.label))?;
        Ok(StarRating {
            stars,
            confidence: best.score,
        })
    }
}

type ModelResult = Result<Arc<dyn SentimentModel>, String>;
type ReadyFuture = Shared<BoxFuture<'static, ModelResult>>;
type InitFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<Arc<dyn SentimentModel>>> + Send + Sync;

/// Handle to a model whose initialization runs in the background.
/// Every use awaits initialization. A failed attempt reports `Unavailable`
/// to its callers and is replaced by a fresh attempt for the next one.
#[derive(Clone)]
pub struct SentimentClassifier {
    init: Arc<InitFn>,
    ready: Arc<Mutex<ReadyFuture>>,
}

fn start(init: &InitFn) -> ReadyFuture {
    let attempt = init();
    let ready = async move {
        match attempt.await {
            Ok(model) => {
                info!("sentiment model ready");
                Ok(model)
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "sentiment model initialization failed");
                Err(format!("{e:#}"))
            }
        }
    }
    .boxed()
    .shared();
    tokio::spawn(ready.clone());
    ready
}

impl SentimentClassifier {
    /// Runs `init` on the current tokio runtime, now and after every failure.
    pub fn initialize<F, Fut>(init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Arc<dyn SentimentModel>>> + Send + 'static,
    {
        let init: Arc<InitFn> = Arc::new(move || init().boxed());
        let ready = start(init.as_ref());
        Self {
            init,
            ready: Arc::new(Mutex::new(ready)),
        }
    }

    #[cfg(test)]
    pub fn ready(model: Arc<dyn SentimentModel>) -> Self {
        Self::initialize(move || futures::future::ready(Ok(model.clone())))
    }

    pub async fn model(&self) -> ServiceResult<Arc<dyn SentimentModel>> {
        let attempt = self.ready.lock().await.clone();
        match attempt.clone().await {
            Ok(model) => Ok(model),
            Err(_) => {
                let mut ready = self.ready.lock().await;
                // Concurrent callers share one retry.
                if ready.ptr_eq(&attempt) {
                    warn!("retrying sentiment model initialization");
                    *ready = start(self.init.as_ref());
                }
                Err(ServiceError::Unavailable("Sentiment analysis".into()))
            }
        }
    }

    /// Score in 0..=100 for `text`.
    #[cfg(test)]
    pub async fn score(&self, text: &str) -> ServiceResult<f64> {
        let model = self.model().await?;
        let rating = model.classify(text).await?;
        Ok(rating.to_score())
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;

    use tokio::sync::Mutex;

    use super::*;

    /// Returns queued scores in order, then `fallback`.
    pub struct ScriptedSentiment {
        queue: Mutex<VecDeque<f64>>,
        fallback: f64,
    }

    impl ScriptedSentiment {
        pub fn new(scores: impl IntoIterator<Item = f64>, fallback: f64) -> Arc<Self> {
            Arc::new(Self {
                queue: Mutex::new(scores.into_iter().collect()),
                fallback,
            })
        }
    }

    #[async_trait]
    impl SentimentModel for ScriptedSentiment {
        async fn classify(&self, _text: &str) -> anyhow::Result<StarRating> {
            let score = self.queue.lock().await.pop_front().unwrap_or(self.fallback);
            // Inverse of `to_score` so the session sees exactly `score`.
            let stars = ((score / 20.0).floor() as u8 + 1).min(5);
            let confidence = (score - f64::from(stars - 1) * 20.0) / 20.0;
            Ok(StarRating { stars, confidence })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn star_scores_map_into_bands() {
        assert_eq!(StarRating { stars: 5, confidence: 0.95 }.to_score(), 99.0);
        assert_eq!(StarRating { stars: 1, confidence: 0.85 }.to_score(), 17.0);
        assert_eq!(StarRating { stars: 3, confidence: 0.5 }.to_score(), 50.0);
    }

    #[test]
    fn labels_parse_to_stars() {
        assert_eq!(parse_stars("1 star"), Some(1));
        assert_eq!(parse_stars("5 stars"), Some(5));
        assert_eq!(parse_stars("POSITIVE"), None);
        assert_eq!(parse_stars("9 stars"), None);
    }

    #[test]
    fn response_shapes_pick_highest_label() {
        let nested: ClassifyResponse = serde_json::from_str(
            r#"[[{"label":"4 stars","score":0.7},{"label":"5 stars","score":0.2}]]"#,
        )
        .unwrap();
        assert_eq!(nested.best().unwrap().label, "4 stars");

        let flat: ClassifyResponse =
            serde_json::from_str(r#"[{"label":"2 stars","score":0.4},{"label":"1 star","score":0.6}]"#)
                .unwrap();
        assert_eq!(flat.best().unwrap().label, "1 star");
    }

    #[tokio::test]
    async fn failed_initialization_reports_unavailable() {
        let classifier = SentimentClassifier::initialize(|| async {
            Err::<Arc<dyn SentimentModel>, _>(anyhow::anyhow!("no endpoint"))
        });
        let err = classifier.score("tasty").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn initialization_is_retried_after_a_failure() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let classifier = SentimentClassifier::initialize(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    anyhow::bail!("503 model is loading");
                }
                Ok(testing::ScriptedSentiment::new(Vec::new(), 70.0) as Arc<dyn SentimentModel>)
            }
        });

        let first = classifier.score("warm").await.unwrap_err();
        assert!(matches!(first, ServiceError::Unavailable(_)));
        assert_eq!(classifier.score("warm").await.unwrap(), 70.0);
        assert_eq!(classifier.score("again").await.unwrap(), 70.0);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn scripted_model_reproduces_scores() {
        let classifier = SentimentClassifier::ready(testing::ScriptedSentiment::new([40.0, 80.0], 50.0));
        assert_eq!(classifier.score("a").await.unwrap(), 40.0);
        assert_eq!(classifier.score("b").await.unwrap(), 80.0);
        assert_eq!(classifier.score("c").await.unwrap(), 50.0);
    }
}
