pub mod ai_labeling;
pub mod analytics;
pub mod cache;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod ingress;
pub mod metrics;
pub mod store;
pub mod timezone;
pub mod validation;

use ai_labeling::{AiLabeling, NullAiLabeling};
use cache::RedisCache;
use config::Config;
use metrics::Metrics;
use store::Database;

pub struct AppState {
    pub db: Database,
    pub cache: RedisCache,
    pub metrics: Metrics,
    pub config: Config,
    pub ai_labeling: Box<dyn AiLabeling>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db = Database::new(&config.database_url).await?;
        db.migrate().await?;
        let cache = RedisCache::new(&config.redis_url).await?;
        let metrics = Metrics::new()?;

        let ai_labeling: Box<dyn AiLabeling> = build_ai_labeling(&config);

        Ok(Self {
            db,
            cache,
            metrics,
            config,
            ai_labeling,
        })
    }
}

#[cfg(feature = "ai-labeling")]
fn build_ai_labeling(config: &Config) -> Box<dyn AiLabeling> {
    match &config.ai_labeling_url {
        Some(url) => Box::new(ai_labeling::HttpAiLabeling::new(url.clone())),
        None => Box::new(NullAiLabeling),
    }
}

#[cfg(not(feature = "ai-labeling"))]
fn build_ai_labeling(_config: &Config) -> Box<dyn AiLabeling> {
    Box::new(NullAiLabeling)
}
