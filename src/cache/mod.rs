use std::{future::Future, time::Duration};

use anyhow::Context;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> anyhow::Result<Self> {
        let client = Client::open(redis_url).context("invalid REDIS_URL")?;
        let manager = client
            .get_connection_manager()
            .await
            .context("failed to connect to redis")?;
        Ok(Self { manager })
    }

    pub async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut conn = self.manager.clone();
        let val: Option<String> = conn.get(key).await?;
        match val {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let mut conn = self.manager.clone();
        let raw = serde_json::to_string(value)?;
        let _: () = conn.set_ex(key, raw, ttl.as_secs()).await?;
        Ok(())
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let _: usize = conn.del(key).await?;
        Ok(())
    }

    pub async fn del_by_pattern(&self, pattern: &str) -> anyhow::Result<usize> {
        let mut conn = self.manager.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let deleted: usize = conn.del(keys).await?;
        Ok(deleted)
    }

    pub async fn get_or_set_json<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> anyhow::Result<(T, bool)>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(cached) = self.get_json(key).await? {
            return Ok((cached, true));
        }

        let value = fetcher().await?;
        self.set_json(key, &value, ttl).await?;
        Ok((value, false))
    }
}

pub mod keys {
    const ANALYTICS_PREFIX: &str = "analytics:v1";

    fn window_suffix(user_id: &str, start: &str, end: &str, session_id: Option<&str>) -> String {
        match session_id {
            Some(session_id) => format!("{user_id}:{start}:{end}:{session_id}"),
            None => format!("{user_id}:{start}:{end}"),
        }
    }

    pub fn tracked_time(user_id: &str, start: &str, end: &str, session_id: Option<&str>) -> String {
        format!(
            "{ANALYTICS_PREFIX}:tracked-time:{}",
            window_suffix(user_id, start, end, session_id)
        )
    }

    pub fn tracked_time_total(user_id: &str, session_id: Option<&str>) -> String {
        match session_id {
            Some(session_id) => format!("{ANALYTICS_PREFIX}:tracked-time-total:{user_id}:{session_id}"),
            None => format!("{ANALYTICS_PREFIX}:tracked-time-total:{user_id}"),
        }
    }

    pub fn engaged_time(user_id: &str, start: &str, end: &str, session_id: Option<&str>) -> String {
        format!(
            "{ANALYTICS_PREFIX}:engaged-time:{}",
            window_suffix(user_id, start, end, session_id)
        )
    }

    pub fn deep_work_sessions(user_id: &str, start: &str, end: &str, session_id: Option<&str>) -> String {
        format!(
            "{ANALYTICS_PREFIX}:deep-work:{}",
            window_suffix(user_id, start, end, session_id)
        )
    }

    pub fn top_domains(
        user_id: &str,
        session_id: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        limit: usize,
    ) -> String {
        let window = match (start, end) {
            (Some(start), Some(end)) => format!("{start}:{end}"),
            _ => "all".to_string(),
        };
        match session_id {
            Some(session_id) => {
                format!("{ANALYTICS_PREFIX}:top-domains:{user_id}:{session_id}:{window}:{limit}")
            }
            None => format!("{ANALYTICS_PREFIX}:top-domains:{user_id}:{window}:{limit}"),
        }
    }

    pub fn user_pattern(user_id: &str) -> String {
        format!("{ANALYTICS_PREFIX}:*:{user_id}:*")
    }
}
