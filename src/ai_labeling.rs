//! Qualitative labeling collaborator. The numeric engine always computes a
//! deterministic fallback `focus_level`; this collaborator, when reachable,
//! may override the label string — never the numbers.

use async_trait::async_trait;

/// Deterministic fallback classification by unique-domain count, used when
/// no collaborator is configured or the collaborator call fails.
pub fn fallback_focus_level(unique_domains: i64) -> &'static str {
    if unique_domains <= 5 {
        "high"
    } else if unique_domains <= 15 {
        "medium"
    } else {
        "low"
    }
}

#[async_trait]
pub trait AiLabeling: Send + Sync {
    /// Returns an overriding focus-level label for the given block summary,
    /// or `None` on any failure (the caller keeps the deterministic label).
    async fn label_focus_level(&self, unique_domains: i64, switches_per_hour: f64) -> Option<String>;
}

/// Default collaborator: always defers to the deterministic fallback. Used
/// when the `ai-labeling` feature is disabled or no endpoint is configured.
pub struct NullAiLabeling;

#[async_trait]
impl AiLabeling for NullAiLabeling {
    async fn label_focus_level(&self, _unique_domains: i64, _switches_per_hour: f64) -> Option<String> {
        None
    }
}

#[cfg(feature = "ai-labeling")]
pub use http_impl::HttpAiLabeling;

#[cfg(feature = "ai-labeling")]
mod http_impl {
    use super::AiLabeling;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    struct LabelRequest {
        unique_domains: i64,
        switches_per_hour: f64,
    }

    #[derive(Deserialize)]
    struct LabelResponse {
        focus_level: String,
    }

    pub struct HttpAiLabeling {
        client: reqwest::Client,
        endpoint: String,
    }

    impl HttpAiLabeling {
        pub fn new(endpoint: String) -> Self {
            Self {
                client: reqwest::Client::new(),
                endpoint,
            }
        }
    }

    #[async_trait]
    impl AiLabeling for HttpAiLabeling {
        async fn label_focus_level(
            &self,
            unique_domains: i64,
            switches_per_hour: f64,
        ) -> Option<String> {
            let result = self
                .client
                .post(&self.endpoint)
                .json(&LabelRequest {
                    unique_domains,
                    switches_per_hour,
                })
                .send()
                .await;

            match result {
                Ok(response) => match response.json::<LabelResponse>().await {
                    Ok(body) => Some(body.focus_level),
                    Err(error) => {
                        tracing::warn!(%error, "ai labeling collaborator returned an unparseable body");
                        None
                    }
                },
                Err(error) => {
                    tracing::warn!(%error, "ai labeling collaborator request failed");
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_thresholds_follow_unique_domain_bands() {
        assert_eq!(fallback_focus_level(5), "high");
        assert_eq!(fallback_focus_level(6), "medium");
        assert_eq!(fallback_focus_level(15), "medium");
        assert_eq!(fallback_focus_level(16), "low");
    }

    #[tokio::test]
    async fn null_collaborator_never_overrides() {
        let collaborator = NullAiLabeling;
        assert_eq!(collaborator.label_focus_level(3, 2.0).await, None);
    }
}
