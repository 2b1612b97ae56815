use anyhow::{anyhow, Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

use crate::models::Suggestions;
use crate::normalize::RecommendationPayload;

/// Consumer side of the proxy's HTTP surface.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build proxy HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn suggestions_url(&self, term: &str) -> String {
        format!(
            "{}/api/suggestions?term={}",
            self.base_url,
            urlencoding::encode(term)
        )
    }

    pub fn recommendations_url(&self, path: &str) -> String {
        format!(
            "{}/api/recommendations?url={}",
            self.base_url,
            urlencoding::encode(path)
        )
    }

    pub async fn suggestions(&self, term: &str) -> Result<Suggestions> {
        let res = self
            .client
            .get(self.suggestions_url(term))
            .send()
            .await
            .context("suggestions request failed")?;
        if !res.status().is_success() {
            return Err(anyhow!("Failed to fetch suggestions: HTTP {}", res.status()));
        }
        let body: serde_json::Value = res.json().await.context("suggestions body is not JSON")?;
        Suggestions::from_autocomplete(&body).context("unexpected suggestions shape")
    }

    pub async fn recommendations(&self, path: &str) -> Result<RecommendationPayload> {
        let res = self
            .client
            .get(self.recommendations_url(path))
            .send()
            .await
            .context("recommendations request failed")?;
        if !res.status().is_success() {
            return Err(anyhow!("Failed to fetch recommendations: HTTP {}", res.status()));
        }
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = res.bytes().await.context("reading recommendations body failed")?;
        Ok(RecommendationPayload::from_response(content_type.as_deref(), &body)?)
    }
}
