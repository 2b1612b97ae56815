use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use tracing::debug;

use crate::config::{BrowserHeaders, UpstreamConfig};

const ACCEPT_JSON: &str = "application/json, text/plain, */*";
const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Raw upstream response, relayed as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamPage {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait UpstreamApi: Send + Sync {
    async fn autocomplete(&self, term: &str) -> Result<serde_json::Value>;
    async fn fetch_page(&self, path: &str) -> Result<UpstreamPage>;
}

#[derive(Debug, Clone)]
pub struct BestSimilarClient {
    client: Client,
    base_url: String,
    headers: BrowserHeaders,
}

impl BestSimilarClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(config.timeout)
            .build()
            .context("Failed to build upstream HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            headers: config.headers.clone(),
        })
    }

    fn header_map(&self, accept: &'static str) -> Result<HeaderMap> {
        browser_header_map(&self.headers, accept)
    }

    async fn get(&self, url: &str, accept: &'static str) -> Result<reqwest::Response> {
        debug!(url = %url, "Forwarding request upstream");
        let res = self
            .client
            .get(url)
            .headers(self.header_map(accept)?)
            .send()
            .await
            .context("upstream request failed")?;
        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("upstream returned HTTP {} for {}", status, url));
        }
        Ok(res)
    }
}

#[async_trait]
impl UpstreamApi for BestSimilarClient {
    async fn autocomplete(&self, term: &str) -> Result<serde_json::Value> {
        let url = format!(
            "{}/site/autocomplete?term={}",
            self.base_url,
            urlencoding::encode(term)
        );
        let res = self.get(&url, ACCEPT_JSON).await?;
        let bytes = res.bytes().await.context("reading autocomplete body failed")?;
        serde_json::from_slice(&bytes).context("autocomplete body is not JSON")
    }

    async fn fetch_page(&self, path: &str) -> Result<UpstreamPage> {
        let url = format!("{}{}", self.base_url, path);
        let res = self.get(&url, ACCEPT_HTML).await?;
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = res
            .bytes()
            .await
            .context("reading recommendations body failed")?;
        Ok(UpstreamPage {
            content_type,
            body: body.to_vec(),
        })
    }
}

pub(crate) fn browser_header_map(headers: &BrowserHeaders, accept: &'static str) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    map.insert(USER_AGENT, HeaderValue::from_str(&headers.user_agent)?);
    map.insert(ACCEPT, HeaderValue::from_static(accept));
    map.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&headers.accept_language)?);
    map.insert(REFERER, HeaderValue::from_str(&headers.referer)?);
    map.insert(ORIGIN, HeaderValue::from_str(&headers.origin)?);
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_map_carries_full_browser_identity() {
        let headers = BrowserHeaders::for_base("https://bestsimilar.com", "Mozilla/5.0 test");
        let map = browser_header_map(&headers, ACCEPT_HTML).unwrap();
        assert_eq!(map[USER_AGENT], "Mozilla/5.0 test");
        assert_eq!(map[REFERER], "https://bestsimilar.com/");
        assert_eq!(map[ORIGIN], "https://bestsimilar.com");
        assert_eq!(map[ACCEPT], ACCEPT_HTML);
        assert_eq!(map[ACCEPT_LANGUAGE], "en-US,en;q=0.9");
    }

    #[test]
    fn header_map_rejects_unprintable_user_agent() {
        let headers = BrowserHeaders::for_base("https://bestsimilar.com", "bad\nagent");
        assert!(browser_header_map(&headers, ACCEPT_JSON).is_err());
    }
}
