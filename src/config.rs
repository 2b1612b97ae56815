use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_UPSTREAM_BASE: &str = "https://bestsimilar.com";
pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const DEFAULT_BIND: &str = "0.0.0.0:3001";
const DEFAULT_PROXY_BASE: &str = "http://localhost:3001";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header set sent to the upstream site so requests look like they come from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserHeaders {
    pub user_agent: String,
    pub accept_language: String,
    pub referer: String,
    pub origin: String,
}

impl BrowserHeaders {
    pub fn for_base(base_url: &str, user_agent: &str) -> Self {
        let origin = base_url.trim_end_matches('/').to_string();
        Self {
            user_agent: user_agent.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: format!("{origin}/"),
            origin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub headers: BrowserHeaders,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            headers: BrowserHeaders::for_base(&base_url, DEFAULT_USER_AGENT),
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self> {
        let base_url = env_or("UPSTREAM_BASE_URL", DEFAULT_UPSTREAM_BASE);
        let base_url = base_url.trim_end_matches('/').to_string();
        let user_agent = env_or("UPSTREAM_USER_AGENT", DEFAULT_USER_AGENT);
        let timeout_secs = env_or("UPSTREAM_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?;
        Ok(Self {
            headers: BrowserHeaders::for_base(&base_url, &user_agent),
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind: SocketAddr,
    pub upstream: UpstreamConfig,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        let bind = env_or("PROXY_BIND", DEFAULT_BIND)
            .parse::<SocketAddr>()
            .context("PROXY_BIND must be a socket address like 0.0.0.0:3001")?;
        Ok(Self {
            bind,
            upstream: UpstreamConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub api_key: String,
    pub base_url: String,
    pub image_base: String,
    pub watch_region: String,
}

impl TmdbConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("TMDB_API_KEY").unwrap_or_default(),
            base_url: env_or("TMDB_BASE_URL", DEFAULT_TMDB_BASE)
                .trim_end_matches('/')
                .to_string(),
            image_base: DEFAULT_IMAGE_BASE.to_string(),
            watch_region: env_or("WATCH_REGION", "US"),
        }
    }
}

/// Settings for the headless discovery client (search page + details view).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub proxy_base_url: String,
    pub upstream_base_url: String,
    pub tmdb: TmdbConfig,
    pub debounce: Duration,
    pub min_term_len: usize,
    pub recommendation_cap: usize,
    pub session_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            proxy_base_url: env_or("PROXY_BASE_URL", DEFAULT_PROXY_BASE)
                .trim_end_matches('/')
                .to_string(),
            upstream_base_url: env_or("UPSTREAM_BASE_URL", DEFAULT_UPSTREAM_BASE)
                .trim_end_matches('/')
                .to_string(),
            tmdb: TmdbConfig::from_env(),
            debounce: Duration::from_millis(300),
            min_term_len: 2,
            recommendation_cap: crate::normalize::RECOMMENDATION_CAP,
            session_file: PathBuf::from(env_or("SESSION_FILE", ".whojoshi-session.json")),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_headers_derive_referer_and_origin_from_base() {
        let headers = BrowserHeaders::for_base("https://bestsimilar.com/", "ua");
        assert_eq!(headers.origin, "https://bestsimilar.com");
        assert_eq!(headers.referer, "https://bestsimilar.com/");
        assert_eq!(headers.user_agent, "ua");
    }
}
