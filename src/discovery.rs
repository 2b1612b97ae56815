use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::client::ProxyClient;
use crate::details::DetailRoute;
use crate::models::{
    EnvelopeRecord, MediaType, RecommendationEnvelope, SuggestionItem, SuggestionKind, Suggestions,
};
use crate::normalize::RecommendationPayload;
use crate::tmdb::TmdbApi;

/// Where suggestions come from; toggled by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Curated recommendations scraped through the proxy.
    #[default]
    Upstream,
    /// TMDB multi-search and TMDB "similar" titles.
    Tmdb,
}

#[async_trait]
pub trait DiscoverySource: Send + Sync {
    async fn suggestions(&self, mode: SearchMode, term: &str) -> Result<Suggestions>;
    async fn recommendations(
        &self,
        mode: SearchMode,
        item: &SuggestionItem,
    ) -> Result<RecommendationPayload>;
}

pub struct LiveDiscovery {
    proxy: ProxyClient,
    tmdb: Arc<dyn TmdbApi>,
}

impl LiveDiscovery {
    pub fn new(proxy: ProxyClient, tmdb: Arc<dyn TmdbApi>) -> Self {
        Self { proxy, tmdb }
    }
}

#[async_trait]
impl DiscoverySource for LiveDiscovery {
    async fn suggestions(&self, mode: SearchMode, term: &str) -> Result<Suggestions> {
        match mode {
            SearchMode::Upstream => self.proxy.suggestions(term).await,
            SearchMode::Tmdb => {
                let hits = self.tmdb.search_multi(term).await?;
                let mut suggestions = Suggestions::default();
                for hit in hits {
                    let label = if hit.year.is_empty() {
                        hit.title.clone()
                    } else {
                        format!("{} ({})", hit.title, hit.year)
                    };
                    let route = DetailRoute {
                        media_type: hit.media_type,
                        id: hit.id,
                    };
                    let (group, kind) = match hit.media_type {
                        MediaType::Movie => (&mut suggestions.movie, SuggestionKind::Movie),
                        MediaType::Tv => (&mut suggestions.tv, SuggestionKind::Tv),
                    };
                    group.push(SuggestionItem {
                        id: hit.id.to_string(),
                        label,
                        url: route.path(),
                        kind,
                    });
                }
                Ok(suggestions)
            }
        }
    }

    async fn recommendations(
        &self,
        mode: SearchMode,
        item: &SuggestionItem,
    ) -> Result<RecommendationPayload> {
        if mode == SearchMode::Upstream || item.kind == SuggestionKind::Tag {
            return self.proxy.recommendations(&item.url).await;
        }

        let route = DetailRoute::from_path(&item.url)
            .ok_or_else(|| anyhow!("not a TMDB title path: {}", item.url))?;
        let similar = self.tmdb.fetch_similar(route.media_type, route.id).await?;
        info!(
            title = %item.label,
            results = similar.len(),
            "Loaded TMDB similar titles"
        );
        Ok(RecommendationPayload::Json(RecommendationEnvelope {
            success: true,
            data: Some(
                similar
                    .into_iter()
                    .map(|r| EnvelopeRecord {
                        id: r.id,
                        title: r.title,
                        poster: r.poster_url,
                        year: Some(r.year).filter(|y| !y.is_empty()),
                        media_type: r.media_type,
                    })
                    .collect(),
            ),
        }))
    }
}
