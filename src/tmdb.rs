use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::TmdbConfig;
use crate::demo::PLACEHOLDER_POSTER;
use crate::models::{MediaRecord, MediaType};

const POSTER_SIZE: &str = "w500";
const BACKDROP_SIZE: &str = "w1280";
const PROFILE_SIZE: &str = "w185";
const LOGO_SIZE: &str = "w92";
const CAST_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieList {
    Trending,
    Upcoming,
    NowPlaying,
}

impl MovieList {
    fn path(&self) -> &'static str {
        match self {
            MovieList::Trending => "trending/movie/week",
            MovieList::Upcoming => "movie/upcoming",
            MovieList::NowPlaying => "movie/now_playing",
        }
    }
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_multi(&self, query: &str) -> Result<Vec<SearchHit>>;
    async fn fetch_details(&self, media_type: MediaType, id: i32) -> Result<TitleMetadata>;
    async fn fetch_credits(&self, media_type: MediaType, id: i32) -> Result<Vec<CastMember>>;
    async fn fetch_similar(&self, media_type: MediaType, id: i32) -> Result<Vec<MediaRecord>>;
    async fn fetch_watch_providers(&self, media_type: MediaType, id: i32) -> Result<WatchProviders>;
    async fn fetch_trailer(&self, media_type: MediaType, id: i32) -> Result<Option<String>>;
    async fn fetch_list(&self, list: MovieList) -> Result<Vec<MediaRecord>>;
}

/// A movie or TV hit from multi-search; people are filtered out.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: i32,
    pub media_type: MediaType,
    pub title: String,
    pub year: String,
    pub poster_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleMetadata {
    pub id: i32,
    pub title: String,
    pub tagline: Option<String>,
    pub overview: String,
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    pub year: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub seasons: Option<u32>,
    pub episodes: Option<u32>,
    pub vote_average: f32,
    pub status: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub imdb_id: Option<String>,
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    pub name: String,
    pub logo_url: Option<String>,
}

/// Where a title can be watched in the configured region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchProviders {
    pub link: Option<String>,
    pub flatrate: Vec<Provider>,
    pub rent: Vec<Provider>,
    pub buy: Vec<Provider>,
}

impl WatchProviders {
    pub fn is_empty(&self) -> bool {
        self.flatrate.is_empty() && self.rent.is_empty() && self.buy.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    image_base: String,
    region: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            image_base: config.image_base.clone(),
            region: config.watch_region.clone(),
        })
    }

    fn url(&self, path: &str, extra: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("TMDB API key not configured"));
        }
        Ok(format!(
            "{}/{path}?api_key={}{extra}",
            self.base_url, self.api_key
        ))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("TMDB API error: {}", status));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }

    fn record_from(&self, item: ListItem, media_type: MediaType) -> MediaRecord {
        let date = item.release_date.as_deref().or(item.first_air_date.as_deref());
        MediaRecord {
            id: item.id.to_string(),
            title: item.title.or(item.name).unwrap_or_default(),
            poster_url: image_url(&self.image_base, item.poster_path.as_deref(), POSTER_SIZE),
            year: date.and_then(extract_year).unwrap_or_default(),
            media_type,
        }
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_multi(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = self.url(
            "search/multi",
            &format!("&query={}&include_adult=false", urlencoding::encode(query)),
        )?;
        let data: Page<ListItem> = self.get_json(&url).await?;
        Ok(data
            .results
            .into_iter()
            .filter_map(|item| {
                let media_type = item.media_type.as_deref().and_then(MediaType::parse)?;
                let record = self.record_from(item, media_type);
                Some(SearchHit {
                    id: record.id.parse().ok()?,
                    media_type,
                    title: record.title,
                    year: record.year,
                    poster_url: record.poster_url,
                })
            })
            .collect())
    }

    async fn fetch_details(&self, media_type: MediaType, id: i32) -> Result<TitleMetadata> {
        match media_type {
            MediaType::Movie => {
                let url = self.url(&format!("movie/{id}"), "&append_to_response=external_ids")?;
                let d: MovieDetail = self.get_json(&url).await?;
                Ok(TitleMetadata {
                    id: d.id,
                    year: d.release_date.as_deref().and_then(extract_year),
                    title: d.title,
                    tagline: d.tagline.filter(|t| !t.is_empty()),
                    overview: d.overview.unwrap_or_default(),
                    genres: names(d.genres),
                    release_date: d.release_date.filter(|r| !r.is_empty()),
                    runtime_minutes: d.runtime.filter(|r| *r > 0),
                    seasons: None,
                    episodes: None,
                    vote_average: d.vote_average.unwrap_or_default(),
                    status: d.status,
                    poster_url: optional_image(&self.image_base, d.poster_path.as_deref(), POSTER_SIZE),
                    backdrop_url: optional_image(&self.image_base, d.backdrop_path.as_deref(), BACKDROP_SIZE),
                    imdb_id: d.imdb_id.or(d.external_ids.and_then(|e| e.imdb_id)),
                    homepage: d.homepage.filter(|h| !h.is_empty()),
                })
            }
            MediaType::Tv => {
                let url = self.url(&format!("tv/{id}"), "&append_to_response=external_ids")?;
                let d: ShowDetail = self.get_json(&url).await?;
                Ok(TitleMetadata {
                    id: d.id,
                    year: d.first_air_date.as_deref().and_then(extract_year),
                    title: d.name,
                    tagline: d.tagline.filter(|t| !t.is_empty()),
                    overview: d.overview.unwrap_or_default(),
                    genres: names(d.genres),
                    release_date: d.first_air_date.filter(|r| !r.is_empty()),
                    runtime_minutes: d.episode_run_time.and_then(|r| r.first().copied()),
                    seasons: d.number_of_seasons,
                    episodes: d.number_of_episodes,
                    vote_average: d.vote_average.unwrap_or_default(),
                    status: d.status,
                    poster_url: optional_image(&self.image_base, d.poster_path.as_deref(), POSTER_SIZE),
                    backdrop_url: optional_image(&self.image_base, d.backdrop_path.as_deref(), BACKDROP_SIZE),
                    imdb_id: d.external_ids.and_then(|e| e.imdb_id),
                    homepage: d.homepage.filter(|h| !h.is_empty()),
                })
            }
        }
    }

    async fn fetch_credits(&self, media_type: MediaType, id: i32) -> Result<Vec<CastMember>> {
        let url = self.url(&format!("{media_type}/{id}/credits"), "")?;
        let credits: Credits = self.get_json(&url).await?;
        Ok(credits
            .cast
            .into_iter()
            .take(CAST_LIMIT)
            .map(|c| CastMember {
                profile_url: optional_image(&self.image_base, c.profile_path.as_deref(), PROFILE_SIZE),
                name: c.name,
                character: c.character.filter(|ch| !ch.is_empty()),
            })
            .collect())
    }

    async fn fetch_similar(&self, media_type: MediaType, id: i32) -> Result<Vec<MediaRecord>> {
        let url = self.url(&format!("{media_type}/{id}/similar"), "")?;
        let data: Page<ListItem> = self.get_json(&url).await?;
        Ok(data
            .results
            .into_iter()
            .map(|item| self.record_from(item, media_type))
            .collect())
    }

    async fn fetch_watch_providers(&self, media_type: MediaType, id: i32) -> Result<WatchProviders> {
        let url = self.url(&format!("{media_type}/{id}/watch/providers"), "")?;
        let mut data: ProviderResponse = self.get_json(&url).await?;
        let Some(region) = data.results.remove(&self.region) else {
            return Ok(WatchProviders::default());
        };
        let convert = |list: Option<Vec<RawProvider>>| {
            list.unwrap_or_default()
                .into_iter()
                .map(|p| Provider {
                    logo_url: optional_image(&self.image_base, p.logo_path.as_deref(), LOGO_SIZE),
                    name: p.provider_name,
                })
                .collect::<Vec<_>>()
        };
        Ok(WatchProviders {
            link: region.link,
            flatrate: convert(region.flatrate),
            rent: convert(region.rent),
            buy: convert(region.buy),
        })
    }

    async fn fetch_trailer(&self, media_type: MediaType, id: i32) -> Result<Option<String>> {
        let url = self.url(&format!("{media_type}/{id}/videos"), "")?;
        let videos: Videos = self.get_json(&url).await?;
        Ok(select_trailer(&videos))
    }

    async fn fetch_list(&self, list: MovieList) -> Result<Vec<MediaRecord>> {
        let url = self.url(list.path(), "")?;
        let data: Page<ListItem> = self.get_json(&url).await?;
        Ok(data
            .results
            .into_iter()
            .map(|item| self.record_from(item, MediaType::Movie))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    id: i64,
    title: Option<String>,
    name: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MovieDetail {
    id: i32,
    title: String,
    tagline: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    runtime: Option<u32>,
    vote_average: Option<f32>,
    status: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    genres: Option<Vec<Genre>>,
    imdb_id: Option<String>,
    homepage: Option<String>,
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct ShowDetail {
    id: i32,
    name: String,
    tagline: Option<String>,
    overview: Option<String>,
    first_air_date: Option<String>,
    episode_run_time: Option<Vec<u32>>,
    number_of_seasons: Option<u32>,
    number_of_episodes: Option<u32>,
    vote_average: Option<f32>,
    status: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    genres: Option<Vec<Genre>>,
    homepage: Option<String>,
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<RawCast>,
}

#[derive(Debug, Deserialize)]
struct RawCast {
    name: String,
    character: Option<String>,
    profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    results: std::collections::HashMap<String, RegionProviders>,
}

#[derive(Debug, Deserialize)]
struct RegionProviders {
    link: Option<String>,
    flatrate: Option<Vec<RawProvider>>,
    rent: Option<Vec<RawProvider>>,
    buy: Option<Vec<RawProvider>>,
}

#[derive(Debug, Deserialize)]
struct RawProvider {
    provider_name: String,
    logo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Videos {
    results: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    site: String,
    #[serde(rename = "type")]
    video_type: String,
    key: String,
}

/// TMDB image URL, or the placeholder poster when the path is missing.
pub fn image_url(image_base: &str, path: Option<&str>, size: &str) -> String {
    optional_image(image_base, path, size).unwrap_or_else(|| PLACEHOLDER_POSTER.to_string())
}

fn optional_image(image_base: &str, path: Option<&str>, size: &str) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{image_base}/{size}{p}"))
}

fn names(genres: Option<Vec<Genre>>) -> Vec<String> {
    genres
        .map(|g| g.into_iter().map(|x| x.name).collect())
        .unwrap_or_default()
}

fn extract_year(date: &str) -> Option<String> {
    date.split('-')
        .next()
        .filter(|y| y.len() == 4)
        .map(|s| s.to_string())
}

fn select_trailer(videos: &Videos) -> Option<String> {
    videos
        .results
        .iter()
        .find(|v| v.site.eq_ignore_ascii_case("YouTube") && v.video_type == "Trailer")
        .or_else(|| {
            videos
                .results
                .iter()
                .find(|v| v.site.eq_ignore_ascii_case("YouTube") && v.video_type == "Teaser")
        })
        .map(|v| format!("https://www.youtube.com/watch?v={}", v.key))
}
