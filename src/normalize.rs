//! Turns a recommendations response into an ordered `MediaRecord` list.
//!
//! The upstream answers either with a JSON envelope or with an HTML page of
//! poster cards. The shape is decided once, from the content type, into a
//! [`RecommendationPayload`]; each variant has its own normalizer.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;
use crate::models::{MediaRecord, MediaType, RecommendationEnvelope};

pub const RECOMMENDATION_CAP: usize = 24;
pub const SECTION_CAP: usize = 12;

const TV_MARKER: &str = "TV show";

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d{4})\)").expect("valid regex"));
static YEAR_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\d{4}\)").expect("valid regex"));
static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse(".column-img").expect("valid selector"));
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid selector"));
static LABEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.label.label-default").expect("valid selector"));

#[derive(Debug, Clone)]
pub enum RecommendationPayload {
    Json(RecommendationEnvelope),
    Html(String),
}

impl RecommendationPayload {
    /// Resolve the response shape at the boundary. JSON bodies that fail to
    /// parse are a `ParseError`; everything else is treated as HTML.
    pub fn from_response(content_type: Option<&str>, body: &[u8]) -> Result<Self, ParseError> {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);
        if is_json {
            Ok(Self::Json(serde_json::from_slice(body)?))
        } else {
            Ok(Self::Html(String::from_utf8_lossy(body).into_owned()))
        }
    }

    /// Normalize and cap. HTML results list movies before TV shows; JSON
    /// results keep the order of the source.
    pub fn normalize(&self, upstream_base: &str, cap: usize) -> Result<Vec<MediaRecord>, ParseError> {
        let mut records = match self {
            Self::Json(envelope) => normalize_envelope(envelope)?,
            Self::Html(html) => group_movies_first(normalize_html(html, upstream_base)),
        };
        records.truncate(cap);
        Ok(records)
    }
}

pub fn normalize_envelope(envelope: &RecommendationEnvelope) -> Result<Vec<MediaRecord>, ParseError> {
    if !envelope.success {
        return Err(ParseError::Unsuccessful);
    }
    let data = envelope.data.as_ref().ok_or(ParseError::MissingData)?;
    Ok(data
        .iter()
        .cloned()
        .map(MediaRecord::from)
        .filter(MediaRecord::is_displayable)
        .collect())
}

/// Scrape every poster card, in document order. Cards without a poster or a
/// title are dropped.
pub fn normalize_html(html: &str, upstream_base: &str) -> Vec<MediaRecord> {
    let doc = Html::parse_document(html);
    doc.select(&CARD)
        .enumerate()
        .filter_map(|(index, card)| parse_card(card, index, upstream_base))
        .filter(MediaRecord::is_displayable)
        .collect()
}

fn parse_card(card: ElementRef<'_>, index: usize, upstream_base: &str) -> Option<MediaRecord> {
    let img = card.select(&IMG).next()?;
    let src = img.value().attr("src").unwrap_or("").trim();
    let alt = img.value().attr("alt").unwrap_or("");
    let id = img
        .value()
        .attr("data-id")
        .map(|s| s.to_string())
        .unwrap_or_else(|| index.to_string());
    let (title, year) = split_year(alt);

    Some(MediaRecord {
        id,
        title,
        poster_url: absolute_poster_url(src, upstream_base),
        year,
        media_type: classify_card(card),
    })
}

/// `"Dune (2021)"` becomes `("Dune", "2021")`. Without a parenthesized
/// four-digit year the text is returned unchanged with an empty year.
pub fn split_year(alt: &str) -> (String, String) {
    let year = YEAR_TOKEN
        .captures(alt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let title = YEAR_SUFFIX.replace(alt, "").into_owned();
    (title, year)
}

pub fn absolute_poster_url(src: &str, upstream_base: &str) -> String {
    if let Some(rest) = src.strip_prefix("//") {
        format!("https://{rest}")
    } else if src.starts_with('/') {
        format!("{}{}", upstream_base.trim_end_matches('/'), src)
    } else {
        src.to_string()
    }
}

fn classify_card(card: ElementRef<'_>) -> MediaType {
    let container = std::iter::once(card)
        .chain(card.ancestors().filter_map(ElementRef::wrap))
        .find(|el| el.value().classes().any(|c| c == "column"))
        .or_else(|| card.parent().and_then(ElementRef::wrap))
        .unwrap_or(card);

    let is_tv = container
        .select(&LABEL)
        .next()
        .map(|label| label.text().collect::<String>().trim() == TV_MARKER)
        .unwrap_or(false);
    if is_tv {
        MediaType::Tv
    } else {
        MediaType::Movie
    }
}

/// Stable partition: movies first, then TV shows.
pub fn group_movies_first(records: Vec<MediaRecord>) -> Vec<MediaRecord> {
    let (movies, shows): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| r.media_type == MediaType::Movie);
    movies.into_iter().chain(shows).collect()
}
