use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "movie" => Some(MediaType::Movie),
            "tv" => Some(MediaType::Tv),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movie or TV show as shown in a result grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    pub title: String,
    pub poster_url: String,
    #[serde(default)]
    pub year: String,
    pub media_type: MediaType,
}

impl MediaRecord {
    /// Records without a poster or a title never reach the UI.
    pub fn is_displayable(&self) -> bool {
        !self.poster_url.trim().is_empty() && !self.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Movie,
    Tv,
    Tag,
}

/// An autocomplete candidate. `url` stays an opaque upstream path until the
/// user commits the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionItem {
    pub id: String,
    pub label: String,
    pub url: String,
    pub kind: SuggestionKind,
}

/// Autocomplete results grouped the way the upstream returns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestions {
    pub movie: Vec<SuggestionItem>,
    pub tv: Vec<SuggestionItem>,
}

impl Suggestions {
    /// Flat navigation order: every movie, then every TV show.
    pub fn all(&self) -> Vec<&SuggestionItem> {
        self.movie.iter().chain(self.tv.iter()).collect()
    }

    pub fn len(&self) -> usize {
        self.movie.len() + self.tv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&SuggestionItem> {
        if index < self.movie.len() {
            self.movie.get(index)
        } else {
            self.tv.get(index - self.movie.len())
        }
    }

    /// Parse the upstream autocomplete body (`{"movie": [...], "tv": [...]}`).
    /// Unknown groups are ignored; missing groups are empty.
    pub fn from_autocomplete(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            movie: Vec<RawItem>,
            #[serde(default)]
            tv: Vec<RawItem>,
        }

        let raw: Raw = serde_json::from_value(value.clone())?;
        let convert = |items: Vec<RawItem>, kind: SuggestionKind| {
            items
                .into_iter()
                .map(|i| SuggestionItem {
                    id: i.id,
                    label: i.label,
                    url: i.url,
                    kind,
                })
                .collect::<Vec<_>>()
        };
        Ok(Self {
            movie: convert(raw.movie, SuggestionKind::Movie),
            tv: convert(raw.tv, SuggestionKind::Tv),
        })
    }
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    label: String,
    url: String,
}

/// JSON shape some recommendation sources answer with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationEnvelope {
    #[serde(default)]
    pub success: bool,
    /// Records that fail to parse are skipped, not the whole envelope.
    #[serde(default, deserialize_with = "readable_records")]
    pub data: Option<Vec<EnvelopeRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub year: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

impl From<EnvelopeRecord> for MediaRecord {
    fn from(r: EnvelopeRecord) -> Self {
        MediaRecord {
            id: r.id,
            title: r.title,
            poster_url: r.poster,
            year: r.year.unwrap_or_default(),
            media_type: r.media_type,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(i64),
}

impl TextOrNumber {
    fn into_string(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(TextOrNumber::deserialize(deserializer)?.into_string())
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(TextOrNumber::into_string))
}

fn readable_records<'de, D>(deserializer: D) -> Result<Option<Vec<EnvelopeRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.map(|items| {
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<EnvelopeRecord>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable recommendation record: {}", e);
                    None
                }
            })
            .collect()
    }))
}
