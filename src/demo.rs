//! Fixed sample data shown when live fetches fail, so the UI stays populated.

use crate::models::{MediaRecord, MediaType, SuggestionItem, SuggestionKind, Suggestions};

pub const PLACEHOLDER_POSTER: &str = "/placeholder.svg";

/// Non-blocking banner raised whenever demo data replaces a live result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoNotice {
    Suggestions,
    Recommendations,
    Trending,
}

impl DemoNotice {
    pub fn title(&self) -> &'static str {
        "Demo Mode"
    }

    pub fn description(&self) -> &'static str {
        match self {
            DemoNotice::Suggestions => "Showing sample results due to API limitations",
            DemoNotice::Recommendations => "Showing sample recommendations due to API limitations",
            DemoNotice::Trending => "Showing sample titles due to API limitations",
        }
    }
}

/// Sample suggestions exist only for terms mentioning "wonder".
pub fn suggestions_for(term: &str) -> Option<Suggestions> {
    if !term.to_lowercase().contains("wonder") {
        return None;
    }
    let item = |id: &str, label: &str, url: &str, kind| SuggestionItem {
        id: id.to_string(),
        label: label.to_string(),
        url: url.to_string(),
        kind,
    };
    Some(Suggestions {
        movie: vec![
            item("1", "Wonder Woman (2017)", "/movies/38910-wonder-woman", SuggestionKind::Movie),
            item(
                "2",
                "Wonder Woman 1984 (2020)",
                "/movies/464052-wonder-woman-1984",
                SuggestionKind::Movie,
            ),
        ],
        tv: vec![item(
            "3",
            "Wonder Years (1988)",
            "/tv/1695-the-wonder-years",
            SuggestionKind::Tv,
        )],
    })
}

pub fn recommendations() -> Vec<MediaRecord> {
    [
        ("1", "Wonder Woman", "2017"),
        ("2", "Wonder Woman 1984", "2020"),
        ("3", "Batman v Superman", "2016"),
        ("4", "Justice League", "2017"),
    ]
    .into_iter()
    .map(|(id, title, year)| sample(id, title, year))
    .collect()
}

pub fn trending() -> Vec<MediaRecord> {
    vec![
        sample("550", "Sample Movie 1", "2024"),
        sample("551", "Sample Movie 2", "2024"),
    ]
}

fn sample(id: &str, title: &str, year: &str) -> MediaRecord {
    MediaRecord {
        id: id.to_string(),
        title: title.to_string(),
        poster_url: PLACEHOLDER_POSTER.to_string(),
        year: year.to_string(),
        media_type: MediaType::Movie,
    }
}
