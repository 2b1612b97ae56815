use tracing::warn;

use crate::demo::{self, DemoNotice};
use crate::models::MediaRecord;
use crate::normalize::SECTION_CAP;
use crate::tmdb::{MovieList, TmdbApi};

#[derive(Debug, Clone, PartialEq)]
pub struct TrendingOutcome {
    pub list: MovieList,
    pub movies: Vec<MediaRecord>,
    pub notice: Option<DemoNotice>,
}

pub async fn load(tmdb: &dyn TmdbApi, list: MovieList) -> TrendingOutcome {
    match tmdb.fetch_list(list).await {
        Ok(mut movies) => {
            movies.retain(MediaRecord::is_displayable);
            movies.truncate(SECTION_CAP);
            TrendingOutcome {
                list,
                movies,
                notice: None,
            }
        }
        Err(e) => {
            warn!(?list, "Error fetching movies: {:#}", e);
            TrendingOutcome {
                list,
                movies: demo::trending(),
                notice: Some(DemoNotice::Trending),
            }
        }
    }
}

pub fn section_title(list: MovieList) -> &'static str {
    match list {
        MovieList::Trending => "Trending Movies",
        MovieList::Upcoming => "Coming Soon",
        MovieList::NowPlaying => "Now Playing",
    }
}
