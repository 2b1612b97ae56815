use tracing::{info, warn};

use crate::error::DetailError;
use crate::models::{MediaRecord, MediaType};
use crate::normalize::SECTION_CAP;
use crate::tmdb::{CastMember, TitleMetadata, TmdbApi, WatchProviders};

/// `(media type, id)` addressing one details view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailRoute {
    pub media_type: MediaType,
    pub id: i32,
}

impl DetailRoute {
    pub fn parse(media_type: &str, id: &str) -> Result<Self, DetailError> {
        let media_type = MediaType::parse(media_type)
            .ok_or_else(|| DetailError::InvalidRoute(format!("unknown media type '{media_type}'")))?;
        let id = id
            .parse::<i32>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| DetailError::InvalidRoute(format!("invalid id '{id}'")))?;
        Ok(Self { media_type, id })
    }

    /// Accepts `/movie/603` style paths.
    pub fn from_path(path: &str) -> Option<Self> {
        let mut parts = path.trim_matches('/').split('/');
        let (kind, id) = (parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        Self::parse(kind, id).ok()
    }

    pub fn path(&self) -> String {
        format!("/{}/{}", self.media_type, self.id)
    }

    /// Selecting a similar title re-enters the details view for it.
    pub fn for_record(record: &MediaRecord) -> Result<Self, DetailError> {
        Self::parse(record.media_type.as_str(), &record.id)
    }
}

/// Everything one details view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRecord {
    pub route: DetailRoute,
    pub metadata: TitleMetadata,
    pub cast: Vec<CastMember>,
    pub similar: Vec<MediaRecord>,
    pub providers: WatchProviders,
    pub trailer: Option<String>,
}

/// Primary metadata first, then the four sub-resources concurrently.
/// Cast and similar are required; providers and trailer degrade to empty.
pub async fn aggregate(tmdb: &dyn TmdbApi, route: DetailRoute) -> Result<DetailRecord, DetailError> {
    let DetailRoute { media_type, id } = route;
    let metadata = tmdb.fetch_details(media_type, id).await?;

    let (cast, similar, providers, trailer) = tokio::join!(
        tmdb.fetch_credits(media_type, id),
        tmdb.fetch_similar(media_type, id),
        tmdb.fetch_watch_providers(media_type, id),
        tmdb.fetch_trailer(media_type, id),
    );
    let cast = cast?;
    let mut similar = similar?;
    similar.retain(MediaRecord::is_displayable);
    similar.truncate(SECTION_CAP);

    let providers = providers.unwrap_or_else(|e| {
        warn!(route = %route.path(), "Watch providers unavailable: {:#}", e);
        WatchProviders::default()
    });
    let trailer = trailer.unwrap_or_else(|e| {
        warn!(route = %route.path(), "Trailer unavailable: {:#}", e);
        None
    });

    info!(
        route = %route.path(),
        title = %metadata.title,
        cast = cast.len(),
        similar = similar.len(),
        "Details loaded"
    );
    Ok(DetailRecord {
        route,
        metadata,
        cast,
        similar,
        providers,
        trailer,
    })
}
