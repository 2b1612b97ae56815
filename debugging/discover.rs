//! Drive the discovery flow against live services and print what a user would see.
//! Usage:
//!   cargo run --bin discover -- search <term> [upstream|tmdb]
//!   cargo run --bin discover -- details <movie|tv> <tmdb_id>
//!   cargo run --bin discover -- trending [trending|upcoming|now_playing]
//!   cargo run --bin discover -- tags <tags.json> [filter]
//! `search` needs the proxy running (PROXY_BASE_URL); `details`, `trending` and
//! TMDB mode need TMDB_API_KEY. The search session is kept in SESSION_FILE.

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use serde_json::{json, Value};
use std::env;
use std::str::FromStr;
use std::sync::Arc;

use whojoshi::client::ProxyClient;
use whojoshi::config::ClientConfig;
use whojoshi::details::{self, DetailRoute};
use whojoshi::discovery::{LiveDiscovery, SearchMode};
use whojoshi::models::MediaRecord;
use whojoshi::search::{Key, SearchController, SearchSettings};
use whojoshi::session::FileStore;
use whojoshi::tags::TagCatalog;
use whojoshi::tmdb::{MovieList, Provider, TmdbApi, TmdbClient};
use whojoshi::trending;

#[derive(Debug, Clone, Copy)]
struct ListArg(MovieList);

impl FromStr for ListArg {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trending" => Ok(ListArg(MovieList::Trending)),
            "upcoming" => Ok(ListArg(MovieList::Upcoming)),
            "now_playing" | "nowplaying" => Ok(ListArg(MovieList::NowPlaying)),
            _ => Err(anyhow::anyhow!(
                "list must be 'trending', 'upcoming' or 'now_playing'"
            )),
        }
    }
}

fn parse_mode(arg: Option<&String>) -> Result<SearchMode> {
    match arg.map(|s| s.to_lowercase()).as_deref() {
        None | Some("upstream") => Ok(SearchMode::Upstream),
        Some("tmdb") => Ok(SearchMode::Tmdb),
        Some(other) => bail!("unknown search mode '{}'", other),
    }
}

fn record_json(record: &MediaRecord) -> Value {
    json!({
        "id": record.id,
        "title": record.title,
        "year": record.year,
        "type": record.media_type.as_str(),
        "poster": record.poster_url,
    })
}

fn provider_names(providers: &[Provider]) -> Vec<&str> {
    providers.iter().map(|p| p.name.as_str()).collect()
}

fn usage() {
    eprintln!("Usage: cargo run --bin discover -- search <term> [upstream|tmdb]");
    eprintln!("       cargo run --bin discover -- details <movie|tv> <tmdb_id>");
    eprintln!("       cargo run --bin discover -- trending [trending|upcoming|now_playing]");
    eprintln!("       cargo run --bin discover -- tags <tags.json> [filter]");
}

async fn search(config: &ClientConfig, tmdb: Arc<dyn TmdbApi>, term: &str, mode: SearchMode) -> Result<()> {
    let proxy = ProxyClient::new(&config.proxy_base_url)?;
    let source = Arc::new(LiveDiscovery::new(proxy, tmdb));
    let store = Arc::new(FileStore::open(&config.session_file)?);
    let mut controller = SearchController::mount(source, store, SearchSettings::from(config));
    controller.set_mode(mode);

    controller.type_term(term).await;
    let suggestions: Vec<Value> = controller
        .machine()
        .suggestions()
        .all()
        .iter()
        .map(|s| json!({ "label": s.label, "url": s.url }))
        .collect();
    if suggestions.is_empty() {
        bail!("no suggestions for '{}'", term);
    }

    controller.press(Key::Enter).await;
    let machine = controller.machine();
    let output = json!({
        "term": machine.session().search_term,
        "mode": mode,
        "suggestions": suggestions,
        "notice": machine.notice().map(|n| n.title()),
        "results": machine.visible_results().into_iter().map(record_json).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    controller.before_unload();
    Ok(())
}

async fn show_details(tmdb: &dyn TmdbApi, kind: &str, id: &str) -> Result<()> {
    let route = DetailRoute::parse(kind, id)?;
    let record = details::aggregate(tmdb, route).await?;
    let meta = &record.metadata;
    let output = json!({
        "route": route.path(),
        "title": meta.title,
        "year": meta.year,
        "tagline": meta.tagline,
        "overview": meta.overview,
        "genres": meta.genres,
        "runtime": meta.runtime_minutes,
        "seasons": meta.seasons,
        "rating": meta.vote_average,
        "poster": meta.poster_url,
        "cast": record.cast.iter().map(|c| json!({ "name": c.name, "character": c.character })).collect::<Vec<_>>(),
        "similar": record.similar.iter().map(record_json).collect::<Vec<_>>(),
        "providers": {
            "link": record.providers.link,
            "stream": provider_names(&record.providers.flatrate),
            "rent": provider_names(&record.providers.rent),
            "buy": provider_names(&record.providers.buy),
        },
        "trailer": record.trailer,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }

    let config = ClientConfig::from_env();
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(&config.tmdb)?);

    match args[1].as_str() {
        "search" => {
            let term = args.get(2).context("search needs a term")?;
            let mode = parse_mode(args.get(3))?;
            search(&config, tmdb, term, mode).await
        }
        "details" => {
            let (kind, id) = match (args.get(2), args.get(3)) {
                (Some(kind), Some(id)) => (kind, id),
                _ => bail!("details needs <movie|tv> <tmdb_id>"),
            };
            show_details(tmdb.as_ref(), kind, id).await
        }
        "trending" => {
            let ListArg(list) = match args.get(2) {
                Some(arg) => ListArg::from_str(arg)?,
                None => ListArg(MovieList::Trending),
            };
            let outcome = trending::load(tmdb.as_ref(), list).await;
            let output = json!({
                "section": trending::section_title(list),
                "notice": outcome.notice.map(|n| n.title()),
                "movies": outcome.movies.iter().map(record_json).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        "tags" => {
            let path = args.get(2).context("tags needs a path to tags.json")?;
            let catalog = TagCatalog::load(path)?;
            let term = args.get(3).map(String::as_str).unwrap_or("");
            let matches: Vec<Value> = catalog
                .filter(term)
                .into_iter()
                .map(|t| json!({ "name": t.name, "url": t.url }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&matches)?);
            Ok(())
        }
        _ => {
            usage();
            std::process::exit(1);
        }
    }
}
