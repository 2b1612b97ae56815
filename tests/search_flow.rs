use anyhow::anyhow;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use whojoshi::client::ProxyClient;
use whojoshi::demo::DemoNotice;
use whojoshi::discovery::{DiscoverySource, LiveDiscovery, SearchMode};
use whojoshi::models::{
    EnvelopeRecord, MediaRecord, MediaType, RecommendationEnvelope, SuggestionItem,
    SuggestionKind, Suggestions,
};
use whojoshi::normalize::RecommendationPayload;
use whojoshi::search::{
    fetch_suggestions, Key, SearchController, SearchMachine, SearchPhase, SearchSettings,
};
use whojoshi::session::{CategoryTab, MemoryStore, SessionKey, SessionStore};
use whojoshi::tmdb::{
    CastMember, MovieList, SearchHit, TitleMetadata, TmdbApi, WatchProviders,
};

/// Nothing listens on the discard port, so every proxy call fails fast.
const UNREACHABLE_PROXY: &str = "http://127.0.0.1:9";

fn item(id: &str, label: &str, kind: SuggestionKind) -> SuggestionItem {
    SuggestionItem {
        id: id.to_string(),
        label: label.to_string(),
        url: format!("/movies/{id}"),
        kind,
    }
}

fn envelope(count: usize) -> RecommendationPayload {
    RecommendationPayload::Json(RecommendationEnvelope {
        success: true,
        data: Some(
            (0..count)
                .map(|i| EnvelopeRecord {
                    id: i.to_string(),
                    title: format!("Film {i}"),
                    poster: format!("/p/{i}.jpg"),
                    year: Some("1999".to_string()),
                    media_type: MediaType::Movie,
                })
                .collect(),
        ),
    })
}

fn instant() -> SearchSettings {
    SearchSettings {
        debounce: Duration::ZERO,
        ..SearchSettings::default()
    }
}

/// Answers every term with the same list; slow terms sleep first.
#[derive(Default)]
struct FakeDiscovery {
    suggestions: Suggestions,
    payload: Option<RecommendationPayload>,
    slow_terms: Vec<String>,
    searched: Mutex<Vec<(SearchMode, String)>>,
    chosen: Mutex<Vec<SuggestionItem>>,
}

#[async_trait::async_trait]
impl DiscoverySource for FakeDiscovery {
    async fn suggestions(&self, mode: SearchMode, term: &str) -> anyhow::Result<Suggestions> {
        self.searched.lock().unwrap().push((mode, term.to_string()));
        if self.slow_terms.iter().any(|t| t == term) {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        let mut suggestions = self.suggestions.clone();
        for s in suggestions.movie.iter_mut() {
            s.label = format!("{} [{term}]", s.label);
        }
        Ok(suggestions)
    }

    async fn recommendations(
        &self,
        _mode: SearchMode,
        item: &SuggestionItem,
    ) -> anyhow::Result<RecommendationPayload> {
        self.chosen.lock().unwrap().push(item.clone());
        self.payload.clone().ok_or_else(|| anyhow!("upstream down"))
    }
}

fn three_movies() -> Suggestions {
    Suggestions {
        movie: vec![
            item("1", "Alien", SuggestionKind::Movie),
            item("2", "Aliens", SuggestionKind::Movie),
        ],
        tv: vec![item("3", "Alien Nation", SuggestionKind::Tv)],
    }
}

#[tokio::test]
async fn wonder_falls_back_to_samples_when_proxy_unreachable() {
    let proxy = ProxyClient::new(UNREACHABLE_PROXY).unwrap();
    let source = Arc::new(LiveDiscovery::new(proxy, Arc::new(FakeTmdb)));
    let store = Arc::new(MemoryStore::new());
    let mut controller = SearchController::mount(source, store.clone(), instant());

    controller.type_term("wonder").await;
    let machine = controller.machine();
    let labels: Vec<_> = machine
        .suggestions()
        .movie
        .iter()
        .map(|s| s.label.as_str())
        .collect();
    assert_eq!(labels, ["Wonder Woman (2017)", "Wonder Woman 1984 (2020)"]);
    assert!(machine.is_dropdown_open());
    assert_eq!(machine.notice(), Some(DemoNotice::Suggestions));
    assert!(machine.session().has_error);

    controller.press(Key::Enter).await;
    let machine = controller.machine();
    assert_eq!(machine.phase(), SearchPhase::ShowingResults);
    assert_eq!(machine.session().search_term, "Wonder Woman (2017)");
    assert_eq!(machine.session().selected_movies.len(), 4);
    assert_eq!(machine.notice(), Some(DemoNotice::Recommendations));
    assert_eq!(store.get(SessionKey::HasError.as_str()).as_deref(), Some("true"));
}

#[tokio::test]
async fn other_terms_show_nothing_when_proxy_unreachable() {
    let proxy = ProxyClient::new(UNREACHABLE_PROXY).unwrap();
    let source = Arc::new(LiveDiscovery::new(proxy, Arc::new(FakeTmdb)));
    let mut controller = SearchController::mount(source, Arc::new(MemoryStore::new()), instant());

    controller.type_term("heat").await;
    assert!(controller.machine().suggestions().is_empty());
    assert!(!controller.machine().is_dropdown_open());
    assert_eq!(controller.machine().notice(), None);
}

#[tokio::test(start_paused = true)]
async fn waits_for_debounce_before_fetching() {
    let source = Arc::new(FakeDiscovery {
        suggestions: three_movies(),
        ..FakeDiscovery::default()
    });
    let settings = SearchSettings::default();
    let mut controller =
        SearchController::mount(source.clone(), Arc::new(MemoryStore::new()), settings);

    let start = tokio::time::Instant::now();
    controller.type_term("alien").await;
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_eq!(controller.machine().suggestions().len(), 3);

    controller.type_term("a").await;
    assert!(controller.machine().suggestions().is_empty());
    assert_eq!(source.searched.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_keystrokes_never_reach_the_source() {
    let source = FakeDiscovery {
        suggestions: three_movies(),
        ..FakeDiscovery::default()
    };
    let debounce = Duration::from_millis(300);
    let mut machine = SearchMachine::new(SearchSettings::default());

    let first = machine.input_changed("wo").unwrap();
    let second = machine.input_changed("won").unwrap();
    let third = machine.input_changed("wond").unwrap();
    let (a, b, c) = tokio::join!(
        fetch_suggestions(&source, debounce, &first),
        fetch_suggestions(&source, debounce, &second),
        fetch_suggestions(&source, debounce, &third),
    );

    assert!(a.is_none());
    assert!(b.is_none());
    let searched: Vec<_> = source
        .searched
        .lock()
        .unwrap()
        .iter()
        .map(|(_, term)| term.clone())
        .collect();
    assert_eq!(searched, ["wond"]);

    assert!(machine.apply_suggestions(third.generation, c.unwrap()));
    assert_eq!(machine.suggestions().movie[0].label, "Alien [wond]");
}

#[tokio::test(start_paused = true)]
async fn slow_response_for_replaced_term_is_discarded() {
    let source = FakeDiscovery {
        suggestions: three_movies(),
        slow_terms: vec!["al".to_string()],
        ..FakeDiscovery::default()
    };
    let debounce = Duration::from_millis(300);
    let mut machine = SearchMachine::new(SearchSettings::default());

    // The fetch for "al" is already in flight when "ali" is typed.
    let first = machine.input_changed("al").unwrap();
    let (slow, second) = tokio::join!(fetch_suggestions(&source, debounce, &first), async {
        tokio::time::sleep(debounce + Duration::from_millis(100)).await;
        machine.input_changed("ali").unwrap()
    });
    let fast = fetch_suggestions(&source, debounce, &second).await.unwrap();

    assert!(machine.apply_suggestions(second.generation, fast));
    assert!(!machine.apply_suggestions(first.generation, slow.unwrap()));
    assert_eq!(machine.suggestions().movie[0].label, "Alien [ali]");
}

#[tokio::test]
async fn keyboard_selection_wraps_and_commits() {
    let source = Arc::new(FakeDiscovery {
        suggestions: three_movies(),
        payload: Some(envelope(30)),
        ..FakeDiscovery::default()
    });
    let mut controller =
        SearchController::mount(source.clone(), Arc::new(MemoryStore::new()), instant());

    controller.type_term("alien").await;
    for _ in 0..4 {
        controller.press(Key::ArrowDown).await;
    }
    assert_eq!(controller.machine().highlighted(), Some(0));
    controller.press(Key::ArrowUp).await;
    assert_eq!(controller.machine().highlighted(), Some(2));
    controller.press(Key::Enter).await;

    let chosen = source.chosen.lock().unwrap().clone();
    assert_eq!(chosen.len(), 1);
    assert_eq!(chosen[0].id, "3");

    let machine = controller.machine();
    assert_eq!(machine.phase(), SearchPhase::ShowingResults);
    assert_eq!(machine.session().selected_movies.len(), 24);
    assert!(!machine.is_dropdown_open());
    assert!(!machine.session().has_error);
}

#[tokio::test]
async fn escape_closes_without_selecting() {
    let source = Arc::new(FakeDiscovery {
        suggestions: three_movies(),
        ..FakeDiscovery::default()
    });
    let mut controller =
        SearchController::mount(source.clone(), Arc::new(MemoryStore::new()), instant());

    controller.type_term("alien").await;
    controller.press(Key::ArrowDown).await;
    controller.press(Key::Escape).await;
    controller.press(Key::Enter).await;

    assert!(!controller.machine().is_dropdown_open());
    assert_eq!(controller.machine().highlighted(), None);
    assert!(source.chosen.lock().unwrap().is_empty());

    controller.focus();
    assert!(controller.machine().is_dropdown_open());
}

#[tokio::test]
async fn session_survives_remount() {
    let source = Arc::new(FakeDiscovery {
        suggestions: three_movies(),
        payload: Some(envelope(5)),
        ..FakeDiscovery::default()
    });
    let store = Arc::new(MemoryStore::new());
    {
        let mut controller = SearchController::mount(source.clone(), store.clone(), instant());
        controller.type_term("alien").await;
        controller.press(Key::Enter).await;
        controller.set_active_tab(CategoryTab::Movies);
        controller.set_scroll_offset(640);
        controller.before_unload();
    }

    let controller = SearchController::mount(source, store, instant());
    let machine = controller.machine();
    assert_eq!(machine.phase(), SearchPhase::ShowingResults);
    assert_eq!(machine.session().search_term, "Alien [alien]");
    assert_eq!(machine.session().selected_movies.len(), 5);
    assert_eq!(machine.session().active_tab, CategoryTab::Movies);
    assert_eq!(machine.session().scroll_offset, 640);
    assert!(!machine.is_dropdown_open());
}

#[tokio::test]
async fn tmdb_mode_uses_search_and_similar_titles() {
    let proxy = ProxyClient::new(UNREACHABLE_PROXY).unwrap();
    let source = Arc::new(LiveDiscovery::new(proxy, Arc::new(FakeTmdb)));
    let mut controller = SearchController::mount(source, Arc::new(MemoryStore::new()), instant());
    controller.set_mode(SearchMode::Tmdb);

    controller.type_term("matrix").await;
    let machine = controller.machine();
    assert_eq!(machine.suggestions().movie[0].label, "The Matrix (1999)");
    assert_eq!(machine.suggestions().movie[0].url, "/movie/603");
    assert_eq!(machine.suggestions().tv[0].label, "The Matrix Show");

    controller.press(Key::Enter).await;
    let machine = controller.machine();
    assert!(!machine.session().has_error);
    let titles: Vec<_> = machine
        .session()
        .selected_movies
        .iter()
        .map(|r| r.title.as_str())
        .collect();
    assert_eq!(titles, ["The Matrix Reloaded"]);
}

struct FakeTmdb;

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn search_multi(&self, _query: &str) -> anyhow::Result<Vec<SearchHit>> {
        Ok(vec![
            SearchHit {
                id: 603,
                media_type: MediaType::Movie,
                title: "The Matrix".to_string(),
                year: "1999".to_string(),
                poster_url: "https://image.tmdb.org/t/p/w500/m.jpg".to_string(),
            },
            SearchHit {
                id: 9001,
                media_type: MediaType::Tv,
                title: "The Matrix Show".to_string(),
                year: String::new(),
                poster_url: "/placeholder.svg".to_string(),
            },
        ])
    }

    async fn fetch_details(&self, _: MediaType, _: i32) -> anyhow::Result<TitleMetadata> {
        Err(anyhow!("unused"))
    }

    async fn fetch_credits(&self, _: MediaType, _: i32) -> anyhow::Result<Vec<CastMember>> {
        Err(anyhow!("unused"))
    }

    async fn fetch_similar(&self, media_type: MediaType, id: i32) -> anyhow::Result<Vec<MediaRecord>> {
        assert_eq!((media_type, id), (MediaType::Movie, 603));
        Ok(vec![MediaRecord {
            id: "604".to_string(),
            title: "The Matrix Reloaded".to_string(),
            poster_url: "https://image.tmdb.org/t/p/w500/r.jpg".to_string(),
            year: "2003".to_string(),
            media_type: MediaType::Movie,
        }])
    }

    async fn fetch_watch_providers(&self, _: MediaType, _: i32) -> anyhow::Result<WatchProviders> {
        Err(anyhow!("unused"))
    }

    async fn fetch_trailer(&self, _: MediaType, _: i32) -> anyhow::Result<Option<String>> {
        Err(anyhow!("unused"))
    }

    async fn fetch_list(&self, _: MovieList) -> anyhow::Result<Vec<MediaRecord>> {
        Err(anyhow!("unused"))
    }
}
