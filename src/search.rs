//! Search page orchestration.
//!
//! [`SearchMachine`] is the synchronous state: input, suggestions, keyboard
//! highlight, results and the persisted session. Every outgoing request is
//! stamped with a [`Generation`]; results carrying an older generation than
//! the latest request of the same kind are dropped on arrival.
//!
//! [`SearchController`] drives the machine against a [`DiscoverySource`],
//! applies the debounce and writes the session after every mutation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, DEFAULT_UPSTREAM_BASE};
use crate::demo::{self, DemoNotice};
use crate::discovery::{DiscoverySource, SearchMode};
use crate::models::{MediaRecord, MediaType, SuggestionItem, Suggestions};
use crate::normalize::{RecommendationPayload, RECOMMENDATION_CAP};
use crate::session::{CategoryTab, SearchSession, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Suggesting,
    LoadingRecommendations,
    ShowingResults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// Latest issued generation, shared with the requests it stamps so a
/// pending request can tell it was superseded without borrowing the machine.
#[derive(Debug, Clone, Default)]
struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    fn next(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

#[derive(Debug, Clone)]
pub struct SuggestRequest {
    pub generation: Generation,
    pub term: String,
    pub mode: SearchMode,
    latest: GenerationCounter,
}

impl SuggestRequest {
    /// `false` once a newer keystroke, commit or mode change replaced it.
    pub fn is_current(&self) -> bool {
        self.latest.is_current(self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendRequest {
    pub generation: Generation,
    pub item: SuggestionItem,
    pub mode: SearchMode,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub min_term_len: usize,
    pub recommendation_cap: usize,
    pub upstream_base_url: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_term_len: 2,
            recommendation_cap: RECOMMENDATION_CAP,
            upstream_base_url: DEFAULT_UPSTREAM_BASE.to_string(),
        }
    }
}

impl From<&ClientConfig> for SearchSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            debounce: config.debounce,
            min_term_len: config.min_term_len,
            recommendation_cap: config.recommendation_cap,
            upstream_base_url: config.upstream_base_url.clone(),
        }
    }
}

#[derive(Debug)]
pub struct SearchMachine {
    settings: SearchSettings,
    phase: SearchPhase,
    mode: SearchMode,
    session: SearchSession,
    suggestions: Suggestions,
    highlighted: Option<usize>,
    dropdown_open: bool,
    dropdown_enabled: bool,
    notice: Option<DemoNotice>,
    suggest_gen: GenerationCounter,
    recommend_gen: GenerationCounter,
}

impl SearchMachine {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            settings,
            phase: SearchPhase::Idle,
            mode: SearchMode::default(),
            session: SearchSession::default(),
            suggestions: Suggestions::default(),
            highlighted: None,
            dropdown_open: false,
            dropdown_enabled: true,
            notice: None,
            suggest_gen: GenerationCounter::default(),
            recommend_gen: GenerationCounter::default(),
        }
    }

    /// Continue a session persisted before navigating away.
    pub fn restore(&mut self, session: SearchSession) {
        self.phase = if session.selected_movies.is_empty() {
            SearchPhase::Idle
        } else {
            SearchPhase::ShowingResults
        };
        self.session = session;
        // A restored term reflects a committed selection; keep the dropdown shut.
        self.dropdown_enabled = false;
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn suggestions(&self) -> &Suggestions {
        &self.suggestions
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn is_dropdown_open(&self) -> bool {
        self.dropdown_open
    }

    pub fn notice(&self) -> Option<DemoNotice> {
        self.notice
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Results shown under the active tab, movies before TV shows on `All`.
    pub fn visible_results(&self) -> Vec<&MediaRecord> {
        let movies = self.results_of(MediaType::Movie);
        let shows = self.results_of(MediaType::Tv);
        match self.session.active_tab {
            CategoryTab::All => movies.into_iter().chain(shows).collect(),
            CategoryTab::Movies => movies,
            CategoryTab::Tv => shows,
        }
    }

    pub fn results_of(&self, media_type: MediaType) -> Vec<&MediaRecord> {
        self.session
            .selected_movies
            .iter()
            .filter(|r| r.media_type == media_type)
            .collect()
    }

    /// Every keystroke supersedes any suggestion request still in flight.
    pub fn input_changed(&mut self, term: &str) -> Option<SuggestRequest> {
        self.session.search_term = term.to_string();
        self.dropdown_enabled = true;
        let generation = self.suggest_gen.next();

        if term.trim().chars().count() < self.settings.min_term_len {
            self.clear_suggestions();
            self.phase = self.resting_phase();
            return None;
        }

        self.phase = SearchPhase::Suggesting;
        Some(SuggestRequest {
            generation,
            term: term.to_string(),
            mode: self.mode,
            latest: self.suggest_gen.clone(),
        })
    }

    /// Returns `false` when the result is stale and was ignored.
    pub fn apply_suggestions(&mut self, generation: Generation, result: Result<Suggestions>) -> bool {
        if !self.suggest_gen.is_current(generation) {
            debug!(?generation, "Dropping stale suggestions");
            return false;
        }

        self.highlighted = None;
        match result {
            Ok(suggestions) => {
                self.session.has_error = false;
                self.dropdown_open = self.dropdown_enabled && !suggestions.is_empty();
                self.suggestions = suggestions;
            }
            Err(e) => {
                warn!("Error fetching suggestions: {:#}", e);
                self.session.has_error = true;
                match demo::suggestions_for(&self.session.search_term) {
                    Some(sample) => {
                        self.dropdown_open = self.dropdown_enabled && !sample.is_empty();
                        self.suggestions = sample;
                        self.notice = Some(DemoNotice::Suggestions);
                    }
                    None => {
                        self.suggestions = Suggestions::default();
                        self.dropdown_open = false;
                    }
                }
            }
        }
        true
    }

    pub fn key(&mut self, key: Key) -> Option<RecommendRequest> {
        let count = self.suggestions.len();
        if !self.dropdown_open || count == 0 {
            return None;
        }

        match key {
            Key::ArrowDown => {
                self.highlighted = Some(match self.highlighted {
                    None => 0,
                    Some(i) => (i + 1) % count,
                });
                None
            }
            Key::ArrowUp => {
                self.highlighted = Some(match self.highlighted {
                    None | Some(0) => count - 1,
                    Some(i) => (i - 1).min(count - 1),
                });
                None
            }
            Key::Enter => {
                let index = self.highlighted.unwrap_or(0).min(count - 1);
                let item = self.suggestions.get(index)?.clone();
                Some(self.commit(item))
            }
            Key::Escape => {
                self.dropdown_open = false;
                self.highlighted = None;
                None
            }
        }
    }

    /// Direct pick, e.g. a click on a suggestion or a tag.
    pub fn select(&mut self, item: SuggestionItem) -> RecommendRequest {
        self.commit(item)
    }

    /// Returns `false` when the result is stale and was ignored.
    pub fn apply_recommendations(
        &mut self,
        generation: Generation,
        result: Result<RecommendationPayload>,
    ) -> bool {
        if !self.recommend_gen.is_current(generation) {
            debug!(?generation, "Dropping stale recommendations");
            return false;
        }

        let normalized = result.and_then(|payload| {
            payload
                .normalize(&self.settings.upstream_base_url, self.settings.recommendation_cap)
                .map_err(anyhow::Error::from)
        });
        match normalized {
            Ok(records) => {
                info!(results = records.len(), "Recommendations loaded");
                self.session.selected_movies = records;
                self.session.has_error = false;
            }
            Err(e) => {
                warn!("Error fetching movie recommendations: {:#}", e);
                self.session.selected_movies = demo::recommendations();
                self.session.has_error = true;
                self.notice = Some(DemoNotice::Recommendations);
            }
        }
        self.session.scroll_offset = 0;
        self.phase = SearchPhase::ShowingResults;
        true
    }

    /// Reopen the dropdown when the input regains focus.
    pub fn focus(&mut self) {
        if self.dropdown_enabled
            && !self.suggestions.is_empty()
            && self.session.search_term.trim().chars().count() >= self.settings.min_term_len
        {
            self.dropdown_open = true;
        }
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.suggest_gen.next();
        self.clear_suggestions();
        if self.phase == SearchPhase::Suggesting {
            self.phase = self.resting_phase();
        }
    }

    pub fn set_active_tab(&mut self, tab: CategoryTab) {
        self.session.active_tab = tab;
    }

    pub fn set_scroll_offset(&mut self, offset: u32) {
        self.session.scroll_offset = offset;
    }

    fn commit(&mut self, item: SuggestionItem) -> RecommendRequest {
        self.session.search_term = item.label.clone();
        self.suggest_gen.next();
        self.clear_suggestions();
        self.dropdown_enabled = false;
        self.phase = SearchPhase::LoadingRecommendations;
        RecommendRequest {
            generation: self.recommend_gen.next(),
            item,
            mode: self.mode,
        }
    }

    fn clear_suggestions(&mut self) {
        self.suggestions = Suggestions::default();
        self.dropdown_open = false;
        self.highlighted = None;
    }

    fn resting_phase(&self) -> SearchPhase {
        if self.session.selected_movies.is_empty() {
            SearchPhase::Idle
        } else {
            SearchPhase::ShowingResults
        }
    }
}

/// Wait out the debounce window, then fetch. Returns `None` without touching
/// the source when a newer request replaced this one during the wait.
pub async fn fetch_suggestions(
    source: &dyn DiscoverySource,
    debounce: Duration,
    request: &SuggestRequest,
) -> Option<Result<Suggestions>> {
    tokio::time::sleep(debounce).await;
    if !request.is_current() {
        debug!(generation = ?request.generation, term = %request.term, "Debounced keystroke superseded");
        return None;
    }
    Some(source.suggestions(request.mode, &request.term).await)
}

pub async fn fetch_recommendations(
    source: &dyn DiscoverySource,
    request: &RecommendRequest,
) -> Result<RecommendationPayload> {
    source.recommendations(request.mode, &request.item).await
}

pub struct SearchController {
    machine: SearchMachine,
    source: Arc<dyn DiscoverySource>,
    store: Arc<dyn SessionStore>,
    debounce: Duration,
}

impl SearchController {
    /// Mounting restores the persisted session when there is one.
    pub fn mount(
        source: Arc<dyn DiscoverySource>,
        store: Arc<dyn SessionStore>,
        settings: SearchSettings,
    ) -> Self {
        let debounce = settings.debounce;
        let mut machine = SearchMachine::new(settings);
        if let Some(session) = SearchSession::restore(store.as_ref()) {
            info!(
                term = %session.search_term,
                results = session.selected_movies.len(),
                "Restored search session"
            );
            machine.restore(session);
        }
        Self {
            machine,
            source,
            store,
            debounce,
        }
    }

    pub fn machine(&self) -> &SearchMachine {
        &self.machine
    }

    pub async fn type_term(&mut self, term: &str) {
        let request = self.machine.input_changed(term);
        self.persist();
        let Some(request) = request else {
            return;
        };
        let Some(result) = fetch_suggestions(self.source.as_ref(), self.debounce, &request).await
        else {
            return;
        };
        self.machine.apply_suggestions(request.generation, result);
        self.persist();
    }

    pub async fn press(&mut self, key: Key) {
        if let Some(request) = self.machine.key(key) {
            self.load(request).await;
        }
    }

    pub async fn choose(&mut self, item: SuggestionItem) {
        let request = self.machine.select(item);
        self.load(request).await;
    }

    pub fn focus(&mut self) {
        self.machine.focus();
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        self.machine.set_mode(mode);
    }

    pub fn set_active_tab(&mut self, tab: CategoryTab) {
        self.machine.set_active_tab(tab);
        self.persist();
    }

    pub fn set_scroll_offset(&mut self, offset: u32) {
        self.machine.set_scroll_offset(offset);
        self.persist();
    }

    pub fn dismiss_notice(&mut self) {
        self.machine.dismiss_notice();
    }

    pub fn before_unload(&self) {
        self.persist();
    }

    async fn load(&mut self, request: RecommendRequest) {
        self.persist();
        let result = fetch_recommendations(self.source.as_ref(), &request).await;
        self.machine.apply_recommendations(request.generation, result);
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.machine.session().persist(self.store.as_ref()) {
            warn!("Failed to persist search session: {:#}", e);
        }
    }
}
