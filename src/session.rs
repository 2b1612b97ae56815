//! Key-value persistence for UI state across navigation.
//!
//! Session keys live as long as the browsing session; preference keys survive
//! it. Values are JSON text so any string store can back them.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::warn;

use crate::models::MediaRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    SearchTerm,
    SelectedMovies,
    ActiveTab,
    HasError,
    ScrollPosition,
}

impl SessionKey {
    pub const ALL: [SessionKey; 5] = [
        SessionKey::SearchTerm,
        SessionKey::SelectedMovies,
        SessionKey::ActiveTab,
        SessionKey::HasError,
        SessionKey::ScrollPosition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::SearchTerm => "searchTerm",
            SessionKey::SelectedMovies => "selectedMovies",
            SessionKey::ActiveTab => "activeTab",
            SessionKey::HasError => "hasError",
            SessionKey::ScrollPosition => "scrollPosition",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    SplashCursorEnabled,
    WelcomePopupShown,
}

impl PreferenceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKey::SplashCursorEnabled => "splashCursorEnabled",
            PreferenceKey::WelcomePopupShown => "welcomePopupShown",
        }
    }
}

/// String store with the semantics of browser storage.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Store several values as one write where the backend supports it.
    fn set_many(&self, entries: Vec<(&str, String)>) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

pub fn get_typed<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key = %key, "Ignoring unreadable stored value: {}", e);
            None
        }
    }
}

pub fn set_typed<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) -> Result<()> {
    store.set(key, to_stored(value)?)
}

fn to_stored<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("serializing stored value failed")
}

/// Drop every session-scoped key; preferences stay.
pub fn clear_session(store: &dyn SessionStore) -> Result<()> {
    for key in SessionKey::ALL {
        store.remove(key.as_str())?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryTab {
    #[default]
    All,
    Movies,
    Tv,
}

/// Ephemeral state of the search page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSession {
    pub search_term: String,
    pub selected_movies: Vec<MediaRecord>,
    pub active_tab: CategoryTab,
    pub has_error: bool,
    pub scroll_offset: u32,
}

impl SearchSession {
    /// `None` when nothing was persisted yet.
    pub fn restore(store: &dyn SessionStore) -> Option<Self> {
        let term: Option<String> = get_typed(store, SessionKey::SearchTerm.as_str());
        let movies: Option<Vec<MediaRecord>> = get_typed(store, SessionKey::SelectedMovies.as_str());
        if term.is_none() && movies.is_none() {
            return None;
        }
        Some(Self {
            search_term: term.unwrap_or_default(),
            selected_movies: movies.unwrap_or_default(),
            active_tab: get_typed(store, SessionKey::ActiveTab.as_str()).unwrap_or_default(),
            has_error: get_typed(store, SessionKey::HasError.as_str()).unwrap_or(false),
            scroll_offset: get_typed(store, SessionKey::ScrollPosition.as_str()).unwrap_or(0),
        })
    }

    /// All five keys land in a single store write.
    pub fn persist(&self, store: &dyn SessionStore) -> Result<()> {
        store.set_many(vec![
            (SessionKey::SearchTerm.as_str(), to_stored(&self.search_term)?),
            (SessionKey::SelectedMovies.as_str(), to_stored(&self.selected_movies)?),
            (SessionKey::ActiveTab.as_str(), to_stored(&self.active_tab)?),
            (SessionKey::HasError.as_str(), to_stored(&self.has_error)?),
            (SessionKey::ScrollPosition.as_str(), to_stored(&self.scroll_offset)?),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub splash_cursor_enabled: bool,
    pub welcome_popup_shown: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            splash_cursor_enabled: true,
            welcome_popup_shown: false,
        }
    }
}

impl Preferences {
    pub fn load(store: &dyn SessionStore) -> Self {
        let defaults = Self::default();
        Self {
            splash_cursor_enabled: get_typed(store, PreferenceKey::SplashCursorEnabled.as_str())
                .unwrap_or(defaults.splash_cursor_enabled),
            welcome_popup_shown: get_typed(store, PreferenceKey::WelcomePopupShown.as_str())
                .unwrap_or(defaults.welcome_popup_shown),
        }
    }

    pub fn save(&self, store: &dyn SessionStore) -> Result<()> {
        set_typed(store, PreferenceKey::SplashCursorEnabled.as_str(), &self.splash_cursor_enabled)?;
        set_typed(store, PreferenceKey::WelcomePopupShown.as_str(), &self.welcome_popup_shown)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// JSON file on disk. Every write replaces the whole file through a
/// temporary sibling and a rename, so readers see the old or the new state.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading session file {}", path.display()))?;
            serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Session file {} is corrupt, starting empty: {}", path.display(), e);
                HashMap::new()
            })
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
            writes: AtomicUsize::new(0),
        })
    }

    /// Number of times the file has been rewritten since opening.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn write(&self, values: &HashMap<String, String>) -> Result<()> {
        let text = serde_json::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, text)
            .with_context(|| format!("writing session file {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replacing session file {}", self.path.display()))?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        values.insert(key.to_string(), value);
        self.write(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        if values.remove(key).is_some() {
            self.write(&values)?;
        }
        Ok(())
    }

    fn set_many(&self, entries: Vec<(&str, String)>) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        for (key, value) in entries {
            values.insert(key.to_string(), value);
        }
        self.write(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;

    fn session() -> SearchSession {
        SearchSession {
            search_term: "Heat (1995)".to_string(),
            selected_movies: vec![MediaRecord {
                id: "9".to_string(),
                title: "Collateral".to_string(),
                poster_url: "https://bestsimilar.com/img/9.jpg".to_string(),
                year: "2004".to_string(),
                media_type: MediaType::Movie,
            }],
            active_tab: CategoryTab::Movies,
            has_error: false,
            scroll_offset: 640,
        }
    }

    #[test]
    fn nothing_persisted_restores_none() {
        let store = MemoryStore::new();
        assert!(SearchSession::restore(&store).is_none());
    }

    #[test]
    fn session_survives_file_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        {
            let store = FileStore::open(&path).unwrap();
            session().persist(&store).unwrap();
        }
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(SearchSession::restore(&reopened), Some(session()));
    }

    #[test]
    fn clear_session_keeps_preferences() {
        let store = MemoryStore::new();
        session().persist(&store).unwrap();
        Preferences {
            splash_cursor_enabled: false,
            welcome_popup_shown: true,
        }
        .save(&store)
        .unwrap();

        clear_session(&store).unwrap();

        assert!(SearchSession::restore(&store).is_none());
        let prefs = Preferences::load(&store);
        assert!(!prefs.splash_cursor_enabled);
        assert!(prefs.welcome_popup_shown);
    }

    #[test]
    fn unreadable_values_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set("searchTerm", "\"dune\"".to_string()).unwrap();
        store.set("activeTab", "not json".to_string()).unwrap();
        let restored = SearchSession::restore(&store).unwrap();
        assert_eq!(restored.search_term, "dune");
        assert_eq!(restored.active_tab, CategoryTab::All);
        assert_eq!(Preferences::load(&store), Preferences::default());
    }

    #[test]
    fn persisting_a_session_rewrites_the_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();

        session().persist(&store).unwrap();

        assert_eq!(store.write_count(), 1);
        assert!(!path.with_extension("tmp").exists());
        let on_disk: HashMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in SessionKey::ALL {
            assert!(on_disk.contains_key(key.as_str()), "{}", key.as_str());
        }
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ broken").unwrap();
        let store = FileStore::open(&path).unwrap();
        assert!(store.get("searchTerm").is_none());
    }
}
