use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::{SuggestionItem, SuggestionKind};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub name: String,
    pub url: String,
}

impl Tag {
    /// Tags feed the same recommendations flow as title suggestions.
    pub fn to_suggestion(&self) -> SuggestionItem {
        SuggestionItem {
            id: self.url.clone(),
            label: self.name.clone(),
            url: self.url.clone(),
            kind: SuggestionKind::Tag,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    tags: Vec<Tag>,
}

impl TagCatalog {
    pub fn from_json(text: &str) -> Result<Self> {
        let tags: Vec<Tag> = serde_json::from_str(text).context("tags file is not a tag list")?;
        Ok(Self { tags })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading tags from {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Case-insensitive substring match; a blank term returns every tag.
    pub fn filter(&self, term: &str) -> Vec<&Tag> {
        let needle = term.trim().to_lowercase();
        self.tags
            .iter()
            .filter(|t| needle.is_empty() || t.name.to_lowercase().contains(&needle))
            .collect()
    }
}
