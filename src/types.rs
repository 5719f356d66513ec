//! Shared types carried from the indexer through the snapshot to the query layer.
//!
//! Everything here is serialized into the published snapshot and decoded again
//! by readers, so the shapes must stay identical on both sides. Maps are
//! `BTreeMap` so that indexing unchanged content produces byte-identical
//! snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One configured content source and its fully assembled index.
///
/// A `Repository` is rebuilt from scratch on every refresh cycle and replaces
/// the previous value in the published snapshot; it is never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    /// Remote URL for mirrored repositories, filesystem path for local ones.
    pub origin: String,
    /// Content root relative to the checkout (e.g. `articles`).
    pub root: String,
    /// Supported language codes, sorted.
    pub languages: Vec<String>,
    /// Configured fallback language; empty when unset.
    #[serde(default)]
    pub fallback_lang: String,
    /// True when the repository has no language directories and every article
    /// is attributed to the fallback language.
    #[serde(default)]
    pub fallback_enabled: bool,
    /// Content path (relative to the content root) → article.
    pub articles: BTreeMap<String, Article>,
    /// Language → articles, in content-path order.
    pub articles_grouped: BTreeMap<String, Vec<Article>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stories: BTreeMap<String, Story>,
}

impl Repository {
    /// Articles for one language, in content-path order. Empty for unknown languages.
    pub fn articles_for(&self, lang: &str) -> &[Article] {
        self.articles_grouped
            .get(lang)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }

    /// Language that requests are redirected to when theirs is unusable.
    ///
    /// Configured fallback first, then `en` if the repository has it, then the
    /// first discovered language.
    pub fn default_language(&self) -> &str {
        if !self.fallback_lang.is_empty() && self.supports(&self.fallback_lang) {
            return &self.fallback_lang;
        }
        if self.supports("en") {
            return "en";
        }
        self.languages.first().map(String::as_str).unwrap_or("en")
    }
}

/// A single piece of content parsed from one markdown file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub publication_date: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    /// Raw markdown. Converted to HTML only when served.
    pub body: String,
    /// Source path relative to the content root (`en/intro.md`).
    pub path: String,
    /// Path without extension (`en/intro`).
    pub url: String,
    /// File stem (`intro`).
    pub slug: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub story_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<Story>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub previous: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next: String,
    pub listed: bool,
}

/// A named sequence of articles, declared in a repository's story manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_slug: Option<String>,
}
