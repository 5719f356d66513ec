//! Repository indexing.
//!
//! Walks one repository's content tree and produces a fully assembled
//! [`Repository`]: languages, the flat article map, the per-language grouping
//! and the story map.
//!
//! ## Directory Structure
//!
//! ```text
//! <checkout>/
//! └── articles/                 # Content root (configurable)
//!     ├── stories.toml          # Story manifest (optional)
//!     ├── en/                   # Language directory (two lowercase letters)
//!     │   ├── install.md
//!     │   └── update.md
//!     ├── it/
//!     │   └── install.md
//!     └── assets/               # Not a locale, ignored
//! ```
//!
//! ## Fallback Mode
//!
//! A content root with no language directories is indexed in fallback mode:
//! markdown files directly under the root are read and every article is
//! attributed to the configured fallback language (`en` when unset).
//!
//! ```text
//! <checkout>/articles/
//! ├── install.md                # → language "en", fallback_enabled = true
//! └── update.md
//! ```
//!
//! ## Language Attribution
//!
//! Outside fallback mode an article's language is the first path segment below
//! the content root, so `en/install.md` belongs to `en`.

use crate::locale::is_valid_locale;
use crate::parse::{self, ParseError};
use crate::story::{self, StoryError};
use crate::types::{Article, Repository, Story};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Language used in fallback mode when the repository configures none.
pub const DEFAULT_FALLBACK_LANG: &str = "en";

const ARTICLE_EXTENSION: &str = "md";

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Content root not found: {0}")]
    MissingRoot(PathBuf),
    #[error("No articles found in {0}")]
    NoArticles(PathBuf),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Story(#[from] StoryError),
}

/// Where a repository's content lives on disk and how to label it.
#[derive(Debug, Clone)]
pub struct RepoSource {
    pub id: String,
    /// Remote URL or local path, carried into the index as-is.
    pub origin: String,
    /// Local checkout directory (mirror or local repository path).
    pub checkout: PathBuf,
    /// Content root relative to the checkout.
    pub root: String,
    /// Fallback language; empty for the default.
    pub fallback_lang: String,
}

impl RepoSource {
    pub fn content_root(&self) -> PathBuf {
        if self.root.is_empty() {
            self.checkout.clone()
        } else {
            self.checkout.join(&self.root)
        }
    }
}

/// Languages discovered for a content root.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageLayout {
    pub languages: Vec<String>,
    pub fallback_enabled: bool,
}

/// Index every source, in parallel, preserving input order.
///
/// Fails on the first repository that cannot be indexed.
pub fn index_all(sources: &[RepoSource]) -> Result<Vec<Repository>, IndexError> {
    sources.par_iter().map(index_repository).collect()
}

/// Build the full index for one repository.
pub fn index_repository(source: &RepoSource) -> Result<Repository, IndexError> {
    let content_root = source.content_root();
    if !content_root.is_dir() {
        return Err(IndexError::MissingRoot(content_root));
    }

    let fallback = if source.fallback_lang.is_empty() {
        DEFAULT_FALLBACK_LANG.to_string()
    } else {
        source.fallback_lang.clone()
    };

    let layout = discover_languages(&content_root, &fallback)?;
    let stories = story::load_stories(&content_root)?;
    let paths = discover_articles(&content_root, &layout.languages)?;

    let mut articles = BTreeMap::new();
    for rel_path in paths {
        let language = if layout.fallback_enabled {
            fallback.clone()
        } else {
            language_from_path(&rel_path).unwrap_or_else(|| fallback.clone())
        };
        let article = load_article(&content_root, &rel_path, &language, &stories)?;
        articles.insert(article.path.clone(), article);
    }

    let articles_grouped = group_by_language(&articles);

    tracing::debug!(
        repo = %source.id,
        languages = ?layout.languages,
        articles = articles.len(),
        stories = stories.len(),
        fallback = layout.fallback_enabled,
        "indexed repository"
    );

    Ok(Repository {
        id: source.id.clone(),
        origin: source.origin.clone(),
        root: source.root.clone(),
        languages: layout.languages,
        fallback_lang: source.fallback_lang.clone(),
        fallback_enabled: layout.fallback_enabled,
        articles,
        articles_grouped,
        stories,
    })
}

/// List the language directories of a content root.
///
/// With no valid locale directories, returns the fallback language with
/// `fallback_enabled` set.
pub fn discover_languages(content_root: &Path, fallback: &str) -> Result<LanguageLayout, IndexError> {
    let mut languages: Vec<String> = fs::read_dir(content_root)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| is_valid_locale(name))
        .collect();
    languages.sort();

    if languages.is_empty() {
        return Ok(LanguageLayout {
            languages: vec![fallback.to_string()],
            fallback_enabled: true,
        });
    }

    Ok(LanguageLayout {
        languages,
        fallback_enabled: false,
    })
}

/// Collect article paths (relative to the content root) for each language.
///
/// A language without its own directory reads the content root directly.
pub fn discover_articles(
    content_root: &Path,
    languages: &[String],
) -> Result<Vec<PathBuf>, IndexError> {
    let mut found = Vec::new();

    for lang in languages {
        let lang_dir = content_root.join(lang);
        let dir = if lang_dir.is_dir() {
            lang_dir
        } else {
            content_root.to_path_buf()
        };

        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_article(entry.path()) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(content_root)
                .unwrap_or(entry.path())
                .to_path_buf();
            if !found.contains(&rel) {
                found.push(rel);
            }
        }
    }

    if found.is_empty() {
        return Err(IndexError::NoArticles(content_root.to_path_buf()));
    }
    Ok(found)
}

/// Bucket articles by their language.
///
/// Always rebuilt from the flat map so every article lands in exactly one bucket.
pub fn group_by_language(articles: &BTreeMap<String, Article>) -> BTreeMap<String, Vec<Article>> {
    let mut grouped: BTreeMap<String, Vec<Article>> = BTreeMap::new();
    for article in articles.values() {
        grouped
            .entry(article.language.clone())
            .or_default()
            .push(article.clone());
    }
    grouped
}

/// First path segment, when it is a locale: `en/install.md` → `en`.
fn language_from_path(rel_path: &Path) -> Option<String> {
    let mut components = rel_path.components();
    let first = components.next()?.as_os_str().to_string_lossy().to_string();
    // A bare file name has no language segment
    components.next()?;
    is_valid_locale(&first).then_some(first)
}

fn is_article(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    !name.starts_with('.')
        && path
            .extension()
            .is_some_and(|e| e == ARTICLE_EXTENSION)
}

fn load_article(
    content_root: &Path,
    rel_path: &Path,
    language: &str,
    stories: &BTreeMap<String, Story>,
) -> Result<Article, IndexError> {
    let content = fs::read_to_string(content_root.join(rel_path))?;
    Ok(parse::parse_article(rel_path, &content, language, stories)?)
}
