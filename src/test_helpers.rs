//! Shared test utilities for the quire test suite.
//!
//! Provides content-tree builders and lookup helpers that work with indexed
//! data structures (`Repository`, `Article`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = multilingual_repo();
//! let repo = index_repository(&source).unwrap();
//!
//! let intro = find_article(&repo, "en", "intro");
//! assert_eq!(article_slugs(&repo, "it"), vec!["install"]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::types::{Article, Repository};

// =========================================================================
// Content builders
// =========================================================================

/// Write `<dir>/<name>` as a header, blank line, and body. Creates `dir`.
pub fn write_article(dir: &Path, name: &str, header: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), format!("{header}\n\n{body}")).unwrap();
}

/// A checkout with `articles/en`, `articles/it` and a story manifest.
///
/// ```text
/// articles/
/// ├── stories.toml          # story "basics"
/// ├── en/
/// │   ├── install.md
/// │   ├── intro.md          # StoryId: basics, Next: intro-advanced
/// │   └── intro-advanced.md # StoryId: basics, Previous: intro
/// └── it/
///     └── install.md
/// ```
pub fn multilingual_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("articles");
    let en = root.join("en");
    let it = root.join("it");

    write_article(
        &en,
        "install.md",
        "Title: Installation\nDescription: Get the system running\nAuthors: Ada\nListed: true",
        "# Installation\n\nDownload the image.",
    );
    write_article(
        &en,
        "intro.md",
        "Title: Introduction\nStoryId: basics\nNext: intro-advanced\nTags: [start]\nListed: true",
        "# Introduction\n\nWelcome.",
    );
    write_article(
        &en,
        "intro-advanced.md",
        "Title: Advanced introduction\nStoryId: basics\nPrevious: intro",
        "Going further.",
    );
    write_article(
        &it,
        "install.md",
        "Title: Installazione\nListed: true",
        "Scarica l'immagine.",
    );
    fs::write(
        root.join("stories.toml"),
        "[[stories]]\nid = \"basics\"\nname = \"The basics\"\nstart_slug = \"intro\"\n",
    )
    .unwrap();

    tmp
}

// =========================================================================
// Repository lookups: panic with a clear message on miss
// =========================================================================

/// Find an article by language and slug. Panics if not found.
pub fn find_article<'a>(repo: &'a Repository, lang: &str, slug: &str) -> &'a Article {
    repo.articles_for(lang)
        .iter()
        .find(|a| a.slug == slug)
        .unwrap_or_else(|| {
            let slugs = article_slugs(repo, lang);
            panic!("article '{slug}' not found in '{lang}'. Available: {slugs:?}")
        })
}

/// Slugs of one language bucket, in bucket order.
pub fn article_slugs<'a>(repo: &'a Repository, lang: &str) -> Vec<&'a str> {
    repo.articles_for(lang)
        .iter()
        .map(|a| a.slug.as_str())
        .collect()
}

/// Minimal article for ranking and query tests.
pub fn article(lang: &str, slug: &str, title: &str) -> Article {
    Article {
        title: title.to_string(),
        description: String::new(),
        publication_date: String::new(),
        authors: Vec::new(),
        tags: Vec::new(),
        body: format!("# {title}"),
        path: format!("{lang}/{slug}.md"),
        url: format!("{lang}/{slug}"),
        slug: slug.to_string(),
        language: lang.to_string(),
        story_id: String::new(),
        story: None,
        previous: String::new(),
        next: String::new(),
        listed: true,
    }
}

/// Repository assembled in memory from a list of articles.
pub fn repository(id: &str, articles: Vec<Article>) -> Repository {
    let articles: std::collections::BTreeMap<String, Article> = articles
        .into_iter()
        .map(|a| (a.path.clone(), a))
        .collect();
    let articles_grouped = crate::index::group_by_language(&articles);
    let languages = articles_grouped.keys().cloned().collect();
    Repository {
        id: id.to_string(),
        origin: format!("/srv/{id}"),
        root: "articles".to_string(),
        languages,
        fallback_lang: String::new(),
        fallback_enabled: false,
        articles,
        articles_grouped,
        stories: Default::default(),
    }
}
