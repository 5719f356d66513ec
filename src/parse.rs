//! Content file parsing.
//!
//! Every article is a markdown file with a metadata header, one blank line,
//! and the body:
//!
//! ```text
//! Title: Getting started
//! Description: Install and first boot
//! PublicationDate: 2024-03-01
//! Authors: Ada, Grace
//! Tags: [install, beginner]
//! StoryId: onboarding
//! Next: configure
//! Listed: true
//!
//! # Getting started
//! ...
//! ```
//!
//! ## Header rules
//!
//! - Keys are case-insensitive and ignore `_` and `-` (`PublicationDate`,
//!   `publication_date` and `publication-date` are the same key).
//! - Unknown keys are ignored; missing keys default to empty / false.
//! - List values (`Authors`, `Tags`) accept `a, b`, `[a, b]`, or YAML-style
//!   `- item` lines under an empty key.
//! - Surrounding single or double quotes are stripped from values.
//!
//! A file without the blank-line separator is rejected regardless of what
//! its header contains.

use crate::types::{Article, Story};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid article format (missing blank line after header): {0}")]
    Format(PathBuf),
    #[error("Article {path} references unknown story '{story_id}'")]
    Reference { path: PathBuf, story_id: String },
}

/// Decoded header fields, before story resolution and path derivation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArticleHeader {
    pub title: String,
    pub description: String,
    pub publication_date: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub story_id: String,
    pub previous: String,
    pub next: String,
    pub listed: bool,
}

/// Split file contents into `(header, body)` at the first blank line.
pub fn split_header(content: &str) -> Option<(String, String)> {
    let normalized = content.replace("\r\n", "\n");
    normalized
        .split_once("\n\n")
        .map(|(header, body)| (header.to_string(), body.to_string()))
}

/// Decode a header block into its known fields.
pub fn parse_header(header: &str) -> ArticleHeader {
    let mut parsed = ArticleHeader::default();
    // Key that is collecting `- item` continuation lines, if any
    let mut open_list: Option<String> = None;

    for line in header.lines() {
        let trimmed = line.trim();

        if let Some(item) = trimmed.strip_prefix("- ")
            && let Some(key) = &open_list
        {
            push_list_item(&mut parsed, key, item);
            continue;
        }

        let Some((raw_key, raw_value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = normalize_key(raw_key);
        let value = raw_value.trim();

        open_list = if value.is_empty() { Some(key.clone()) } else { None };

        match key.as_str() {
            "title" => parsed.title = unquote(value),
            "description" => parsed.description = unquote(value),
            "publicationdate" | "date" => parsed.publication_date = unquote(value),
            "authors" | "author" => parsed.authors = parse_list(value),
            "tags" => parsed.tags = parse_list(value),
            "storyid" | "story" => parsed.story_id = unquote(value),
            "previous" | "prev" => parsed.previous = unquote(value),
            "next" => parsed.next = unquote(value),
            "listed" => parsed.listed = parse_flag(value),
            _ => {}
        }
    }

    parsed
}

/// Build an [`Article`] from one file's contents.
///
/// `path` is the file location relative to the content root and drives the
/// slug and URL. `language` is decided by the indexer. `stories` is the
/// repository's story map; an unknown non-empty story id is an error.
pub fn parse_article(
    path: &Path,
    content: &str,
    language: &str,
    stories: &BTreeMap<String, Story>,
) -> Result<Article, ParseError> {
    let (header, body) =
        split_header(content).ok_or_else(|| ParseError::Format(path.to_path_buf()))?;
    let header = parse_header(&header);

    let story = if header.story_id.is_empty() {
        None
    } else {
        let story = stories
            .get(&header.story_id)
            .ok_or_else(|| ParseError::Reference {
                path: path.to_path_buf(),
                story_id: header.story_id.clone(),
            })?;
        Some(story.clone())
    };

    let slug = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let content_path = to_slash(path);
    let url = to_slash(&path.with_extension(""));

    Ok(Article {
        title: header.title,
        description: header.description,
        publication_date: header.publication_date,
        authors: header.authors,
        tags: header.tags,
        body,
        path: content_path,
        url,
        slug,
        language: language.to_string(),
        story_id: header.story_id,
        story,
        previous: header.previous,
        next: header.next,
        listed: header.listed,
    })
}

/// Render a relative path with `/` separators on every platform.
pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    for quote in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(quote) && v.ends_with(quote) {
            return v[1..v.len() - 1].to_string();
        }
    }
    v.to_string()
}

fn parse_list(value: &str) -> Vec<String> {
    let inner = value
        .trim()
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    inner
        .split(',')
        .map(unquote)
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        unquote(value).to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}

fn push_list_item(header: &mut ArticleHeader, key: &str, item: &str) {
    let item = unquote(item);
    if item.is_empty() {
        return;
    }
    match key {
        "authors" | "author" => header.authors.push(item),
        "tags" => header.tags.push(item),
        _ => {}
    }
}
