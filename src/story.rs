//! Story manifests.
//!
//! A repository may declare stories (named sequences of articles) in a
//! `stories.toml` file at its content root:
//!
//! ```toml
//! [[stories]]
//! id = "onboarding"
//! name = "Getting on board"
//! description = "From download to first update"
//! start_slug = "install"
//! ```
//!
//! The manifest is optional. Articles point at a story through their
//! `StoryId` header; the parser rejects ids that are not declared here.

use crate::types::Story;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the story manifest within a content root.
pub const STORY_MANIFEST: &str = "stories.toml";

#[derive(Error, Debug)]
pub enum StoryError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid story manifest {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Story without id in {0}")]
    MissingId(PathBuf),
}

#[derive(Debug, Default, Deserialize)]
struct StoryManifest {
    #[serde(default)]
    stories: Vec<Story>,
}

/// Load the story map for a content root.
///
/// Returns an empty map when the manifest does not exist. When two stories
/// share an id, the later one wins.
pub fn load_stories(content_root: &Path) -> Result<BTreeMap<String, Story>, StoryError> {
    let path = content_root.join(STORY_MANIFEST);
    if !path.is_file() {
        tracing::debug!(root = %content_root.display(), "no story manifest, skipping");
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(&path).map_err(|source| StoryError::Io {
        path: path.clone(),
        source,
    })?;
    parse_stories(&content).map_err(|err| match err {
        StoryError::Toml { source, .. } => StoryError::Toml { path, source },
        StoryError::MissingId(_) => StoryError::MissingId(path),
        other => other,
    })
}

/// Decode manifest text into a story map keyed by id.
pub fn parse_stories(content: &str) -> Result<BTreeMap<String, Story>, StoryError> {
    let manifest: StoryManifest = toml::from_str(content).map_err(|source| StoryError::Toml {
        path: PathBuf::new(),
        source,
    })?;

    let mut stories = BTreeMap::new();
    for story in manifest.stories {
        if story.id.trim().is_empty() {
            return Err(StoryError::MissingId(PathBuf::new()));
        }
        stories.insert(story.id.clone(), story);
    }
    Ok(stories)
}
