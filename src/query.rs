//! Read-only access to the last published snapshot.
//!
//! A [`Catalog`] never touches disk or network beyond the cache store: every
//! call fetches the current snapshot bytes, decodes them, and answers from
//! that one consistent value.

use crate::snapshot;
use crate::store::{CacheStore, SNAPSHOT_KEY, StoreError};
use crate::types::{Article, Repository};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("repository not found: {0}")]
    NotFound(String),
    #[error("no snapshot has been published yet")]
    NoSnapshot,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("corrupt snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Outcome of checking a requested language against a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageChoice {
    Supported(String),
    /// Serve this language instead.
    Redirect(String),
}

/// Query handle shared by all request handlers.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CacheStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Every published repository, in configuration order.
    pub async fn snapshot(&self) -> Result<Vec<Repository>, QueryError> {
        let bytes = self
            .store
            .get(SNAPSHOT_KEY)
            .await?
            .ok_or(QueryError::NoSnapshot)?;
        Ok(snapshot::decode(&bytes)?)
    }

    pub async fn get_repo(&self, id: &str) -> Result<Repository, QueryError> {
        let repos = match self.snapshot().await {
            Ok(repos) => repos,
            Err(QueryError::NoSnapshot) => return Err(QueryError::NotFound(id.to_string())),
            Err(e) => return Err(e),
        };
        repos
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| QueryError::NotFound(id.to_string()))
    }

    pub async fn languages(&self, id: &str) -> Result<Vec<String>, QueryError> {
        Ok(self.get_repo(id).await?.languages)
    }

    /// Articles for one language, in content-path order.
    pub async fn articles(&self, id: &str, lang: &str) -> Result<Vec<Article>, QueryError> {
        let repo = self.get_repo(id).await?;
        Ok(repo.articles_for(lang).to_vec())
    }

    /// Articles of `lang` matching `query`, exact matches first.
    pub async fn search_articles(
        &self,
        id: &str,
        lang: &str,
        query: &str,
    ) -> Result<Vec<Article>, QueryError> {
        let repo = self.get_repo(id).await?;
        Ok(rank_matches(query, repo.articles_for(lang))
            .into_iter()
            .cloned()
            .collect())
    }

    /// Best match for `query`, if any.
    pub async fn search_article(
        &self,
        id: &str,
        lang: &str,
        query: &str,
    ) -> Result<Option<Article>, QueryError> {
        Ok(self.search_articles(id, lang, query).await?.into_iter().next())
    }
}

/// Articles whose slug or title equals `query`, followed by those whose slug
/// or title contains it. Both groups keep the input order. Case-sensitive.
pub fn rank_matches<'a>(query: &str, articles: &'a [Article]) -> Vec<&'a Article> {
    let (exact, partial): (Vec<&Article>, Vec<&Article>) = articles
        .iter()
        .filter(|a| a.slug.contains(query) || a.title.contains(query))
        .partition(|a| a.slug == query || a.title == query);
    exact.into_iter().chain(partial).collect()
}

/// Check `lang` against the repository, falling back to its default language.
pub fn resolve_language(repo: &Repository, lang: Option<&str>) -> LanguageChoice {
    match lang {
        Some(lang) if repo.supports(lang) => LanguageChoice::Supported(lang.to_string()),
        _ => LanguageChoice::Redirect(repo.default_language().to_string()),
    }
}
