//! Read-only JSON API over the [`Catalog`].
//!
//! ```text
//! GET /                                   {"status":"ok","version":"…"}
//! GET /repos                              repository summaries
//! GET /:repo                              {"status":"ok"} or 404
//! GET /:repo/langs                        ["en","it"]
//! GET /:repo/articles/:lang               title, languages, tags, stories, articles
//! GET /:repo/articles/:lang/:slug         one article, body rendered to HTML
//! GET /:repo/search/:lang?q=…             {"query":"…","results":[…]}
//! ```
//!
//! An unsupported language on the article routes answers `302 Found` pointing
//! at the repository's default language. Every response carries permissive
//! CORS headers.

use crate::query::{Catalog, LanguageChoice, QueryError, rank_matches, resolve_language};
use crate::render;
use crate::types::{Article, Repository, Story};
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// Build the application router.
pub fn router(catalog: Catalog) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/repos", get(list_repos))
        .route("/:repo", get(repo_status))
        .route("/:repo/langs", get(languages))
        .route("/:repo/articles/:lang", get(articles))
        .route("/:repo/articles/:lang/:slug", get(article))
        .route("/:repo/search/:lang", get(search))
        .layer(middleware::from_fn(cors))
        .with_state(catalog)
}

/// Query failures map to 404; backend trouble is logged, never surfaced.
pub struct ApiError(QueryError);

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            QueryError::NotFound(_) | QueryError::NoSnapshot => {}
            other => tracing::error!(error = %other, "snapshot unreadable"),
        }
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct RepoSummary {
    pub id: String,
    pub count: usize,
    pub languages: Vec<String>,
    pub fallback_lang: String,
    pub fallback_enabled: bool,
}

impl From<&Repository> for RepoSummary {
    fn from(repo: &Repository) -> Self {
        Self {
            id: repo.id.clone(),
            count: repo.articles.len(),
            languages: repo.languages.clone(),
            fallback_lang: repo.fallback_lang.clone(),
            fallback_enabled: repo.fallback_enabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleList {
    pub title: String,
    pub supported_langs: Vec<String>,
    pub tags: Vec<String>,
    pub stories: BTreeMap<String, Story>,
    pub articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<Article>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn list_repos(State(catalog): State<Catalog>) -> Result<Json<Vec<RepoSummary>>, ApiError> {
    let repos = catalog.snapshot().await?;
    Ok(Json(repos.iter().map(RepoSummary::from).collect()))
}

async fn repo_status(
    State(catalog): State<Catalog>,
    Path(repo): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    catalog.get_repo(&repo).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn languages(
    State(catalog): State<Catalog>,
    Path(repo): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(catalog.languages(&repo).await?))
}

async fn articles(
    State(catalog): State<Catalog>,
    Path((id, lang)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let repo = catalog.get_repo(&id).await?;
    let lang = match resolve_language(&repo, Some(&lang)) {
        LanguageChoice::Supported(lang) => lang,
        LanguageChoice::Redirect(lang) => {
            return Ok(found(&articles_location(&id, &lang, None)));
        }
    };

    let articles = repo.articles_for(&lang).to_vec();
    let list = ArticleList {
        title: repo.id.clone(),
        supported_langs: repo.languages.clone(),
        tags: collect_tags(&articles),
        stories: repo.stories.clone(),
        articles,
    };
    Ok(Json(list).into_response())
}

async fn article(
    State(catalog): State<Catalog>,
    Path((id, lang, slug)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let repo = catalog.get_repo(&id).await?;
    if let LanguageChoice::Redirect(lang) = resolve_language(&repo, Some(&lang)) {
        return Ok(found(&articles_location(&id, &lang, Some(&slug))));
    }

    match best_match(&repo, &lang, &slug) {
        Some(article) => Ok(Json(render::rendered(article)).into_response()),
        None => Err(QueryError::NotFound(format!("{id}/{lang}/{slug}")).into()),
    }
}

/// Top-ranked article for `slug`, taken from an already loaded snapshot.
fn best_match<'a>(repo: &'a Repository, lang: &str, slug: &str) -> Option<&'a Article> {
    rank_matches(slug, repo.articles_for(lang)).into_iter().next()
}

/// `/:repo/articles/:lang[/:slug]` with the segments percent-encoded again.
fn articles_location(id: &str, lang: &str, slug: Option<&str>) -> String {
    let base = format!(
        "/{}/articles/{}",
        urlencoding::encode(id),
        urlencoding::encode(lang)
    );
    match slug {
        Some(slug) => format!("{base}/{}", urlencoding::encode(slug)),
        None => base,
    }
}

async fn search(
    State(catalog): State<Catalog>,
    Path((id, lang)): Path<(String, String)>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let Some(query) = params.q.filter(|q| !q.is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing query parameter 'q'" })),
        )
            .into_response());
    };

    let results = catalog.search_articles(&id, &lang, &query).await?;
    Ok(Json(SearchResponse { query, results }).into_response())
}

/// `302 Found` to `location`.
fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Distinct tags across `articles`, sorted.
pub fn collect_tags(articles: &[Article]) -> Vec<String> {
    articles
        .iter()
        .flat_map(|a| a.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

async fn cors(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{article, repository};

    #[test]
    fn tags_are_sorted_and_distinct() {
        let mut a = article("en", "a", "A");
        a.tags = vec!["start".into(), "cli".into()];
        let mut b = article("en", "b", "B");
        b.tags = vec!["cli".into()];
        assert_eq!(collect_tags(&[a, b]), vec!["cli", "start"]);
    }

    #[test]
    fn best_match_prefers_exact_slug() {
        let repo = repository(
            "docs",
            vec![
                article("en", "intro-advanced", "Advanced"),
                article("en", "intro", "Intro"),
                article("it", "intro", "Introduzione"),
            ],
        );
        assert_eq!(best_match(&repo, "en", "intro").unwrap().title, "Intro");
        assert_eq!(best_match(&repo, "en", "adv").unwrap().slug, "intro-advanced");
        assert_eq!(best_match(&repo, "it", "intro").unwrap().title, "Introduzione");
        assert!(best_match(&repo, "en", "zzz").is_none());
    }

    #[test]
    fn locations_reencode_segments() {
        assert_eq!(articles_location("docs", "en", None), "/docs/articles/en");
        assert_eq!(
            articles_location("docs", "en", Some("a?b")),
            "/docs/articles/en/a%3Fb"
        );
        assert_eq!(
            articles_location("my docs", "en", Some("a/b#c")),
            "/my%20docs/articles/en/a%2Fb%23c"
        );
    }

    #[test]
    fn found_sets_location() {
        let response = found("/docs/articles/en");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/docs/articles/en"
        );
    }

    #[test]
    fn not_found_error_is_404() {
        let response = ApiError(QueryError::NotFound("docs".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
