//! # quire
//!
//! A documentation server. Markdown articles live in git repositories (or
//! plain directories), organised by language; quire mirrors them, indexes
//! them, and answers JSON queries by repository, language and slug.
//!
//! # Architecture: Sync → Index → Publish → Query
//!
//! ```text
//! 1. Sync      remote origin  →  repos/<mirror>/     (git clone / pull)
//! 2. Index     checkout       →  Vec<Repository>     (parse every article)
//! 3. Publish   Vec<Repository> → cache["Repos"]      (one JSON blob, one set)
//! 4. Query     cache["Repos"] →  HTTP responses      (decode, filter, render)
//! ```
//!
//! Stages 1–3 run together in the refresh scheduler: once at startup
//! (priming, which must succeed before the server listens) and then every 15
//! minutes in the background. Stage 4 runs per request and only ever reads the
//! cache, so a request sees either the previous snapshot or the next one in
//! full.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`mirror`] | Clone/pull remote repositories, detect origin drift and local changes |
//! | [`parse`] | One markdown file with a `Key: value` header → [`types::Article`] |
//! | [`story`] | Optional `stories.toml` manifest per repository |
//! | [`index`] | Walk a content root, discover languages, group articles |
//! | [`locale`] | Two-letter language code validation |
//! | [`store`] | Pluggable byte cache: memory, sled, redis |
//! | [`snapshot`] | Encode, fingerprint and publish the repository list |
//! | [`refresh`] | Priming and the steady-state refresh loop |
//! | [`query`] | Read-only lookups and search over the published snapshot |
//! | [`render`] | Markdown → HTML for served articles |
//! | [`http`] | axum router exposing the query layer |
//! | [`config`] | `quire.toml` loading and validation |
//! | [`output`] | CLI output formatting for `quire check` |
//! | [`types`] | `Repository`, `Article`, `Story` |
//!
//! # Content Layout
//!
//! ```text
//! <checkout>/articles/
//! ├── stories.toml        # optional
//! ├── en/
//! │   ├── install.md
//! │   └── intro.md
//! └── it/
//!     └── install.md
//! ```
//!
//! A content root without two-letter language directories is served in
//! fallback mode: every article is attributed to the repository's fallback
//! language (`en` unless configured).

pub mod config;
pub mod http;
pub mod index;
pub mod locale;
pub mod mirror;
pub mod output;
pub mod parse;
pub mod query;
pub mod refresh;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod story;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
