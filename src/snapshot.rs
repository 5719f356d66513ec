//! Snapshot encoding and publication.
//!
//! A snapshot is the complete, ordered list of indexed repositories encoded
//! as one JSON document. It is always built in full before it is handed to
//! the store, and handed over with a single `set`.

use crate::store::{CacheStore, SNAPSHOT_KEY, StoreError};
use crate::types::Repository;
use sha2::{Digest, Sha256};
use std::fmt;

/// Serialize the repository list.
pub fn encode(repos: &[Repository]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(repos)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<Repository>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Hex-encoded SHA-256 of an encoded snapshot.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}

/// What one publication wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub repos: usize,
    pub articles: usize,
    pub bytes: usize,
    pub fingerprint: String,
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} repositories, {} articles, {} bytes ({})",
            self.repos,
            self.articles,
            self.bytes,
            &self.fingerprint[..self.fingerprint.len().min(12)]
        )
    }
}

/// Store an already encoded snapshot under [`SNAPSHOT_KEY`].
pub async fn publish(
    store: &dyn CacheStore,
    repos: &[Repository],
    encoded: Vec<u8>,
) -> Result<PublishReport, StoreError> {
    let report = PublishReport {
        repos: repos.len(),
        articles: repos.iter().map(|r| r.articles.len()).sum(),
        bytes: encoded.len(),
        fingerprint: fingerprint(&encoded),
    };
    store.set(SNAPSHOT_KEY, encoded).await?;
    tracing::info!(
        backend = store.backend(),
        repos = report.repos,
        articles = report.articles,
        bytes = report.bytes,
        fingerprint = %report.fingerprint,
        "snapshot published"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_helpers::{article, repository};

    fn sample() -> Vec<Repository> {
        vec![
            repository(
                "docs",
                vec![article("en", "intro", "Intro"), article("it", "intro", "Introduzione")],
            ),
            repository("handbook", vec![article("en", "setup", "Setup")]),
        ]
    }

    #[test]
    fn encode_is_deterministic() {
        let repos = sample();
        assert_eq!(encode(&repos).unwrap(), encode(&repos.clone()).unwrap());
    }

    #[test]
    fn decode_restores_repositories() {
        let repos = sample();
        let decoded = decode(&encode(&repos).unwrap()).unwrap();
        assert_eq!(decoded, repos);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"not json").is_err());
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        // sha256("")
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(fingerprint(b"a"), fingerprint(b"b"));
    }

    #[tokio::test]
    async fn publish_sets_snapshot_key() {
        let store = MemoryStore::new(None);
        let repos = sample();
        let encoded = encode(&repos).unwrap();
        let expected = encoded.clone();

        let report = publish(&store, &repos, encoded).await.unwrap();

        assert_eq!(report.repos, 2);
        assert_eq!(report.articles, 3);
        assert_eq!(report.bytes, expected.len());
        assert_eq!(report.fingerprint, fingerprint(&expected));
        assert_eq!(store.get(SNAPSHOT_KEY).await.unwrap(), Some(expected));
    }

    #[test]
    fn report_display_shortens_fingerprint() {
        let report = PublishReport {
            repos: 1,
            articles: 4,
            bytes: 100,
            fingerprint: "0123456789abcdef".into(),
        };
        assert_eq!(
            report.to_string(),
            "1 repositories, 4 articles, 100 bytes (0123456789ab)"
        );
    }
}
