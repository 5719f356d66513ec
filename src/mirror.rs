//! Local mirrors of remote content repositories.
//!
//! Each remote repository is cloned into its own directory under the mirrors
//! directory and kept up to date with `git pull`. The directory name is the
//! origin URL with every character outside `[A-Za-z0-9._-]` replaced by `_`:
//!
//! ```text
//! repos/
//! ├── https___github.com_acme_docs.git/
//! └── git_example.org_handbook/
//! ```
//!
//! ## Origin drift
//!
//! When an existing mirror's remote URL differs from the configured origin,
//! the caller's [`DriftPolicy`] decides what happens. The library never reads
//! from a terminal: interactive confirmation is a [`ConfirmDrift`]
//! implementation supplied by the binary, and background refreshes always use
//! [`DriftPolicy::Force`].
//!
//! ## Git
//!
//! All operations run the `git` CLI with `GIT_TERMINAL_PROMPT=0`, so a
//! repository that asks for credentials fails instead of hanging.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run git: {0}")]
    Spawn(std::io::Error),
    #[error("git {command} failed in {dir}: {stderr}")]
    Git {
        command: String,
        dir: PathBuf,
        stderr: String,
    },
    #[error("no mirror for {origin} at {path}")]
    MissingMirror { origin: String, path: PathBuf },
    #[error("mirror {0} has no configured remote")]
    NoRemote(PathBuf),
    #[error("drift confirmation failed: {0}")]
    Confirm(String),
}

/// Asks whether a mirror whose origin changed may be discarded.
pub trait ConfirmDrift: Send + Sync {
    /// Return true to delete the mirror at `mirror` and clone `configured`.
    fn confirm_overwrite(&self, mirror: &Path, configured: &str, found: &str) -> bool;
}

/// What to do when a mirror's remote URL differs from the configured origin.
#[derive(Clone)]
pub enum DriftPolicy {
    /// Discard the mirror and clone again without asking.
    Force,
    /// Keep the existing mirror and pull it as-is.
    Keep,
    /// Ask the confirmer; a refusal behaves like [`DriftPolicy::Keep`].
    Ask(Arc<dyn ConfirmDrift>),
}

impl fmt::Debug for DriftPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftPolicy::Force => write!(f, "Force"),
            DriftPolicy::Keep => write!(f, "Keep"),
            DriftPolicy::Ask(_) => write!(f, "Ask"),
        }
    }
}

/// Result of a successful [`Mirrors::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No mirror existed; a fresh clone was made.
    Cloned,
    /// Existing mirror pulled (possibly already up to date).
    Updated,
    /// Origin drifted; the mirror was discarded and cloned again.
    Recloned,
    /// Origin drifted but the mirror was kept and pulled.
    Kept,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncOutcome::Cloned => "cloned",
            SyncOutcome::Updated => "updated",
            SyncOutcome::Recloned => "recloned",
            SyncOutcome::Kept => "kept (origin drift declined)",
        };
        f.write_str(s)
    }
}

/// Directory holding all mirrors, plus the git operations on them.
#[derive(Debug, Clone)]
pub struct Mirrors {
    dir: PathBuf,
}

impl Mirrors {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the mirror for `origin` lives.
    pub fn mirror_path(&self, origin: &str) -> PathBuf {
        self.dir.join(sanitize_origin(origin))
    }

    /// Clone or update the mirror for `origin`.
    pub async fn sync(&self, origin: &str, policy: &DriftPolicy) -> Result<SyncOutcome, SyncError> {
        let path = self.mirror_path(origin);

        if !path.exists() {
            tokio::fs::create_dir_all(&path).await?;
            self.clone_into(origin, &path).await?;
            return Ok(SyncOutcome::Cloned);
        }

        if !path.join(".git").exists() {
            tracing::warn!(mirror = %path.display(), "mirror is not a git repository, cloning again");
            tokio::fs::remove_dir_all(&path).await?;
            tokio::fs::create_dir_all(&path).await?;
            self.clone_into(origin, &path).await?;
            return Ok(SyncOutcome::Cloned);
        }

        let found = remote_url(&path).await?;
        let mut outcome = SyncOutcome::Updated;

        if found != origin {
            let overwrite = match policy {
                DriftPolicy::Force => true,
                DriftPolicy::Keep => false,
                DriftPolicy::Ask(confirm) => {
                    let confirm = Arc::clone(confirm);
                    let mirror = path.clone();
                    let configured = origin.to_string();
                    let found = found.clone();
                    tokio::task::spawn_blocking(move || {
                        confirm.confirm_overwrite(&mirror, &configured, &found)
                    })
                    .await
                    .map_err(|e| SyncError::Confirm(e.to_string()))?
                }
            };

            if overwrite {
                tracing::warn!(
                    mirror = %path.display(),
                    configured = origin,
                    found = %found,
                    "origin changed, discarding mirror"
                );
                tokio::fs::remove_dir_all(&path).await?;
                tokio::fs::create_dir_all(&path).await?;
                self.clone_into(origin, &path).await?;
                return Ok(SyncOutcome::Recloned);
            }

            tracing::warn!(
                mirror = %path.display(),
                configured = origin,
                found = %found,
                "origin changed, keeping existing mirror"
            );
            outcome = SyncOutcome::Kept;
        }

        if matches!(policy, DriftPolicy::Force) && self.has_changes(origin).await? {
            tracing::info!(mirror = %path.display(), "discarding local changes");
            git(Some(&path), &["reset", "--hard"]).await?;
            git(Some(&path), &["clean", "-fdx"]).await?;
        }

        git(Some(&path), &["pull", "--ff-only"]).await?;
        Ok(outcome)
    }

    /// Whether the mirror's working tree has uncommitted or untracked changes.
    pub async fn has_changes(&self, origin: &str) -> Result<bool, SyncError> {
        let path = self.existing_mirror(origin)?;
        let status = git(Some(&path), &["status", "--porcelain"]).await?;
        Ok(!status.trim().is_empty())
    }

    /// Fetch and report whether upstream has commits the mirror lacks.
    pub async fn is_behind(&self, origin: &str) -> Result<bool, SyncError> {
        let path = self.existing_mirror(origin)?;
        git(Some(&path), &["fetch", "--quiet"]).await?;
        let count = git(Some(&path), &["rev-list", "--count", "HEAD..@{upstream}"]).await?;
        Ok(count.trim().parse::<u64>().unwrap_or(0) > 0)
    }

    fn existing_mirror(&self, origin: &str) -> Result<PathBuf, SyncError> {
        let path = self.mirror_path(origin);
        if !path.join(".git").exists() {
            return Err(SyncError::MissingMirror {
                origin: origin.to_string(),
                path,
            });
        }
        Ok(path)
    }

    async fn clone_into(&self, origin: &str, path: &Path) -> Result<(), SyncError> {
        tracing::info!(origin, mirror = %path.display(), "cloning");
        let target = path.to_string_lossy().to_string();
        if let Err(err) = git(None, &["clone", "--quiet", origin, &target]).await {
            // Leave no half-created mirror behind, the next sync must clone again
            if let Err(cleanup) = tokio::fs::remove_dir_all(path).await {
                tracing::warn!(mirror = %path.display(), error = %cleanup, "failed to remove partial mirror");
            }
            return Err(err);
        }
        Ok(())
    }
}

/// Map an origin URL to a safe directory name.
pub fn sanitize_origin(origin: &str) -> String {
    origin
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// URL of the mirror's first remote.
async fn remote_url(path: &Path) -> Result<String, SyncError> {
    let remotes = git(Some(path), &["remote"]).await?;
    let name = remotes
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| SyncError::NoRemote(path.to_path_buf()))?
        .to_string();
    let url = git(Some(path), &["remote", "get-url", &name]).await?;
    Ok(url.trim().to_string())
}

/// Run git, returning stdout. Non-zero exit is a [`SyncError::Git`].
///
/// Inside a mirror, repository discovery stops at the mirror directory so git
/// never acts on a checkout that happens to enclose the mirrors directory.
async fn git(dir: Option<&Path>, args: &[&str]) -> Result<String, SyncError> {
    let mut cmd = Command::new("git");
    if let Some(dir) = dir {
        cmd.current_dir(dir);
        let absolute = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        if let Some(parent) = absolute.parent() {
            cmd.env("GIT_CEILING_DIRECTORIES", parent);
        }
    }
    let output = cmd
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(SyncError::Spawn)?;

    if !output.status.success() {
        return Err(SyncError::Git {
            command: args.first().copied().unwrap_or_default().to_string(),
            dir: dir.map(Path::to_path_buf).unwrap_or_default(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
