use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command::Invocation;
use crate::error::SynthError;

/// A shallow clone on local disk.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// The working tree, always absolute.
    pub path: PathBuf,
    /// What [`cleanup_repository`] removes: the temp directory when one
    /// was created, otherwise the working tree itself.
    root: PathBuf,
}

/// Directory name for a clone of `url`: the last path segment without `.git`.
pub fn repo_dir_name(url: &str) -> &str {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(url);
    last.strip_suffix(".git").unwrap_or(last)
}

/// Shallow-clone `url` into `<dest>/<repo-name>`, or into a fresh temp
/// directory when `dest` is `None`.
///
/// The temp directory is removed if the clone fails or the future is
/// dropped before it finishes.
pub async fn clone_repository(url: &str, dest: Option<&Path>) -> Result<Checkout, SynthError> {
    match dest {
        Some(dir) => {
            let dir = std::path::absolute(dir).map_err(|e| SynthError::io(dir, e))?;
            let path = dir.join(repo_dir_name(url));
            git_clone(url, &path).await?;
            Ok(Checkout {
                root: path.clone(),
                path,
            })
        }
        None => {
            let temp = tempfile::Builder::new()
                .prefix("stratus-")
                .tempdir()
                .map_err(|e| SynthError::io(std::env::temp_dir(), e))?;
            let path = temp.path().join(repo_dir_name(url));
            git_clone(url, &path).await?;
            Ok(Checkout {
                path,
                root: temp.keep(),
            })
        }
    }
}

async fn git_clone(url: &str, path: &Path) -> Result<(), SynthError> {
    info!(url, path = %path.display(), "cloning repository");
    Invocation::new("git")
        .args(["clone", "--depth", "1", url])
        .args([path.to_string_lossy()])
        .run()
        .await?;
    info!(path = %path.display(), "repository cloned");
    Ok(())
}

/// Remove a checkout. Failure is logged and otherwise ignored.
pub fn cleanup_repository(checkout: &Checkout) {
    match std::fs::remove_dir_all(&checkout.root) {
        Ok(()) => info!(path = %checkout.root.display(), "removed cloned repository"),
        Err(e) => {
            warn!(path = %checkout.root.display(), error = %e, "failed to remove cloned repository")
        }
    }
}
