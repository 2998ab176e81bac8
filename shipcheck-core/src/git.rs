//! Detects the GitHub repository of the working directory.
//!
//! Used to prefill the public repository URL when `shipcheck` is launched inside
//! a checkout. Any git2 failure simply means "no suggestion".

use std::path::Path;

use git2::Repository;

use crate::controller::GITHUB_URL_PREFIX;

/// Returns `https://github.com/<owner>/<repo>` for the `origin` remote of the
/// repository containing `path`, if that remote points at github.com.
pub fn detect_origin(path: &Path) -> Option<String> {
    let repo = match Repository::discover(path) {
        Ok(repo) => repo,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "not inside a git repository");
            return None;
        }
    };
    let remote = repo.find_remote("origin").ok()?;
    let url = remote.url()?;
    let normalized = normalize_remote_url(url);
    if normalized.is_none() {
        tracing::debug!(%url, "origin is not a GitHub remote");
    }
    normalized
}

/// Normalizes the common GitHub remote forms to the browser URL.
///
/// ```text
/// git@github.com:owner/repo.git        -> https://github.com/owner/repo
/// ssh://git@github.com/owner/repo.git  -> https://github.com/owner/repo
/// https://github.com/owner/repo.git    -> https://github.com/owner/repo
/// ```
pub fn normalize_remote_url(url: &str) -> Option<String> {
    let url = url.trim();
    let path = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))
        .or_else(|| url.strip_prefix("git://github.com/"))?;

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some(format!("{GITHUB_URL_PREFIX}{owner}/{repo}"))
}
