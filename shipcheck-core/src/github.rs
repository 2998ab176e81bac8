//! GitHub REST v3 client for the private-repository flow.
//!
//! Only two calls are made: `GET /user` to verify a personal access token and
//! `GET /user/repos` to list the repositories it can see. Results are opaque
//! display data for the repository browser.

use serde::Deserialize;

use crate::error::{GitHubError, ValidationError};

/// Default API root.
pub const GITHUB_API: &str = "https://api.github.com";

/// Accepted personal access token prefixes (classic and fine-grained).
pub const TOKEN_PREFIXES: [&str; 2] = ["ghp_", "github_pat_"];

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl GitHubUser {
    /// Full name when set, login otherwise.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.login)
    }
}

/// One repository as listed by `/user/repos`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub private: bool,
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Checks the shape of a personal access token and returns it trimmed.
///
/// # Errors
///
/// [`ValidationError::EmptyToken`] for a blank token and
/// [`ValidationError::MalformedToken`] when it has neither known prefix.
pub fn validate_token(token: &str) -> Result<&str, ValidationError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ValidationError::EmptyToken);
    }
    if !TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
        return Err(ValidationError::MalformedToken);
    }
    Ok(token)
}

/// Case-insensitive substring match over `name` and `description`. An empty
/// (or blank) term keeps everything.
pub fn filter_repositories<'a>(repos: &'a [Repository], term: &str) -> Vec<&'a Repository> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return repos.iter().collect();
    }
    repos
        .iter()
        .filter(|repo| {
            repo.name.to_lowercase().contains(&term)
                || repo
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&term))
        })
        .collect()
}

/// Thin reqwest wrapper over the two endpoints.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
}

impl GitHubClient {
    /// Builds a client against `api_base` (normally [`GITHUB_API`]).
    ///
    /// # Errors
    ///
    /// [`GitHubError::Http`] if the HTTP client cannot be constructed.
    pub fn new(api_base: &str) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("shipcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, api_base: api_base.trim_end_matches('/').to_owned() })
    }

    /// `GET /user`.
    ///
    /// # Errors
    ///
    /// Token shape errors, [`GitHubError::Unauthorized`] for 401/403, any other
    /// non-success status, or a transport/decoding failure.
    pub async fn verify_token(&self, token: &str) -> Result<GitHubUser, GitHubError> {
        let token = validate_token(token)?;
        self.get_json(token, "/user").await
    }

    /// `GET /user/repos?sort=updated&per_page=100`.
    ///
    /// # Errors
    ///
    /// As [`GitHubClient::verify_token`].
    pub async fn list_repositories(&self, token: &str) -> Result<Vec<Repository>, GitHubError> {
        let token = validate_token(token)?;
        self.get_json(token, "/user/repos?sort=updated&per_page=100").await
    }

    /// Verifies the token, then lists its repositories.
    ///
    /// # Errors
    ///
    /// The first failure of either call.
    pub async fn connect(&self, token: &str) -> Result<(GitHubUser, Vec<Repository>), GitHubError> {
        let user = self.verify_token(token).await?;
        tracing::info!(login = %user.login, "GitHub token verified");
        let repos = self.list_repositories(token).await?;
        tracing::info!(count = repos.len(), "repositories listed");
        Ok((user, repos))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
    ) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_base, path);
        tracing::debug!(%url, "GitHub request");
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("token {token}"))
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GitHubError::Unauthorized);
        }
        if !status.is_success() {
            return Err(GitHubError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}
