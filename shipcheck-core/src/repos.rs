//! Repository selection state for the private-repository flow.
//!
//! The browser never performs I/O. A connect is split into
//! [`RepositoryBrowser::begin_connect`], which validates the token and hands back
//! an [`ConnectAttempt`] for the caller to run, and
//! [`RepositoryBrowser::finish_connect`], which applies the result. A failed
//! attempt restores exactly the state that existed before it began.
//!
//! The credential lives only here, in memory.

use crate::error::{GitHubError, ValidationError};
use crate::github::{self, GitHubUser, Repository};

/// Connection state of the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Connection {
    #[default]
    Disconnected,
    Connecting,
    Connected { token: String, user: GitHubUser },
}

/// A connect the caller must run with [`github::GitHubClient::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub id: u64,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    connection: Connection,
    repositories: Vec<Repository>,
    selected: Option<u64>,
}

#[derive(Debug, Default)]
pub struct RepositoryBrowser {
    connection: Connection,
    repositories: Vec<Repository>,
    search: String,
    cursor: usize,
    /// Selected repository id; survives filtering.
    selected: Option<u64>,
    attempt: u64,
    rollback: Option<Snapshot>,
}

impl RepositoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected { .. })
    }

    pub fn user(&self) -> Option<&GitHubUser> {
        match &self.connection {
            Connection::Connected { user, .. } => Some(user),
            _ => None,
        }
    }

    /// The verified token, only while connected.
    pub fn token(&self) -> Option<&str> {
        match &self.connection {
            Connection::Connected { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Validates `token` and moves to `Connecting`.
    ///
    /// # Errors
    ///
    /// Token shape errors; the state is left untouched.
    pub fn begin_connect(&mut self, token: &str) -> Result<ConnectAttempt, ValidationError> {
        let token = github::validate_token(token)?.to_owned();
        if self.rollback.is_none() {
            self.rollback = Some(Snapshot {
                connection: self.connection.clone(),
                repositories: self.repositories.clone(),
                selected: self.selected,
            });
        }
        self.attempt += 1;
        self.connection = Connection::Connecting;
        tracing::debug!(attempt = self.attempt, "GitHub connect started");
        Ok(ConnectAttempt { id: self.attempt, token })
    }

    /// Applies the outcome of `attempt`. Results of superseded attempts are
    /// ignored.
    ///
    /// On success the browser is connected with the new list and no selection.
    /// On failure the pre-attempt state is restored and the error is returned
    /// for the caller to report.
    ///
    /// # Errors
    ///
    /// The attempt's own [`GitHubError`].
    pub fn finish_connect(
        &mut self,
        attempt: &ConnectAttempt,
        result: Result<(GitHubUser, Vec<Repository>), GitHubError>,
    ) -> Result<(), GitHubError> {
        if attempt.id != self.attempt || self.connection != Connection::Connecting {
            tracing::debug!(
                attempt = attempt.id,
                current = self.attempt,
                "ignoring superseded connect"
            );
            return Ok(());
        }
        match result {
            Ok((user, repositories)) => {
                tracing::info!(login = %user.login, count = repositories.len(), "GitHub connected");
                self.rollback = None;
                self.connection = Connection::Connected { token: attempt.token.clone(), user };
                self.repositories = repositories;
                self.selected = None;
                self.search.clear();
                self.cursor = 0;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "GitHub connect failed; rolling back");
                let snapshot = self.rollback.take().unwrap_or_default();
                self.connection = snapshot.connection;
                self.repositories = snapshot.repositories;
                self.selected = snapshot.selected;
                self.clamp_cursor();
                Err(err)
            }
        }
    }

    /// Forgets the credential, user, list and selection.
    pub fn disconnect(&mut self) {
        tracing::info!("GitHub disconnected");
        self.attempt += 1;
        self.connection = Connection::Disconnected;
        self.repositories.clear();
        self.search.clear();
        self.cursor = 0;
        self.selected = None;
        self.rollback = None;
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.clamp_cursor();
    }

    /// Repositories matching the search term, in listing order.
    pub fn visible(&self) -> Vec<&Repository> {
        github::filter_repositories(&self.repositories, &self.search)
    }

    /// Moves the cursor by `delta` within the visible list.
    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.visible().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    /// Selects the repository under the cursor, replacing any previous
    /// selection.
    pub fn select_at_cursor(&mut self) -> Option<&Repository> {
        let id = self.visible().get(self.cursor).map(|r| r.id)?;
        self.select(id)
    }

    /// Selects by repository id.
    pub fn select(&mut self, id: u64) -> Option<&Repository> {
        let repo = self.repositories.iter().find(|r| r.id == id)?;
        tracing::debug!(repository = %repo.full_name, "repository selected");
        self.selected = Some(id);
        Some(repo)
    }

    pub fn selected(&self) -> Option<&Repository> {
        let id = self.selected?;
        self.repositories.iter().find(|r| r.id == id)
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}
