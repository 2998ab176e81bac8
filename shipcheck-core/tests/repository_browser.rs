//! Repository filtering and the private-repository browser state.

use serde_json::json;
use shipcheck_core::error::{GitHubError, ValidationError};
use shipcheck_core::github::{self, GitHubUser, Repository};
use shipcheck_core::repos::{Connection, RepositoryBrowser};

fn repo(id: u64, name: &str, description: Option<&str>) -> Repository {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "full_name": format!("acme/{name}"),
        "description": description,
        "private": true,
        "html_url": format!("https://github.com/acme/{name}"),
        "language": "Rust",
        "stargazers_count": 3,
        "forks_count": 1,
        "updated_at": "2024-05-01T12:00:00Z"
    }))
    .unwrap()
}

fn user(login: &str) -> GitHubUser {
    GitHubUser { login: login.into(), name: None, avatar_url: None }
}

fn listing() -> Vec<Repository> {
    vec![
        repo(1, "billing-api", Some("Invoices and PAYMENTS")),
        repo(2, "web", None),
        repo(3, "infra", Some("Terraform for the API cluster")),
    ]
}

fn connected_browser() -> RepositoryBrowser {
    let mut browser = RepositoryBrowser::new();
    let attempt = browser.begin_connect("ghp_first").unwrap();
    browser.finish_connect(&attempt, Ok((user("octo"), listing()))).unwrap();
    browser
}

#[test]
fn filter_matches_name_or_description_case_insensitively() {
    let repos = listing();
    let names = |term: &str| -> Vec<String> {
        github::filter_repositories(&repos, term)
            .into_iter()
            .map(|r| r.name.clone())
            .collect()
    };

    assert_eq!(names(""), vec!["billing-api", "web", "infra"]);
    assert_eq!(names("  "), vec!["billing-api", "web", "infra"]);
    assert_eq!(names("API"), vec!["billing-api", "infra"]);
    assert_eq!(names("payments"), vec!["billing-api"]);
    assert!(names("nothing-matches").is_empty());
}

#[test]
fn token_shape_is_checked_before_any_request() {
    assert_eq!(github::validate_token(""), Err(ValidationError::EmptyToken));
    assert_eq!(github::validate_token("abc123"), Err(ValidationError::MalformedToken));
    assert_eq!(github::validate_token(" ghp_abc "), Ok("ghp_abc"));
    assert_eq!(github::validate_token("github_pat_abc"), Ok("github_pat_abc"));

    let mut browser = RepositoryBrowser::new();
    assert!(browser.begin_connect("password").is_err());
    assert_eq!(browser.connection(), &Connection::Disconnected);
}

#[test]
fn successful_connect_exposes_user_and_token() {
    let browser = connected_browser();
    assert!(browser.is_connected());
    assert_eq!(browser.token(), Some("ghp_first"));
    assert_eq!(browser.user().map(GitHubUser::display_name), Some("octo"));
    assert_eq!(browser.repositories().len(), 3);
    assert!(browser.selected().is_none());
}

#[test]
fn failed_connect_rolls_back_to_disconnected() {
    let mut browser = RepositoryBrowser::new();
    let attempt = browser.begin_connect("ghp_bad").unwrap();
    assert_eq!(browser.connection(), &Connection::Connecting);

    let err = browser
        .finish_connect(&attempt, Err(GitHubError::Unauthorized))
        .unwrap_err();
    assert!(matches!(err, GitHubError::Unauthorized));
    assert_eq!(browser.connection(), &Connection::Disconnected);
    assert!(browser.token().is_none());
    assert!(browser.repositories().is_empty());
}

#[test]
fn failed_reconnect_restores_the_previous_connection() {
    let mut browser = connected_browser();
    browser.select(3).unwrap();

    let attempt = browser.begin_connect("ghp_second").unwrap();
    assert!(browser.token().is_none());
    let _ = browser.finish_connect(&attempt, Err(GitHubError::Status(500)));

    assert_eq!(browser.token(), Some("ghp_first"));
    assert_eq!(browser.repositories().len(), 3);
    assert_eq!(browser.selected().map(|r| r.id), Some(3));
}

#[test]
fn superseded_attempts_are_ignored() {
    let mut browser = RepositoryBrowser::new();
    let stale = browser.begin_connect("ghp_one").unwrap();
    let current = browser.begin_connect("ghp_two").unwrap();

    browser.finish_connect(&stale, Ok((user("old"), vec![]))).unwrap();
    assert_eq!(browser.connection(), &Connection::Connecting);

    browser.finish_connect(&current, Ok((user("new"), listing()))).unwrap();
    assert_eq!(browser.token(), Some("ghp_two"));
    assert_eq!(browser.user().unwrap().login, "new");
}

#[test]
fn selection_replaces_and_survives_filtering() {
    let mut browser = connected_browser();
    browser.move_cursor(1);
    assert_eq!(browser.select_at_cursor().map(|r| r.id), Some(2));

    browser.set_search("api");
    assert_eq!(browser.cursor(), 1, "cursor clamped to the filtered list");
    browser.move_cursor(-5);
    assert_eq!(browser.select_at_cursor().map(|r| r.id), Some(1));
    assert_eq!(browser.selected().map(|r| r.name.as_str()), Some("billing-api"));

    browser.set_search("web");
    assert_eq!(browser.selected().map(|r| r.id), Some(1), "hidden selection is kept");
}

#[test]
fn disconnect_clears_everything() {
    let mut browser = connected_browser();
    browser.select(1).unwrap();
    browser.set_search("bill");
    browser.disconnect();

    assert_eq!(browser.connection(), &Connection::Disconnected);
    assert!(browser.token().is_none());
    assert!(browser.repositories().is_empty());
    assert!(browser.selected().is_none());
    assert!(browser.search().is_empty());
}
