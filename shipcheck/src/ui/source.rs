//! Repository source panel: the public URL field, or the private flow with
//! token, connection state, search and the repository list.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
};
use shipcheck_core::github::Repository;
use shipcheck_core::repos::Connection;

use crate::app::{AppState, Focus};
use crate::theme::Theme;
use crate::ui::layout::{editing, field_lines, inner_rect, label_style, panel_block};

/// Description characters shown per list row.
const LIST_DESCRIPTION_CHARS: usize = 40;

/// Outer height of the source panel for the current mode.
pub fn panel_height(state: &AppState) -> u16 {
    if state.private { 14 } else { 3 }
}

pub fn render_source(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let focused = matches!(
        state.focus,
        Focus::RepositoryUrl | Focus::Token | Focus::Search | Focus::RepositoryList
    );
    let title =
        if state.private { "Repository · private (p)" } else { "Repository · public (p)" };
    frame.render_widget(panel_block(title, focused, theme), area);

    let inner = inner_rect(area);
    if state.private {
        render_private(frame, inner, state, theme);
    } else {
        let line = labelled(
            "URL     ",
            field_lines(
                &state.repository_url,
                editing(state, Focus::RepositoryUrl),
                false,
                "https://github.com/owner/repo",
                theme,
            ),
            state.focus == Focus::RepositoryUrl,
            theme,
        );
        frame.render_widget(Paragraph::new(line), inner);
    }
}

fn render_private(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let [token, connection, search, selected, list] = area.layout(&Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ]));

    let token_line = labelled(
        "Token   ",
        field_lines(
            &state.token,
            editing(state, Focus::Token),
            true,
            "ghp_… then Enter or c",
            theme,
        ),
        state.focus == Focus::Token,
        theme,
    );
    frame.render_widget(Paragraph::new(token_line), token);

    let status = match state.browser.connection() {
        Connection::Disconnected => Span::styled("not connected", Style::default().fg(theme.muted)),
        Connection::Connecting => {
            Span::styled("connecting…", Style::default().fg(theme.phase_running))
        }
        Connection::Connected { user, .. } => Span::styled(
            format!(
                "connected as {} · {} repositories (D disconnects)",
                user.display_name(),
                state.browser.repositories().len()
            ),
            Style::default().fg(theme.phase_complete),
        ),
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("GitHub  ", label_style(false, theme)),
            status,
        ])),
        connection,
    );

    let search_line = labelled(
        "Search  ",
        field_lines(
            &state.search,
            editing(state, Focus::Search),
            false,
            "name or description",
            theme,
        ),
        state.focus == Focus::Search,
        theme,
    );
    frame.render_widget(Paragraph::new(search_line), search);

    let mut chosen = vec![Span::styled("Selected", label_style(false, theme)), Span::raw(" ")];
    match state.browser.selected() {
        Some(repo) => {
            chosen.push(Span::styled(repo.full_name.clone(), Style::default().fg(theme.selection)));
            if let Some(description) = description(repo) {
                chosen.push(Span::styled(
                    format!(" · {description}"),
                    Style::default().fg(theme.muted),
                ));
            }
        }
        None => chosen.push(Span::styled(
            "none (Enter on a repository)",
            Style::default().fg(theme.muted),
        )),
    }
    frame.render_widget(Paragraph::new(Line::from(chosen)), selected);

    let selected_id = state.browser.selected().map(|r| r.id);
    let items: Vec<ListItem> = state
        .browser
        .visible()
        .into_iter()
        .map(|repo| {
            let marker = if Some(repo.id) == selected_id { "● " } else { "  " };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(theme.selection)),
                Span::raw(repo.full_name.clone()),
            ];
            if let Some(description) = description(repo) {
                spans.push(Span::styled(
                    format!("  {}", truncate(description, LIST_DESCRIPTION_CHARS)),
                    Style::default().fg(theme.text),
                ));
            }
            if let Some(language) = &repo.language {
                spans.push(Span::styled(format!("  {language}"), Style::default().fg(theme.muted)));
            }
            spans.push(Span::styled(
                format!("  ★{}", repo.stargazers_count),
                Style::default().fg(theme.muted),
            ));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list_focused = state.focus == Focus::RepositoryList;
    let highlight = if list_focused {
        Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let mut list_state = ListState::default().with_selected(Some(state.browser.cursor()));
    frame.render_stateful_widget(
        List::new(items).highlight_style(highlight).highlight_symbol("› "),
        list,
        &mut list_state,
    );
}

/// Prefixes the first line of a single-line field with its label.
fn labelled(
    label: &'static str,
    mut lines: Vec<Line<'static>>,
    focused: bool,
    theme: &Theme,
) -> Line<'static> {
    let mut spans = vec![Span::styled(label, label_style(focused, theme))];
    if !lines.is_empty() {
        spans.extend(lines.swap_remove(0).spans);
    }
    Line::from(spans)
}

fn description(repo: &Repository) -> Option<&str> {
    repo.description.as_deref().map(str::trim).filter(|d| !d.is_empty())
}

/// First `max` chars of `text`, with an ellipsis when cut.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_are_trimmed_and_cut_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 3), "ééé…");

        let repo: Repository = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "api",
            "full_name": "acme/api",
            "description": "   ",
            "private": true,
            "html_url": "https://github.com/acme/api",
        }))
        .unwrap();
        assert_eq!(description(&repo), None);
    }
}
