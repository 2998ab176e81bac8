//! Recent assessments overlay.

use chrono::{Local, TimeZone};
use ratatui::{
    Frame,
    layout::Constraint,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, List, ListItem, ListState},
};
use shipcheck_core::types::{AssessmentRecord, SessionOutcome};
use shipcheck_core::verdict::Verdict;

use crate::app::AppState;
use crate::theme::Theme;

pub fn render_history_overlay(frame: &mut Frame, state: &AppState, theme: &Theme) {
    if frame.area().width < 60 {
        return;
    }
    let area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(70));
    frame.render_widget(Clear, area);

    let block = Block::bordered()
        .title(" Recent assessments · j/k move, h or Esc to dismiss ")
        .border_style(Style::default().fg(theme.border_active));

    let items: Vec<ListItem> = if state.history.is_empty() {
        vec![ListItem::new(Line::styled(
            "No assessments recorded yet.",
            Style::default().fg(theme.muted),
        ))]
    } else {
        state.history.iter().map(|record| history_item(record, theme)).collect()
    };

    let mut list_state = ListState::default().with_selected(Some(state.history_cursor));
    frame.render_stateful_widget(
        List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
        area,
        &mut list_state,
    );
}

fn history_item(record: &AssessmentRecord, theme: &Theme) -> ListItem<'static> {
    let finished = Local
        .timestamp_opt(record.finished_at, 0)
        .single()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.finished_at.to_string());

    let (verdict, color) = match (record.outcome, record.verdict) {
        (SessionOutcome::Failed, _) => ("failed".to_owned(), theme.phase_failed),
        (SessionOutcome::Completed, Some(Verdict::Yes)) => ("YES".to_owned(), theme.verdict_yes),
        (SessionOutcome::Completed, Some(Verdict::No)) => ("NO".to_owned(), theme.verdict_no),
        (SessionOutcome::Completed, _) => ("?".to_owned(), theme.verdict_unknown),
    };
    let secs = record.duration_secs().max(0);

    ListItem::new(Line::from(vec![
        Span::styled(format!("{finished}  "), Style::default().fg(theme.muted)),
        Span::styled(
            format!("{verdict:<7}"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{:>2}:{:02}  {:>2} vars  ", secs / 60, secs % 60, record.config_keys),
            Style::default().fg(theme.muted),
        ),
        Span::raw(record.repository_url.clone()),
    ]))
}
