//! Progress and live log panels.

use chrono::{Local, TimeZone};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use shipcheck_core::controller::{format_elapsed, PhaseStatus, Session};
use shipcheck_core::types::{AssessmentRecord, SessionOutcome};

use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Three phase rows plus the timer in the title. The footer names the
/// repository and, when known, its previous verdict.
pub fn render_progress(
    frame: &mut Frame,
    area: Rect,
    session: &Session,
    previous: Option<&AssessmentRecord>,
    theme: &Theme,
) {
    let timer = session
        .elapsed()
        .map(|elapsed| format!(" ⏱ {} ", format_elapsed(elapsed)))
        .unwrap_or_default();
    let block = panel_block("Progress", false, theme)
        .title_top(Line::from(timer).right_aligned());

    let mut lines: Vec<Line> = session
        .progress
        .iter()
        .map(|(phase, status)| {
            let (icon, word, color) = match status {
                PhaseStatus::Pending => ("○", "pending", theme.phase_pending),
                PhaseStatus::Running => ("◐", "running", theme.phase_running),
                PhaseStatus::Complete => ("●", "complete", theme.phase_complete),
                PhaseStatus::Failed => ("✗", "failed", theme.phase_failed),
            };
            let label_style = if status == PhaseStatus::Running {
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            };
            Line::from(vec![
                Span::styled(format!("{icon} "), Style::default().fg(color)),
                Span::styled(format!("{:<28}", phase.label()), label_style),
                Span::styled(word, Style::default().fg(color)),
            ])
        })
        .collect();

    let mut footer = match &session.repository_url {
        Some(url) => url.clone(),
        None => "s starts an analysis".to_owned(),
    };
    if session.is_start_queued() {
        footer.push_str(" · waiting for a session id");
    }
    if let Some(record) = previous {
        footer.push_str(&format!(" · previously {}", previous_label(record)));
    }
    lines.push(Line::styled(footer, Style::default().fg(theme.muted)));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Latest log entries that fit, newest at the bottom.
pub fn render_log(frame: &mut Frame, area: Rect, session: &Session, theme: &Theme) {
    let visible = usize::from(inner_rect(area).height);
    let skip = session.log.len().saturating_sub(visible);
    let lines: Vec<Line> = session
        .log
        .iter()
        .skip(skip)
        .map(|entry| {
            let color = match entry.status.as_str() {
                "error" => theme.phase_failed,
                "completed" | "phase_complete" => theme.phase_complete,
                "questions_ready" => theme.accent,
                _ => theme.text,
            };
            let message = entry.message.lines().next().unwrap_or_default().to_owned();
            Line::from(vec![
                Span::styled(format!("{} ", entry.time_label()), Style::default().fg(theme.muted)),
                Span::styled(format!("[{}] ", entry.status), Style::default().fg(color)),
                Span::raw(message),
            ])
        })
        .collect();

    let title = format!("Log · {}", session.log.len());
    frame.render_widget(Paragraph::new(lines).block(panel_block(title, false, theme)), area);
}

fn previous_label(record: &AssessmentRecord) -> String {
    let verdict = match (record.outcome, record.verdict) {
        (SessionOutcome::Failed, _) => "failed".to_owned(),
        (SessionOutcome::Completed, verdict) => verdict.map_or("?".to_owned(), |v| v.to_string()),
    };
    match Local.timestamp_opt(record.finished_at, 0).single() {
        Some(at) => format!("{verdict} on {}", at.format("%Y-%m-%d")),
        None => verdict,
    }
}
