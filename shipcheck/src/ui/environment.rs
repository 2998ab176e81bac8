//! Environment form and its live preview.
//!
//! The form is one scrolling paragraph: the `.env` paste area, the fixed
//! fields, the bulk list and the custom rows. The preview always shows what a
//! start would send right now.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use shipcheck_core::envconfig;

use crate::app::{AppState, Focus, FIELD_NAMES};
use crate::theme::Theme;
use crate::ui::layout::{editing, field_lines, inner_rect, label_style, panel_block};

/// Rows always reserved for the `.env` paste area.
const BLOB_ROWS: usize = 4;

pub fn render_environment(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let focused = matches!(
        state.focus,
        Focus::EnvBlob | Focus::Field(_) | Focus::Bulk | Focus::CustomKey(_) | Focus::CustomValue(_)
    );
    let block = panel_block("Environment · n add row · x remove row · X clear", focused, theme);

    let mut lines: Vec<Line> = Vec::new();
    let mut focus_line = 0;

    let blob_override = !state.env_blob.is_blank();
    lines.push(heading(
        ".env paste (overrides everything below)",
        state.focus == Focus::EnvBlob,
        theme,
    ));
    if state.focus == Focus::EnvBlob {
        focus_line = lines.len();
    }
    let mut blob =
        field_lines(&state.env_blob, editing(state, Focus::EnvBlob), false, "KEY=value", theme);
    while blob.len() < BLOB_ROWS {
        blob.push(Line::raw(""));
    }
    lines.extend(blob.into_iter().map(indent));

    let muted_if_overridden = |style: Style| {
        if blob_override { style.fg(theme.muted) } else { style }
    };

    lines.push(heading("Fields", false, theme));
    for (i, name) in FIELD_NAMES.iter().enumerate() {
        let focus = Focus::Field(i);
        if state.focus == focus {
            focus_line = lines.len();
        }
        let value = field_lines(&state.fields[i], editing(state, focus), false, "", theme);
        lines.push(row(
            Span::styled(
                format!("{name:<14}"),
                muted_if_overridden(label_style(state.focus == focus, theme)),
            ),
            value,
        ));
    }

    if state.focus == Focus::Bulk {
        focus_line = lines.len();
    }
    let bulk = field_lines(
        &state.bulk,
        editing(state, Focus::Bulk),
        false,
        "KEY=value, KEY2=value2",
        theme,
    );
    lines.push(row(
        Span::styled(
            format!("{:<14}", "Bulk"),
            muted_if_overridden(label_style(state.focus == Focus::Bulk, theme)),
        ),
        bulk,
    ));

    lines.push(heading("Custom", false, theme));
    if state.custom.is_empty() {
        lines.push(Line::styled("  (none, press n to add)", Style::default().fg(theme.muted)));
    }
    for (row_index, (key, value)) in state.custom.iter().enumerate() {
        let key_focus = Focus::CustomKey(row_index);
        let value_focus = Focus::CustomValue(row_index);
        if state.focus == key_focus || state.focus == value_focus {
            focus_line = lines.len();
        }
        let mut spans = vec![Span::raw("  ")];
        let key_line = field_lines(key, editing(state, key_focus), false, "KEY", theme);
        spans.extend(first_line(key_line));
        spans.push(Span::styled(" = ", label_style(false, theme)));
        let value_line = field_lines(value, editing(state, value_focus), false, "value", theme);
        spans.extend(first_line(value_line));
        let mut line = Line::from(spans);
        if state.focus == key_focus || state.focus == value_focus {
            line = line.style(Style::default().add_modifier(Modifier::BOLD));
        }
        lines.push(line);
    }

    let inner = inner_rect(area);
    let height = usize::from(inner.height.max(1));
    let scroll = focus_line.saturating_sub(height.saturating_sub(2));
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0)),
        area,
    );
}

pub fn render_preview(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let config = state.environment_config();
    let title = format!("Preview · {} variables", config.len());
    let body = envconfig::preview(&config);
    let lines: Vec<Line> = body
        .lines()
        .map(|line| {
            if line.starts_with('#') {
                Line::styled(line.to_owned(), Style::default().fg(theme.muted))
            } else {
                Line::styled(line.to_owned(), Style::default().fg(theme.text))
            }
        })
        .collect();
    frame.render_widget(
        Paragraph::new(lines)
            .block(panel_block(title, false, theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn heading(text: &'static str, focused: bool, theme: &Theme) -> Line<'static> {
    Line::from(Span::styled(text, label_style(focused, theme).add_modifier(Modifier::UNDERLINED)))
}

fn indent(line: Line<'static>) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    spans.extend(line.spans);
    Line::from(spans)
}

fn first_line(mut lines: Vec<Line<'static>>) -> Vec<Span<'static>> {
    if lines.is_empty() { Vec::new() } else { lines.swap_remove(0).spans }
}

fn row(label: Span<'static>, value: Vec<Line<'static>>) -> Line<'static> {
    let mut spans = vec![Span::raw("  "), label];
    spans.extend(first_line(value));
    Line::from(spans)
}
