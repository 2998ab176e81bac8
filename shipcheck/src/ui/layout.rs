//! Layout engine and shared widgets for shipcheck.
//!
//! Pure layout arithmetic plus the small building blocks every panel uses: the
//! bordered panel block, text-field lines with a cursor, and the status bar.
//! Called inside `terminal.draw()` on every render so each frame reflects the
//! current terminal size.
//!
//! # Panel geometry
//!
//! At `>= 100` columns the input column (source, environment, preview) sits left
//! of the session column (progress, log, questions or verdict). Narrower
//! terminals stack the two columns vertically.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};
use shipcheck_core::controller::{Notice, NoticeKind};

use crate::app::{AppState, ChannelState, Focus, Mode, TextField};
use crate::theme::Theme;

/// The panel rectangles of one frame.
pub struct Areas {
    pub source: Rect,
    pub environment: Rect,
    pub preview: Rect,
    pub progress: Rect,
    pub log: Rect,
    /// Questions or verdict; zero-height while neither is shown.
    pub outcome: Rect,
    pub status_bar: Rect,
}

/// Computes the panel rectangles for the current frame.
///
/// `source_height` is the outer height of the repository source panel and
/// `show_outcome` reserves room for the questions or verdict panel.
pub fn compute_layout(frame: &Frame, source_height: u16, show_outcome: bool) -> Areas {
    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let columns = if main_area.width >= 100 {
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
    } else {
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)])
    };
    let [inputs, session] = main_area.layout(&columns.spacing(Spacing::Overlap(1)));

    let [source, environment, preview] = inputs.layout(
        &Layout::vertical([
            Constraint::Length(source_height),
            Constraint::Fill(3),
            Constraint::Fill(2),
        ])
        .spacing(Spacing::Overlap(1)),
    );

    let outcome_share = if show_outcome { 3 } else { 0 };
    let [progress, log, outcome] = session.layout(
        &Layout::vertical([
            Constraint::Length(6),
            Constraint::Fill(2),
            Constraint::Fill(outcome_share),
        ])
        .spacing(Spacing::Overlap(1)),
    );

    Areas { source, environment, preview, progress, log, outcome, status_bar }
}

/// The inner `Rect` of a panel after removing the 1-cell border on each side.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Builds a bordered `Block` for a panel.
///
/// Focused panels get a thick border in `border_active`. `MergeStrategy::Fuzzy`
/// is required because `Exact` draws broken junctions between thick and plain
/// borders.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// True while `focus` is the field being edited.
pub fn editing(state: &AppState, focus: Focus) -> bool {
    state.mode == Mode::Editing && state.focus == focus
}

/// Accent style for field labels, bold when the field has focus.
pub fn label_style(focused: bool, theme: &Theme) -> Style {
    let style = Style::default().fg(theme.accent);
    if focused { style.add_modifier(Modifier::BOLD) } else { style }
}

/// Renders a text field as display lines.
///
/// `cursor` draws a reversed cell at the cursor position. `mask` hides the
/// value behind bullets. An empty field without a cursor shows `placeholder`.
pub fn field_lines(
    field: &TextField,
    cursor: bool,
    mask: bool,
    placeholder: &str,
    theme: &Theme,
) -> Vec<Line<'static>> {
    if field.value().is_empty() && !cursor {
        return vec![Line::styled(placeholder.to_owned(), Style::default().fg(theme.muted))];
    }

    let (display, cursor_at) = if mask {
        let before = field.value()[..field.cursor()].chars().count();
        let total = field.value().chars().count();
        ("•".repeat(total), before * '•'.len_utf8())
    } else {
        (field.value().to_owned(), field.cursor())
    };
    let (before, after) = display.split_at(cursor_at);

    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    push_segments(&mut lines, &mut current, before);

    let rest = if cursor {
        let (shown, rest) = match after.chars().next() {
            Some(c) if c != '\n' => (c.to_string(), &after[c.len_utf8()..]),
            _ => (" ".to_owned(), after),
        };
        current.push(Span::styled(shown, Style::default().add_modifier(Modifier::REVERSED)));
        rest
    } else {
        after
    };
    push_segments(&mut lines, &mut current, rest);
    lines.push(Line::from(current));
    lines
}

fn push_segments(lines: &mut Vec<Line<'static>>, current: &mut Vec<Span<'static>>, text: &str) {
    for (i, part) in text.split('\n').enumerate() {
        if i > 0 {
            lines.push(Line::from(std::mem::take(current)));
        }
        if !part.is_empty() {
            current.push(Span::raw(part.to_owned()));
        }
    }
}

/// Renders the 1-row status bar: mode, channel, service readiness and the
/// current notice.
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    session_id: Option<&str>,
    notice: Option<&Notice>,
    theme: &Theme,
) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Editing => (" EDIT ", theme.status_mode_edit),
        Mode::Normal | Mode::HelpOverlay | Mode::HistoryOverlay => {
            (" NORMAL ", theme.status_mode_normal)
        }
    };

    let channel = match (&state.channel, session_id) {
        (ChannelState::Connected, Some(id)) => format!("● session {}", short_id(id)),
        (ChannelState::Connected, None) => "● joined, awaiting session".to_owned(),
        (ChannelState::Connecting, _) => "○ connecting".to_owned(),
        (ChannelState::Disconnected(reason), _) => format!("✗ disconnected ({reason})"),
    };

    let mut spans = vec![
        Span::styled(mode_text, Style::default().fg(mode_fg).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::raw(channel),
        Span::raw("  │  "),
        Span::raw(state.readiness.label()),
    ];
    if let Some(notice) = notice {
        let fg = match notice.kind {
            NoticeKind::Info => theme.notice_info,
            NoticeKind::Validation | NoticeKind::Credential | NoticeKind::Protocol => {
                theme.notice_error
            }
        };
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(
            notice.message.clone(),
            Style::default().fg(fg).add_modifier(Modifier::BOLD),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}

fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}
