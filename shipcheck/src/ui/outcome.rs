//! Questions and verdict panels, plus the initial analysis that precedes
//! them. Assessment text is light markdown and rendered line by line.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use shipcheck_core::controller::QuestionRound;
use shipcheck_core::verdict::{Assessment, Verdict};

use crate::app::{AppState, Focus, Mode};
use crate::theme::Theme;
use crate::ui::layout::{field_lines, inner_rect, panel_block};

/// Numbered questions, each followed by its answer field.
pub fn render_questions(
    frame: &mut Frame,
    area: Rect,
    round: &QuestionRound,
    state: &AppState,
    theme: &Theme,
) {
    let focused = matches!(state.focus, Focus::Answer(_));
    let block = panel_block("Missing information · a submits", focused, theme);

    let mut lines: Vec<Line> = Vec::new();
    let mut focus_line = 0;
    for item in &round.items {
        let focus = Focus::Answer(item.index);
        let is_focused = state.focus == focus;
        let number_style = if is_focused {
            Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.accent)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}. ", item.index + 1), number_style),
            Span::styled(item.text.clone(), Style::default().fg(theme.text)),
        ]));
        if is_focused {
            focus_line = lines.len();
        }
        let editing = state.mode == Mode::Editing && is_focused;
        let answer = state.answers.get(item.index).cloned().unwrap_or_default();
        for line in field_lines(&answer, editing, false, "(your answer)", theme) {
            let mut spans = vec![Span::styled("   › ", Style::default().fg(theme.muted))];
            spans.extend(line.spans);
            lines.push(Line::from(spans));
        }
        lines.push(Line::raw(""));
    }

    let height = usize::from(inner_rect(area).height.max(1));
    let scroll = focus_line.saturating_sub(height.saturating_sub(3));
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0)),
        area,
    );
}

/// Large verdict banner over the full final assessment text.
pub fn render_verdict(frame: &mut Frame, area: Rect, outcome: &Assessment, theme: &Theme) {
    let (caption, color) = match outcome.verdict {
        Verdict::Yes => ("Deployable", theme.verdict_yes),
        Verdict::No => ("Not deployable", theme.verdict_no),
        Verdict::Unknown => ("Verdict unknown", theme.verdict_unknown),
    };
    let block = panel_block("Verdict", false, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let [banner, text] =
        inner.layout(&Layout::vertical([Constraint::Length(3), Constraint::Fill(1)]));

    let badge = Style::default()
        .fg(theme.status_bar_bg)
        .bg(color)
        .add_modifier(Modifier::BOLD);
    let banner_lines = vec![
        Line::styled("       ", badge),
        Line::from(vec![
            Span::styled(format!("  {:^3}  ", outcome.verdict.to_string()), badge),
            Span::raw("  "),
            Span::styled(caption, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ]),
        Line::styled("       ", badge),
    ];
    frame.render_widget(Paragraph::new(banner_lines).alignment(Alignment::Left), banner);

    frame.render_widget(
        Paragraph::new(markdown_lines(&outcome.final_assessment, theme)).wrap(Wrap { trim: false }),
        text,
    );
}

/// Result of the initial phase, shown while questions or the final phase are
/// pending.
pub fn render_initial(frame: &mut Frame, area: Rect, result: &str, theme: &Theme) {
    frame.render_widget(
        Paragraph::new(markdown_lines(result, theme))
            .block(panel_block("Initial analysis", false, theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

/// Styles headings, `-`/`*` list items and `**bold**` runs. Everything else
/// is plain text.
pub fn markdown_lines(text: &str, theme: &Theme) -> Vec<Line<'static>> {
    let body = Style::default().fg(theme.text);
    let heading = Style::default().fg(theme.accent).add_modifier(Modifier::BOLD);
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let hashes = trimmed.chars().take_while(|&c| c == '#').count();
            if (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
                return Line::from(inline_spans(trimmed[hashes..].trim(), heading));
            }
            if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
                let indent = " ".repeat(line.len() - trimmed.len());
                let mut spans =
                    vec![Span::styled(format!("{indent}• "), Style::default().fg(theme.accent))];
                spans.extend(inline_spans(item, body));
                return Line::from(spans);
            }
            Line::from(inline_spans(line, body))
        })
        .collect()
}

/// Splits on `**`, toggling bold. An unclosed marker bolds to the end of line.
fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    text.split("**")
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            let style = if i % 2 == 1 { base.add_modifier(Modifier::BOLD) } else { base };
            Span::styled(part.to_owned(), style)
        })
        .collect()
}

/// Shown while the final phase is running.
pub fn render_waiting(frame: &mut Frame, area: Rect, theme: &Theme) {
    frame.render_widget(
        Paragraph::new(Line::styled(
            "Waiting for the final assessment…",
            Style::default().fg(theme.muted),
        ))
        .block(panel_block("Verdict", false, theme)),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn markdown_headings_lists_and_bold() {
        let theme = Theme::dark();
        let lines = markdown_lines(
            "## Summary\n- uses **Postgres**\n  * nested\n**ANSWER: YES**\n#hashtag",
            &theme,
        );
        let texts: Vec<String> = lines.iter().map(text_of).collect();
        assert_eq!(
            texts,
            ["Summary", "• uses Postgres", "  • nested", "ANSWER: YES", "#hashtag"]
        );

        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        let postgres = &lines[1].spans[2];
        assert_eq!(postgres.content, "Postgres");
        assert!(postgres.style.add_modifier.contains(Modifier::BOLD));
        assert!(!lines[1].spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(!lines[4].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }
}
