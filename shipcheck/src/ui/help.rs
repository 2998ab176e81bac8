//! Help overlay renderer for shipcheck.
//!
//! Draws a centred modal over the panels. `Clear` erases the background first,
//! inside the same `terminal.draw()` closure as everything else.

use ratatui::{
    Frame,
    layout::Constraint,
    style::Style,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Renders the help overlay, scrolled by `help_scroll` rows.
///
/// Skipped on terminals narrower than 60 columns to avoid a zero-height area.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(70), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help · j/k scroll, ? or Esc to dismiss ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Navigation"),
        Line::from("  Tab / Shift-Tab   Next / previous input"),
        Line::from("  j / k             Next / previous input, or move in the repository list"),
        Line::from("  i / Enter         Edit the focused input"),
        Line::from("  Esc               Stop editing"),
        Line::from("  Enter             Stop editing a single-line input"),
        Line::from("  Ctrl-u            Clear the input being edited"),
        Line::from(""),
        Line::from("Repository"),
        Line::from("  p                 Toggle public URL / private GitHub repository"),
        Line::from("  c                 Connect to GitHub with the token"),
        Line::from("  Enter             Select the repository under the cursor"),
        Line::from("  D                 Disconnect from GitHub"),
        Line::from(""),
        Line::from("Environment"),
        Line::from("  n                 Add a custom variable row"),
        Line::from("  x                 Remove the focused custom row"),
        Line::from("  X                 Clear every environment input"),
        Line::from("  A pasted .env block overrides the fields, bulk list and custom rows."),
        Line::from(""),
        Line::from("Analysis"),
        Line::from("  s                 Start the analysis"),
        Line::from("  a                 Submit answers to the follow-up questions"),
        Line::from("  r                 Reset to idle"),
        Line::from(""),
        Line::from("General"),
        Line::from("  h                 Recent assessments"),
        Line::from("  ?                 Open / close this help"),
        Line::from("  q / Ctrl-c        Quit"),
    ])
}
