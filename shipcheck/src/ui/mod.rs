//! UI rendering for shipcheck.
//!
//! `render()` is the single entry point, called from the event loop's
//! `terminal.draw()` closure. Rendering is a pure projection of `AppState` and
//! the session controller; nothing here mutates state.

mod environment;
pub mod help;
mod history;
pub mod keybindings;
mod layout;
mod outcome;
mod session;
mod source;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect, Spacing},
};
use shipcheck_core::controller::{AnalysisSessionController, Phase};
use shipcheck_core::timer::Ticker;
use shipcheck_core::transport::Transport;

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, render_status_bar};

/// Renders one complete frame.
pub fn render<T: Transport, K: Ticker>(
    frame: &mut Frame,
    state: &AppState,
    controller: &AnalysisSessionController<T, K>,
    theme: &Theme,
) {
    let session = controller.session();
    let round = controller.round();
    let outcome = controller.outcome();
    let waiting_final = session.phase == Phase::Final && outcome.is_none();
    let initial = session
        .initial_result
        .as_deref()
        .filter(|_| outcome.is_none() && matches!(session.phase, Phase::Questions | Phase::Final));
    let has_body = round.is_some() || outcome.is_some() || waiting_final;
    let show_outcome = has_body || initial.is_some();

    let areas = compute_layout(frame, source::panel_height(state), show_outcome);

    source::render_source(frame, areas.source, state, theme);
    environment::render_environment(frame, areas.environment, state, theme);
    environment::render_preview(frame, areas.preview, state, theme);
    session::render_progress(frame, areas.progress, session, state.previous.as_ref(), theme);
    session::render_log(frame, areas.log, session, theme);

    if areas.outcome.height >= 3 {
        let mut body = areas.outcome;
        if let Some(result) = initial {
            let summary = if has_body && body.height >= 8 {
                let [summary, rest] = body.layout(
                    &Layout::vertical([Constraint::Fill(2), Constraint::Fill(3)])
                        .spacing(Spacing::Overlap(1)),
                );
                body = rest;
                summary
            } else if has_body {
                Rect::default()
            } else {
                body
            };
            if summary.height > 0 {
                outcome::render_initial(frame, summary, result, theme);
            }
        }
        if let Some(round) = round {
            outcome::render_questions(frame, body, round, state, theme);
        } else if let Some(assessment) = outcome {
            outcome::render_verdict(frame, body, assessment, theme);
        } else if waiting_final {
            outcome::render_waiting(frame, body, theme);
        }
    }

    render_status_bar(
        frame,
        areas.status_bar,
        state,
        session.session_id.as_deref(),
        controller.notice(),
        theme,
    );

    // Overlays go last so they sit on top.
    match state.mode {
        Mode::HelpOverlay => help::render_help_overlay(frame, theme, state.help_scroll),
        Mode::HistoryOverlay => history::render_history_overlay(frame, state, theme),
        Mode::Normal | Mode::Editing => {}
    }
}
