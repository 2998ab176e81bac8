//! Event bus for shipcheck.
//!
//! All user input, timer ticks, channel traffic and background-task results are
//! normalised into a single `AppEvent` enum and sent over a tokio unbounded MPSC
//! channel. The main loop receives from this channel and is the only place that
//! touches the session controller, so no state is shared across tasks.
//!
//! Two independent intervals drive the render and logic cycles:
//! - **Render interval** (33 ms ≈ 30 FPS) triggers a `terminal.draw()` call.
//! - **Tick interval** (250 ms = 4 Hz) expires notices.
//!
//! The one-second elapsed-time tick is separate: it only runs while a session is
//! in flight and is owned by the controller's ticker.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::{FutureExt, StreamExt};
use shipcheck_core::error::{GitHubError, StatusError};
use shipcheck_core::github::{GitHubUser, Repository};
use shipcheck_core::repos::ConnectAttempt;
use shipcheck_core::service::ServiceStatus;
use shipcheck_core::transport::ChannelEvent;
use shipcheck_core::types::AssessmentRecord;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Everything the main loop reacts to.
#[derive(Debug)]
pub enum AppEvent {
    /// A key press from the terminal (`KeyEventKind::Press` only).
    Key(KeyEvent),
    /// Terminal was resized to (columns, rows).
    Resize(u16, u16),
    /// Logic tick (4 Hz / 250 ms).
    Tick,
    /// Render tick (≈30 FPS / 33 ms).
    Render,
    /// One second of session time passed.
    ElapsedTick,
    /// Connection lifecycle or inbound traffic of the analysis channel.
    Channel(ChannelEvent),
    /// Result of a GitHub connect started by the repository browser.
    GitHub {
        attempt: ConnectAttempt,
        result: Result<(GitHubUser, Vec<Repository>), GitHubError>,
    },
    /// Result of the startup service health check.
    Status(Result<ServiceStatus, StatusError>),
    /// Recent assessments loaded for the history overlay.
    History(Vec<AssessmentRecord>),
    /// The last recorded assessment of a repository that was just started.
    Previous {
        repository_url: String,
        record: Option<AssessmentRecord>,
    },
}

/// Both ends of the event bus. Background tasks get clones of `tx`; the main
/// loop owns `rx`.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the background tokio task that feeds terminal input and the two UI
/// intervals into the event channel.
///
/// - `reader.next().fuse()` keeps `tokio::select!` from polling a finished
///   crossterm stream.
/// - Only `KeyEventKind::Press` is forwarded; Windows also reports releases.
/// - The task exits once the receiver is gone.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            let sent = tokio::select! {
                _ = tick_tick => tx.send(AppEvent::Tick),
                _ = render_tick => tx.send(AppEvent::Render),
                maybe_event = crossterm_event => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        tx.send(AppEvent::Key(key))
                    }
                    Some(Ok(Event::Resize(w, h))) => tx.send(AppEvent::Resize(w, h)),
                    _ => Ok(()),
                },
            };
            if sent.is_err() {
                break;
            }
        }
    });
}
