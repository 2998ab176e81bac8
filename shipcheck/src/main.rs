//! shipcheck: deployment-readiness assessment of a GitHub repository from the
//! terminal.
//!
//! Entry point for the `shipcheck` binary. Wires together the terminal lifecycle
//! (`tui`), the unified event bus (`event`), the UI (`ui`), the theme system
//! (`theme`), user configuration (`config`) and the core session controller,
//! channel client and history database from `shipcheck-core`.
//!
//! # Startup sequence
//!
//! 1. Parse flags and load the config file. Both are read-only, safe before
//!    terminal init.
//! 2. Install the file logger. stderr belongs to the TUI from here on.
//! 3. `install_panic_hook()` first so it is the innermost hook.
//! 4. `register_sigterm()`, polled by the 50 ms heartbeat in the event loop.
//! 5. `init_tui()`.
//! 6. Spawn the input task, the channel client, the health check and open the
//!    history database before the first frame.
//!
//! `restore_tui()` runs after the event loop exits (q, SIGTERM or channel
//! close). Inside the loop `?` is only used in the Render arm; draw errors leave
//! the loop and still reach `restore_tui()`.

mod app;
mod config;
mod event;
mod theme;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use shipcheck_core::controller::{AnalysisSessionController, NoticeKind};
use shipcheck_core::db;
use shipcheck_core::github::GitHubClient;
use shipcheck_core::service::{self, Readiness};
use shipcheck_core::timer::{IntervalTicker, TICK_PERIOD};
use shipcheck_core::transport::SocketIoClient;
use tokio::sync::mpsc;
use tokio_rusqlite::Connection;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::event::AppEvent;
use crate::ui::keybindings::{self, KeyAction};

type Controller = AnalysisSessionController<SocketIoClient, IntervalTicker<AppEvent>>;

/// Number of assessments shown in the history overlay.
const HISTORY_LIMIT: usize = 50;

#[derive(Parser, Debug)]
#[command(
    name = "shipcheck",
    version,
    about = "Assess whether a GitHub repository is ready to deploy"
)]
struct Cli {
    /// Analysis service base URL (overrides `server` in config.toml).
    #[arg(long)]
    server: Option<String>,

    /// Prefill the public repository URL instead of detecting the git origin.
    #[arg(long)]
    repo: Option<String>,

    /// Theme name: catppuccin-mocha or dark.
    #[arg(long)]
    theme: Option<String>,

    /// Do not record or show assessment history.
    #[arg(long)]
    no_history: bool,
}

/// Installs the file logger under the data directory.
///
/// `SHIPCHECK_LOG` wins over `RUST_LOG`, which wins over `log_filter` from the
/// config file.
fn init_logging(log_filter: &str) -> anyhow::Result<PathBuf> {
    let dir = config::data_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("shipcheck.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_env("SHIPCHECK_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_filter))
        .context("invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()
        .context("installing the logger")?;
    Ok(path)
}

/// Opens the history database, or `None` when history is off or unavailable.
async fn open_history(enabled: bool) -> Option<Connection> {
    if !enabled {
        return None;
    }
    let path = config::data_dir().join("history.db");
    match db::open_db(&path.to_string_lossy()).await {
        Ok(conn) => Some(conn),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "history disabled: cannot open database");
            None
        }
    }
}

/// Stores every session the controller finished since the last call.
fn record_finished(controller: &mut Controller, history: Option<&Connection>) {
    for finished in controller.take_finished() {
        let Some(conn) = history.cloned() else { continue };
        tokio::spawn(async move {
            if let Err(err) = db::record_assessment(&conn, finished).await {
                tracing::warn!(%err, "failed to record assessment");
            }
        });
    }
}

/// Starts an analysis from the form and looks up the repository's previous
/// assessment.
fn start_analysis(
    state: &mut AppState,
    controller: &mut Controller,
    history: Option<&Connection>,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let request = match state.start_request() {
        Ok(request) => request,
        Err(err) => {
            controller.notify(NoticeKind::Validation, err.to_string());
            return;
        }
    };
    if let Err(err) = controller.start(request) {
        tracing::debug!(%err, "start rejected");
        return;
    }
    state.previous = None;

    let (Some(conn), Some(repository_url)) =
        (history.cloned(), controller.session().repository_url.clone())
    else {
        return;
    };
    let tx = tx.clone();
    tokio::spawn(async move {
        match db::latest_for_repository(&conn, &repository_url).await {
            Ok(record) => {
                let _ = tx.send(AppEvent::Previous { repository_url, record });
            }
            Err(err) => tracing::warn!(%err, "failed to look up the previous assessment"),
        }
    });
}

fn spawn_connect(
    github: &GitHubClient,
    state: &mut AppState,
    controller: &mut Controller,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let attempt = match state.browser.begin_connect(state.token.value()) {
        Ok(attempt) => attempt,
        Err(err) => {
            controller.notify(NoticeKind::Credential, err.to_string());
            return;
        }
    };
    state.search.clear();
    let github = github.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = github.connect(&attempt.token).await;
        let _ = tx.send(AppEvent::GitHub { attempt, result });
    });
}

fn spawn_history_load(
    history: Option<&Connection>,
    controller: &mut Controller,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let Some(conn) = history.cloned() else {
        controller.notify(NoticeKind::Info, "History is disabled");
        return;
    };
    let tx = tx.clone();
    tokio::spawn(async move {
        match db::recent_assessments(&conn, HISTORY_LIMIT).await {
            Ok(records) => {
                let _ = tx.send(AppEvent::History(records));
            }
            Err(err) => tracing::warn!(%err, "failed to load history"),
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_warning) = config::load();

    let log_path = init_logging(&config.log_filter)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log = %log_path.display(),
        "shipcheck starting"
    );
    if let Some(warning) = config_warning {
        tracing::warn!("{warning}");
    }

    let server = cli.server.unwrap_or(config.server);
    let theme = theme::Theme::from_name(cli.theme.as_deref().unwrap_or(&config.theme));
    let history_enabled = config.history && !cli.no_history;
    let github = GitHubClient::new(&config.github_api).context("building the GitHub client")?;

    let prefill = cli.repo.or_else(|| {
        let cwd = std::env::current_dir().ok()?;
        shipcheck_core::git::detect_origin(&cwd)
    });
    let mut state = AppState::new(prefill);

    let handler = event::EventHandler::new();
    let tx = handler.tx.clone();
    let mut rx = handler.rx;

    let transport = SocketIoClient::spawn(&server, tx.clone(), AppEvent::Channel)
        .with_context(|| format!("invalid analysis server address {server}"))?;
    let ticker = IntervalTicker::new(TICK_PERIOD, tx.clone(), || AppEvent::ElapsedTick);
    let mut controller: Controller = AnalysisSessionController::new(transport, ticker);
    tracing::info!(%server, history = history_enabled, "analysis channel spawned");

    {
        let tx = tx.clone();
        let server = server.clone();
        tokio::spawn(async move {
            let result = service::fetch_status(&server).await;
            let _ = tx.send(AppEvent::Status(result));
        });
    }

    let history = open_history(history_enabled).await;

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm().context("registering the SIGTERM handler")?;
    let mut terminal = tui::init_tui()?;
    event::spawn_event_task(tx.clone());

    // Event loop: exits only via `break`, so `restore_tui()` is always reached.
    let outcome: anyhow::Result<()> = 'event_loop: loop {
        tokio::select! {
            // Heartbeat: SIGTERM is checked at least every 50 ms even when the
            // terminal is quiet.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    tracing::info!("SIGTERM received");
                    break 'event_loop Ok(());
                }
            }
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else { break 'event_loop Ok(()) };
                match event {
                    AppEvent::Render => {
                        let drawn = terminal
                            .draw(|frame| ui::render(frame, &state, &controller, &theme));
                        if let Err(err) = drawn {
                            break 'event_loop Err(err.into());
                        }
                    }
                    AppEvent::Key(key) => match keybindings::handle_key(key, &mut state) {
                        KeyAction::Continue => {}
                        KeyAction::Quit => break 'event_loop Ok(()),
                        KeyAction::Start => {
                            start_analysis(&mut state, &mut controller, history.as_ref(), &tx);
                        }
                        KeyAction::Submit => {
                            if let Err(err) = controller.submit_answers(|i| state.answer(i)) {
                                tracing::debug!(%err, "submit rejected");
                            }
                        }
                        KeyAction::Reset => controller.reset(),
                        KeyAction::Connect => {
                            spawn_connect(&github, &mut state, &mut controller, &tx);
                        }
                        KeyAction::ShowHistory => {
                            spawn_history_load(history.as_ref(), &mut controller, &tx);
                        }
                    },
                    AppEvent::Resize(width, height) => {
                        tracing::trace!(width, height, "terminal resized");
                    }
                    AppEvent::Tick => {
                        controller.expire_notice(Instant::now());
                    }
                    // The timer is drawn from the session clock on the next Render.
                    AppEvent::ElapsedTick => {}
                    AppEvent::Channel(channel_event) => {
                        state.channel.observe(&channel_event);
                        controller.on_channel_event(channel_event);
                    }
                    AppEvent::GitHub { attempt, result } => {
                        match state.browser.finish_connect(&attempt, result) {
                            Ok(()) => {
                                if let Some(user) = state.browser.user() {
                                    let message =
                                        format!("Connected to GitHub as {}", user.display_name());
                                    controller.notify(NoticeKind::Info, message);
                                }
                            }
                            Err(err) => controller.notify(
                                NoticeKind::Credential,
                                format!("GitHub connection failed: {err}"),
                            ),
                        }
                    }
                    AppEvent::Status(result) => {
                        if let Err(err) = &result {
                            tracing::warn!(%err, "service status check failed");
                        }
                        state.readiness = Readiness::from_result(&result);
                    }
                    AppEvent::History(records) => state.show_history(records),
                    AppEvent::Previous { repository_url, record } => {
                        let current = controller.session().repository_url.as_deref();
                        if current == Some(repository_url.as_str()) {
                            state.previous = record;
                        }
                    }
                }
                state.sync_round(controller.round());
                record_finished(&mut controller, history.as_ref());
            }
        }
        if term_flag.load(Ordering::Relaxed) {
            break 'event_loop Ok(());
        }
    };

    tui::restore_tui()?;
    tracing::info!("shipcheck exiting");
    outcome
}
