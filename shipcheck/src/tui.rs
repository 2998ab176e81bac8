//! Terminal lifecycle for shipcheck.
//!
//! The TUI renders to stderr so stdout stays free for shell pipelines, and the
//! log goes to a file under the data directory so it never tears the screen.

use std::io::{stderr, BufWriter, Stderr};
use std::panic;
use std::sync::{atomic::AtomicBool, Arc};

use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use signal_hook::consts::SIGTERM;

pub type Tui = Terminal<CrosstermBackend<BufWriter<Stderr>>>;

/// Raw mode, alternate screen and window title. Pair with [`restore_tui`].
pub fn init_tui() -> std::io::Result<Tui> {
    let mut out = BufWriter::new(stderr());
    enable_raw_mode()?;
    execute!(out, EnterAlternateScreen, SetTitle("shipcheck"))?;
    Terminal::new(CrosstermBackend::new(out))
}

/// Leaves the alternate screen and shows the cursor again. Safe to call twice.
///
/// Runs after the event loop and from the panic hook; ratatui does not restore
/// the terminal on `Drop`.
pub fn restore_tui() -> std::io::Result<()> {
    disable_raw_mode()?;
    execute!(stderr(), LeaveAlternateScreen, Show)?;
    Ok(())
}

/// Chains a hook that restores the terminal and logs the panic ahead of the
/// previous hook. Install before [`init_tui`].
pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = restore_tui();
        tracing::error!(%info, "panic");
        previous(info);
    }));
}

/// Flag raised on SIGTERM, polled by the event loop heartbeat.
///
/// # Errors
///
/// Returns `Err` when the handler cannot be registered.
pub fn register_sigterm() -> std::io::Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&term))?;
    Ok(term)
}
