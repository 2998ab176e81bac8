//! The elapsed-time ticker.
//!
//! A session runs at most one periodic timer. [`Ticker::start`] replaces any
//! running timer rather than adding a second one, and [`Ticker::stop`] is
//! idempotent, so the controller can call either from any state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Period of the elapsed-time tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub trait Ticker {
    /// Starts ticking, stopping a running timer first.
    fn start(&mut self);
    /// Stops the timer. No-op when nothing is running.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Tokio interval that sends `make()` on `tx` every period.
pub struct IntervalTicker<E> {
    period: Duration,
    tx: mpsc::UnboundedSender<E>,
    make: Arc<dyn Fn() -> E + Send + Sync>,
    handle: Option<JoinHandle<()>>,
}

impl<E: Send + 'static> IntervalTicker<E> {
    pub fn new<F>(period: Duration, tx: mpsc::UnboundedSender<E>, make: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        Self { period, tx, make: Arc::new(make), handle: None }
    }
}

impl<E: Send + 'static> Ticker for IntervalTicker<E> {
    fn start(&mut self) {
        self.stop();
        let tx = self.tx.clone();
        let make = Arc::clone(&self.make);
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if tx.send(make()).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<E> Drop for IntervalTicker<E> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
