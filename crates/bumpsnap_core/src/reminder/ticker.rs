//! Recurring tick sources for the reminder poll.
//!
//! # Invariants
//! - `TickHandle::cancel` is synchronous and idempotent.
//! - Dropping a handle cancels it; no timer outlives its owner.

use log::{debug, error};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Starts recurring timers.
pub trait TickSource {
    fn start(&self, interval: Duration) -> Box<dyn TickHandle>;
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn start(&self, interval: Duration) -> Box<dyn TickHandle> {
        (**self).start(interval)
    }
}

/// Owning handle of one recurring timer.
pub trait TickHandle {
    /// Drains ticks that elapsed since the last call without blocking.
    fn take_ticks(&mut self) -> usize;

    /// Blocks up to `timeout` for at least one tick, then drains.
    fn wait_ticks(&mut self, timeout: Duration) -> usize;

    fn cancel(&mut self);

    fn is_active(&self) -> bool;
}

/// Timer thread per handle; ticks are delivered over a channel so the state
/// itself stays on the owner's thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadTickSource;

impl TickSource for ThreadTickSource {
    fn start(&self, interval: Duration) -> Box<dyn TickHandle> {
        Box::new(ThreadTicker::spawn(interval))
    }
}

pub struct ThreadTicker {
    stop: Option<Sender<()>>,
    ticks: Receiver<()>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTicker {
    pub fn spawn(interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (tick_tx, tick_rx) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name("bumpsnap-reminder".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if tick_tx.send(()).is_err() {
                            break;
                        }
                    }
                    // Explicit stop or the owner went away.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        let worker = match spawned {
            Ok(worker) => {
                debug!(
                    "event=ticker_start module=reminder status=ok interval_ms={}",
                    interval.as_millis()
                );
                Some(worker)
            }
            Err(err) => {
                error!("event=ticker_start module=reminder status=error error={err}");
                None
            }
        };

        Self {
            stop: worker.as_ref().map(|_| stop_tx),
            ticks: tick_rx,
            worker,
        }
    }
}

impl TickHandle for ThreadTicker {
    fn take_ticks(&mut self) -> usize {
        if !self.is_active() {
            return 0;
        }
        self.ticks.try_iter().count()
    }

    fn wait_ticks(&mut self, timeout: Duration) -> usize {
        if !self.is_active() {
            return 0;
        }
        match self.ticks.recv_timeout(timeout) {
            Ok(()) => 1 + self.ticks.try_iter().count(),
            Err(_) => 0,
        }
    }

    fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=ticker_stop module=reminder status=error reason=worker_panicked");
            } else {
                debug!("event=ticker_stop module=reminder status=ok");
            }
        }
    }

    fn is_active(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Default)]
struct ManualTicks {
    pending: usize,
    started: usize,
    active: usize,
    last_interval: Option<Duration>,
}

/// Deterministic tick source: ticks arrive only when `fire` is called.
#[derive(Debug, Clone, Default)]
pub struct ManualTickSource {
    shared: Rc<RefCell<ManualTicks>>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `ticks` elapsed intervals for the active handle.
    pub fn fire(&self, ticks: usize) {
        let mut shared = self.shared.borrow_mut();
        if shared.active > 0 {
            shared.pending += ticks;
        }
    }

    /// Number of timers ever started.
    pub fn started(&self) -> usize {
        self.shared.borrow().started
    }

    /// Number of timers started and not yet cancelled.
    pub fn active(&self) -> usize {
        self.shared.borrow().active
    }

    pub fn last_interval(&self) -> Option<Duration> {
        self.shared.borrow().last_interval
    }
}

impl TickSource for ManualTickSource {
    fn start(&self, interval: Duration) -> Box<dyn TickHandle> {
        {
            let mut shared = self.shared.borrow_mut();
            shared.started += 1;
            shared.active += 1;
            shared.pending = 0;
            shared.last_interval = Some(interval);
        }
        Box::new(ManualTickHandle {
            shared: Rc::clone(&self.shared),
            active: true,
        })
    }
}

struct ManualTickHandle {
    shared: Rc<RefCell<ManualTicks>>,
    active: bool,
}

impl TickHandle for ManualTickHandle {
    fn take_ticks(&mut self) -> usize {
        if !self.active {
            return 0;
        }
        std::mem::take(&mut self.shared.borrow_mut().pending)
    }

    fn wait_ticks(&mut self, _timeout: Duration) -> usize {
        self.take_ticks()
    }

    fn cancel(&mut self) {
        if self.active {
            self.active = false;
            let mut shared = self.shared.borrow_mut();
            shared.active = shared.active.saturating_sub(1);
            shared.pending = 0;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for ManualTickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
