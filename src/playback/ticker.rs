use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifies one continuous per-refresh callback registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickToken(pub u64);

/// Host display-refresh source (a `requestAnimationFrame` loop, a vsync timer, ...).
///
/// After `schedule` the host calls [`crate::ScrubPlayer::on_tick`] once per refresh until the token
/// is cancelled.
pub trait TickScheduler {
    /// Register a continuous per-refresh callback.
    fn schedule(&self) -> TickToken;
    /// Stop the callback registered under `token`.
    fn cancel(&self, token: TickToken);
}

/// A running tick registration, cancelled on [`TickLoop::cancel`] or drop.
pub struct TickLoop {
    scheduler: Rc<dyn TickScheduler>,
    token: Option<TickToken>,
}

impl TickLoop {
    /// Register with `scheduler` and hold the registration.
    pub fn start(scheduler: Rc<dyn TickScheduler>) -> Self {
        let token = scheduler.schedule();
        tracing::debug!(token = token.0, "tick loop started");
        Self {
            scheduler,
            token: Some(token),
        }
    }

    /// Whether the registration is still live.
    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Cancel the registration; idempotent.
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            self.scheduler.cancel(token);
            tracing::debug!(token = token.0, "tick loop cancelled");
        }
    }
}

impl Drop for TickLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TickLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickLoop")
            .field("token", &self.token)
            .finish()
    }
}

/// Scheduler that only records registrations; the owner drives ticks by hand.
#[derive(Debug, Default)]
pub struct ManualTicker {
    next: Cell<u64>,
    active: RefCell<Vec<TickToken>>,
}

impl ManualTicker {
    /// Create a ticker with no registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live registrations.
    pub fn active_count(&self) -> usize {
        self.active.borrow().len()
    }

    /// Whether `token` is live.
    pub fn is_active(&self, token: TickToken) -> bool {
        self.active.borrow().contains(&token)
    }
}

impl TickScheduler for ManualTicker {
    fn schedule(&self) -> TickToken {
        let token = TickToken(self.next.get());
        self.next.set(token.0 + 1);
        self.active.borrow_mut().push(token);
        token
    }

    fn cancel(&self, token: TickToken) {
        self.active.borrow_mut().retain(|&t| t != token);
    }
}
