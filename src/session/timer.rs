//! Per-question countdown timer.
//!
//! The timer is a spawned task that emits [`SessionEvent::TimerTick`] once per
//! tick interval. Arming replaces any previous task; disarming aborts it so no
//! delayed tick fires after the session has moved on. The state machine
//! additionally ignores ticks while disarmed, so even a tick already sitting in
//! the channel cannot decrement the countdown.

use crate::session::state::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Countdown tick source bound to the recording state.
pub struct SessionTimer {
    events: UnboundedSender<SessionEvent>,
    tick_interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl SessionTimer {
    /// Creates a timer emitting one tick per second.
    pub fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self::with_tick_interval(events, Duration::from_secs(1))
    }

    /// Creates a timer with a custom tick interval. Tests use short intervals
    /// so countdown scenarios run in milliseconds.
    pub fn with_tick_interval(events: UnboundedSender<SessionEvent>, tick_interval: Duration) -> Self {
        Self {
            events,
            tick_interval,
            task: None,
        }
    }

    /// Arms the countdown. Any previously armed task is cancelled first, so at
    /// most one tick source exists at a time.
    pub fn arm(&mut self) {
        self.disarm();
        let events = self.events.clone();
        let tick = self.tick_interval;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
            loop {
                interval.tick().await;
                if events.send(SessionEvent::TimerTick).is_err() {
                    // Session channel closed: nothing left to tick for.
                    break;
                }
            }
        }));
        tracing::debug!("Countdown armed ({}ms tick)", self.tick_interval.as_millis());
    }

    /// Cancels the pending tick task, if any.
    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Countdown disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
