use crate::event_sink::EventSink;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// Single-shot timer that reports through an [`EventSink`].
///
/// Every arming gets a fresh token and aborts the previous instance. The
/// owner passes the token of a firing back to [`Timer::fire`], which accepts
/// only the instance that is armed right now. A firing that raced with a
/// cancel or a re-arm is rejected, so at most one action per arming runs.
#[derive(Debug, Default)]
pub struct Timer {
    handle: Option<JoinHandle<()>>,
    token: u64,
    delay: Option<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm<E, F>(&mut self, delay: Duration, sink: &EventSink<E>, make: F)
    where
        E: Send + 'static,
        F: FnOnce(u64) -> E + Send + 'static,
    {
        self.cancel();
        self.token += 1;
        self.delay = Some(delay);

        let token = self.token;
        let sink = sink.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.emit(make(token));
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.delay = None;
    }

    /// Accepts a firing and disarms, or rejects a stale one.
    pub fn fire(&mut self, token: u64) -> bool {
        if self.handle.is_none() || token != self.token {
            return false;
        }
        self.handle = None;
        self.delay = None;
        true
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Delay of the armed instance.
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Periodic counterpart of [`Timer`]. The first tick comes one period after
/// `start`.
#[derive(Debug, Default)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
    token: u64,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<E, F>(&mut self, period: Duration, sink: &EventSink<E>, make: F)
    where
        E: Send + 'static,
        F: Fn(u64) -> E + Send + 'static,
    {
        self.stop();
        self.token += 1;

        let token = self.token;
        let sink = sink.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                if !sink.emit(make(token)) {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn accepts(&self, token: u64) -> bool {
        self.handle.is_some() && token == self.token
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
