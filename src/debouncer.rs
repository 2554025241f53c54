use std::time::{Duration, Instant};
use tracing::trace;

/// Default quiet period before free-text filter input is applied
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Coalesces rapid value changes into one delivery after a period of
/// inactivity. The last value within a window always wins; earlier values
/// are replaced, never delivered late.
///
/// With a zero delay (instant mode) every change is delivered immediately.
#[derive(Debug, Clone)]
pub struct Debouncer<V> {
    /// The duration to wait after the last change before delivering
    delay: Duration,
    /// When the last change occurred
    last_event: Option<Instant>,
    pending: Option<V>,
}

impl<V> Debouncer<V> {
    /// Create a new debouncer with the specified delay in milliseconds
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            last_event: None,
            pending: None,
        }
    }

    pub fn instant() -> Self {
        Self::new(0)
    }

    /// Delay for a search input: zero in instant mode, `delay_ms` otherwise
    pub fn for_search(instant_search: bool, delay_ms: u64) -> Self {
        if instant_search {
            Self::instant()
        } else {
            Self::new(delay_ms)
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_instant(&self) -> bool {
        self.delay.is_zero()
    }

    /// Register a new value. In instant mode the value comes straight back;
    /// otherwise it replaces any pending value and restarts the window.
    pub fn on_value_change(&mut self, value: V) -> Option<V> {
        self.on_value_change_at(value, Instant::now())
    }

    pub fn on_value_change_at(&mut self, value: V, now: Instant) -> Option<V> {
        if self.is_instant() {
            self.clear();
            return Some(value);
        }
        if self.pending.is_some() {
            trace!(target: "filter", "Debounce window restarted");
        }
        self.last_event = Some(now);
        self.pending = Some(value);
        None
    }

    /// The pending value, once the quiet period has passed
    pub fn poll(&mut self) -> Option<V> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Option<V> {
        let last = self.last_event?;
        if now.saturating_duration_since(last) >= self.delay {
            self.last_event = None;
            return self.pending.take();
        }
        None
    }

    /// Deliver the pending value now, skipping the rest of the window
    pub fn flush(&mut self) -> Option<V> {
        self.last_event = None;
        self.pending.take()
    }

    /// Get the time remaining before the pending value is delivered.
    /// Returns None if nothing is pending.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.time_remaining_at(Instant::now())
    }

    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.pending.as_ref()?;
        self.last_event
            .map(|last| self.delay.saturating_sub(now.saturating_duration_since(last)))
    }

    /// Drop any pending value without delivering it
    pub fn clear(&mut self) {
        self.last_event = None;
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&V> {
        self.pending.as_ref()
    }
}

impl<V> Default for Debouncer<V> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}
