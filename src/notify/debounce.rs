//! Leading-edge debouncing of bursty change events.

use std::time::Duration;
use tokio::time::Instant;

/// Default minimum spacing between forwarded notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Leading-edge debouncer.
///
/// The first event of a burst is forwarded immediately; every further event
/// arriving within `window` of the last forwarded one is dropped. Editors
/// commonly emit create, write and rename for a single save, which this turns
/// into one reload.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given window.
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Decide whether an event observed at `now` should be forwarded.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
