use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Admits at most one update per window.
///
/// Some clipboard writers announce a single logical update several times in a
/// row; only the first announcement inside `window` is admitted.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_admitted: Mutex<Option<Instant>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last_admitted: Mutex::new(None) }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn admit(&self) -> bool {
        self.admit_at(Instant::now())
    }

    pub(crate) fn admit_at(&self, now: Instant) -> bool {
        let mut last = match self.last_admitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match *last {
            Some(previous) if now.saturating_duration_since(previous) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
