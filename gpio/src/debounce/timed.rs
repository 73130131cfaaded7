use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};
use log::trace;

/// Drops key detections that arrive too soon after the last accepted one.
///
/// Scanning resolves a key on every falling edge, bounces included, so the
/// caller runs the results through this filter with a monotonic timestamp.
pub struct TimedKeyFilter<K> {
    last_accepted: Option<(K, Instant)>,
    pub debounce_time: Duration,
}

impl<K: Copy + Debug> TimedKeyFilter<K> {
    pub const DEFAULT_DEBOUNCE_TIME: Duration = Duration::from_millis(200);

    pub fn new() -> Self {
        Self {
            last_accepted: None,
            debounce_time: Self::DEFAULT_DEBOUNCE_TIME,
        }
    }

    pub fn with_debounce_time(mut self, debounce_time: Duration) -> Self {
        self.debounce_time = debounce_time;
        self
    }

    /// Gets the last accepted key.
    pub fn last(&self) -> Option<K> {
        self.last_accepted.map(|(key, _)| key)
    }

    /// Returns `Some(key)` if the detection at `now` should be acted upon.
    pub fn accept(&mut self, key: K, now: Instant) -> Option<K> {
        if let Some((_, at)) = self.last_accepted {
            if now.saturating_duration_since(at) < self.debounce_time {
                trace!("Dropped {:?}, too close to the previous key.", key);
                return None;
            }
        }

        self.last_accepted = Some((key, now));
        Some(key)
    }
}

impl<K: Copy + Debug> Default for TimedKeyFilter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug> Debug for TimedKeyFilter<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimedKeyFilter({:?})", self.debounce_time)
    }
}
