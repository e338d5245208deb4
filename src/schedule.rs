//! Time source and loop cadence.

/// Monotonic millisecond counter. Allowed to wrap.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// How long to idle between two loop iterations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Always pause the full interval after the work, so the period is
    /// interval plus work time.
    FixedPause(u32),
    /// Pause only for what is left of the interval since the cycle began.
    MinimumInterval(u32),
}

impl Pacing {
    /// Milliseconds to wait, given when the cycle started and the time now.
    pub fn pause_ms(&self, started_ms: u32, now_ms: u32) -> u32 {
        match *self {
            Pacing::FixedPause(interval) => interval,
            Pacing::MinimumInterval(interval) => {
                interval.saturating_sub(now_ms.wrapping_sub(started_ms))
            }
        }
    }
}
