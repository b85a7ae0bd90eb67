//! Rate and ETA statistics shown after the bar.

use std::time::Instant;

use crate::percentage::Percentage;

/// Timing baseline for rate/ETA computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateTracker {
    started_at: Instant,
}

impl RateTracker {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started_at: Instant) -> Self {
        Self { started_at }
    }

    /// Whole seconds elapsed at `now`; zero if `now` predates the start.
    pub fn elapsed_secs_at(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started_at).as_secs()
    }

    pub fn snapshot(&self, percentage: Percentage) -> Statistics {
        self.snapshot_at(Instant::now(), percentage)
    }

    pub fn snapshot_at(&self, now: Instant, percentage: Percentage) -> Statistics {
        Statistics::compute(self.elapsed_secs_at(now), percentage)
    }
}

/// Progress speed, picked so slow bars never show a sub-one rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    /// Nothing has elapsed yet.
    Unknown,
    /// Percentage points per second.
    PerSecond(f64),
    /// Seconds per percentage point, used once that figure exceeds 1.
    SecondsPerPercent(f64),
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "?"),
            Self::PerSecond(rate) => write!(f, "{rate:.2} pct/s"),
            Self::SecondsPerPercent(inverse) => write!(f, "{inverse:.2} s/pct"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub elapsed_secs: u64,
    pub remaining_secs: Option<u64>,
    pub rate: Rate,
}

impl Statistics {
    pub fn compute(elapsed_secs: u64, percentage: Percentage) -> Self {
        let pct = f64::from(percentage.get());
        let (rate, remaining_secs) = if elapsed_secs == 0 {
            (Rate::Unknown, None)
        } else {
            let elapsed = elapsed_secs as f64;
            let per_second = pct / elapsed;
            let rate = if pct > 0.0 && elapsed / pct > 1.0 {
                Rate::SecondsPerPercent(elapsed / pct)
            } else {
                Rate::PerSecond(per_second)
            };
            let remaining = (per_second > 0.0)
                .then(|| (f64::from(percentage.remaining()) / per_second) as u64);
            (rate, remaining)
        };
        Self {
            elapsed_secs,
            remaining_secs,
            rate,
        }
    }

    /// `[elapsed<remaining, rate]`
    pub fn suffix(&self) -> String {
        let remaining = self
            .remaining_secs
            .map(format_interval)
            .unwrap_or_else(|| "?".to_string());
        format!(
            "[{}<{}, {}]",
            format_interval(self.elapsed_secs),
            remaining,
            self.rate
        )
    }
}

/// `MM:SS`, or `H:MM:SS` once the hour component is non-zero.
pub fn format_interval(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
