//! Timers for Warden: fixed-period tick loops and delayed follow-ups.
//!
//! Warden has two kinds of timed work:
//!
//! - **Periodic loops** independent of any connection: re-pinning frozen
//!   players (every 100 ms by default) and decaying attempt counters
//!   (every minute). Each is driven by a [`TickScheduler`].
//! - **One-shot follow-ups** tied to one identity: the grace-timeout
//!   kick, the deferred freeze of unregistered players, and clearing the
//!   dead flag after respawn. Each is started with [`schedule`].
//!
//! # Integration
//!
//! A scheduler sits inside a `tokio::select!` loop next to a shutdown
//! signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         _ = scheduler.wait_for_tick() => {
//!             warden.enforce_positions();
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod delay;

pub use delay::schedule;

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for one periodic loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. `Duration::ZERO` disables the loop: the
    /// scheduler never fires.
    pub period: Duration,
    /// Fraction (0.0 to 1.0) of the period after which a slow tick is
    /// logged at warn level.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::ZERO,
            budget_warn_threshold: 0.80,
        }
    }
}

impl TickConfig {
    /// Shortest period accepted; anything lower is clamped up.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    /// A config for the given period with defaults elsewhere.
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. Rules:
    /// - a non-zero `period` below [`Self::MIN_PERIOD`] is raised to it
    /// - `budget_warn_threshold` is clamped to `0.0..=1.0`
    pub fn validated(mut self) -> Self {
        if !self.period.is_zero() && self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_millis() as u64,
                min_ms = Self::MIN_PERIOD.as_millis() as u64,
                "tick period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// The period, or `None` when the loop is disabled.
    pub fn tick_duration(&self) -> Option<Duration> {
        (!self.period.is_zero()).then_some(self.period)
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired more than 10% of a period late.
    pub overrun: bool,
    /// How many whole periods were skipped because of lateness. A late
    /// loop resumes one period from now instead of catching up: running
    /// an idempotent body back to back achieves nothing the last run
    /// doesn't.
    pub ticks_skipped: u64,
}

/// Counters kept across the loop's lifetime.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Longest body execution reported via `record_tick_end`.
    pub max_tick_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler. One per background loop.
pub struct TickScheduler {
    config: TickConfig,
    period: Option<Duration>,
    tick_count: u64,
    /// When the next tick should fire (Tokio instant for `sleep_until`).
    next_tick: Option<TokioInstant>,
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.tick_duration();

        let next_tick = period.map(|d| TokioInstant::now() + d);

        match period {
            None => debug!("tick scheduler created disabled (zero period)"),
            Some(d) => debug!(period_ms = d.as_millis() as u64, "tick scheduler created"),
        }

        Self {
            config,
            period,
            tick_count: 0,
            next_tick,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Wait until the next tick is due.
    ///
    /// When disabled this future pends forever, which is harmless inside
    /// `tokio::select!`.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, period) = match (self.next_tick, self.period) {
            (Some(next), Some(period)) => (next, period),
            _ => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0u64;

        if overrun {
            ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "tick overrun, skipping ahead"
                );
            }
        }
        self.next_tick = Some(now + period);

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Record that the body of the current tick has finished.
    ///
    /// Emits a warning when the body used more than the configured share
    /// of the period.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        if elapsed > self.metrics.max_tick_time {
            self.metrics.max_tick_time = elapsed;
        }

        if let Some(period) = self.period {
            let utilization = elapsed.as_secs_f64() / period.as_secs_f64();
            if utilization >= self.config.budget_warn_threshold {
                warn!(
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    period_ms = period.as_secs_f64() * 1000.0,
                    "tick body approaching its period"
                );
            }
        }
    }

    /// `true` when the period is zero and the loop never fires.
    pub fn is_disabled(&self) -> bool {
        self.period.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
