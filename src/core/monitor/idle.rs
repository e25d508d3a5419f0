use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::warn;

use crate::error::Result;

/// A platform source for "seconds since last user input".
///
/// Probes are tried in order; a probe that cannot answer returns an error and
/// the oracle moves to the next one. Implementations live in the platform
/// layer.
pub trait IdleProbe: Send {
    fn name(&self) -> &'static str;

    /// Seconds since the last user input, or an error if this probe is
    /// unavailable on the current system.
    fn poll(&mut self) -> Result<u64>;
}

/// Result of one [`IdleOracle::observe`] call.
#[derive(Debug, Clone, Copy)]
pub struct IdleObservation {
    pub idle_seconds: u64,
    pub is_idle: bool,
    /// An idle interval that was closed by this observation, if any.
    pub closed_period: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Determines idle time through an ordered probe chain with a heuristic
/// fallback, and keeps the history of idle intervals.
///
/// When every native probe is unavailable, idle time is measured from the
/// last sample tick (see `mark_tick`), and a warning is emitted exactly once.
pub struct IdleOracle {
    probes: Vec<Box<dyn IdleProbe>>,
    /// Set by `update()` when the caller independently observed activity.
    last_known_activity: Option<Instant>,
    /// Advanced by `mark_tick()`; anchor for the fallback heuristic.
    fallback_anchor: DateTime<Utc>,
    fallback_warned: bool,
    currently_idle: bool,
    idle_started: Option<DateTime<Utc>>,
    periods: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl IdleOracle {
    pub fn new(probes: Vec<Box<dyn IdleProbe>>) -> Self {
        Self {
            probes,
            last_known_activity: None,
            fallback_anchor: Utc::now(),
            fallback_warned: false,
            currently_idle: false,
            idle_started: None,
            periods: Vec::new(),
        }
    }

    /// Seconds since the last detected user input.
    ///
    /// Walks the probe chain in order; if all probes fail, falls back to time
    /// since the last sample tick. The result is clamped by the time since
    /// the last explicit `update()`, so a reported activity immediately
    /// zeroes the reading.
    pub fn idle_seconds(&mut self) -> u64 {
        let mut native = None;
        for probe in &mut self.probes {
            match probe.poll() {
                Ok(secs) => {
                    native = Some(secs);
                    break;
                }
                Err(err) => {
                    log::debug!("idle probe '{}' unavailable: {err}", probe.name());
                }
            }
        }

        let raw = match native {
            Some(secs) => secs,
            None => {
                if !self.fallback_warned {
                    warn!(
                        "no native idle detection available, falling back to \
                         time-based tracking"
                    );
                    self.fallback_warned = true;
                }
                (Utc::now() - self.fallback_anchor).num_seconds().max(0) as u64
            }
        };

        match self.last_known_activity {
            Some(at) => raw.min(at.elapsed().as_secs()),
            None => raw,
        }
    }

    /// Whether the system counts as idle for the given threshold.
    pub fn is_idle(&mut self, threshold_secs: u64) -> bool {
        self.idle_seconds() >= threshold_secs
    }

    /// Evaluate idle state and maintain the idle-interval history.
    ///
    /// Entering idle opens an interval backdated by the reported idle time;
    /// leaving idle closes it. The closed interval, if any, is returned so
    /// the caller can persist it.
    pub fn observe(&mut self, threshold_secs: u64) -> IdleObservation {
        let idle_seconds = self.idle_seconds();
        let is_idle = idle_seconds >= threshold_secs;
        let now = Utc::now();
        let mut closed_period = None;

        if is_idle && !self.currently_idle {
            self.currently_idle = true;
            self.idle_started = Some(now - ChronoDuration::seconds(idle_seconds as i64));
        } else if !is_idle && self.currently_idle {
            self.currently_idle = false;
            if let Some(start) = self.idle_started.take() {
                self.periods.push((start, now));
                closed_period = Some((start, now));
            }
        }

        IdleObservation {
            idle_seconds,
            is_idle,
            closed_period,
        }
    }

    /// Record externally-observed user activity (e.g. a window focus change).
    ///
    /// Resets the activity anchor so the next `idle_seconds()` returns 0 and,
    /// if the oracle was idle, closes the open idle interval at now.
    pub fn update(&mut self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let now = Utc::now();
        self.last_known_activity = Some(Instant::now());
        self.fallback_anchor = now;

        if self.currently_idle {
            self.currently_idle = false;
            if let Some(start) = self.idle_started.take() {
                self.periods.push((start, now));
                return Some((start, now));
            }
        }
        None
    }

    /// Advance the fallback anchor; called by the sampler once per tick.
    ///
    /// While idle, the anchor is left alone so fallback idle time keeps
    /// accumulating across ticks.
    pub fn mark_tick(&mut self) {
        if !self.currently_idle {
            self.fallback_anchor = Utc::now();
        }
    }

    pub fn currently_idle(&self) -> bool {
        self.currently_idle
    }

    /// Recorded idle intervals intersecting the given range.
    pub fn idle_periods(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.periods
            .iter()
            .filter(|(s, e)| *s < end && *e > start)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(u64);

    impl IdleProbe for FixedProbe {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn poll(&mut self) -> Result<u64> {
            Ok(self.0)
        }
    }

    struct BrokenProbe;

    impl IdleProbe for BrokenProbe {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn poll(&mut self) -> Result<u64> {
            Err(crate::WorkpulseError::idle_unavailable("not supported"))
        }
    }

    #[test]
    fn probe_chain_falls_through_to_first_working_probe() {
        let mut oracle = IdleOracle::new(vec![Box::new(BrokenProbe), Box::new(FixedProbe(42))]);
        assert_eq!(oracle.idle_seconds(), 42);
    }

    #[test]
    fn fallback_measures_from_last_tick() {
        let mut oracle = IdleOracle::new(vec![Box::new(BrokenProbe)]);
        oracle.mark_tick();
        // Immediately after a tick the fallback reports (close to) zero.
        assert!(oracle.idle_seconds() <= 1);
    }

    #[test]
    fn observe_tracks_idle_transitions() {
        let mut oracle = IdleOracle::new(vec![Box::new(FixedProbe(400))]);
        let obs = oracle.observe(300);
        assert!(obs.is_idle);
        assert!(obs.closed_period.is_none());
        assert!(oracle.currently_idle());

        // Activity resumes: interval closes.
        oracle.probes = vec![Box::new(FixedProbe(3))];
        let obs = oracle.observe(300);
        assert!(!obs.is_idle);
        let (start, end) = obs.closed_period.expect("interval should close");
        assert!(end > start);
    }

    #[test]
    fn update_while_idle_closes_exactly_one_interval_and_zeroes_idle() {
        let mut oracle = IdleOracle::new(vec![Box::new(FixedProbe(400))]);
        oracle.observe(300);
        assert!(oracle.currently_idle());

        let closed = oracle.update();
        assert!(closed.is_some());
        assert!(!oracle.currently_idle());
        // A second update closes nothing further.
        assert!(oracle.update().is_none());
        // Native probe still reports 400 but the activity clamp wins.
        assert_eq!(oracle.idle_seconds(), 0);

        let now = Utc::now();
        let periods = oracle.idle_periods(now - ChronoDuration::hours(1), now);
        assert_eq!(periods.len(), 1);
    }

    #[test]
    fn idle_periods_returns_intersecting_intervals() {
        let mut oracle = IdleOracle::new(vec![Box::new(FixedProbe(400))]);
        oracle.observe(300);
        oracle.update();

        let now = Utc::now();
        // A window that starts inside the recorded interval still sees it.
        let within = oracle.idle_periods(now - ChronoDuration::seconds(10), now);
        assert_eq!(within.len(), 1);
        // A disjoint window in the future does not.
        let future = oracle.idle_periods(
            now + ChronoDuration::hours(1),
            now + ChronoDuration::hours(2),
        );
        assert!(future.is_empty());
    }
}
