use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BREAK_THRESHOLD_SECS: u64 = 40 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Working,
    Break,
}

/// A closed Working or Break interval, handed to persistence on every
/// transition and at shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: SessionKind,
    pub focus_secs: u64,
    pub break_secs: u64,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SessionStarted { at: DateTime<Utc> },
    BreakStarted { at: DateTime<Utc> },
    BreakEnded { at: DateTime<Utc> },
    IntervalClosed { record: SessionRecord },
}

/// Aggregate session statistics, including the open interval.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub total_work_secs: u64,
    pub total_break_secs: u64,
    pub session_count: usize,
    /// work / (work + break), clamped to [0, 1]; 0 when nothing elapsed.
    pub focus_ratio: f64,
    pub current_kind: Option<SessionKind>,
    pub current_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerState {
    Uninitialized,
    Working,
    Break,
}

/// Work/break session state machine driven by the sampler tick.
///
/// Elapsed time between ticks accrues into the accumulator of the state the
/// tracker was in, so focus_time + break_time always equals wall time since
/// the first tick (up to rounding).
pub struct SessionTracker {
    state: TrackerState,
    interval_start: Option<DateTime<Utc>>,
    last_tick: Option<DateTime<Utc>>,
    total_work: ChronoDuration,
    total_break: ChronoDuration,
    closed_sessions: usize,
    break_threshold: ChronoDuration,
}

impl SessionTracker {
    pub fn new(break_threshold_secs: u64) -> Self {
        Self {
            state: TrackerState::Uninitialized,
            interval_start: None,
            last_tick: None,
            total_work: ChronoDuration::zero(),
            total_break: ChronoDuration::zero(),
            closed_sessions: 0,
            break_threshold: ChronoDuration::seconds(break_threshold_secs as i64),
        }
    }

    pub fn set_break_threshold(&mut self, secs: u64) {
        self.break_threshold = ChronoDuration::seconds(secs as i64);
    }

    /// Advance the state machine by one tick.
    pub fn tick(&mut self, now: DateTime<Utc>, is_idle: bool) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        match self.state {
            TrackerState::Uninitialized => {
                self.state = TrackerState::Working;
                self.interval_start = Some(now);
                self.last_tick = Some(now);
                events.push(SessionEvent::SessionStarted { at: now });
                return events;
            }
            TrackerState::Working => {
                self.accrue(now);
                if is_idle {
                    events.push(SessionEvent::IntervalClosed {
                        record: self.close_interval(now),
                    });
                    self.state = TrackerState::Break;
                    self.interval_start = Some(now);
                    events.push(SessionEvent::BreakStarted { at: now });
                }
            }
            TrackerState::Break => {
                self.accrue(now);
                if !is_idle {
                    events.push(SessionEvent::IntervalClosed {
                        record: self.close_interval(now),
                    });
                    self.state = TrackerState::Working;
                    self.interval_start = Some(now);
                    events.push(SessionEvent::BreakEnded { at: now });
                }
            }
        }

        events
    }

    /// Whether continuous time in Working exceeds the break threshold.
    ///
    /// A reminder signal only; it causes no transition.
    pub fn should_take_break(&self, now: DateTime<Utc>) -> bool {
        if self.state != TrackerState::Working {
            return false;
        }
        match self.interval_start {
            Some(start) => now - start >= self.break_threshold,
            None => false,
        }
    }

    pub fn stats(&self, now: DateTime<Utc>) -> SessionStats {
        // Include the not-yet-accrued tail of the open interval.
        let pending = match (self.state, self.last_tick) {
            (TrackerState::Uninitialized, _) | (_, None) => ChronoDuration::zero(),
            (_, Some(last)) => (now - last).max(ChronoDuration::zero()),
        };

        let (work, rest) = match self.state {
            TrackerState::Working => (self.total_work + pending, self.total_break),
            TrackerState::Break => (self.total_work, self.total_break + pending),
            TrackerState::Uninitialized => (self.total_work, self.total_break),
        };

        let work_secs = work.num_seconds().max(0) as u64;
        let break_secs = rest.num_seconds().max(0) as u64;
        let denominator = work_secs + break_secs;
        let focus_ratio = if denominator == 0 {
            0.0
        } else {
            (work_secs as f64 / denominator as f64).clamp(0.0, 1.0)
        };

        SessionStats {
            total_work_secs: work_secs,
            total_break_secs: break_secs,
            session_count: self.closed_sessions,
            focus_ratio,
            current_kind: match self.state {
                TrackerState::Working => Some(SessionKind::Working),
                TrackerState::Break => Some(SessionKind::Break),
                TrackerState::Uninitialized => None,
            },
            current_secs: match self.interval_start {
                Some(start) => (now - start).num_seconds().max(0) as u64,
                None => 0,
            },
        }
    }

    /// Force-close the open interval and return its record plus the final
    /// aggregates.
    pub fn shutdown(&mut self, now: DateTime<Utc>) -> (Option<SessionRecord>, SessionStats) {
        let record = match self.state {
            TrackerState::Uninitialized => None,
            _ => {
                self.accrue(now);
                let record = self.close_interval(now);
                self.state = TrackerState::Uninitialized;
                self.interval_start = None;
                self.last_tick = None;
                Some(record)
            }
        };
        (record, self.stats(now))
    }

    fn accrue(&mut self, now: DateTime<Utc>) {
        let elapsed = match self.last_tick {
            Some(last) => (now - last).max(ChronoDuration::zero()),
            None => ChronoDuration::zero(),
        };
        match self.state {
            TrackerState::Working => self.total_work = self.total_work + elapsed,
            TrackerState::Break => self.total_break = self.total_break + elapsed,
            TrackerState::Uninitialized => {}
        }
        self.last_tick = Some(now);
    }

    fn close_interval(&mut self, now: DateTime<Utc>) -> SessionRecord {
        let start = self.interval_start.unwrap_or(now);
        let elapsed = (now - start).num_seconds().max(0) as u64;
        let kind = if self.state == TrackerState::Break {
            SessionKind::Break
        } else {
            SessionKind::Working
        };
        self.closed_sessions += 1;

        SessionRecord {
            start,
            end: now,
            kind,
            focus_secs: if kind == SessionKind::Working { elapsed } else { 0 },
            break_secs: if kind == SessionKind::Break { elapsed } else { 0 },
        }
    }
}
