//! Free-slot computation across calendars.
//!
//! A [`SlotGrid`] describes the bookable grid (how many days, which working
//! hours, how long each slot is, and in which time zone the hours are read).
//! [`SlotGrid::candidate_slots`] lays that grid out starting from "now", and
//! [`compute_availability`] drops every candidate overlapping a busy period.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use umi_core::{SlotGrid, TimeInterval, compute_availability};
//!
//! let now = Utc.with_ymd_and_hms(2025, 2, 5, 8, 30, 0).unwrap();
//! let busy = TimeInterval::new(
//!     Utc.with_ymd_and_hms(2025, 2, 5, 13, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 2, 5, 14, 30, 0).unwrap(),
//! )
//! .unwrap();
//!
//! let result = compute_availability(&SlotGrid::new(1), now, &[busy], 1).unwrap();
//! assert_eq!(result.total_slots(), 6);
//! ```

use chrono::{DateTime, Days, Duration, LocalResult, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::time::TimeInterval;

/// Default number of days to consider.
pub const DEFAULT_HORIZON_DAYS: u32 = 7;
/// Default first working hour (inclusive).
pub const DEFAULT_WORK_START_HOUR: u32 = 9;
/// Default last working hour (exclusive).
pub const DEFAULT_WORK_END_HOUR: u32 = 17;

/// Invalid slot grid parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// `horizon_days` was zero.
    #[error("horizon must cover at least one day")]
    EmptyHorizon,

    /// Working hours outside `0 <= start < end <= 24`.
    #[error("invalid working hours {start}..{end}: need 0 <= start < end <= 24")]
    InvalidWorkHours { start: u32, end: u32 },

    /// Slot duration was zero or negative.
    #[error("slot duration must be positive")]
    NonPositiveSlot,
}

/// The bookable grid: horizon, working window, slot length and time zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    /// Number of calendar days to lay out, starting from the anchor day.
    pub horizon_days: u32,
    /// First working hour of each day (inclusive).
    pub work_start_hour: u32,
    /// End of the working window (exclusive).
    pub work_end_hour: u32,
    /// Length of every candidate slot.
    pub slot_duration: Duration,
    /// Zone in which working hours are interpreted.
    pub time_zone: Tz,
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            work_start_hour: DEFAULT_WORK_START_HOUR,
            work_end_hour: DEFAULT_WORK_END_HOUR,
            slot_duration: Duration::hours(1),
            time_zone: Tz::UTC,
        }
    }
}

impl SlotGrid {
    /// Creates a grid over `horizon_days` with the default working window.
    pub fn new(horizon_days: u32) -> Self {
        Self {
            horizon_days,
            ..Default::default()
        }
    }

    /// Builder: set the working window.
    pub fn with_work_hours(mut self, start: u32, end: u32) -> Self {
        self.work_start_hour = start;
        self.work_end_hour = end;
        self
    }

    /// Builder: set the slot length.
    pub fn with_slot_duration(mut self, duration: Duration) -> Self {
        self.slot_duration = duration;
        self
    }

    /// Builder: set the time zone.
    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.time_zone = tz;
        self
    }

    /// Checks the grid invariants.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.horizon_days == 0 {
            return Err(GridError::EmptyHorizon);
        }
        if self.work_start_hour >= self.work_end_hour || self.work_end_hour > 24 {
            return Err(GridError::InvalidWorkHours {
                start: self.work_start_hour,
                end: self.work_end_hour,
            });
        }
        if self.slot_duration <= Duration::zero() {
            return Err(GridError::NonPositiveSlot);
        }
        Ok(())
    }

    /// Number of candidates the grid yields: `horizon_days * working hours`.
    ///
    /// Local hours that do not exist (DST spring-forward gap) are skipped, so
    /// in such zones the actual count can be lower on transition days.
    pub fn candidate_count(&self) -> usize {
        self.horizon_days as usize * (self.work_end_hour - self.work_start_hour) as usize
    }

    /// IANA name of the grid's time zone.
    pub fn time_zone_label(&self) -> &'static str {
        self.time_zone.name()
    }

    /// `now` rounded up to the next whole hour in the grid's zone.
    ///
    /// An instant already on an hour boundary is kept as-is.
    pub fn anchor(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        let local = now.with_timezone(&self.time_zone);
        let past_hour = Duration::minutes(i64::from(local.minute()))
            + Duration::seconds(i64::from(local.second()))
            + Duration::nanoseconds(i64::from(local.nanosecond()));
        if past_hour.is_zero() {
            local
        } else {
            local - past_hour + Duration::hours(1)
        }
    }

    /// Lays out the candidate slots, chronologically (day-major, hour-minor).
    pub fn candidate_slots(&self, now: DateTime<Utc>) -> Result<Vec<CandidateSlot>, GridError> {
        self.validate()?;

        let anchor_date = self.anchor(now).date_naive();
        let mut slots = Vec::with_capacity(self.candidate_count());

        for day in 0..self.horizon_days {
            let Some(date) = anchor_date.checked_add_days(Days::new(u64::from(day))) else {
                break;
            };
            for hour in self.work_start_hour..self.work_end_hour {
                let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
                    continue;
                };
                let local = date.and_time(time);
                let start = match self.time_zone.from_local_datetime(&local) {
                    LocalResult::Single(dt) => dt,
                    LocalResult::Ambiguous(earliest, _) => earliest,
                    LocalResult::None => {
                        debug!(%local, zone = self.time_zone_label(), "skipping nonexistent local hour");
                        continue;
                    }
                };
                let start = start.with_timezone(&Utc);
                if let Ok(interval) = TimeInterval::from_duration(start, self.slot_duration) {
                    slots.push(CandidateSlot(interval));
                }
            }
        }

        Ok(slots)
    }
}

/// One bookable unit of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CandidateSlot(TimeInterval);

impl CandidateSlot {
    /// The slot's time range.
    pub fn interval(&self) -> &TimeInterval {
        &self.0
    }

    /// Slot start (UTC).
    pub fn start(&self) -> DateTime<Utc> {
        self.0.start()
    }

    /// Slot end (UTC).
    pub fn end(&self) -> DateTime<Utc> {
        self.0.end()
    }

    /// Slot length in minutes.
    pub fn duration_minutes(&self) -> i64 {
        self.0.duration_minutes()
    }

    /// Whether no busy period overlaps this slot.
    pub fn is_free(&self, busy: &[TimeInterval]) -> bool {
        !busy.iter().any(|period| self.0.overlaps(period))
    }
}

impl From<TimeInterval> for CandidateSlot {
    fn from(interval: TimeInterval) -> Self {
        Self(interval)
    }
}

/// Keeps the candidates that overlap no busy period, preserving order.
pub fn free_slots(candidates: &[CandidateSlot], busy: &[TimeInterval]) -> Vec<CandidateSlot> {
    candidates
        .iter()
        .filter(|slot| slot.is_free(busy))
        .copied()
        .collect()
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityResult {
    /// Free slots in chronological order.
    pub available_slots: Vec<CandidateSlot>,
    /// Number of candidates generated before filtering.
    pub candidates_generated: usize,
    /// Number of calendars attempted, failed ones included.
    pub calendars_processed: usize,
    /// IANA zone the working hours were read in.
    pub time_zone: &'static str,
}

impl AvailabilityResult {
    /// Count of available slots.
    pub fn total_slots(&self) -> usize {
        self.available_slots.len()
    }
}

/// Computes the free slots of `grid` given the union of busy periods.
///
/// `calendars_processed` is passed through untouched; callers count every
/// calendar they attempted, whether its fetch succeeded or not.
pub fn compute_availability(
    grid: &SlotGrid,
    now: DateTime<Utc>,
    busy: &[TimeInterval],
    calendars_processed: usize,
) -> Result<AvailabilityResult, GridError> {
    let candidates = grid.candidate_slots(now)?;
    let available_slots = free_slots(&candidates, busy);

    debug!(
        candidates = candidates.len(),
        busy = busy.len(),
        available = available_slots.len(),
        "computed availability"
    );

    Ok(AvailabilityResult {
        available_slots,
        candidates_generated: candidates.len(),
        calendars_processed,
        time_zone: grid.time_zone_label(),
    })
}

/// The range covered by the grid's candidates, used as a fetch window.
pub fn grid_window(slots: &[CandidateSlot]) -> Option<TimeInterval> {
    let first = slots.first()?;
    Some(
        slots
            .iter()
            .fold(*first.interval(), |acc, slot| acc.span(slot.interval())),
    )
}
