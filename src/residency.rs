//! Residency time aggregation
//!
//! Walks an ordered stay sequence and sums, per list, the time between
//! entering a list and the next move. The last stay is still open and is
//! measured up to `now`.

use crate::model::{StageId, StaySegment};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Accumulated residency per visited list
///
/// Keys are exactly the lists the card visited. Values may be negative when
/// move timestamps precede the creation instant; they are kept as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationTable {
    totals: BTreeMap<StageId, TimeDelta>,
}

impl DurationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `duration` to the total of `stage`
    pub fn add(&mut self, stage: &StageId, duration: TimeDelta) {
        let total = self.totals.entry(stage.clone()).or_insert_with(TimeDelta::zero);
        *total = *total + duration;
    }

    /// Total time spent in `stage`, `None` if the card never visited it
    pub fn get(&self, stage: &StageId) -> Option<TimeDelta> {
        self.totals.get(stage).copied()
    }

    /// Total time spent in `stage` in fractional hours
    pub fn hours(&self, stage: &StageId) -> Option<f64> {
        self.get(stage).map(to_hours)
    }

    /// Sum over all visited lists
    ///
    /// Equals `now` minus the earliest entry, i.e. the card's lifetime unless
    /// a move predates its creation.
    pub fn total(&self) -> TimeDelta {
        self.totals
            .values()
            .fold(TimeDelta::zero(), |acc, d| acc + *d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StageId, &TimeDelta)> {
        self.totals.iter()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Convert a duration to fractional hours at millisecond precision
pub fn to_hours(duration: TimeDelta) -> f64 {
    duration.num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Sum the duration of each stay into a fresh per-list table
///
/// Each segment lasts until the next one starts; the final segment lasts
/// until `now`. An empty sequence yields an empty table.
pub fn aggregate(segments: &[StaySegment], now: DateTime<Utc>) -> DurationTable {
    let mut table = DurationTable::new();

    for (i, segment) in segments.iter().enumerate() {
        let until = segments
            .get(i + 1)
            .map_or(now, |next| next.entered_at);
        let duration = until - segment.entered_at;

        if duration < TimeDelta::zero() {
            tracing::warn!(
                stage = %segment.stage,
                entered_at = %segment.entered_at,
                hours = to_hours(duration),
                "negative stay duration, move timestamps are inconsistent"
            );
        }

        table.add(&segment.stage, duration);
    }

    table
}
