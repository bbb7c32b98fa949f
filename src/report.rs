//! Report rows: per-card hours projected onto the monitored lists

use crate::model::{StageId, Unit, UnitId};
use crate::residency::DurationTable;
use chrono::{DateTime, Utc};
use std::fmt;

/// One report cell for a monitored list
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoursCell {
    /// Total hours spent in the list, unrounded
    Hours(f64),
    /// The card never visited the list
    NotApplicable,
}

impl HoursCell {
    pub fn hours(&self) -> Option<f64> {
        match self {
            HoursCell::Hours(h) => Some(*h),
            HoursCell::NotApplicable => None,
        }
    }
}

impl fmt::Display for HoursCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoursCell::Hours(h) => write!(f, "{}", h),
            HoursCell::NotApplicable => f.write_str("NA"),
        }
    }
}

/// A card's line in the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub unit_id: UnitId,
    pub created_at: DateTime<Utc>,
    /// One cell per monitored list, in column order
    pub cells: Vec<HoursCell>,
    pub unit_name: String,
}

/// Project a card's residency table onto the monitored lists
///
/// Lists the card visited get their total in hours; the others get
/// [`HoursCell::NotApplicable`]. Visited lists that are not monitored are
/// left out.
pub fn build_row(
    unit: &Unit,
    created_at: DateTime<Utc>,
    table: &DurationTable,
    monitored: &[StageId],
) -> ReportRow {
    let cells = monitored
        .iter()
        .map(|stage| {
            table
                .hours(stage)
                .map_or(HoursCell::NotApplicable, HoursCell::Hours)
        })
        .collect();

    ReportRow {
        unit_id: unit.id.clone(),
        created_at,
        cells,
        unit_name: unit.name.clone(),
    }
}
