//! Board data model: lists (stages), cards (units) and their moves

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Identifier of a board list (a workflow stage)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a card (a unit of work)
///
/// The leading eight hex digits encode the creation time in seconds since
/// the Unix epoch, see [`crate::timestamp::decode_created_at`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A card moved into `destination` at `occurred_at`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEvent {
    pub destination: StageId,
    pub occurred_at: DateTime<Utc>,
}

impl MoveEvent {
    pub fn new(destination: impl Into<StageId>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            destination: destination.into(),
            occurred_at,
        }
    }
}

/// One stay of a card in a list, starting at `entered_at` and lasting until
/// the next segment starts (or until now for the last one)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaySegment {
    pub stage: StageId,
    pub entered_at: DateTime<Utc>,
}

/// Minimal card data returned when listing the cards of a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSummary {
    pub id: UnitId,
    pub name: String,
}

/// A card together with its full move history
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub events: Vec<MoveEvent>,
}

impl Unit {
    pub fn new(summary: UnitSummary, events: Vec<MoveEvent>) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            events,
        }
    }
}
