//! Card filtering for the `ignoreCards` configuration entry
//!
//! Ignored cards are dropped right after the list listing, before their
//! action history is requested.

use crate::model::{UnitId, UnitSummary};
use std::collections::HashSet;

/// Card filter that determines which cards get a report row
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    ignored: HashSet<UnitId>,
}

impl IgnoreFilter {
    /// Create a filter that lets every card through
    pub fn none() -> Self {
        Self::default()
    }

    /// Create a filter ignoring the given card ids
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = UnitId>,
    {
        Self {
            ignored: ids.into_iter().collect(),
        }
    }

    /// Check if a card should be processed
    pub fn should_process(&self, unit: &UnitSummary) -> bool {
        !self.ignored.contains(&unit.id)
    }

    /// Number of ignored ids
    pub fn len(&self) -> usize {
        self.ignored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ignored.is_empty()
    }
}
