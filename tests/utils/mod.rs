// In-memory board used by the integration tests
//
// Serves fixed list memberships and card histories, and records which card
// histories were requested.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use trimmer::error::{Result, TrimmerError};
use trimmer::model::{StageId, UnitId, UnitSummary};
use trimmer::trello::{BoardSource, RawAction};

#[derive(Default)]
pub struct FakeBoard {
    lists: HashMap<StageId, Vec<UnitSummary>>,
    histories: HashMap<UnitId, Vec<RawAction>>,
    broken_cards: HashSet<UnitId>,
    denied_cards: HashSet<UnitId>,
    unreachable_lists: HashSet<StageId>,
    history_requests: Mutex<Vec<UnitId>>,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an (initially empty) list
    pub fn with_list(mut self, list: &str) -> Self {
        self.lists.entry(StageId::from(list)).or_default();
        self
    }

    /// Put a card in `list` with the given raw history
    pub fn with_card(mut self, list: &str, id: &str, name: &str, history: Vec<RawAction>) -> Self {
        self.lists
            .entry(StageId::from(list))
            .or_default()
            .push(UnitSummary {
                id: UnitId::from(id),
                name: name.to_string(),
            });
        self.histories.insert(UnitId::from(id), history);
        self
    }

    /// Make the history request of a card fail
    pub fn with_broken_history(mut self, id: &str) -> Self {
        self.broken_cards.insert(UnitId::from(id));
        self
    }

    /// Make the history request of a card fail with bad credentials
    pub fn with_denied_history(mut self, id: &str) -> Self {
        self.denied_cards.insert(UnitId::from(id));
        self
    }

    /// Make a list fail with a transport error instead of a lookup miss
    pub fn with_unreachable_list(mut self, list: &str) -> Self {
        self.unreachable_lists.insert(StageId::from(list));
        self
    }

    pub fn history_requests(&self) -> Vec<UnitId> {
        self.history_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BoardSource for FakeBoard {
    async fn fetch_units_of_stage(&self, stage: &StageId) -> Result<Vec<UnitSummary>> {
        if self.unreachable_lists.contains(stage) {
            return Err(TrimmerError::Http {
                resource: format!("list {stage}"),
                reason: "connection reset by peer".to_string(),
            });
        }
        self.lists
            .get(stage)
            .cloned()
            .ok_or_else(|| TrimmerError::StageNotFound {
                stage: stage.to_string(),
            })
    }

    async fn fetch_event_history(&self, unit: &UnitId) -> Result<Vec<RawAction>> {
        self.history_requests.lock().unwrap().push(unit.clone());
        if self.denied_cards.contains(unit) {
            return Err(TrimmerError::AccessDenied {
                resource: format!("card {unit}"),
            });
        }
        if self.broken_cards.contains(unit) {
            return Err(TrimmerError::Http {
                resource: format!("card {unit}"),
                reason: "503 Service Unavailable".to_string(),
            });
        }
        Ok(self.histories.get(unit).cloned().unwrap_or_default())
    }
}

/// Card id whose embedded creation time is `created`
pub fn card_id(created: DateTime<Utc>, suffix: &str) -> String {
    format!("{:08x}{}", created.timestamp() as u32, suffix)
}

/// Creation instant used by the scenarios: 2017-12-06T16:43:06Z
pub fn t0() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(0x5a28_1e1a, 0).unwrap()
}

/// A move into `list` at `t0 + hours`
pub fn move_at(list: &str, hours: i64) -> RawAction {
    let at = t0() + TimeDelta::hours(hours);
    RawAction::moved_to(list, &at.to_rfc3339())
}
