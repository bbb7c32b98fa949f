//! Board access: the Trello REST API behind the [`BoardSource`] trait
//!
//! The run only needs two calls: the cards currently in a list, and the
//! action history of one card. Everything else in an action is ignored;
//! only `data.listAfter` (a move between lists) matters.
//!
//! Trello serves at most 1000 actions per request, newest first. Longer
//! histories are paged with `before=<oldest action id seen>`.

use crate::config::{Config, Credentials};
use crate::error::{Result, TrimmerError};
use crate::model::{MoveEvent, StageId, UnitId, UnitSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Source of list membership and card history
#[async_trait]
pub trait BoardSource: Send + Sync {
    /// Cards of a list; fails with [`TrimmerError::StageNotFound`] for an unknown list
    async fn fetch_units_of_stage(&self, stage: &StageId) -> Result<Vec<UnitSummary>>;

    /// Raw action history of a card
    async fn fetch_event_history(&self, unit: &UnitId) -> Result<Vec<RawAction>>;
}

/// A card action as returned by the board API
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawAction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub data: ActionData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionData {
    #[serde(rename = "listAfter")]
    pub list_after: Option<ListRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListRef {
    pub id: String,
}

impl RawAction {
    /// Build an action moving a card into `list` at `date` (RFC 3339)
    pub fn moved_to(list: &str, date: &str) -> Self {
        Self {
            id: String::new(),
            date: date.to_string(),
            data: ActionData {
                list_after: Some(ListRef {
                    id: list.to_string(),
                }),
            },
        }
    }

    /// The list move carried by this action, if any
    ///
    /// Actions without `listAfter` are not moves and yield `None`. A move
    /// with an unreadable date is dropped with a warning.
    pub fn move_event(&self) -> Option<MoveEvent> {
        let list = self.data.list_after.as_ref()?;
        match DateTime::parse_from_rfc3339(&self.date) {
            Ok(date) => Some(MoveEvent::new(
                StageId::new(list.id.as_str()),
                date.with_timezone(&Utc),
            )),
            Err(e) => {
                tracing::warn!(list = %list.id, date = %self.date, "dropping move with bad date: {}", e);
                None
            }
        }
    }
}

/// Cursor for the next (older) page of a card's history
///
/// A page shorter than `limit` is the last one. A full page continues
/// before its oldest action, which Trello returns last.
pub fn next_page_before(page: &[RawAction], limit: u32) -> Option<String> {
    if page.len() < limit as usize {
        return None;
    }
    page.last()
        .map(|action| action.id.clone())
        .filter(|id| !id.is_empty())
}

/// Extract the list moves from a card's raw history
pub fn move_events(actions: &[RawAction]) -> Vec<MoveEvent> {
    actions.iter().filter_map(RawAction::move_event).collect()
}

#[derive(Debug, Deserialize)]
struct CardRecord {
    id: String,
    #[serde(default)]
    name: String,
}

impl From<CardRecord> for UnitSummary {
    fn from(card: CardRecord) -> Self {
        UnitSummary {
            id: UnitId::new(card.id),
            name: card.name,
        }
    }
}

/// Failure of a single API request, before it is attributed to a list or card
#[derive(Debug)]
enum RequestError {
    Status { status: StatusCode, body: String },
    Transport(String),
    Decode(String),
}

impl RequestError {
    /// List failures abort the run, whatever their cause
    fn for_stage(self, stage: &StageId) -> TrimmerError {
        let resource = format!("list {stage}");
        match self {
            RequestError::Status { status, .. }
                if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST =>
            {
                TrimmerError::StageNotFound {
                    stage: stage.to_string(),
                }
            }
            RequestError::Status { status, .. }
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                TrimmerError::AccessDenied { resource }
            }
            other => TrimmerError::StageUnavailable {
                stage: stage.to_string(),
                reason: other.reason(),
            },
        }
    }

    /// Card failures skip the card, except bad credentials which would
    /// fail every other card too
    fn for_unit(self, unit: &UnitId) -> TrimmerError {
        let resource = format!("card {unit}");
        match self {
            RequestError::Status { status, .. }
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                TrimmerError::AccessDenied { resource }
            }
            other => other.for_resource(resource),
        }
    }

    fn reason(&self) -> String {
        match self {
            RequestError::Status { status, body } => format!("{status}: {}", body.trim()),
            RequestError::Transport(reason) | RequestError::Decode(reason) => reason.clone(),
        }
    }

    fn for_resource(self, resource: String) -> TrimmerError {
        match self {
            RequestError::Decode(reason) => TrimmerError::Decode { resource, reason },
            other => TrimmerError::Http {
                resource,
                reason: other.reason(),
            },
        }
    }
}

/// HTTP client for the Trello REST API
#[derive(Clone)]
pub struct TrelloClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    actions_limit: u32,
}

impl TrelloClient {
    /// Build a client from the run configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrimmerError::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credentials: config.credentials.clone(),
            actions_limit: config.actions_limit,
        })
    }

    async fn get<T>(&self, path: &str, params: &[(&str, String)]) -> std::result::Result<T, RequestError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(url)
            .query(params)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("token", self.credentials.api_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        Self::decode_response(resp).await
    }

    async fn decode_response<T>(resp: Response) -> std::result::Result<T, RequestError>
    where
        T: DeserializeOwned,
    {
        let status = resp.status();
        if status.is_success() {
            resp.json::<T>()
                .await
                .map_err(|e| RequestError::Decode(e.to_string()))
        } else {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("response body error: {e}"));
            Err(RequestError::Status { status, body })
        }
    }
}

#[async_trait]
impl BoardSource for TrelloClient {
    async fn fetch_units_of_stage(&self, stage: &StageId) -> Result<Vec<UnitSummary>> {
        let path = format!("/lists/{stage}/cards");
        let cards: Vec<CardRecord> = self
            .get(&path, &[("fields", "id,name,idList".to_string())])
            .await
            .map_err(|e| e.for_stage(stage))?;
        tracing::debug!(list = %stage, cards = cards.len(), "fetched list");
        Ok(cards.into_iter().map(UnitSummary::from).collect())
    }

    async fn fetch_event_history(&self, unit: &UnitId) -> Result<Vec<RawAction>> {
        let path = format!("/cards/{unit}/actions");
        let mut actions = Vec::new();
        let mut before: Option<String> = None;

        loop {
            let mut params = vec![
                ("filter", "updateCard:idList,createCard".to_string()),
                ("limit", self.actions_limit.to_string()),
            ];
            if let Some(cursor) = &before {
                params.push(("before", cursor.clone()));
            }

            let page: Vec<RawAction> = self
                .get(&path, &params)
                .await
                .map_err(|e| e.for_unit(unit))?;
            let next = next_page_before(&page, self.actions_limit);
            actions.extend(page);

            match next {
                Some(cursor) if before.as_ref() != Some(&cursor) => {
                    tracing::trace!(card = %unit, before = %cursor, "fetching older actions");
                    before = Some(cursor);
                }
                _ => break,
            }
        }

        tracing::trace!(card = %unit, actions = actions.len(), "fetched card history");
        Ok(actions)
    }
}
