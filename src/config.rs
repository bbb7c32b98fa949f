//! Configuration loading for `trimmer.conf`
//!
//! The file is JSON:
//!
//! ```json
//! {
//!   "trello": { "API_KEY": "...", "API_TOKEN": "..." },
//!   "monitorLists": { "<listId>": "Backlog", "<listId>": "Doing" },
//!   "ignoreCards": { "<cardId>": true },
//!   "initialList": "<listId>"
//! }
//! ```
//!
//! `monitorLists` is read in document order, which is the report column order.

use crate::error::{Result, TrimmerError};
use crate::filter::IgnoreFilter;
use crate::model::{StageId, UnitId};
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "trimmer.conf";
/// Default report file name
pub const DEFAULT_OUTPUT_FILE: &str = "trimmer.data";
/// Trello REST API root
pub const DEFAULT_BASE_URL: &str = "https://trello.com/1";

/// Largest page Trello serves for a card's actions; longer histories are paged
pub const MAX_ACTIONS_LIMIT: u32 = 1000;
/// Upper bound on concurrent card history requests
pub const MAX_CONCURRENCY: usize = 1024;

const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_ACTIONS_LIMIT: u32 = MAX_ACTIONS_LIMIT;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API credentials, passed through to every request
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(rename = "API_KEY", default)]
    pub api_key: String,
    #[serde(rename = "API_TOKEN", default)]
    pub api_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("api_token", &redact(&self.api_token))
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// A monitored list and its report column title
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitoredStage {
    pub id: StageId,
    pub name: String,
}

/// Effective run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Monitored lists in column order
    pub monitored: Vec<MonitoredStage>,
    pub ignore: IgnoreFilter,
    /// List every card is assumed to start in at creation
    pub initial_stage: StageId,
    /// Maximum number of card histories fetched at once
    pub concurrency: usize,
    /// Page size for the card actions request
    pub actions_limit: u32,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    trello: Credentials,
    monitor_lists: MonitorLists,
    #[serde(default)]
    ignore_cards: IgnoreCards,
    initial_list: Option<String>,
    concurrency: Option<usize>,
    actions_limit: Option<u32>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// `monitorLists` as an ordered sequence of stages
///
/// Accepts the object form `{ "<id>": "<title>" }` and an array of
/// `{ "id": ..., "name": ... }`; both keep document order.
#[derive(Debug, Default)]
struct MonitorLists(Vec<MonitoredStage>);

impl<'de> Deserialize<'de> for MonitorLists {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MonitorListsVisitor;

        impl<'de> Visitor<'de> for MonitorListsVisitor {
            type Value = MonitorLists;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of list id to column title, or an array of {id, name}")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut stages = Vec::new();
                while let Some((id, name)) = map.next_entry::<String, String>()? {
                    stages.push(MonitoredStage {
                        id: StageId::new(id),
                        name,
                    });
                }
                Ok(MonitorLists(stages))
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut stages = Vec::new();
                while let Some(stage) = seq.next_element::<MonitoredStage>()? {
                    stages.push(stage);
                }
                Ok(MonitorLists(stages))
            }
        }

        deserializer.deserialize_any(MonitorListsVisitor)
    }
}

/// `ignoreCards` as either `{ "<id>": <flag> }` or `["<id>", ...]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IgnoreCards {
    Flags(serde_json::Map<String, Value>),
    Ids(Vec<String>),
}

impl Default for IgnoreCards {
    fn default() -> Self {
        IgnoreCards::Ids(Vec::new())
    }
}

impl IgnoreCards {
    /// Ids to ignore; in the object form only entries with a truthy flag count
    fn into_ids(self) -> Vec<UnitId> {
        match self {
            IgnoreCards::Flags(map) => map
                .into_iter()
                .filter(|(_, flag)| is_truthy(flag))
                .map(|(id, _)| UnitId::new(id))
                .collect(),
            IgnoreCards::Ids(ids) => ids.into_iter().map(UnitId::new).collect(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Collapse repeated list ids into one column
///
/// Like a JS object literal, the column keeps the position of the first
/// occurrence and the title of the last one.
fn merge_duplicate_lists(stages: Vec<MonitoredStage>) -> Vec<MonitoredStage> {
    let mut merged: Vec<MonitoredStage> = Vec::with_capacity(stages.len());
    for stage in stages {
        match merged.iter_mut().find(|existing| existing.id == stage.id) {
            Some(existing) => {
                tracing::debug!(list = %stage.id, "list repeated in monitorLists, keeping one column");
                existing.name = stage.name;
            }
            None => merged.push(stage),
        }
    }
    merged
}

impl Config {
    /// Read and validate a configuration file, then apply
    /// `TRIMMER_API_KEY` / `TRIMMER_API_TOKEN` overrides
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| TrimmerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text, &path.display().to_string())?;
        Ok(config.with_credential_overrides(
            std::env::var("TRIMMER_API_KEY").ok(),
            std::env::var("TRIMMER_API_TOKEN").ok(),
        ))
    }

    /// Parse and validate configuration text; `origin` names it in errors
    pub fn from_json(text: &str, origin: &str) -> Result<Self> {
        let raw: RawConfig =
            serde_json::from_str(text).map_err(|source| TrimmerError::ConfigParse {
                origin: origin.to_string(),
                source,
            })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let monitored = merge_duplicate_lists(raw.monitor_lists.0);
        let Some(first) = monitored.first() else {
            return Err(TrimmerError::InvalidConfig(
                "monitorLists must name at least one list".to_string(),
            ));
        };
        if monitored.iter().any(|stage| stage.id.as_str().is_empty()) {
            return Err(TrimmerError::InvalidConfig(
                "monitorLists contains an empty list id".to_string(),
            ));
        }

        let initial_stage = match raw.initial_list {
            Some(id) if id.is_empty() => {
                return Err(TrimmerError::InvalidConfig(
                    "initialList must not be empty".to_string(),
                ))
            }
            Some(id) => StageId::new(id),
            None => {
                tracing::debug!(list = %first.id, "initialList not set, using first monitored list");
                first.id.clone()
            }
        };

        let concurrency = raw.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(TrimmerError::InvalidConfig(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {concurrency}"
            )));
        }

        let actions_limit = raw.actions_limit.unwrap_or(DEFAULT_ACTIONS_LIMIT);
        if !(1..=MAX_ACTIONS_LIMIT).contains(&actions_limit) {
            return Err(TrimmerError::InvalidConfig(format!(
                "actionsLimit must be between 1 and {MAX_ACTIONS_LIMIT}, got {actions_limit}"
            )));
        }

        Ok(Self {
            credentials: raw.trello,
            ignore: IgnoreFilter::from_ids(raw.ignore_cards.into_ids()),
            initial_stage,
            concurrency,
            actions_limit,
            base_url: raw
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            monitored,
        })
    }

    /// Replace credentials with the given values when present
    pub fn with_credential_overrides(
        mut self,
        api_key: Option<String>,
        api_token: Option<String>,
    ) -> Self {
        if let Some(key) = api_key {
            self.credentials.api_key = key;
        }
        if let Some(token) = api_token {
            self.credentials.api_token = token;
        }
        self
    }

    /// Monitored list ids in column order
    pub fn monitored_ids(&self) -> Vec<StageId> {
        self.monitored.iter().map(|stage| stage.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitSummary;

    const ORIGINAL: &str = r#"{
        "trello": { "API_KEY": "key", "API_TOKEN": "token" },
        "monitorLists": { "l2": "Doing", "l1": "Backlog", "l3": "Done" },
        "ignoreCards": { "c1": true, "c2": false }
    }"#;

    fn card(id: &str) -> UnitSummary {
        UnitSummary {
            id: UnitId::from(id),
            name: String::new(),
        }
    }

    #[test]
    fn test_parses_original_format() {
        let config = Config::from_json(ORIGINAL, "test").unwrap();
        assert_eq!(config.credentials.api_key, "key");
        assert_eq!(config.credentials.api_token, "token");
        assert_eq!(config.monitored.len(), 3);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.actions_limit, DEFAULT_ACTIONS_LIMIT);
    }

    #[test]
    fn test_monitor_lists_keep_document_order() {
        let config = Config::from_json(ORIGINAL, "test").unwrap();
        let ids: Vec<&str> = config.monitored.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["l2", "l1", "l3"]);
        assert_eq!(config.monitored[1].name, "Backlog");
    }

    #[test]
    fn test_initial_stage_defaults_to_first_list() {
        let config = Config::from_json(ORIGINAL, "test").unwrap();
        assert_eq!(config.initial_stage, StageId::from("l2"));
    }

    #[test]
    fn test_explicit_initial_stage() {
        let text = r#"{ "monitorLists": { "l1": "A", "l2": "B" }, "initialList": "l0" }"#;
        let config = Config::from_json(text, "test").unwrap();
        assert_eq!(config.initial_stage, StageId::from("l0"));
    }

    #[test]
    fn test_ignore_cards_object_honours_flags() {
        let config = Config::from_json(ORIGINAL, "test").unwrap();
        assert!(!config.ignore.should_process(&card("c1")));
        assert!(config.ignore.should_process(&card("c2")));
        assert!(config.ignore.should_process(&card("c3")));
    }

    #[test]
    fn test_ignore_cards_array() {
        let text = r#"{ "monitorLists": { "l1": "A" }, "ignoreCards": ["c1", "c2"] }"#;
        let config = Config::from_json(text, "test").unwrap();
        assert_eq!(config.ignore.len(), 2);
        assert!(!config.ignore.should_process(&card("c2")));
    }

    #[test]
    fn test_monitor_lists_array_form() {
        let text = r#"{ "monitorLists": [ { "id": "l9", "name": "Z" }, { "id": "l1", "name": "A" } ] }"#;
        let config = Config::from_json(text, "test").unwrap();
        assert_eq!(config.monitored_ids(), vec![StageId::from("l9"), StageId::from("l1")]);
    }

    #[test]
    fn test_empty_monitor_lists_rejected() {
        let err = Config::from_json(r#"{ "monitorLists": {} }"#, "test").unwrap_err();
        assert!(matches!(err, TrimmerError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_monitor_lists_rejected() {
        let err = Config::from_json(r#"{ "trello": {} }"#, "conf.json").unwrap_err();
        assert!(matches!(err, TrimmerError::ConfigParse { .. }));
        assert!(err.to_string().contains("conf.json"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let text = r#"{ "monitorLists": { "l1": "A" }, "concurrency": 0 }"#;
        assert!(Config::from_json(text, "test").is_err());
    }

    #[test]
    fn test_huge_concurrency_rejected() {
        let text = r#"{ "monitorLists": { "l1": "A" }, "concurrency": 18446744073709551615 }"#;
        let err = Config::from_json(text, "test").unwrap_err();
        assert!(matches!(err, TrimmerError::InvalidConfig(_)));
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_max_concurrency_accepted() {
        let text = format!(r#"{{ "monitorLists": {{ "l1": "A" }}, "concurrency": {MAX_CONCURRENCY} }}"#);
        let config = Config::from_json(&text, "test").unwrap();
        assert_eq!(config.concurrency, MAX_CONCURRENCY);
    }

    #[test]
    fn test_actions_limit_above_page_size_rejected() {
        let text = r#"{ "monitorLists": { "l1": "A" }, "actionsLimit": 1001 }"#;
        let err = Config::from_json(text, "test").unwrap_err();
        assert!(matches!(err, TrimmerError::InvalidConfig(_)));
        assert!(err.to_string().contains("actionsLimit"));
    }

    #[test]
    fn test_zero_actions_limit_rejected() {
        let text = r#"{ "monitorLists": { "l1": "A" }, "actionsLimit": 0 }"#;
        assert!(Config::from_json(text, "test").is_err());
    }

    #[test]
    fn test_repeated_list_id_keeps_one_column() {
        let text = r#"{ "monitorLists": { "L1": "A", "L2": "Doing", "L1": "B" } }"#;
        let config = Config::from_json(text, "test").unwrap();
        assert_eq!(
            config.monitored,
            vec![
                MonitoredStage {
                    id: StageId::from("L1"),
                    name: "B".to_string(),
                },
                MonitoredStage {
                    id: StageId::from("L2"),
                    name: "Doing".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_repeated_list_id_in_array_form() {
        let text = r#"{ "monitorLists": [ { "id": "L1", "name": "A" }, { "id": "L1", "name": "B" } ] }"#;
        let config = Config::from_json(text, "test").unwrap();
        assert_eq!(config.monitored_ids(), vec![StageId::from("L1")]);
        assert_eq!(config.monitored[0].name, "B");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let text = r#"{ "monitorLists": { "l1": "A" }, "baseUrl": "http://localhost:9000/1/" }"#;
        let config = Config::from_json(text, "test").unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/1");
    }

    #[test]
    fn test_credential_overrides() {
        let config = Config::from_json(ORIGINAL, "test")
            .unwrap()
            .with_credential_overrides(Some("env-key".to_string()), None);
        assert_eq!(config.credentials.api_key, "env-key");
        assert_eq!(config.credentials.api_token, "token");
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = Config::from_json(ORIGINAL, "test").unwrap();
        let debug = format!("{:?}", config.credentials);
        assert!(!debug.contains("\"token\""));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/trimmer.conf")).unwrap_err();
        assert!(matches!(err, TrimmerError::ConfigRead { .. }));
        assert!(err.is_fatal());
    }
}
