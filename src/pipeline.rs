//! Report run: list membership, card histories, rows
//!
//! Lists are fetched concurrently and any list failure aborts the run
//! before the report sink is opened. Cards are then processed as
//! independent tasks; a failing card is logged and left out while the
//! others continue. Rows are written in completion order by this task
//! alone.

use crate::config::Config;
use crate::csv_output::ReportWriter;
use crate::error::{Result, TrimmerError};
use crate::model::{StageId, Unit, UnitSummary};
use crate::movement::reconstruct;
use crate::report::{build_row, ReportRow};
use crate::residency::{aggregate, to_hours};
use crate::timestamp::decode_created_at;
use crate::trello::{move_events, BoardSource};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cards listed across all monitored lists, after de-duplication
    pub listed: usize,
    pub ignored: usize,
    /// Cards left out because of a card-level error
    pub skipped: usize,
    pub rows_written: usize,
}

/// Compute the report row of one card
///
/// The card is assumed to start in `initial_stage` at the instant encoded
/// in its id; its last stay is measured up to `now`.
pub fn process_unit(
    unit: &Unit,
    initial_stage: &StageId,
    monitored: &[StageId],
    now: DateTime<Utc>,
) -> Result<ReportRow> {
    let created_at = decode_created_at(&unit.id)?;
    Ok(row_for(unit, created_at, initial_stage, monitored, now))
}

fn row_for(
    unit: &Unit,
    created_at: DateTime<Utc>,
    initial_stage: &StageId,
    monitored: &[StageId],
    now: DateTime<Utc>,
) -> ReportRow {
    let segments = reconstruct(initial_stage, created_at, &unit.events);
    tracing::debug!(card = %unit.id, name = %unit.name, created = %created_at, "card");
    for segment in &segments {
        tracing::debug!(card = %unit.id, "    => {}   {}", segment.stage, segment.entered_at);
    }

    let table = aggregate(&segments, now);
    for (stage, duration) in table.iter() {
        tracing::debug!(card = %unit.id, "    {}   ===>  {} hours", stage, to_hours(*duration));
    }

    build_row(unit, created_at, &table, monitored)
}

/// Fetch the cards of every monitored list
///
/// Lists are queried concurrently. The first failing list aborts the
/// remaining requests and is returned as a fatal error. Cards are returned in
/// list configuration order; a card reported under several lists is kept
/// once.
pub async fn fetch_membership(
    source: Arc<dyn BoardSource>,
    stages: &[StageId],
) -> Result<Vec<UnitSummary>> {
    let mut tasks = JoinSet::new();
    for (index, stage) in stages.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        tasks.spawn(async move {
            let units = source.fetch_units_of_stage(&stage).await;
            (index, units)
        });
    }

    let mut per_stage: Vec<Vec<UnitSummary>> = vec![Vec::new(); stages.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, units) = match joined {
            Ok(result) => result,
            Err(e) => {
                tasks.abort_all();
                return Err(TrimmerError::StageUnavailable {
                    stage: "(unknown)".to_string(),
                    reason: format!("fetch task failed: {e}"),
                });
            }
        };
        match units {
            Ok(units) => per_stage[index] = units,
            Err(e) => {
                tasks.abort_all();
                return Err(stage_failure(&stages[index], e));
            }
        }
    }

    let mut seen = HashSet::new();
    let mut units = Vec::new();
    for unit in per_stage.into_iter().flatten() {
        if seen.insert(unit.id.clone()) {
            units.push(unit);
        } else {
            tracing::debug!(card = %unit.id, "card listed under several lists, keeping first");
        }
    }
    Ok(units)
}

/// Any failure to read a list is fatal, whatever the source reported
fn stage_failure(stage: &StageId, err: TrimmerError) -> TrimmerError {
    if err.is_fatal() {
        err
    } else {
        TrimmerError::StageUnavailable {
            stage: stage.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Run a complete report
///
/// `open_sink` is only called once list membership is known, so a fatal
/// list error leaves no report behind. A fatal card error (bad
/// credentials) stops the run with the rows written so far. Returns the
/// run counters and the flushed sink.
pub async fn run_report<W, F>(
    source: Arc<dyn BoardSource>,
    config: &Config,
    now: DateTime<Utc>,
    open_sink: F,
) -> Result<(RunSummary, W)>
where
    W: Write,
    F: FnOnce() -> std::io::Result<W>,
{
    let monitored: Arc<[StageId]> = config.monitored_ids().into();
    let listed = fetch_membership(Arc::clone(&source), &monitored).await?;

    let mut summary = RunSummary {
        listed: listed.len(),
        ..RunSummary::default()
    };

    let mut writer = ReportWriter::new(open_sink()?);
    writer.write_header(&config.monitored)?;

    let limiter = Arc::new(Semaphore::new(config.concurrency));
    let initial_stage = config.initial_stage.clone();
    let mut tasks = JoinSet::new();

    for card in listed {
        if !config.ignore.should_process(&card) {
            tracing::debug!(card = %card.id, "ignored");
            summary.ignored += 1;
            continue;
        }

        let source = Arc::clone(&source);
        let limiter = Arc::clone(&limiter);
        let monitored = Arc::clone(&monitored);
        let initial_stage = initial_stage.clone();
        tasks.spawn(async move {
            let id = card.id.clone();
            let row = fetch_and_process(source, limiter, card, initial_stage, monitored, now).await;
            (id, row)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(row))) => writer.write_row(&row)?,
            Ok((id, Err(e))) if e.is_fatal() => {
                tracing::error!(card = %id, "aborting run: {}", e);
                tasks.abort_all();
                return Err(e);
            }
            Ok((id, Err(e))) => {
                tracing::warn!(card = %id, "skipping card: {}", e);
                summary.skipped += 1;
            }
            Err(e) => {
                tracing::warn!("card task failed: {}", e);
                summary.skipped += 1;
            }
        }
    }

    summary.rows_written = writer.rows_written();
    let sink = writer.finish()?;
    tracing::info!(
        listed = summary.listed,
        written = summary.rows_written,
        ignored = summary.ignored,
        skipped = summary.skipped,
        "report complete"
    );
    Ok((summary, sink))
}

async fn fetch_and_process(
    source: Arc<dyn BoardSource>,
    limiter: Arc<Semaphore>,
    card: UnitSummary,
    initial_stage: StageId,
    monitored: Arc<[StageId]>,
    now: DateTime<Utc>,
) -> Result<ReportRow> {
    // A card whose id carries no timestamp is not worth a request
    let created_at = decode_created_at(&card.id)?;

    let history = {
        let _permit = limiter.acquire().await.map_err(|e| TrimmerError::Http {
            resource: format!("card {}", card.id),
            reason: e.to_string(),
        })?;
        source.fetch_event_history(&card.id).await?
    };

    let unit = Unit::new(card, move_events(&history));
    Ok(row_for(&unit, created_at, &initial_stage, &monitored, now))
}
