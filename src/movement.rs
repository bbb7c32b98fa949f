//! Reconstruction of a card's stay sequence from its move events
//!
//! The card is assumed to start in `initial_stage` at its creation instant;
//! every move event then opens a new stay. Events arrive in whatever order
//! the board API returns them.

use crate::model::{MoveEvent, StageId, StaySegment};
use chrono::{DateTime, Utc};

/// Build the chronologically ordered stay sequence of a card
///
/// Returns exactly `1 + events.len()` segments: the synthetic creation
/// segment followed by one segment per event, sorted ascending by entry
/// time. Nothing is merged or dropped, a move into the list the card is
/// already in yields its own segment.
///
/// Equal timestamps are ordered deterministically: the creation segment
/// comes first, then events by destination id. The result therefore does
/// not depend on the order of `events`.
pub fn reconstruct(
    initial_stage: &StageId,
    created_at: DateTime<Utc>,
    events: &[MoveEvent],
) -> Vec<StaySegment> {
    let mut moves: Vec<&MoveEvent> = events.iter().collect();
    moves.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.destination.cmp(&b.destination))
    });

    let mut segments = Vec::with_capacity(events.len() + 1);
    segments.push(StaySegment {
        stage: initial_stage.clone(),
        entered_at: created_at,
    });
    segments.extend(moves.into_iter().map(|event| StaySegment {
        stage: event.destination.clone(),
        entered_at: event.occurred_at,
    }));

    // Stable: keeps the creation segment ahead of events sharing its instant
    segments.sort_by_key(|segment| segment.entered_at);
    segments
}
