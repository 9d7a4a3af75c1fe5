//! Pure rotation decision logic.
//!
//! `decide` depends only on its arguments — no clock reads, no store
//! access — so every rotation behavior is unit-testable exactly.

use chrono::{DateTime, Utc};

use rotabot_core::duration::parse_iso8601;
use rotabot_core::error::{Result, RotaBotError};
use rotabot_core::types::{Decision, HistoryRecord, Rota};

/// Decide the current duty-holder for `rota` at instant `now`.
///
/// `history` may contain records for other rotas, in any order, or be
/// empty — the engine filters by `rota.id` and picks the record with
/// the maximum `end_time` itself. If that record is still active the
/// decision holds the current assignee; otherwise the rotation
/// advances to the next participant (wrapping), or bootstraps to the
/// first participant when no history exists.
///
/// An assignee no longer present in `rota.participants` (membership
/// changed after the record was written) wraps to the first
/// participant. That is policy, not an error.
pub fn decide(rota: &Rota, history: &[HistoryRecord], now: DateTime<Utc>) -> Result<Decision> {
    if rota.participants.is_empty() {
        return Err(RotaBotError::InvalidRota {
            rota_id: rota.id.clone(),
            reason: "participant list is empty".into(),
        });
    }

    let latest = history
        .iter()
        .filter(|r| r.rota_id == rota.id)
        .max_by_key(|r| r.end_time);

    if let Some(latest) = latest {
        if latest.end_time > now {
            return Ok(Decision::hold(&latest.assignee));
        }
    }

    let next = match latest {
        None => &rota.participants[0],
        Some(latest) => next_participant(&rota.participants, &latest.assignee),
    };

    // Config validation checks this at startup; an unparseable
    // duration here means the rota bypassed it.
    let duration = parse_iso8601(&rota.duty_duration).ok_or_else(|| {
        RotaBotError::InvalidRota {
            rota_id: rota.id.clone(),
            reason: format!("unparseable duty_duration '{}'", rota.duty_duration),
        }
    })?;

    Ok(Decision::advance(next, now + duration))
}

/// Next participant after `current`, wrapping at the end of the list.
/// A `current` not in the list wraps to the front.
fn next_participant<'a>(participants: &'a [String], current: &str) -> &'a String {
    match participants.iter().position(|p| p == current) {
        Some(i) if i + 1 < participants.len() => &participants[i + 1],
        _ => &participants[0],
    }
}
