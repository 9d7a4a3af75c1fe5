//! The rota data model — rotas, history records, and engine decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named recurring duty rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rota {
    /// Short stable identifier, unique across rotas. History records
    /// reference it, so it is immutable once any history exists.
    pub id: String,
    /// Display label, e.g. "Release Coordinator".
    pub name: String,
    /// Length of one assignment as an ISO-8601 duration ("P1DT12H").
    pub duty_duration: String,
    /// Ordered rotation sequence of participant display names.
    /// Order is load-bearing: index i hands over to index i+1.
    pub participants: Vec<String>,
    /// When and what to announce.
    pub alert: AlertSchedule,
}

/// A recurring reminder: schedule expression plus message template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSchedule {
    /// `@every <duration>` or a 5-field cron expression.
    pub expression: String,
    /// Message body appended after the duty-holder mention.
    pub message: String,
}

/// One completed or active duty assignment. Append-only: written once
/// by the resolver, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Globally unique, generated at creation (uuid v4).
    pub id: String,
    /// The owning rota.
    pub rota_id: String,
    /// Instant the assignment expires (creation time + duty_duration).
    pub end_time: DateTime<Utc>,
    /// Participant display name from the owning rota's list.
    pub assignee: String,
}

impl HistoryRecord {
    /// Create a fresh record with a generated id.
    pub fn new(rota_id: &str, assignee: &str, end_time: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            rota_id: rota_id.to_string(),
            end_time,
            assignee: assignee.to_string(),
        }
    }
}

/// Outcome of a rotation engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Who holds the duty after this decision.
    pub assignee: String,
    /// Whether the rotation advanced (a new record must be persisted).
    pub transitioned: bool,
    /// End of the new duty window; set iff `transitioned`.
    pub new_end_time: Option<DateTime<Utc>>,
}

impl Decision {
    /// The latest assignment is still active — no state change.
    pub fn hold(assignee: &str) -> Self {
        Self {
            assignee: assignee.to_string(),
            transitioned: false,
            new_end_time: None,
        }
    }

    /// The rotation advanced to a new assignee.
    pub fn advance(assignee: &str, new_end_time: DateTime<Utc>) -> Self {
        Self {
            assignee: assignee.to_string(),
            transitioned: true,
            new_end_time: Some(new_end_time),
        }
    }
}

/// An inbound chat message event, as surfaced by the gateway listener.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Channel the message arrived in.
    pub channel_id: String,
    /// Platform user id of the sender.
    pub sender_id: String,
    /// Raw message text.
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_record_ids_unique() {
        let now = Utc::now();
        let a = HistoryRecord::new("RC", "sc", now);
        let b = HistoryRecord::new("RC", "sc", now);
        assert_ne!(a.id, b.id);
        assert_eq!(a.rota_id, b.rota_id);
    }

    #[test]
    fn test_decision_constructors() {
        let now = Utc::now();
        let hold = Decision::hold("sc");
        assert!(!hold.transitioned);
        assert!(hold.new_end_time.is_none());

        let advance = Decision::advance("jo", now);
        assert!(advance.transitioned);
        assert_eq!(advance.new_end_time, Some(now));
    }
}
