//! Collaborator traits — the seams between the core and the outside
//! world. Concrete implementations live in `rotabot-store` (SQLite,
//! in-memory) and `rotabot-channels` (Slack); the resolver and
//! dispatcher are written against these traits so they test with fakes.

use async_trait::async_trait;
use futures::stream::Stream;

use crate::error::Result;
use crate::types::{HistoryRecord, InboundMessage};

/// Durable append-only log of duty assignments.
///
/// The store has no secondary index on `rota_id`; callers read the
/// whole collection and filter client-side. Records are immutable once
/// written — there is no update or delete.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Read every record in the history collection.
    async fn scan_all(&self) -> Result<Vec<HistoryRecord>>;

    /// Append one record.
    async fn put(&self, record: HistoryRecord) -> Result<()>;
}

/// Chat platform connection: message delivery, name resolution, and
/// the inbound event stream. Reconnection policy is owned by the
/// implementation, not by callers of `listen`.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Deliver text to a channel or user id.
    async fn send_message(&self, channel_or_user_id: &str, text: &str) -> Result<()>;

    /// Resolve a display name to a platform user id.
    /// Returns "unknown" when the name does not match any user.
    async fn user_id_by_name(&self, display_name: &str) -> Result<String>;

    /// Resolve a channel name to its id. Returns "unknown" on miss.
    async fn channel_id_by_name(&self, name: &str) -> Result<String>;

    /// Long-lived stream of inbound message events.
    async fn listen(&self) -> Result<Box<dyn Stream<Item = InboundMessage> + Send + Unpin>>;
}
