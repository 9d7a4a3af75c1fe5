//! # RotaBot Core
//!
//! Shared foundation for the RotaBot workspace: the rota data model,
//! the error taxonomy, collaborator traits (history store, chat
//! gateway), configuration loading, and ISO-8601 duration parsing.
//!
//! Nothing in this crate performs I/O beyond config file reads — the
//! concrete store and gateway implementations live in `rotabot-store`
//! and `rotabot-channels`.

pub mod config;
pub mod duration;
pub mod error;
pub mod traits;
pub mod types;

pub use config::RotaBotConfig;
pub use error::{Result, RotaBotError};
pub use traits::{ChatGateway, HistoryStore};
pub use types::{AlertSchedule, Decision, HistoryRecord, InboundMessage, Rota};
