//! # RotaBot Channels
//!
//! Chat gateway implementations. Slack is the only platform wired in:
//! - [`slack`] — Web API client (`chat.postMessage`, `users.list`,
//!   `conversations.list`, `auth.test`) implementing `ChatGateway`.
//! - [`socket_mode`] — Socket Mode listener producing the inbound
//!   message stream, reconnecting on its own.

pub mod slack;
pub mod socket_mode;

pub use slack::SlackGateway;
