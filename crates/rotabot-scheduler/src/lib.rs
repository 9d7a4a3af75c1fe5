//! # RotaBot Scheduler
//!
//! Turns each rota's alert schedule into a recurring trigger. On each
//! firing the duty resolver is invoked, the reminder is formatted with
//! the duty-holder's mention, and the message is handed to the chat
//! gateway.
//!
//! Tokio interval ticking only — no cron crate dependency; schedule
//! expressions are parsed by [`schedule`].

pub mod dispatcher;
pub mod schedule;

pub use dispatcher::{spawn_dispatcher, TriggerDispatcher};
pub use schedule::Schedule;
