//! # RotaBot Engine
//!
//! The rotation state machine and its orchestration:
//! - [`engine`] — pure decision logic: given a rota, its history, and
//!   the current instant, decide who is on duty and whether the
//!   rotation advances. No I/O, fully deterministic.
//! - [`registry`] — the configured rota set, looked up by id.
//! - [`resolver`] — fetch history, run the engine, persist the new
//!   assignment on transition, optionally resolve the assignee to a
//!   platform identity.

pub mod engine;
pub mod registry;
pub mod resolver;

pub use engine::decide;
pub use registry::RotaRegistry;
pub use resolver::{DutyResolver, Resolution};
