//! Per-user conversation state machine
//!
//! - [`state`]: the state enum, each variant carrying its own context
//! - [`action`]: callback data grammar
//! - [`validation`]: local checks of typed input
//! - [`engine`]: transitions

pub mod action;
pub mod engine;
pub mod state;
pub mod validation;

pub use action::{Action, PathKind};
pub use engine::{EngineError, EventKind, InboundEvent, SessionEngine};
pub use state::State;
