//! fxreplay: deterministic FX tick replay and paper-trading engine.
//!
//! Hexagonal architecture: the replay kernel in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
