//! Replay kernel: market data, clock, signals, ledger and policy.

pub mod clock;
pub mod config;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod ledger;
pub mod metrics;
pub mod policy;
pub mod position;
pub mod price_store;
pub mod signal;
pub mod signal_engine;
pub mod simulator;
pub mod snapshot;
pub mod tick;
pub mod timeframe;
