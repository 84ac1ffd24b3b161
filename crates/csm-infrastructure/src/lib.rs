//! Ambient infrastructure for the codebase state machine: configuration,
//! logging, rate limiting, audit logging and the composition root that
//! wires `csm-providers` adapters behind `csm-domain` ports.

pub mod audit;
pub mod config;
pub mod constants;
pub mod di;
pub mod logging;
pub mod rate_limit;

pub use config::{AppConfig, ConfigLoader};
pub use di::{bootstrap, AppServices};
