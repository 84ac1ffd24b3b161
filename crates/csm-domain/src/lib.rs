//! Domain types, repository contracts and outbound ports for the codebase
//! state machine. This crate holds no I/O and no framework dependencies
//! beyond serialization and hashing.

pub mod constants;
pub mod error;
pub mod ports;
pub mod repositories;
pub mod value_objects;

pub use error::{Error, Result};
