//! Composition root.

mod bootstrap;

pub use bootstrap::{bootstrap, AppServices};
