//! Application-level orchestration: the state machine and the integrity
//! subsystem.

pub mod integrity;
pub mod state_service;

pub use integrity::IntegrityChecker;
pub use state_service::StateService;
