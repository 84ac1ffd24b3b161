//! MCP tool handlers: each translates one tool call into a
//! [`csm_application::use_cases::state_service::StateService`] call, gated
//! by the rate limiter.

pub mod integrity;
pub mod readers;
pub mod writers;

pub use integrity::IntegrityHandlers;
pub use readers::ReadHandlers;
pub use writers::WriteHandlers;
