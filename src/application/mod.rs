//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Supervisor: Connection lifecycle and reconnect loop
//! - Moderation: Spam detection and sanctions
//! - Messaging: Command parsing and routing
//! - Services: The per-message pipeline
//! - Resources: Post-command maintenance hooks
//! - Errors: Domain-specific errors

pub mod errors;
pub mod messaging;
pub mod moderation;
pub mod resources;
pub mod services;
pub mod supervisor;
