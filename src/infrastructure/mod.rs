//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Adapters: Transport integrations (console, in-memory)

pub mod adapters;
pub mod config;
