//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Core business objects (Message, Session, Command)
//! - Traits: Abstractions for infrastructure (Transport, Connector, CommandHandler)

pub mod entities;
pub mod traits;
