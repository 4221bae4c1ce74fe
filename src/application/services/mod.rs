//! Application services - Business logic orchestration

pub mod message_service;

pub use message_service::{Disposition, IgnoreReason, MessageService, Screened};
