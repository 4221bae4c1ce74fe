//! stiletto-bot - session supervisor for a group chat bot
//!
//! Keeps one authenticated session alive, reconnecting with exponential backoff
//! (uncapped unless a ceiling is configured) up to a fixed retry budget,
//! moderates spam with escalating sanctions, and routes prefixed commands.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
