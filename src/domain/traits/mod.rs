//! Domain traits - Abstractions for infrastructure implementations

pub mod handler;
pub mod transport;

pub use handler::CommandHandler;
pub use transport::{Connection, Connector, Transport};
