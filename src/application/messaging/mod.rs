//! Message handling - parsing, dispatch context, command routing

pub mod context;
pub mod parser;
pub mod router;

pub use context::DispatchContext;
pub use parser::{CommandParser, ParsedCommand};
pub use router::{is_owner, CommandRouter, DispatchOutcome};
