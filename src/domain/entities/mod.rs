//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod message;
pub mod event;
pub mod command;
pub mod session;

pub use user::User;
pub use message::{Message, Content};
pub use event::{ConnectionUpdate, TransportEvent, UpsertKind};
pub use command::{Capability, CommandDescriptor, CommandRegistry};
pub use session::{CloseDecision, ConnectionState, CredentialHandle, ReconnectPolicy, Session};
