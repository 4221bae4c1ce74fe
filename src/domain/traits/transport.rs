use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::errors::TransportError;
use crate::domain::entities::{CredentialHandle, TransportEvent};

/// Transport trait - outbound operations on the chat platform
///
/// Every call is best-effort; callers decide whether a failure matters.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text reply to a chat. Returns the new message id.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<String, TransportError>;

    /// Delete a message for everyone in the chat
    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        participant: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Temporarily stop a participant from writing in a chat
    async fn restrict_participant(&self, chat_id: &str, participant: &str) -> Result<(), TransportError>;

    /// Kick a participant out of a chat
    async fn remove_participant(&self, chat_id: &str, participant: &str) -> Result<(), TransportError>;
}

/// A live connection: the outbound handle plus its inbound event stream
pub struct Connection {
    pub transport: Arc<dyn Transport>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Connector trait - builds a fresh session with the remote service
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &CredentialHandle) -> Result<Connection, TransportError>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect(&self, credentials: &CredentialHandle) -> Result<Connection, TransportError> {
        (**self).connect(credentials).await
    }
}
