//! Dispatch context handed to command handlers

use std::sync::Arc;

use crate::domain::entities::Message;
use crate::domain::traits::Transport;

/// Everything a handler needs for one command invocation
#[derive(Clone)]
pub struct DispatchContext {
    pub sender: String,
    pub chat_id: String,
    /// Canonical command name (aliases already resolved)
    pub command: String,
    pub args: Vec<String>,
    pub message: Message,
    pub transport: Arc<dyn Transport>,
    /// Current concurrency hint from the resource governor
    pub concurrency_hint: usize,
}

impl DispatchContext {
    pub fn new(
        message: Message,
        command: impl Into<String>,
        args: Vec<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            sender: message.sender_id().to_string(),
            chat_id: message.chat_id.clone(),
            command: command.into(),
            args,
            message,
            transport,
            concurrency_hint: 1,
        }
    }

    pub fn with_concurrency_hint(mut self, hint: usize) -> Self {
        self.concurrency_hint = hint;
        self
    }

    /// Reply in the originating chat. Returns whether the send went through.
    pub async fn reply(&self, text: impl AsRef<str>) -> bool {
        match self.transport.send_text(&self.chat_id, text.as_ref()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(chat_id = %self.chat_id, command = %self.command, error = %e, "reply failed");
                false
            }
        }
    }
}
