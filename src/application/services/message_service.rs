use std::sync::Arc;

use crate::application::messaging::{CommandRouter, DispatchOutcome};
use crate::application::moderation::{ModerationEngine, Verdict};
use crate::domain::entities::{Message, UpsertKind};
use crate::domain::traits::Transport;

/// Why a message was dropped before moderation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    SelfSent,
    NoContent,
}

/// Final disposition of one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Ignored(IgnoreReason),
    Sanctioned(Verdict),
    /// Clean, and not a command
    Passed,
    Dispatched(DispatchOutcome),
}

/// Where a message stands once moderation has seen it
#[derive(Debug)]
pub enum Screened {
    Done(Disposition),
    /// Clean command, ready for the router
    Command(Message),
}

/// Runs each inbound message through moderation, then the router
pub struct MessageService {
    moderation: Arc<ModerationEngine>,
    router: Arc<CommandRouter>,
}

impl MessageService {
    pub fn new(moderation: Arc<ModerationEngine>, router: Arc<CommandRouter>) -> Self {
        Self { moderation, router }
    }

    pub fn moderation(&self) -> &Arc<ModerationEngine> {
        &self.moderation
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    /// Only live deliveries are processed; history replays are skipped.
    pub fn accepts_batch(kind: UpsertKind) -> bool {
        kind == UpsertKind::Notify
    }

    /// Process an incoming message. Moderation always runs before dispatch and
    /// a sanctioned message never reaches the router.
    pub async fn process(&self, transport: Arc<dyn Transport>, message: Message) -> Disposition {
        match self.screen(transport.as_ref(), message).await {
            Screened::Done(disposition) => disposition,
            Screened::Command(message) => self.dispatch(transport, &message).await,
        }
    }

    /// Everything up to and including moderation. A message only comes back as
    /// `Command` when it is clean and carries the command prefix.
    pub async fn screen(&self, transport: &dyn Transport, message: Message) -> Screened {
        if message.from_me {
            return Screened::Done(Disposition::Ignored(IgnoreReason::SelfSent));
        }
        if message.content.is_empty() {
            return Screened::Done(Disposition::Ignored(IgnoreReason::NoContent));
        }

        tracing::debug!(
            chat_id = %message.chat_id,
            sender = message.sender_id(),
            name = ?message.sender.as_ref().map(|u| u.display_name()),
            "new message"
        );

        let verdict = self.moderation.inspect(transport, &message).await;
        if verdict.is_sanctioned() {
            return Screened::Done(Disposition::Sanctioned(verdict));
        }

        if !self.router.is_command(message.text()) {
            return Screened::Done(Disposition::Passed);
        }
        Screened::Command(message)
    }

    /// Route a screened command to its handler.
    pub async fn dispatch(&self, transport: Arc<dyn Transport>, message: &Message) -> Disposition {
        Disposition::Dispatched(self.router.dispatch(transport, message).await)
    }
}
