//! Command router - resolves aliases, checks capabilities, invokes handlers

use std::sync::Arc;

use tracing::{debug, info};

use super::context::DispatchContext;
use super::parser::CommandParser;
use crate::application::resources::ResourceGovernor;
use crate::domain::entities::user::user_part;
use crate::domain::entities::{Capability, CommandRegistry, Message};
use crate::domain::traits::Transport;

pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command.";
pub const PERMISSION_DENIED_REPLY: &str = "Permission denied. You are not the owner.";

/// What happened to one command message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The text was not a command
    NotACommand,
    NotFound { name: String },
    PermissionDenied { command: String },
    InvalidArguments { command: String, expected: usize, got: usize },
    Invoked { command: String },
}

/// Whether `sender` is the configured owner. Compares account parts so that
/// device and server suffixes do not matter. An empty owner matches nobody.
pub fn is_owner(sender: &str, owner: &str) -> bool {
    let owner = user_part(owner);
    !owner.is_empty() && user_part(sender) == owner
}

pub struct CommandRouter {
    parser: CommandParser,
    registry: Arc<CommandRegistry>,
    owner: String,
    governor: Option<Arc<ResourceGovernor>>,
}

impl CommandRouter {
    pub fn new(prefix: impl Into<String>, owner: impl Into<String>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            parser: CommandParser::new(prefix),
            registry,
            owner: owner.into(),
            governor: None,
        }
    }

    /// Attach the governor whose maintenance runs after each dispatch
    pub fn with_governor(mut self, governor: Arc<ResourceGovernor>) -> Self {
        self.governor = Some(governor);
        self
    }

    pub fn is_command(&self, text: &str) -> bool {
        self.parser.is_command(text)
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn prefix(&self) -> &str {
        self.parser.prefix()
    }

    /// Route one message. Replies for unknown / denied / malformed commands are
    /// sent here; everything else is up to the handler.
    pub async fn dispatch(&self, transport: Arc<dyn Transport>, message: &Message) -> DispatchOutcome {
        let Some(parsed) = self.parser.parse(message.text()) else {
            return DispatchOutcome::NotACommand;
        };

        let outcome = self.route(transport, message, parsed.name, parsed.args).await;

        if let Some(governor) = &self.governor {
            governor.schedule_maintenance();
        }
        outcome
    }

    async fn route(
        &self,
        transport: Arc<dyn Transport>,
        message: &Message,
        name: String,
        args: Vec<String>,
    ) -> DispatchOutcome {
        let sender = message.sender_id();
        debug!(chat_id = %message.chat_id, sender, command = %name, ?args, "received command");

        let Some(descriptor) = self.registry.resolve(&name) else {
            reply(transport.as_ref(), &message.chat_id, UNKNOWN_COMMAND_REPLY).await;
            return DispatchOutcome::NotFound { name };
        };
        let command = descriptor.name.clone();

        if descriptor.capability == Capability::Owner && !is_owner(sender, &self.owner) {
            info!(chat_id = %message.chat_id, sender, command = %command, "owner command refused");
            reply(transport.as_ref(), &message.chat_id, PERMISSION_DENIED_REPLY).await;
            return DispatchOutcome::PermissionDenied { command };
        }

        if args.len() < descriptor.min_args {
            let usage = descriptor
                .usage
                .clone()
                .unwrap_or_else(|| format!("{}{}", self.prefix(), command));
            reply(transport.as_ref(), &message.chat_id, &format!("Usage: {usage}")).await;
            return DispatchOutcome::InvalidArguments {
                command,
                expected: descriptor.min_args,
                got: args.len(),
            };
        }

        let hint = self
            .governor
            .as_ref()
            .map(|g| g.max_concurrent_tasks())
            .unwrap_or(1);
        let ctx = DispatchContext::new(message.clone(), command.clone(), args, transport)
            .with_concurrency_hint(hint);
        descriptor.handler.handle(&ctx).await;

        DispatchOutcome::Invoked { command }
    }
}

async fn reply(transport: &dyn Transport, chat_id: &str, text: &str) {
    if let Err(e) = transport.send_text(chat_id, text).await {
        tracing::warn!(chat_id, error = %e, "reply failed");
    }
}
