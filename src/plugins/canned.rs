//! Canned-reply commands: fixed text, no side effects

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::CommandError;
use crate::application::messaging::DispatchContext;
use crate::domain::entities::{CommandDescriptor, CommandRegistry};
use crate::domain::traits::CommandHandler;
use crate::plugins::trait_def::Plugin;

/// Handler that always answers with the same text
pub struct CannedReply {
    text: &'static str,
}

impl CannedReply {
    pub fn new(text: &'static str) -> Self {
        Self { text }
    }
}

#[async_trait]
impl CommandHandler for CannedReply {
    async fn handle(&self, ctx: &DispatchContext) {
        ctx.reply(self.text).await;
    }
}

struct Canned {
    name: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
    reply: &'static str,
    owner: bool,
    usage: Option<&'static str>,
    min_args: usize,
}

const CANNED: &[Canned] = &[
    Canned {
        name: "broadcast",
        aliases: &[],
        description: "Broadcast a message",
        reply: "Broadcasting message. This is not a charity service.",
        owner: true,
        usage: Some(".broadcast <text>"),
        min_args: 1,
    },
    Canned {
        name: "autobio",
        aliases: &["bio"],
        description: "Update the bot bio",
        reply: "Owner bio updated. No emotions.",
        owner: true,
        usage: None,
        min_args: 0,
    },
    Canned {
        name: "profilepic",
        aliases: &["pp"],
        description: "Fetch a profile picture",
        reply: "Fetching profile picture. One moment.",
        owner: false,
        usage: None,
        min_args: 0,
    },
    Canned {
        name: "antilink",
        aliases: &[],
        description: "Enable link filtering",
        reply: "Antilink activated. Unwanted links will vanish.",
        owner: false,
        usage: None,
        min_args: 0,
    },
    Canned {
        name: "welcome",
        aliases: &[],
        description: "Set the welcome message",
        reply: "Welcome message set. Cold and calculated.",
        owner: false,
        usage: None,
        min_args: 0,
    },
    Canned {
        name: "goodbye",
        aliases: &[],
        description: "Set the goodbye message",
        reply: "Goodbye message set. No sentimental attachments.",
        owner: false,
        usage: None,
        min_args: 0,
    },
    Canned {
        name: "warn",
        aliases: &[],
        description: "Issue a warning",
        reply: "[SYSTEM] WARNING: Your behavior is unacceptable. Cease all activity immediately or prepare to be removed.",
        owner: false,
        usage: None,
        min_args: 0,
    },
    Canned {
        name: "dare",
        aliases: &[],
        description: "Get a dare",
        reply: "Dare: Prove your worth. No excuses.",
        owner: false,
        usage: None,
        min_args: 0,
    },
    Canned {
        name: "truth",
        aliases: &[],
        description: "Get a truth",
        reply: "Truth: Face reality. No sugarcoating.",
        owner: false,
        usage: None,
        min_args: 0,
    },
];

/// The fixed-reply command set
pub struct CannedPlugin;

impl Plugin for CannedPlugin {
    fn name(&self) -> &str {
        "canned"
    }

    fn description(&self) -> &str {
        "Fixed-text replies"
    }

    fn register(&self, registry: &mut CommandRegistry) -> Result<(), CommandError> {
        for entry in CANNED {
            let mut descriptor = CommandDescriptor::new(entry.name, Arc::new(CannedReply::new(entry.reply)))
                .with_description(entry.description)
                .with_aliases(entry.aliases.iter().copied())
                .with_min_args(entry.min_args);
            if let Some(usage) = entry.usage {
                descriptor = descriptor.with_usage(usage);
            }
            if entry.owner {
                descriptor = descriptor.owner_only();
            }
            registry.register(descriptor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Capability;

    #[test]
    fn registers_aliases_and_owner_flags() {
        let mut registry = CommandRegistry::new();
        CannedPlugin.register(&mut registry).unwrap();

        assert_eq!(registry.len(), CANNED.len());
        assert_eq!(registry.resolve("pp").unwrap().name, "profilepic");
        assert_eq!(registry.resolve("bio").unwrap().name, "autobio");
        assert_eq!(registry.get("autobio").unwrap().capability, Capability::Owner);
        assert_eq!(registry.get("broadcast").unwrap().min_args, 1);
        assert_eq!(registry.get("profilepic").unwrap().capability, Capability::None);
    }

    #[test]
    fn second_install_conflicts() {
        let mut registry = CommandRegistry::new();
        CannedPlugin.register(&mut registry).unwrap();
        assert!(matches!(
            CannedPlugin.register(&mut registry),
            Err(CommandError::Conflict(_))
        ));
    }
}
