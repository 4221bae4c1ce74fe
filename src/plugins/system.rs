//! System commands: liveness, menus and owner shutdown

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use crate::application::errors::CommandError;
use crate::application::messaging::DispatchContext;
use crate::application::supervisor::ShutdownSignal;
use crate::domain::entities::{CommandDescriptor, CommandRegistry};
use crate::domain::traits::CommandHandler;
use crate::plugins::canned::CannedReply;
use crate::plugins::trait_def::Plugin;

/// Lists the registry. The text is published once every plugin is installed.
#[derive(Default)]
pub struct MenuHandler {
    text: OnceCell<String>,
}

impl MenuHandler {
    pub fn publish(&self, registry: &CommandRegistry, prefix: &str) {
        if self.text.set(registry.help_text(prefix)).is_err() {
            tracing::debug!("menu already published");
        }
    }
}

#[async_trait]
impl CommandHandler for MenuHandler {
    async fn handle(&self, ctx: &DispatchContext) {
        let text = self
            .text
            .get()
            .map(String::as_str)
            .unwrap_or("Full menu loaded. Choose wisely.");
        ctx.reply(text).await;
    }
}

struct ShutdownHandler {
    signal: ShutdownSignal,
}

#[async_trait]
impl CommandHandler for ShutdownHandler {
    async fn handle(&self, ctx: &DispatchContext) {
        tracing::warn!(sender = %ctx.sender, "shutdown requested by owner");
        ctx.reply("Shutdown initiated. Exiting.").await;
        self.signal.trigger();
    }
}

pub struct SystemPlugin {
    shutdown: ShutdownSignal,
    menu: Arc<MenuHandler>,
}

impl SystemPlugin {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            shutdown,
            menu: Arc::new(MenuHandler::default()),
        }
    }

    pub fn menu(&self) -> Arc<MenuHandler> {
        Arc::clone(&self.menu)
    }
}

impl Plugin for SystemPlugin {
    fn name(&self) -> &str {
        "system"
    }

    fn description(&self) -> &str {
        "Liveness, menus and shutdown"
    }

    fn register(&self, registry: &mut CommandRegistry) -> Result<(), CommandError> {
        registry.register(
            CommandDescriptor::new("ping", Arc::new(CannedReply::new("Pong. No frills.")))
                .with_description("Check the bot responds"),
        )?;
        registry.register(
            CommandDescriptor::new("alive", Arc::new(CannedReply::new("Status: Operational. No exceptions.")))
                .with_description("Report status"),
        )?;
        registry.register(
            CommandDescriptor::new("menu", self.menu.clone()).with_description("List commands"),
        )?;
        registry.register(
            CommandDescriptor::new(
                "ownermenu",
                Arc::new(CannedReply::new("Owner Menu: .shutdown, .broadcast, .autobio")),
            )
            .with_description("List owner commands")
            .owner_only(),
        )?;
        registry.register(
            CommandDescriptor::new(
                "shutdown",
                Arc::new(ShutdownHandler {
                    signal: self.shutdown.clone(),
                }),
            )
            .with_description("Stop the bot")
            .owner_only(),
        )?;
        Ok(())
    }
}
