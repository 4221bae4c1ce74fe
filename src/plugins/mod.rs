//! Built-in command plugins

pub mod canned;
pub mod manager;
pub mod system;
pub mod trait_def;

pub use canned::{CannedPlugin, CannedReply};
pub use manager::PluginManager;
pub use system::{MenuHandler, SystemPlugin};
pub use trait_def::Plugin;

use crate::application::errors::CommandError;
use crate::application::supervisor::ShutdownSignal;
use crate::domain::entities::CommandRegistry;

/// Registry with every built-in command installed and the menu rendered.
pub fn builtin_registry(prefix: &str, shutdown: ShutdownSignal) -> Result<CommandRegistry, CommandError> {
    let system = SystemPlugin::new(shutdown);
    let menu = system.menu();

    let mut manager = PluginManager::new();
    manager.register(system).map_err(CommandError::Conflict)?;
    manager.register(CannedPlugin).map_err(CommandError::Conflict)?;

    let mut registry = CommandRegistry::new();
    manager.install_all(&mut registry)?;
    menu.publish(&registry, prefix);
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::{CommandRouter, DispatchOutcome};
    use crate::domain::entities::Message;
    use crate::domain::traits::Transport;
    use crate::infrastructure::adapters::memory::MemoryTransport;
    use std::sync::Arc;

    const OWNER: &str = "15550001111@s.whatsapp.net";

    fn router(signal: ShutdownSignal) -> CommandRouter {
        let registry = builtin_registry(".", signal).unwrap();
        CommandRouter::new(".", OWNER, Arc::new(registry))
    }

    #[tokio::test]
    async fn menu_lists_every_command() {
        let (signal, _rx) = ShutdownSignal::channel();
        let router = router(signal);
        let transport = Arc::new(MemoryTransport::new());

        let outcome = router
            .dispatch(transport.clone(), &Message::from_text("chat@s.whatsapp.net", ".menu"))
            .await;
        assert_eq!(outcome, DispatchOutcome::Invoked { command: "menu".to_string() });

        let sent = transport.sent_texts();
        assert_eq!(sent.len(), 1);
        for name in [".ping", ".menu", ".profilepic", ".shutdown - Stop the bot [owner]"] {
            assert!(sent[0].contains(name), "menu missing {name}: {}", sent[0]);
        }
    }

    #[tokio::test]
    async fn owner_shutdown_triggers_signal() {
        let (signal, _rx) = ShutdownSignal::channel();
        let router = router(signal.clone());
        let transport = Arc::new(MemoryTransport::new());

        let stranger = Message::from_text("g@g.us", ".shutdown").with_participant("999@s.whatsapp.net");
        router.dispatch(transport.clone(), &stranger).await;
        assert!(!signal.is_triggered());

        let owner = Message::from_text("g@g.us", ".shutdown").with_participant("15550001111:3@s.whatsapp.net");
        let outcome = router.dispatch(transport.clone(), &owner).await;
        assert_eq!(outcome, DispatchOutcome::Invoked { command: "shutdown".to_string() });
        assert!(signal.is_triggered());
        assert_eq!(
            transport.sent_texts(),
            vec![
                "Permission denied. You are not the owner.".to_string(),
                "Shutdown initiated. Exiting.".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn ping_replies_in_originating_chat() {
        let (signal, _rx) = ShutdownSignal::channel();
        let router = router(signal);
        let transport = Arc::new(MemoryTransport::new());
        let dyn_transport: Arc<dyn Transport> = transport.clone();

        router
            .dispatch(dyn_transport, &Message::from_text("chat@s.whatsapp.net", ".PING"))
            .await;
        assert_eq!(transport.sent_texts(), vec!["Pong. No frills.".to_string()]);
    }
}
