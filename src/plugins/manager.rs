//! Plugin manager - collects plugins and installs them into a registry

use tracing::{error, info};

use crate::application::errors::CommandError;
use crate::domain::entities::CommandRegistry;
use crate::plugins::trait_def::Plugin;

/// Manages all plugins for the bot
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> Result<(), String> {
        let name = plugin.name().to_string();

        if self.has_plugin(&name) {
            return Err(format!("Plugin '{}' already registered", name));
        }

        info!("Registering plugin: {} ({})", name, plugin.description());
        self.plugins.push(Box::new(plugin));
        Ok(())
    }

    /// Check if a plugin exists
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Install every plugin's commands, in registration order
    pub fn install_all(&self, registry: &mut CommandRegistry) -> Result<(), CommandError> {
        for plugin in &self.plugins {
            let before = registry.len();
            if let Err(e) = plugin.register(registry) {
                error!("Plugin '{}' failed to install: {}", plugin.name(), e);
                return Err(e);
            }
            info!(
                "Installed plugin '{}' ({} commands)",
                plugin.name(),
                registry.len() - before
            );
        }
        Ok(())
    }
}
