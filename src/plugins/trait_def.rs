//! Plugin trait definitions

use crate::application::errors::CommandError;
use crate::domain::entities::CommandRegistry;

/// A bundle of commands installed into the registry at startup
pub trait Plugin: Send + Sync {
    /// Unique identifier for the plugin
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Add this plugin's commands. Fails on a name or alias clash.
    fn register(&self, registry: &mut CommandRegistry) -> Result<(), CommandError>;
}
