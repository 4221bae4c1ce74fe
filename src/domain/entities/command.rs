use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::domain::traits::CommandHandler;

/// Permission level a sender needs to run a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    None,
    Owner,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::None => "none",
            Capability::Owner => "owner",
        }
    }
}

/// Static description of a bot command
pub struct CommandDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub usage: Option<String>,
    pub capability: Capability,
    pub min_args: usize,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            description: None,
            aliases: Vec::new(),
            usage: None,
            capability: Capability::None,
            min_args: 0,
            handler,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(|a| a.into().to_lowercase()).collect();
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn owner_only(self) -> Self {
        self.with_capability(Capability::Owner)
    }

    pub fn with_min_args(mut self, min_args: usize) -> Self {
        self.min_args = min_args;
        self
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("capability", &self.capability)
            .field("min_args", &self.min_args)
            .finish_non_exhaustive()
    }
}

/// Command registry: canonical names plus a one-hop alias table
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDescriptor>,
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Names and aliases share one namespace and must be unique.
    pub fn register(&mut self, command: CommandDescriptor) -> Result<(), CommandError> {
        if self.is_taken(&command.name) {
            return Err(CommandError::Conflict(command.name));
        }
        for alias in &command.aliases {
            if alias == &command.name || self.is_taken(alias) {
                return Err(CommandError::Conflict(alias.clone()));
            }
        }

        for alias in &command.aliases {
            self.aliases.insert(alias.clone(), command.name.clone());
        }
        self.commands.insert(command.name.clone(), command);
        Ok(())
    }

    fn is_taken(&self, name: &str) -> bool {
        self.commands.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Map an alias to its canonical name; canonical names map to themselves.
    pub fn canonical_name(&self, input: &str) -> String {
        let name = input.to_lowercase();
        self.aliases.get(&name).cloned().unwrap_or(name)
    }

    /// Find the descriptor for a name or alias.
    pub fn resolve(&self, input: &str) -> Option<&CommandDescriptor> {
        self.commands.get(&self.canonical_name(input))
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    /// All commands sorted by name
    pub fn all(&self) -> Vec<&CommandDescriptor> {
        let mut commands: Vec<_> = self.commands.values().collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn help_text(&self, prefix: &str) -> String {
        let mut help = "Available commands:\n".to_string();
        for cmd in self.all() {
            help.push_str(&format!(
                "  {}{} - {}",
                prefix,
                cmd.name,
                cmd.description.as_deref().unwrap_or("")
            ));
            if cmd.capability == Capability::Owner {
                help.push_str(" [owner]");
            }
            help.push('\n');
        }
        help
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::DispatchContext;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn handle(&self, _ctx: &DispatchContext) {}
    }

    fn cmd(name: &str) -> CommandDescriptor {
        CommandDescriptor::new(name, Arc::new(Noop))
    }

    #[test]
    fn alias_resolves_to_canonical_descriptor() {
        let mut registry = CommandRegistry::new();
        registry.register(cmd("profilepic").with_aliases(["pp"])).unwrap();

        assert_eq!(registry.canonical_name("PP"), "profilepic");
        assert_eq!(registry.resolve("pp").unwrap().name, "profilepic");
        assert_eq!(registry.resolve("ProfilePic").unwrap().name, "profilepic");
        assert!(registry.resolve("nope").is_none());
    }

    #[test]
    fn aliases_are_a_single_hop() {
        let mut registry = CommandRegistry::new();
        registry.register(cmd("autobio").with_aliases(["bio"])).unwrap();
        // an alias cannot point at another alias or shadow a command
        let err = registry.register(cmd("about").with_aliases(["bio"])).unwrap_err();
        assert_eq!(err, CommandError::Conflict("bio".into()));
        let err = registry.register(cmd("bio")).unwrap_err();
        assert_eq!(err, CommandError::Conflict("bio".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn help_lists_sorted_and_marks_owner_commands() {
        let mut registry = CommandRegistry::new();
        registry.register(cmd("shutdown").owner_only().with_description("Stop")).unwrap();
        registry.register(cmd("alive").with_description("Status")).unwrap();

        let help = registry.help_text(".");
        let alive = help.find(".alive").unwrap();
        let shutdown = help.find(".shutdown - Stop [owner]").unwrap();
        assert!(alive < shutdown);
    }
}
