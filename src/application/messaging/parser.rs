//! Command parser - turns prefixed text into a command name and arguments

/// A command line split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Case-folded name as typed (before alias resolution)
    pub name: String,
    pub args: Vec<String>,
}

/// Parses command text using the configured prefix
#[derive(Debug, Clone)]
pub struct CommandParser {
    command_prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    pub fn is_command(&self, text: &str) -> bool {
        !self.command_prefix.is_empty() && text.starts_with(&self.command_prefix)
    }

    /// Parse text into a command. Returns `None` for text without the prefix
    /// or with nothing after it.
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        if !self.is_command(text) {
            return None;
        }
        let cmd_text = &text[self.command_prefix.len()..];

        let mut parts = cmd_text.split_whitespace();
        let name = parts.next()?.to_lowercase();
        let args = parts.map(|s| s.to_string()).collect();

        Some(ParsedCommand { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_and_args() {
        let parser = CommandParser::new(".");
        let parsed = parser.parse(".Warn  @bob   spamming again").unwrap();
        assert_eq!(parsed.name, "warn");
        assert_eq!(parsed.args, vec!["@bob", "spamming", "again"]);
    }

    #[test]
    fn rejects_unprefixed_and_empty() {
        let parser = CommandParser::new(".");
        assert_eq!(parser.parse("ping"), None);
        assert_eq!(parser.parse("."), None);
        assert_eq!(parser.parse(".   "), None);
    }

    #[test]
    fn multi_char_prefix() {
        let parser = CommandParser::new("!!");
        assert!(parser.is_command("!!ping"));
        assert!(!parser.is_command("!ping"));
        assert_eq!(parser.parse("!!ping").unwrap().name, "ping");
    }
}
