use std::fmt;

/// Represents a chat participant as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: String,
    pub push_name: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            push_name: None,
        }
    }

    pub fn with_push_name(mut self, name: impl Into<String>) -> Self {
        self.push_name = Some(name.into());
        self
    }

    /// The account part of the identity, without server or device suffix.
    pub fn user_part(&self) -> &str {
        user_part(&self.id)
    }

    pub fn display_name(&self) -> String {
        match self.push_name {
            Some(ref name) => name.clone(),
            None => self.user_part().to_string(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Strip the `@server` and `:device` suffixes from a transport identity.
///
/// `"15551234567:3@s.whatsapp.net"` becomes `"15551234567"`.
pub fn user_part(id: &str) -> &str {
    let account = id.split('@').next().unwrap_or(id);
    account.split(':').next().unwrap_or(account)
}
