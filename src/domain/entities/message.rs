use super::User;
use chrono::{DateTime, Utc};

/// Message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain conversation body
    Text(String),
    /// Extended body (quoted replies, link previews)
    ExtendedText(String),
    /// Media or other payload the core does not read (`image`, `sticker`, ...)
    Other(String),
    Empty,
}

impl Content {
    /// The readable text of the message, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text(s) | Content::ExtendedText(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty)
    }
}

/// Represents an incoming message delivered by the transport
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    /// Author inside a group chat. `None` for direct chats, where the chat is the author.
    pub participant: Option<String>,
    pub sender: Option<User>,
    pub from_me: bool,
    pub content: Content,
    pub timestamp: DateTime<Utc>,
    pub raw: Option<serde_json::Value>,
}

impl Message {
    pub fn new(chat_id: impl Into<String>, content: Content) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            participant: None,
            sender: None,
            from_me: false,
            content,
            timestamp: Utc::now(),
            raw: None,
        }
    }

    pub fn from_text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(chat_id, Content::Text(text.into()))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    pub fn with_sender(mut self, user: User) -> Self {
        self.sender = Some(user);
        self
    }

    pub fn from_self(mut self) -> Self {
        self.from_me = true;
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Who wrote the message: the group participant, else the chat itself.
    pub fn sender_id(&self) -> &str {
        self.participant.as_deref().unwrap_or(&self.chat_id)
    }

    pub fn is_group(&self) -> bool {
        self.participant.is_some()
    }

    /// Text body or extended-text body; empty when neither is present.
    pub fn text(&self) -> &str {
        self.content.text().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_falls_back_to_chat() {
        let direct = Message::from_text("111@s.whatsapp.net", "hi");
        assert_eq!(direct.sender_id(), "111@s.whatsapp.net");
        assert!(!direct.is_group());

        let group = Message::from_text("G@g.us", "hi").with_participant("A@s.whatsapp.net");
        assert_eq!(group.sender_id(), "A@s.whatsapp.net");
        assert!(group.is_group());
    }

    #[test]
    fn text_reads_extended_body_and_ignores_media() {
        let extended = Message::new("c", Content::ExtendedText("quoted".into()));
        assert_eq!(extended.text(), "quoted");

        let image = Message::new("c", Content::Other("image".into()));
        assert_eq!(image.text(), "");
    }
}
