use super::Message;

/// How a batch of messages reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    /// Live delivery of new messages
    Notify,
    /// History replay or sync batch
    Append,
}

/// Connection lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Open,
    Close { code: Option<u16> },
}

/// Everything the transport can hand to the supervisor
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Messages {
        kind: UpsertKind,
        messages: Vec<Message>,
    },
    Connection(ConnectionUpdate),
    StatusUpdate {
        ids: Vec<String>,
    },
    MessagesDeleted {
        ids: Vec<String>,
    },
}

impl TransportEvent {
    pub fn notify(messages: Vec<Message>) -> Self {
        TransportEvent::Messages {
            kind: UpsertKind::Notify,
            messages,
        }
    }

    pub fn open() -> Self {
        TransportEvent::Connection(ConnectionUpdate::Open)
    }

    pub fn close(code: Option<u16>) -> Self {
        TransportEvent::Connection(ConnectionUpdate::Close { code })
    }
}
