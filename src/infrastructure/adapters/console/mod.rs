//! Console adapter for development/testing
//!
//! Plain input lines arrive as live messages from the configured sender.
//! Lines starting with `{` are scripted transport events, e.g.
//!
//! ```text
//! {"event": "message", "text": "free bitcoin claim", "chat": "g1@g.us", "participant": "a@s.whatsapp.net", "push_name": "Ada"}
//! {"event": "close", "code": 428}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, Mutex};

use crate::application::errors::TransportError;
use crate::application::supervisor::ShutdownSignal;
use crate::domain::entities::{
    ConnectionUpdate, Content, CredentialHandle, Message, TransportEvent, UpsertKind, User,
};
use crate::domain::traits::{Connection, Connector, Transport};
use crate::infrastructure::config::ConsoleConfig;

/// Prints every outbound call to stdout
#[derive(Debug, Default)]
pub struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<String, TransportError> {
        println!("[BOT] {}: {}", chat_id, text);
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        _participant: Option<&str>,
    ) -> Result<(), TransportError> {
        println!("[DELETE] {} {}", chat_id, message_id);
        Ok(())
    }

    async fn restrict_participant(&self, chat_id: &str, participant: &str) -> Result<(), TransportError> {
        println!("[RESTRICT] {} {}", chat_id, participant);
        Ok(())
    }

    async fn remove_participant(&self, chat_id: &str, participant: &str) -> Result<(), TransportError> {
        println!("[REMOVE] {} {}", chat_id, participant);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BatchKind {
    #[default]
    Notify,
    Append,
}

impl From<BatchKind> for UpsertKind {
    fn from(kind: BatchKind) -> Self {
        match kind {
            BatchKind::Notify => UpsertKind::Notify,
            BatchKind::Append => UpsertKind::Append,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ScriptedEvent {
    Open,
    Close {
        #[serde(default)]
        code: Option<u16>,
    },
    Message {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        chat: Option<String>,
        #[serde(default)]
        participant: Option<String>,
        #[serde(default)]
        push_name: Option<String>,
        #[serde(default)]
        from_me: bool,
        #[serde(default)]
        kind: BatchKind,
    },
    Status {
        ids: Vec<String>,
    },
    Deleted {
        ids: Vec<String>,
    },
}

/// Turn one input line into a transport event.
pub fn parse_line(line: &str, settings: &ConsoleConfig) -> Option<TransportEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if !line.starts_with('{') {
        let mut message = Message::from_text(&settings.chat_id, line);
        if settings.sender_id != settings.chat_id {
            message = message.with_participant(&settings.sender_id);
        }
        message = message.with_sender(User::new(&settings.sender_id));
        return Some(TransportEvent::notify(vec![message]));
    }

    let raw: serde_json::Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed scripted event");
            return None;
        }
    };
    let scripted: ScriptedEvent = match serde_json::from_value(raw.clone()) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unknown scripted event");
            return None;
        }
    };

    let event = match scripted {
        ScriptedEvent::Open => TransportEvent::open(),
        ScriptedEvent::Close { code } => TransportEvent::close(code),
        ScriptedEvent::Status { ids } => TransportEvent::StatusUpdate { ids },
        ScriptedEvent::Deleted { ids } => TransportEvent::MessagesDeleted { ids },
        ScriptedEvent::Message {
            text,
            chat,
            participant,
            push_name,
            from_me,
            kind,
        } => {
            let content = text.map(Content::Text).unwrap_or(Content::Empty);
            let mut message =
                Message::new(chat.unwrap_or_else(|| settings.chat_id.clone()), content).with_raw(raw);
            if let Some(participant) = participant {
                message = message.with_participant(participant);
            }
            let mut sender = User::new(message.sender_id());
            if let Some(name) = push_name {
                sender = sender.with_push_name(name);
            }
            message = message.with_sender(sender);
            if from_me {
                message = message.from_self();
            }
            TransportEvent::Messages {
                kind: kind.into(),
                messages: vec![message],
            }
        }
    };
    Some(event)
}

/// Connector over a line-oriented input (stdin in production)
///
/// A single reader task parses input for the lifetime of the process. Each
/// `connect()` opens a session that forwards parsed events until a close
/// event, so a scripted close exercises the reconnect path. End of input
/// requests shutdown.
pub struct ConsoleConnector {
    input: Arc<Mutex<mpsc::Receiver<TransportEvent>>>,
    transport: Arc<ConsoleTransport>,
}

impl ConsoleConnector {
    pub fn stdin(settings: ConsoleConfig, shutdown: ShutdownSignal) -> Self {
        Self::from_reader(tokio::io::stdin(), settings, shutdown)
    }

    pub fn from_reader<R>(reader: R, settings: ConsoleConfig, shutdown: ShutdownSignal) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = parse_line(&line, &settings) {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::info!("console input closed, requesting shutdown");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "console input failed");
                        break;
                    }
                }
            }
            shutdown.trigger();
        });

        Self {
            input: Arc::new(Mutex::new(rx)),
            transport: Arc::new(ConsoleTransport),
        }
    }
}

#[async_trait]
impl Connector for ConsoleConnector {
    async fn connect(&self, credentials: &CredentialHandle) -> Result<Connection, TransportError> {
        tracing::info!(auth_dir = %credentials.path().display(), "console session opening");

        let (tx, rx) = mpsc::channel(64);
        tx.send(TransportEvent::open())
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let input = Arc::clone(&self.input);
        tokio::spawn(async move {
            let mut input = input.lock().await;
            while let Some(event) = input.recv().await {
                let closes = matches!(event, TransportEvent::Connection(ConnectionUpdate::Close { .. }));
                if tx.send(event).await.is_err() || closes {
                    break;
                }
            }
        });

        let transport: Arc<dyn Transport> = self.transport.clone();
        Ok(Connection { transport, events: rx })
    }
}
