//! In-memory adapter: a recording transport and a scripted connector
//!
//! Used to drive the supervisor without a remote service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::errors::TransportError;
use crate::domain::entities::{CredentialHandle, TransportEvent};
use crate::domain::traits::{Connection, Connector, Transport};

/// One outbound operation as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCall {
    Send { chat_id: String, text: String },
    Delete { chat_id: String, message_id: String },
    Restrict { chat_id: String, participant: String },
    Remove { chat_id: String, participant: String },
}

/// Transport that records every call and optionally fails all of them
#[derive(Default)]
pub struct MemoryTransport {
    calls: Mutex<Vec<OutboundCall>>,
    fail: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call is recorded and then rejected with `PermissionDenied`.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<OutboundCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: OutboundCall) -> Result<(), TransportError> {
        self.log().push(call);
        if self.fail {
            return Err(TransportError::PermissionDenied("not an admin".to_string()));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<OutboundCall> {
        self.log().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.log()
            .iter()
            .filter_map(|c| match c {
                OutboundCall::Send { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<String, TransportError> {
        self.record(OutboundCall::Send {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        })?;
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        _participant: Option<&str>,
    ) -> Result<(), TransportError> {
        self.record(OutboundCall::Delete {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
        })
    }

    async fn restrict_participant(&self, chat_id: &str, participant: &str) -> Result<(), TransportError> {
        self.record(OutboundCall::Restrict {
            chat_id: chat_id.to_string(),
            participant: participant.to_string(),
        })
    }

    async fn remove_participant(&self, chat_id: &str, participant: &str) -> Result<(), TransportError> {
        self.record(OutboundCall::Remove {
            chat_id: chat_id.to_string(),
            participant: participant.to_string(),
        })
    }
}

/// What one `connect()` call produces
#[derive(Debug, Clone)]
pub enum Script {
    /// The connect call itself fails
    Fail(TransportError),
    /// Deliver the events, then end the stream
    Events(Vec<TransportEvent>),
    /// Deliver the events and keep the stream open
    Hold(Vec<TransportEvent>),
}

/// Connector that plays back a queue of scripted sessions
///
/// Once the queue is empty every further connect fails.
pub struct ScriptedConnector {
    transport: Arc<MemoryTransport>,
    scripts: Mutex<VecDeque<Script>>,
    held: Mutex<Vec<mpsc::Sender<TransportEvent>>>,
    connects: AtomicU32,
}

impl ScriptedConnector {
    pub fn new(transport: Arc<MemoryTransport>, scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            transport,
            scripts: Mutex::new(scripts.into_iter().collect()),
            held: Mutex::new(Vec::new()),
            connects: AtomicU32::new(0),
        }
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _credentials: &CredentialHandle) -> Result<Connection, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let (events, hold) = match script {
            None => return Err(TransportError::Network("no scripted session left".to_string())),
            Some(Script::Fail(err)) => return Err(err),
            Some(Script::Events(events)) => (events, false),
            Some(Script::Hold(events)) => (events, true),
        };

        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.try_send(event)
                .map_err(|e| TransportError::Network(e.to_string()))?;
        }
        if hold {
            self.held.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        }

        let transport: Arc<dyn Transport> = self.transport.clone();
        Ok(Connection { transport, events: rx })
    }
}
