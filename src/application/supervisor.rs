//! Connection supervisor - owns the session, its event stream and the
//! reconnect loop

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::errors::SupervisorError;
use super::services::{MessageService, Screened};
use crate::domain::entities::{
    CloseDecision, ConnectionUpdate, Message, ReconnectPolicy, Session, TransportEvent, UpsertKind,
};
use crate::domain::traits::{Connection, Connector, Transport};

/// How long in-flight message tasks get to finish when the supervisor stops
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Cloneable handle that asks the supervisor to stop cleanly
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn channel() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn trigger(&self) {
        // send_replace works even when every receiver is gone
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

enum PumpExit {
    Closed(Option<u16>),
    Shutdown,
}

pub struct ConnectionSupervisor<C: Connector> {
    connector: C,
    policy: ReconnectPolicy,
    session: Session,
    service: Arc<MessageService>,
    shutdown: watch::Receiver<bool>,
    in_flight: JoinSet<()>,
    /// Per chat, resolves once the latest message has been through moderation
    lanes: HashMap<String, oneshot::Receiver<()>>,
}

impl<C: Connector> ConnectionSupervisor<C> {
    pub fn new(
        connector: C,
        policy: ReconnectPolicy,
        session: Session,
        service: Arc<MessageService>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            connector,
            policy,
            session,
            service,
            shutdown,
            in_flight: JoinSet::new(),
            lanes: HashMap::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until shutdown (`Ok`) or a terminal connection failure (`Err`).
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let result = self.run_loop().await;
        self.drain().await;
        result
    }

    async fn run_loop(&mut self) -> Result<(), SupervisorError> {
        loop {
            self.session.begin_connect();

            let close_code = match self.connector.connect(self.session.credentials()).await {
                Ok(connection) => match self.pump(connection).await {
                    PumpExit::Closed(code) => code,
                    PumpExit::Shutdown => return Ok(()),
                },
                Err(e) => {
                    warn!(error = %e, attempt = self.session.attempts(), "connect attempt failed");
                    None
                }
            };

            match self.session.on_close(close_code, &self.policy) {
                CloseDecision::Reconnect { attempt, delay } => {
                    info!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = millis(delay),
                        "connection closed, reconnecting"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = wait_for_shutdown(&mut self.shutdown) => return Ok(()),
                    }
                }
                CloseDecision::Fail(err) => {
                    error!(error = %err, "connection failed permanently");
                    return Err(err);
                }
            }
        }
    }

    async fn pump(&mut self, mut connection: Connection) -> PumpExit {
        loop {
            let event = tokio::select! {
                event = connection.events.recv() => event,
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    info!("shutdown requested");
                    return PumpExit::Shutdown;
                }
            };

            // reap finished message tasks and idle chat lanes
            while self.in_flight.try_join_next().is_some() {}
            self.lanes
                .retain(|_, gate| matches!(gate.try_recv(), Err(TryRecvError::Empty)));

            match event {
                None => {
                    warn!("event stream ended without a close event");
                    return PumpExit::Closed(None);
                }
                Some(TransportEvent::Connection(ConnectionUpdate::Open)) => {
                    self.session.on_open();
                    info!("connected");
                }
                Some(TransportEvent::Connection(ConnectionUpdate::Close { code })) => {
                    info!(code = ?code, "connection closed by remote");
                    return PumpExit::Closed(code);
                }
                Some(TransportEvent::Messages { kind, messages }) => {
                    self.ingest(kind, messages, &connection.transport);
                }
                Some(TransportEvent::StatusUpdate { ids }) => {
                    for id in ids {
                        info!(jid = %id, "status update");
                    }
                }
                Some(TransportEvent::MessagesDeleted { ids }) => {
                    info!(count = ids.len(), "messages deleted remotely");
                }
            }
        }
    }

    /// Spawn one pipeline task per message, in delivery order.
    ///
    /// Within a chat, each message waits for the previous one to clear
    /// moderation before it is screened. Command handlers run outside that
    /// gate, so a slow handler never holds up the chat. Different chats never
    /// wait on each other.
    fn ingest(&mut self, kind: UpsertKind, messages: Vec<Message>, transport: &Arc<dyn Transport>) {
        if !MessageService::accepts_batch(kind) {
            debug!(count = messages.len(), ?kind, "skipping non-live message batch");
            return;
        }

        for message in messages.into_iter().filter(|m| !m.from_me) {
            let service = Arc::clone(&self.service);
            let transport = Arc::clone(transport);
            let (screened_tx, screened_rx) = oneshot::channel();
            let previous = self.lanes.insert(message.chat_id.clone(), screened_rx);

            self.in_flight.spawn(async move {
                if let Some(previous) = previous {
                    // an aborted predecessor drops its sender; carry on regardless
                    let _ = previous.await;
                }
                let chat_id = message.chat_id.clone();
                let screened = service.screen(transport.as_ref(), message).await;
                let _ = screened_tx.send(());

                let disposition = match screened {
                    Screened::Done(disposition) => disposition,
                    Screened::Command(message) => service.dispatch(transport, &message).await,
                };
                debug!(chat_id = %chat_id, ?disposition, "message processed");
            });
        }
    }

    async fn drain(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }
        let pending = self.in_flight.len();
        let drained = tokio::time::timeout(DRAIN_GRACE, async {
            while self.in_flight.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(pending, "abandoning message tasks still running at exit");
            self.in_flight.abort_all();
        }
    }
}

/// Whole milliseconds for logging, saturating for delays past `u64::MAX` ms.
fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // sender dropped without triggering: never resolves
            std::future::pending::<()>().await;
        }
    }
}
