//! Moderation engine - spam detection and escalating sanctions

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ledger::ViolationLedger;
use super::signatures::{fingerprint, SpamSignatures};
use crate::domain::entities::Message;
use crate::domain::traits::Transport;

/// Outcome of inspecting one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    Warned,
    Muted,
    Removed,
}

impl Verdict {
    /// Anything but `Clean` stops the message from reaching the router.
    pub fn is_sanctioned(&self) -> bool {
        !matches!(self, Verdict::Clean)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Clean => "clean",
            Verdict::Warned => "warned",
            Verdict::Muted => "muted",
            Verdict::Removed => "removed",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strike thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub mute_at: u32,
    pub remove_at: u32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            mute_at: 2,
            remove_at: 3,
        }
    }
}

impl EscalationPolicy {
    pub fn verdict_for(&self, strikes: u32) -> Verdict {
        if strikes == 0 {
            Verdict::Clean
        } else if strikes >= self.remove_at {
            Verdict::Removed
        } else if strikes >= self.mute_at {
            Verdict::Muted
        } else {
            Verdict::Warned
        }
    }
}

pub struct ModerationEngine {
    signatures: SpamSignatures,
    ledger: ViolationLedger,
    policy: EscalationPolicy,
    enabled: bool,
}

impl ModerationEngine {
    pub fn new(signatures: SpamSignatures, ledger: ViolationLedger, policy: EscalationPolicy) -> Self {
        Self {
            signatures,
            ledger,
            policy,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        let mut engine = Self::new(
            SpamSignatures::new(),
            ViolationLedger::new(Duration::ZERO),
            EscalationPolicy::default(),
        );
        engine.enabled = false;
        engine
    }

    pub fn ledger(&self) -> &ViolationLedger {
        &self.ledger
    }

    pub fn policy(&self) -> EscalationPolicy {
        self.policy
    }

    pub async fn inspect(&self, transport: &dyn Transport, message: &Message) -> Verdict {
        self.inspect_at(transport, message, Instant::now()).await
    }

    /// Inspect with an explicit clock reading. Never fails: sanction errors are logged.
    pub async fn inspect_at(&self, transport: &dyn Transport, message: &Message, now: Instant) -> Verdict {
        if !self.enabled {
            return Verdict::Clean;
        }

        let text = message.text();
        let Some(kind) = self.signatures.detect(text) else {
            return Verdict::Clean;
        };

        let offender = message.sender_id();
        let policy = self.policy;
        let strikes = self
            .ledger
            .record_violation(offender, now, |s| policy.verdict_for(s) != Verdict::Removed);
        let verdict = policy.verdict_for(strikes);

        self.enforce(transport, message, verdict).await;
        self.announce(transport, message, verdict, strikes).await;

        let preview: String = text.chars().take(15).collect();
        info!(
            chat_id = %message.chat_id,
            offender,
            strikes,
            signature = %kind,
            verdict = %verdict,
            "spam sanctioned: {}...",
            preview
        );
        verdict
    }

    async fn enforce(&self, transport: &dyn Transport, message: &Message, verdict: Verdict) {
        let chat_id = message.chat_id.as_str();
        let offender = message.sender_id();

        if let Err(e) = transport
            .delete_message(chat_id, &message.id, message.participant.as_deref())
            .await
        {
            warn!(chat_id, message_id = %message.id, error = %e, "failed to delete spam message");
        }

        let sanction = match verdict {
            Verdict::Muted => transport.restrict_participant(chat_id, offender).await,
            Verdict::Removed => transport.remove_participant(chat_id, offender).await,
            Verdict::Clean | Verdict::Warned => Ok(()),
        };
        if let Err(e) = sanction {
            warn!(chat_id, offender, verdict = %verdict, error = %e, "failed to apply sanction");
        }
    }

    async fn announce(&self, transport: &dyn Transport, message: &Message, verdict: Verdict, strikes: u32) {
        let notice = sanction_notice(verdict, strikes, self.policy.remove_at, message.text());
        if let Err(e) = transport.send_text(&message.chat_id, &notice).await {
            warn!(chat_id = %message.chat_id, error = %e, "failed to post sanction notice");
        }
    }

    /// Periodically drop expired ledger records.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = engine.ledger.sweep(Instant::now());
                if removed > 0 {
                    debug!(removed, remaining = engine.ledger.len(), "violation ledger swept");
                }
            }
        })
    }

}

fn sanction_notice(verdict: Verdict, strikes: u32, remove_at: u32, text: &str) -> String {
    let headline = match verdict {
        Verdict::Warned => format!("[0xSPAM_WARN] Violation {strikes}/{remove_at}: Message incinerated"),
        Verdict::Muted => format!("[0xSPAM_MUTE] Violation {strikes}/{remove_at}: 24h comms ban enacted"),
        Verdict::Removed | Verdict::Clean => {
            format!("[0xSPAM_TERM] Violation {strikes}/{remove_at}: Entity purged from network")
        }
    };
    let next = if strikes < remove_at {
        format!("{} strikes remain", remove_at - strikes)
    } else {
        "Terminal".to_string()
    };
    let hash = fingerprint(text);
    format!("{headline}\nHash: {}...\nNext: {next}", &hash[..12])
}
