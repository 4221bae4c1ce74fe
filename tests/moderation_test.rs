//! Moderation escalation integration tests
//! Run with: cargo test --test moderation_test

use std::sync::Arc;
use std::time::{Duration, Instant};

use stiletto_bot::application::messaging::CommandRouter;
use stiletto_bot::application::moderation::{
    EscalationPolicy, ModerationEngine, SpamSignatures, Verdict, ViolationLedger,
};
use stiletto_bot::application::services::{Disposition, MessageService};
use stiletto_bot::application::supervisor::ShutdownSignal;
use stiletto_bot::domain::entities::Message;
use stiletto_bot::infrastructure::adapters::memory::{MemoryTransport, OutboundCall};
use stiletto_bot::plugins::builtin_registry;

const TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn engine() -> ModerationEngine {
    ModerationEngine::new(
        SpamSignatures::new().with_phrases(["join my channel"]),
        ViolationLedger::new(TTL),
        EscalationPolicy::default(),
    )
}

fn spam(offender: &str) -> Message {
    Message::from_text("G@g.us", "bitcoin free claim now").with_participant(offender)
}

#[tokio::test]
async fn test_three_strikes_escalate_to_removal() {
    let engine = engine();
    let transport = MemoryTransport::new();
    let start = Instant::now();

    let verdicts = [
        engine.inspect_at(&transport, &spam("A@s.whatsapp.net"), start).await,
        engine
            .inspect_at(&transport, &spam("A@s.whatsapp.net"), start + Duration::from_secs(60))
            .await,
        engine
            .inspect_at(&transport, &spam("A@s.whatsapp.net"), start + Duration::from_secs(120))
            .await,
    ];
    assert_eq!(verdicts, [Verdict::Warned, Verdict::Muted, Verdict::Removed]);

    let sent = transport.sent_texts();
    assert!(sent[0].starts_with("[0xSPAM_WARN] Violation 1/3: Message incinerated"));
    assert!(sent[0].ends_with("Next: 2 strikes remain"));
    assert!(sent[1].starts_with("[0xSPAM_MUTE] Violation 2/3: 24h comms ban enacted"));
    assert!(sent[2].starts_with("[0xSPAM_TERM] Violation 3/3"));
    assert!(sent[2].ends_with("Next: Terminal"));

    let calls = transport.calls();
    assert!(calls.contains(&OutboundCall::Restrict {
        chat_id: "G@g.us".to_string(),
        participant: "A@s.whatsapp.net".to_string(),
    }));
    assert!(calls.contains(&OutboundCall::Remove {
        chat_id: "G@g.us".to_string(),
        participant: "A@s.whatsapp.net".to_string(),
    }));
    let deletes = calls
        .iter()
        .filter(|c| matches!(c, OutboundCall::Delete { .. }))
        .count();
    assert_eq!(deletes, 3);

    // removal clears the record
    assert!(engine.ledger().get("A@s.whatsapp.net").is_none());
}

#[tokio::test]
async fn test_quiet_period_resets_strikes() {
    let engine = engine();
    let transport = MemoryTransport::new();
    let start = Instant::now();

    engine.inspect_at(&transport, &spam("A@s.whatsapp.net"), start).await;
    let later = start + TTL + Duration::from_secs(1);
    let verdict = engine.inspect_at(&transport, &spam("A@s.whatsapp.net"), later).await;

    assert_eq!(verdict, Verdict::Warned);
    assert_eq!(engine.ledger().strikes("A@s.whatsapp.net", later), Some(1));
}

#[tokio::test]
async fn test_offenders_are_tracked_independently() {
    let engine = engine();
    let transport = MemoryTransport::new();
    let now = Instant::now();

    engine.inspect_at(&transport, &spam("A@s.whatsapp.net"), now).await;
    let verdict = engine.inspect_at(&transport, &spam("B@s.whatsapp.net"), now).await;

    assert_eq!(verdict, Verdict::Warned);
    assert_eq!(engine.ledger().len(), 2);
}

#[tokio::test]
async fn test_sanction_failures_do_not_stop_processing() {
    let engine = engine();
    let transport = MemoryTransport::new().failing();

    let verdict = engine.inspect(&transport, &spam("A@s.whatsapp.net")).await;

    assert_eq!(verdict, Verdict::Warned);
    assert_eq!(engine.ledger().strikes("A@s.whatsapp.net", Instant::now()), Some(1));
}

#[tokio::test]
async fn test_sanctioned_command_is_never_dispatched() {
    let (shutdown, _rx) = ShutdownSignal::channel();
    let registry = builtin_registry(".", shutdown).unwrap();
    let router = CommandRouter::new(".", "", Arc::new(registry));
    let service = MessageService::new(Arc::new(engine()), Arc::new(router));
    let transport = Arc::new(MemoryTransport::new());

    let message = Message::from_text("G@g.us", ".ping www.example.com").with_participant("C@s.whatsapp.net");
    let disposition = service.process(transport.clone(), message).await;

    assert_eq!(disposition, Disposition::Sanctioned(Verdict::Warned));
    assert!(!transport.sent_texts().iter().any(|t| t == "Pong. No frills."));
}

#[tokio::test]
async fn test_configured_phrase_matches_exactly() {
    let engine = engine();
    let transport = MemoryTransport::new();
    let now = Instant::now();

    let exact = Message::from_text("G@g.us", "join my channel").with_participant("D@s.whatsapp.net");
    let longer = Message::from_text("G@g.us", "please join my channel").with_participant("E@s.whatsapp.net");

    assert_eq!(engine.inspect_at(&transport, &exact, now).await, Verdict::Warned);
    assert_eq!(engine.inspect_at(&transport, &longer, now).await, Verdict::Clean);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_strikes_for_one_offender_are_counted_once_each() {
    let engine = Arc::new(engine());
    let transport = Arc::new(MemoryTransport::new());
    let now = Instant::now();

    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { engine.inspect_at(transport.as_ref(), &spam("A@s.whatsapp.net"), now).await })
        })
        .collect();

    let mut verdicts = Vec::new();
    for task in tasks {
        verdicts.push(task.await.unwrap());
    }
    for expected in [Verdict::Warned, Verdict::Muted, Verdict::Removed] {
        assert_eq!(verdicts.iter().filter(|v| **v == expected).count(), 1, "{:?}", verdicts);
    }

    let sent = transport.sent_texts();
    for strike in ["Violation 1/3", "Violation 2/3", "Violation 3/3"] {
        assert_eq!(sent.iter().filter(|t| t.contains(strike)).count(), 1, "{:?}", sent);
    }
    assert!(engine.ledger().get("A@s.whatsapp.net").is_none());
}
