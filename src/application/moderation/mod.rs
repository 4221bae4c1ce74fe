//! Moderation - spam signatures, violation ledger, sanctions

pub mod engine;
pub mod ledger;
pub mod signatures;

pub use engine::{EscalationPolicy, ModerationEngine, Verdict};
pub use ledger::{ViolationLedger, ViolationRecord};
pub use signatures::{fingerprint, SignatureKind, SpamSignatures};
