//! Violation ledger - time-bounded strike counts per offender
//!
//! Records are split across shards by offender, so strikes for different
//! offenders are counted under different locks. Within a shard, expiry is
//! tracked with a min-heap keyed by deadline instead of a timer per record.
//! Refreshing a record pushes a new heap entry; entries whose deadline no
//! longer matches the record are stale and skipped when popped.

use std::cmp::Reverse;
use std::collections::hash_map::RandomState;
use std::collections::{BinaryHeap, HashMap};
use std::hash::BuildHasher;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const SHARDS: usize = 16;

/// Strike state for one offender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViolationRecord {
    pub strikes: u32,
    pub expires_at: Instant,
}

#[derive(Default)]
struct LedgerState {
    records: HashMap<String, ViolationRecord>,
    expiries: BinaryHeap<Reverse<(Instant, String)>>,
}

impl LedgerState {
    fn sweep(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(Reverse((deadline, _))) = self.expiries.peek() {
            if *deadline > now {
                break;
            }
            let Some(Reverse((deadline, offender))) = self.expiries.pop() else {
                break;
            };
            let live = self
                .records
                .get(&offender)
                .is_some_and(|r| r.expires_at == deadline);
            if live {
                self.records.remove(&offender);
                removed += 1;
            }
        }
        removed
    }
}

/// In-memory ledger with a sliding TTL per offender
pub struct ViolationLedger {
    ttl: Duration,
    hasher: RandomState,
    shards: Vec<Mutex<LedgerState>>,
}

impl ViolationLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            hasher: RandomState::new(),
            shards: (0..SHARDS).map(|_| Mutex::new(LedgerState::default())).collect(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn shard_index(&self, offender: &str) -> usize {
        (self.hasher.hash_one(offender) as usize) % self.shards.len()
    }

    fn lock(shard: &Mutex<LedgerState>) -> MutexGuard<'_, LedgerState> {
        // The state stays consistent between statements, so a panic elsewhere
        // never leaves it half-written.
        shard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn shard(&self, offender: &str) -> MutexGuard<'_, LedgerState> {
        Self::lock(&self.shards[self.shard_index(offender)])
    }

    /// Count one violation and restart the offender's TTL window.
    ///
    /// A record whose window has already closed restarts at one strike.
    /// `retain` sees the new strike count; returning `false` drops the record in
    /// the same critical section. Returns the new strike count.
    pub fn record_violation<F>(&self, offender: &str, now: Instant, retain: F) -> u32
    where
        F: FnOnce(u32) -> bool,
    {
        let mut state = self.shard(offender);

        let expires_at = now + self.ttl;
        let record = state
            .records
            .entry(offender.to_string())
            .or_insert(ViolationRecord {
                strikes: 0,
                expires_at,
            });
        if record.expires_at <= now {
            record.strikes = 0;
        }
        record.strikes += 1;
        record.expires_at = expires_at;
        let strikes = record.strikes;

        if retain(strikes) {
            state.expiries.push(Reverse((expires_at, offender.to_string())));
        } else {
            state.records.remove(offender);
        }
        strikes
    }

    /// Live strike count, `None` when there is no unexpired record.
    pub fn strikes(&self, offender: &str, now: Instant) -> Option<u32> {
        self.shard(offender)
            .records
            .get(offender)
            .filter(|r| r.expires_at > now)
            .map(|r| r.strikes)
    }

    pub fn get(&self, offender: &str) -> Option<ViolationRecord> {
        self.shard(offender).records.get(offender).copied()
    }

    /// Drop every record whose window has closed. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        self.shards.iter().map(|shard| Self::lock(shard).sweep(now)).sum()
    }

    /// Number of stored records, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| Self::lock(shard).records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn keep(_: u32) -> bool {
        true
    }

    #[test]
    fn strikes_accumulate_within_window() {
        let ledger = ViolationLedger::new(TTL);
        let t0 = Instant::now();
        assert_eq!(ledger.record_violation("A", t0, keep), 1);
        assert_eq!(ledger.record_violation("A", t0 + Duration::from_secs(10), keep), 2);
        assert_eq!(ledger.record_violation("B", t0, keep), 1);
        assert_eq!(ledger.strikes("A", t0 + Duration::from_secs(11)), Some(2));
    }

    #[test]
    fn window_slides_from_latest_violation() {
        let ledger = ViolationLedger::new(TTL);
        let t0 = Instant::now();
        ledger.record_violation("A", t0, keep);
        ledger.record_violation("A", t0 + Duration::from_secs(50), keep);

        // past the first deadline, but inside the refreshed one
        let later = t0 + Duration::from_secs(90);
        assert_eq!(ledger.sweep(later), 0);
        assert_eq!(ledger.strikes("A", later), Some(2));

        let expired = t0 + Duration::from_secs(110);
        assert_eq!(ledger.sweep(expired), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn expired_record_restarts_at_one() {
        let ledger = ViolationLedger::new(TTL);
        let t0 = Instant::now();
        ledger.record_violation("A", t0, keep);
        ledger.record_violation("A", t0, keep);

        let after = t0 + TTL + Duration::from_millis(1);
        assert_eq!(ledger.strikes("A", after), None);
        assert_eq!(ledger.record_violation("A", after, keep), 1);
    }

    #[test]
    fn retain_false_drops_record_atomically() {
        let ledger = ViolationLedger::new(TTL);
        let t0 = Instant::now();
        let strikes = ledger.record_violation("A", t0, |s| s < 1);
        assert_eq!(strikes, 1);
        assert!(ledger.get("A").is_none());
        // stale heap entries do not resurrect or remove anything later
        assert_eq!(ledger.sweep(t0 + TTL * 2), 0);
    }

    #[test]
    fn expired_record_is_not_swept_by_other_offenders() {
        let ledger = ViolationLedger::new(TTL);
        let t0 = Instant::now();
        ledger.record_violation("A", t0, keep);

        // counting B never touches A's stale record
        let after = t0 + TTL + Duration::from_secs(1);
        ledger.record_violation("B", after, keep);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.strikes("A", after), None);

        assert_eq!(ledger.sweep(after), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn stale_heap_entry_after_restart_keeps_live_record() {
        let ledger = ViolationLedger::new(TTL);
        let t0 = Instant::now();
        ledger.record_violation("A", t0, keep);
        let restart = t0 + TTL + Duration::from_secs(5);
        assert_eq!(ledger.record_violation("A", restart, keep), 1);

        // the first deadline has passed, the restarted one has not
        assert_eq!(ledger.sweep(restart + Duration::from_secs(1)), 0);
        assert_eq!(ledger.strikes("A", restart + Duration::from_secs(1)), Some(1));
    }

    #[test]
    fn concurrent_offenders_do_not_share_a_lock() {
        use std::sync::{Arc, Barrier};

        let ledger = Arc::new(ViolationLedger::new(TTL));
        let now = Instant::now();
        let a = "A@s.whatsapp.net";
        let b = (0..1000)
            .map(|i| format!("{i}@s.whatsapp.net"))
            .find(|o| ledger.shard_index(o) != ledger.shard_index(a))
            .unwrap();

        // A's counting holds its shard while B is counted on another thread
        let barrier = Arc::new(Barrier::new(2));
        let worker = {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                ledger.record_violation(&b, now, keep)
            })
        };
        let strikes = ledger.record_violation(a, now, |_| {
            barrier.wait();
            worker.join().unwrap() == 1
        });
        assert_eq!(strikes, 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn same_offender_increments_serialize() {
        use std::sync::Arc;

        let ledger = Arc::new(ViolationLedger::new(TTL));
        let now = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| ledger.record_violation("A", now, keep))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen: Vec<u32> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=400).collect::<Vec<_>>());
    }
}
