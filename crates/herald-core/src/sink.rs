//! Outbound decision hand-off.
//!
//! The director never applies decisions itself. Every executed decision is
//! submitted to a [`DecisionSink`]; the host polls or drains it and applies
//! the intents to its own authoritative state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use herald_types::DecisionRecord;

/// Receiver of executed decisions.
pub trait DecisionSink: Send + Sync {
    /// Accept one decision record.
    fn submit(&self, record: DecisionRecord);
}

#[derive(Debug, Default)]
struct LogInner {
    records: VecDeque<DecisionRecord>,
    dropped: u64,
}

/// Bounded in-memory decision log.
///
/// Clones share the same log, so the host can keep one handle while the
/// director writes through another. Over capacity the oldest record is
/// dropped.
#[derive(Debug, Clone)]
pub struct DecisionLog {
    inner: Arc<Mutex<LogInner>>,
    capacity: usize,
}

impl DecisionLog {
    /// A log holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner::default())),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take every buffered record, oldest first.
    pub fn drain(&self) -> Vec<DecisionRecord> {
        self.lock().records.drain(..).collect()
    }

    /// Copy of the buffered records, oldest first.
    pub fn snapshot(&self) -> Vec<DecisionRecord> {
        self.lock().records.iter().cloned().collect()
    }

    /// Buffered records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Records discarded for lack of space.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}

impl DecisionSink for DecisionLog {
    fn submit(&self, record: DecisionRecord) {
        let mut inner = self.lock();
        inner.records.push_back(record);
        while inner.records.len() > self.capacity {
            inner.records.pop_front();
            inner.dropped = inner.dropped.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use herald_types::{ActorId, EntityId, EconomicPolicy, Intent};

    fn record(amount: f64) -> DecisionRecord {
        DecisionRecord {
            actor: ActorId(1000),
            entity: EntityId(1),
            issued_at: NaiveDateTime::default(),
            intent: Intent::Economic {
                policy: EconomicPolicy::AdjustTaxes,
                amount,
            },
        }
    }

    #[test]
    fn clones_share_the_log() {
        let log = DecisionLog::new(10);
        let writer = log.clone();
        writer.submit(record(0.1));
        writer.submit(record(0.2));
        assert_eq!(log.len(), 2);
        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(writer.is_empty());
    }

    #[test]
    fn oldest_records_are_dropped_over_capacity() {
        let log = DecisionLog::new(2);
        for i in 0..4 {
            log.submit(record(f64::from(i)));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 2);
        let first = log.snapshot().into_iter().next();
        assert!(first.is_some_and(|r| r == record(2.0)));
    }
}
