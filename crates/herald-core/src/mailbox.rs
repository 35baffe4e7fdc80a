//! Per-actor priority mailboxes.
//!
//! A [`Mailbox`] holds four FIFO tiers. Each message carries the game date
//! at which it becomes due; the director only dispatches due messages and
//! leaves the rest queued for a later frame. Pops are either immediate or
//! bounded by a short condition-variable wait, never unbounded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDateTime;
use herald_types::{ActorId, Packet, Relevance};
use serde::Serialize;

/// Dispatch tier of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Dispatched ahead of everything else, once per actor per frame.
    Critical,
    /// Marks the actor as a preferred candidate for the frame.
    High,
    /// Ordinary news.
    Medium,
    /// Background noise.
    Low,
}

impl Priority {
    /// Every tier, most urgent first.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// The tier a delivered relevance maps to. Irrelevant news that still
    /// got through is treated as low.
    pub const fn from_relevance(relevance: Relevance) -> Self {
        match relevance {
            Relevance::Critical => Self::Critical,
            Relevance::High => Self::High,
            Relevance::Medium => Self::Medium,
            Relevance::Low | Relevance::Irrelevant => Self::Low,
        }
    }
}

/// A packet waiting in an actor's mailbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The packet as delivered to this actor.
    pub packet: Packet,
    /// Recipient.
    pub actor: ActorId,
    /// Tier it was queued in.
    pub priority: Priority,
    /// Game date it was queued.
    pub received_at: NaiveDateTime,
    /// Game date from which it may be dispatched.
    pub scheduled_at: NaiveDateTime,
}

impl Message {
    /// Whether the message may be dispatched at `now`.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.scheduled_at <= now
    }
}

/// Queue depth per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    /// Critical messages.
    pub critical: usize,
    /// High-priority messages.
    pub high: usize,
    /// Medium-priority messages.
    pub medium: usize,
    /// Low-priority messages.
    pub low: usize,
}

impl TierCounts {
    /// Sum over every tier.
    pub const fn total(&self) -> usize {
        self.critical
            .saturating_add(self.high)
            .saturating_add(self.medium)
            .saturating_add(self.low)
    }

    /// Depth of one tier.
    pub const fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }

    /// Add another set of counts to this one.
    pub const fn accumulate(&mut self, other: &Self) {
        self.critical = self.critical.saturating_add(other.critical);
        self.high = self.high.saturating_add(other.high);
        self.medium = self.medium.saturating_add(other.medium);
        self.low = self.low.saturating_add(other.low);
    }
}

#[derive(Debug, Default)]
struct Tiers {
    critical: VecDeque<Message>,
    high: VecDeque<Message>,
    medium: VecDeque<Message>,
    low: VecDeque<Message>,
}

impl Tiers {
    const fn tier(&self, priority: Priority) -> &VecDeque<Message> {
        match priority {
            Priority::Critical => &self.critical,
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }

    const fn tier_mut(&mut self, priority: Priority) -> &mut VecDeque<Message> {
        match priority {
            Priority::Critical => &mut self.critical,
            Priority::High => &mut self.high,
            Priority::Medium => &mut self.medium,
            Priority::Low => &mut self.low,
        }
    }

    fn is_empty(&self) -> bool {
        Priority::ALL.iter().all(|p| self.tier(*p).is_empty())
    }

    fn pop_highest(&mut self) -> Option<Message> {
        Priority::ALL
            .iter()
            .find_map(|p| self.tier_mut(*p).pop_front())
    }

    fn pop_due_from(&mut self, priority: Priority, now: NaiveDateTime) -> Option<Message> {
        let tier = self.tier_mut(priority);
        if tier.front().is_some_and(|front| front.is_due(now)) {
            tier.pop_front()
        } else {
            None
        }
    }

    fn counts(&self) -> TierCounts {
        TierCounts {
            critical: self.critical.len(),
            high: self.high.len(),
            medium: self.medium.len(),
            low: self.low.len(),
        }
    }
}

/// Four-tier mailbox for one actor.
#[derive(Debug, Default)]
pub struct Mailbox {
    tiers: Mutex<Tiers>,
    ready: Condvar,
    pushed: AtomicU64,
    popped: AtomicU64,
}

impl Mailbox {
    /// An empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tiers> {
        self.tiers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count_pop(&self, message: Option<Message>) -> Option<Message> {
        if message.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        message
    }

    /// Queue a message in its tier and wake one waiter.
    pub fn push(&self, message: Message) {
        self.lock().tier_mut(message.priority).push_back(message);
        self.pushed.fetch_add(1, Ordering::Relaxed);
        self.ready.notify_one();
    }

    /// Pop the most urgent message, due or not, waiting at most `timeout`
    /// for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Message> {
        let guard = self.lock();
        let (mut guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |tiers| tiers.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        let message = guard.pop_highest();
        drop(guard);
        self.count_pop(message)
    }

    /// Pop from the highest tier whose front message is due at `now`.
    ///
    /// Fronts that are not yet due stay where they are.
    pub fn pop_due(&self, now: NaiveDateTime) -> Option<Message> {
        let message = {
            let mut tiers = self.lock();
            Priority::ALL
                .iter()
                .find_map(|p| tiers.pop_due_from(*p, now))
        };
        self.count_pop(message)
    }

    /// Pop the front of one tier if it is due at `now`.
    pub fn pop_due_from(&self, priority: Priority, now: NaiveDateTime) -> Option<Message> {
        let message = self.lock().pop_due_from(priority, now);
        self.count_pop(message)
    }

    /// Whether a tier holds any message, due or not.
    pub fn has_pending(&self, priority: Priority) -> bool {
        !self.lock().tier(priority).is_empty()
    }

    /// Messages queued across every tier.
    pub fn len(&self) -> usize {
        self.lock().counts().total()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Messages queued per tier.
    pub fn len_by_priority(&self) -> TierCounts {
        self.lock().counts()
    }

    /// Drop every queued message. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut tiers = self.lock();
        let dropped = tiers.counts().total();
        *tiers = Tiers::default();
        dropped
    }

    /// Messages ever pushed.
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Messages ever popped.
    pub fn popped(&self) -> u64 {
        self.popped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use herald_types::{EntityId, InformationType, RegionId};
    use std::sync::Arc;

    fn epoch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1444, 11, 11)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    fn message(priority: Priority, due_in_hours: i64) -> Message {
        let packet = Packet::new(
            InformationType::MilitaryAction,
            RegionId(1),
            EntityId(1),
            0.5,
            epoch(),
        );
        Message {
            packet,
            actor: ActorId(1000),
            priority,
            received_at: epoch(),
            scheduled_at: epoch() + TimeDelta::hours(due_in_hours),
        }
    }

    #[test]
    fn most_urgent_tier_first() {
        let mailbox = Mailbox::new();
        mailbox.push(message(Priority::Low, 0));
        mailbox.push(message(Priority::Critical, 0));
        mailbox.push(message(Priority::Medium, 0));
        let order: Vec<Priority> = std::iter::from_fn(|| mailbox.pop_due(epoch()))
            .map(|m| m.priority)
            .collect();
        assert_eq!(order, vec![Priority::Critical, Priority::Medium, Priority::Low]);
        assert_eq!(mailbox.pushed(), 3);
        assert_eq!(mailbox.popped(), 3);
    }

    #[test]
    fn undue_messages_stay_queued() {
        let mailbox = Mailbox::new();
        mailbox.push(message(Priority::High, 24));
        mailbox.push(message(Priority::Low, 0));

        let first = mailbox.pop_due(epoch());
        assert!(first.is_some_and(|m| m.priority == Priority::Low));
        assert!(mailbox.pop_due(epoch()).is_none());
        assert_eq!(mailbox.len(), 1);
        assert!(mailbox.has_pending(Priority::High));

        let later = epoch() + TimeDelta::hours(24);
        assert!(mailbox.pop_due(later).is_some());
        assert!(mailbox.is_empty());
    }

    #[test]
    fn counts_by_tier() {
        let mailbox = Mailbox::new();
        mailbox.push(message(Priority::High, 0));
        mailbox.push(message(Priority::High, 0));
        mailbox.push(message(Priority::Low, 0));
        let counts = mailbox.len_by_priority();
        assert_eq!(counts.high, 2);
        assert_eq!(counts.get(Priority::Low), 1);
        assert_eq!(counts.total(), 3);
        assert_eq!(mailbox.clear(), 3);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn pop_timeout_gives_up_on_empty() {
        let mailbox = Mailbox::new();
        assert!(mailbox.pop_timeout(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn pop_timeout_wakes_on_push() {
        let mailbox = Arc::new(Mailbox::new());
        let producer = Arc::clone(&mailbox);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            producer.push(message(Priority::Medium, 0));
        });
        let received = mailbox.pop_timeout(Duration::from_secs(5));
        assert!(received.is_some_and(|m| m.priority == Priority::Medium));
        assert!(handle.join().is_ok());
    }

    #[test]
    fn relevance_maps_to_tiers() {
        assert_eq!(Priority::from_relevance(Relevance::Critical), Priority::Critical);
        assert_eq!(Priority::from_relevance(Relevance::High), Priority::High);
        assert_eq!(Priority::from_relevance(Relevance::Irrelevant), Priority::Low);
    }
}
