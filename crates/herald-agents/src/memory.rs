//! Bounded agent memory.
//!
//! Nations and characters remember the events they hear about. A
//! [`MemoryStore`] keeps at most `capacity` entries. Pruning first forgets
//! entries older than the configured lifetime, then drops the
//! least-impactful entries until the store is back under capacity.

use chrono::{NaiveDateTime, TimeDelta};
use herald_types::{EntityId, InformationType};

/// Signed impact of a piece of news: harmful kinds count negative.
pub fn impact_of(kind: InformationType, severity: f64) -> f64 {
    let magnitude = severity.clamp(0.0, 1.0);
    match kind {
        InformationType::MilitaryAction
        | InformationType::Rebellion
        | InformationType::Plague
        | InformationType::NaturalDisaster
        | InformationType::EconomicCrisis
        | InformationType::TradeDisruption
        | InformationType::SuccessionCrisis => -magnitude,
        _ => magnitude,
    }
}

/// One remembered event.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    /// Who the memory is about, or [`EntityId::NONE`].
    pub subject: EntityId,
    /// What kind of news it was.
    pub kind: InformationType,
    /// Free-text summary.
    pub description: String,
    /// Signed emotional or strategic impact. Negative is harmful.
    pub impact: f64,
    /// When it was remembered.
    pub when: NaiveDateTime,
}

/// Capacity- and age-bounded memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Vec<MemoryEntry>,
    capacity: usize,
    lifetime: TimeDelta,
}

impl MemoryStore {
    /// Create a store holding at most `capacity` entries for at most
    /// `lifetime_hours` game hours.
    pub fn new(capacity: usize, lifetime_hours: i64) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            lifetime: TimeDelta::try_hours(lifetime_hours).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Remember an entry. Over capacity, the least-impactful entry goes.
    pub fn record(&mut self, entry: MemoryEntry) {
        self.entries.push(entry);
        self.shed_excess();
    }

    /// Forget expired entries, then trim to capacity.
    ///
    /// Returns how many entries were removed.
    pub fn prune(&mut self, now: NaiveDateTime) -> usize {
        let before = self.entries.len();
        let lifetime = self.lifetime;
        self.entries
            .retain(|entry| now.signed_duration_since(entry.when) <= lifetime);
        self.shed_excess();
        before.saturating_sub(self.entries.len())
    }

    fn shed_excess(&mut self) {
        while self.entries.len() > self.capacity {
            let weakest = self
                .entries
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.impact.abs().total_cmp(&b.impact.abs()))
                .map(|(index, _)| index);
            match weakest {
                Some(index) => {
                    self.entries.remove(index);
                }
                None => break,
            }
        }
    }

    /// Entries in the order they were remembered.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one kind.
    pub fn count_of(&self, kind: InformationType) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Entries with negative impact.
    pub fn count_negative(&self) -> usize {
        self.entries.iter().filter(|e| e.impact < 0.0).count()
    }

    /// Summed impact of memories about `subject`.
    pub fn impact_on(&self, subject: EntityId) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.subject == subject)
            .map(|e| e.impact)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1444, 1, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    fn entry(impact: f64, when: NaiveDateTime) -> MemoryEntry {
        MemoryEntry {
            subject: EntityId(1),
            kind: InformationType::MilitaryAction,
            description: String::from("battle"),
            impact,
            when,
        }
    }

    #[test]
    fn over_capacity_drops_least_impactful() {
        let mut store = MemoryStore::new(2, 8760);
        store.record(entry(-0.9, at(1)));
        store.record(entry(0.1, at(2)));
        store.record(entry(0.5, at(3)));
        assert_eq!(store.len(), 2);
        let impacts: Vec<f64> = store.iter().map(|e| e.impact).collect();
        assert_eq!(impacts, vec![-0.9, 0.5]);
    }

    #[test]
    fn prune_forgets_expired_first() {
        let mut store = MemoryStore::new(10, 48);
        store.record(entry(1.0, at(1)));
        store.record(entry(0.1, at(5)));
        let removed = store.prune(at(6));
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!((store.impact_on(EntityId(1)) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn counts_by_kind_and_sign() {
        let mut store = MemoryStore::new(10, 8760);
        store.record(entry(-0.5, at(1)));
        store.record(MemoryEntry {
            kind: InformationType::EconomicCrisis,
            ..entry(0.3, at(2))
        });
        assert_eq!(store.count_of(InformationType::MilitaryAction), 1);
        assert_eq!(store.count_negative(), 1);
        assert!(!store.is_empty());
    }
}
