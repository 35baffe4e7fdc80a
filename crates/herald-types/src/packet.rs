//! The normalized event packet.
//!
//! A [`Packet`] is created once per external event and copied at every
//! relay. Each relay increments the hop count, degrades accuracy, and
//! appends the next region to the path, so accuracy never increases with
//! distance from the source and a path never revisits a region.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, PacketId, RegionId};

// ---------------------------------------------------------------------------
// InformationType
// ---------------------------------------------------------------------------

/// Category of a world event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InformationType {
    /// Armies moved, battles fought, sieges laid.
    MilitaryAction,
    /// A revolt inside a realm.
    Rebellion,
    /// A disputed or vacant throne.
    SuccessionCrisis,
    /// Relations between two realms changed.
    DiplomaticChange,
    /// Bankruptcy, famine, or collapse of income.
    EconomicCrisis,
    /// A technology was discovered.
    TechnologyAdvance,
    /// Religious upheaval or conversion.
    ReligiousEvent,
    /// Cultural drift or flowering.
    CulturalShift,
    /// Earthquake, flood, or similar.
    NaturalDisaster,
    /// Disease outbreak.
    Plague,
    /// Trade routes cut or embargoes imposed.
    TradeDisruption,
    /// Two realms formed an alliance.
    AllianceFormation,
}

impl InformationType {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::MilitaryAction,
        Self::Rebellion,
        Self::SuccessionCrisis,
        Self::DiplomaticChange,
        Self::EconomicCrisis,
        Self::TechnologyAdvance,
        Self::ReligiousEvent,
        Self::CulturalShift,
        Self::NaturalDisaster,
        Self::Plague,
        Self::TradeDisruption,
        Self::AllianceFormation,
    ];

    /// Relative spreading speed before the severity factor is applied.
    pub const fn base_speed(self) -> f64 {
        match self {
            Self::MilitaryAction => 1.5,
            Self::Rebellion => 1.3,
            Self::SuccessionCrisis | Self::Plague => 1.2,
            Self::AllianceFormation | Self::NaturalDisaster => 1.1,
            Self::DiplomaticChange => 1.0,
            Self::EconomicCrisis | Self::TradeDisruption => 0.8,
            Self::ReligiousEvent => 0.7,
            Self::TechnologyAdvance => 0.6,
            Self::CulturalShift => 0.5,
        }
    }

    /// Severity assumed when an event carries no explicit severity.
    pub const fn default_severity(self) -> f64 {
        match self {
            Self::SuccessionCrisis | Self::Plague => 0.8,
            Self::MilitaryAction | Self::Rebellion => 0.7,
            Self::NaturalDisaster => 0.6,
            Self::EconomicCrisis | Self::AllianceFormation => 0.5,
            Self::DiplomaticChange | Self::TradeDisruption => 0.4,
            Self::ReligiousEvent | Self::TechnologyAdvance => 0.3,
            Self::CulturalShift => 0.2,
        }
    }
}

impl core::fmt::Display for InformationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::MilitaryAction => "military action",
            Self::Rebellion => "rebellion",
            Self::SuccessionCrisis => "succession crisis",
            Self::DiplomaticChange => "diplomatic change",
            Self::EconomicCrisis => "economic crisis",
            Self::TechnologyAdvance => "technology advance",
            Self::ReligiousEvent => "religious event",
            Self::CulturalShift => "cultural shift",
            Self::NaturalDisaster => "natural disaster",
            Self::Plague => "plague",
            Self::TradeDisruption => "trade disruption",
            Self::AllianceFormation => "alliance formation",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Relevance
// ---------------------------------------------------------------------------

/// Relevance tier of a packet, totally ordered from irrelevant to critical.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Relevance {
    /// Not worth anyone's attention.
    #[default]
    Irrelevant,
    /// Background noise.
    Low,
    /// Worth noting.
    Medium,
    /// Demands a reaction soon.
    High,
    /// Demands a reaction now.
    Critical,
}

impl Relevance {
    /// Numeric weight used in attention scoring.
    pub const fn weight(self) -> f64 {
        match self {
            Self::Critical => 1.0,
            Self::High => 0.7,
            Self::Medium => 0.4,
            Self::Low => 0.2,
            Self::Irrelevant => 0.0,
        }
    }

    /// Base relevance tier implied by an event severity.
    pub fn from_severity(severity: f64) -> Self {
        if severity >= 0.9 {
            Self::Critical
        } else if severity >= 0.7 {
            Self::High
        } else if severity >= 0.4 {
            Self::Medium
        } else if severity >= 0.2 {
            Self::Low
        } else {
            Self::Irrelevant
        }
    }
}

impl core::fmt::Display for Relevance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Irrelevant => "irrelevant",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Normalized representation of a world event as it travels between regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Unique id shared by every relayed copy of the same event.
    pub id: PacketId,
    /// Event category.
    pub kind: InformationType,
    /// Relevance tier before per-actor adjustment.
    pub base_relevance: Relevance,
    /// Region where the event happened.
    pub source_region: RegionId,
    /// Entity that caused the event, or [`EntityId::NONE`].
    pub originator: EntityId,
    /// Free-text description.
    pub description: String,
    /// How serious the event is, in `[0, 1]`.
    pub severity: f64,
    /// How faithful this copy is, in `[0, 1]`; `1.0` at the source.
    pub accuracy: f64,
    /// Number of relays from the source region.
    pub hop_count: u32,
    /// Regions visited so far, starting with the source. Never repeats.
    pub path: Vec<RegionId>,
    /// Numeric payload (amounts, casualties, etc.).
    pub numeric: BTreeMap<String, f64>,
    /// Text payload (names, titles, etc.).
    pub text: BTreeMap<String, String>,
    /// Game date the event happened.
    pub occurred_at: NaiveDateTime,
}

impl Packet {
    /// Create a fresh packet at its source region.
    ///
    /// Severity is clamped to `[0, 1]` and the base relevance is derived
    /// from it; use [`Self::with_base_relevance`] to override.
    pub fn new(
        kind: InformationType,
        source_region: RegionId,
        originator: EntityId,
        severity: f64,
        occurred_at: NaiveDateTime,
    ) -> Self {
        let severity = severity.clamp(0.0, 1.0);
        Self {
            id: PacketId::new(),
            kind,
            base_relevance: Relevance::from_severity(severity),
            source_region,
            originator,
            description: String::new(),
            severity,
            accuracy: 1.0,
            hop_count: 0,
            path: vec![source_region],
            numeric: BTreeMap::new(),
            text: BTreeMap::new(),
            occurred_at,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Override the base relevance tier.
    #[must_use]
    pub const fn with_base_relevance(mut self, relevance: Relevance) -> Self {
        self.base_relevance = relevance;
        self
    }

    /// Add a numeric payload entry.
    #[must_use]
    pub fn with_numeric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.numeric.insert(key.into(), value);
        self
    }

    /// Add a text payload entry.
    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.text.insert(key.into(), value.into());
        self
    }

    /// Look up a numeric payload entry.
    pub fn numeric(&self, key: &str) -> Option<f64> {
        self.numeric.get(key).copied()
    }

    /// Effective propagation speed: type base speed scaled by severity.
    pub fn propagation_speed(&self) -> f64 {
        self.kind.base_speed() * (0.5 + self.severity)
    }

    /// Accuracy after one more relay at the given degradation rate.
    pub fn degraded_accuracy(&self, degradation_rate: f64) -> f64 {
        let rate = degradation_rate.clamp(0.0, 1.0);
        (self.accuracy * (1.0 - rate)).clamp(0.0, self.accuracy)
    }

    /// Whether `region` already appears in the propagation path.
    pub fn has_visited(&self, region: RegionId) -> bool {
        self.path.contains(&region)
    }

    /// The region this copy currently sits in.
    pub fn current_region(&self) -> RegionId {
        self.path.last().copied().unwrap_or(self.source_region)
    }

    /// Produce the copy that arrives in `next` after one relay.
    #[must_use]
    pub fn relayed(&self, next: RegionId, degradation_rate: f64) -> Self {
        let mut copy = self.clone();
        copy.hop_count = self.hop_count.saturating_add(1);
        copy.accuracy = self.degraded_accuracy(degradation_rate);
        copy.path.push(next);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn epoch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1444, 11, 11)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    #[test]
    fn relevance_is_totally_ordered() {
        assert!(Relevance::Irrelevant < Relevance::Low);
        assert!(Relevance::Low < Relevance::Medium);
        assert!(Relevance::Medium < Relevance::High);
        assert!(Relevance::High < Relevance::Critical);
    }

    #[test]
    fn base_relevance_from_severity() {
        assert_eq!(Relevance::from_severity(0.95), Relevance::Critical);
        assert_eq!(Relevance::from_severity(0.9), Relevance::Critical);
        assert_eq!(Relevance::from_severity(0.8), Relevance::High);
        assert_eq!(Relevance::from_severity(0.5), Relevance::Medium);
        assert_eq!(Relevance::from_severity(0.25), Relevance::Low);
        assert_eq!(Relevance::from_severity(0.05), Relevance::Irrelevant);
    }

    #[test]
    fn military_outruns_economic_news() {
        let military = Packet::new(
            InformationType::MilitaryAction,
            RegionId(1),
            EntityId(1),
            0.5,
            epoch(),
        );
        let economic = Packet::new(
            InformationType::EconomicCrisis,
            RegionId(1),
            EntityId(1),
            0.5,
            epoch(),
        );
        assert!(military.propagation_speed() > economic.propagation_speed());
    }

    #[test]
    fn relay_degrades_and_extends_path() {
        let packet = Packet::new(
            InformationType::Plague,
            RegionId(1),
            EntityId::NONE,
            0.7,
            epoch(),
        );
        let next = packet.relayed(RegionId(2), 0.05);
        assert_eq!(next.hop_count, 1);
        assert!(next.accuracy < packet.accuracy);
        assert!((next.accuracy - 0.95).abs() < 1e-9);
        assert_eq!(next.path, vec![RegionId(1), RegionId(2)]);
        assert!(next.has_visited(RegionId(1)));
        assert_eq!(next.current_region(), RegionId(2));
        assert_eq!(next.id, packet.id);
    }

    #[test]
    fn accuracy_never_increases_even_with_bad_rate() {
        let packet = Packet::new(
            InformationType::Rebellion,
            RegionId(1),
            EntityId(2),
            0.6,
            epoch(),
        );
        let mut current = packet;
        for (step, rate) in [0.05, -0.5, 0.3, 2.0].into_iter().enumerate() {
            let next = current.relayed(RegionId(u32::try_from(step).unwrap_or(0).saturating_add(10)), rate);
            assert!(next.accuracy <= current.accuracy);
            current = next;
        }
        assert!(current.accuracy >= 0.0);
    }

    #[test]
    fn severity_is_clamped() {
        let packet = Packet::new(
            InformationType::NaturalDisaster,
            RegionId(3),
            EntityId::NONE,
            1.7,
            epoch(),
        );
        assert!((packet.severity - 1.0).abs() < f64::EPSILON);
        assert_eq!(packet.base_relevance, Relevance::Critical);
    }

    #[test]
    fn payload_builders() {
        let packet = Packet::new(
            InformationType::EconomicCrisis,
            RegionId(3),
            EntityId(4),
            0.5,
            epoch(),
        )
        .with_description("Treasury collapse")
        .with_numeric("economic_impact", 0.4)
        .with_text("realm", "Aragon");
        assert_eq!(packet.numeric("economic_impact"), Some(0.4));
        assert_eq!(packet.numeric("missing"), None);
        assert_eq!(packet.text.get("realm").map(String::as_str), Some("Aragon"));
        assert_eq!(packet.description, "Treasury collapse");
    }
}
