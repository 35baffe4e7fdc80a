//! Normalizes inbound "event occurred" reports into packets.
//!
//! Gameplay systems describe events loosely: a kind string, a source
//! region, an originator, and a numeric payload. [`packet_from_report`]
//! classifies the kind, works out a severity, and produces a [`Packet`]
//! ready for [`PropagationEngine::start_propagation`].
//!
//! [`PropagationEngine::start_propagation`]: crate::PropagationEngine::start_propagation

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use herald_types::{EntityId, InformationType, Packet, RegionId};

/// Payload key carrying an explicit severity.
pub const KEY_SEVERITY: &str = "severity";
/// Payload key carrying an economic impact in `[0, 1]`.
pub const KEY_ECONOMIC_IMPACT: &str = "economic_impact";
/// Payload key carrying battle casualties.
pub const KEY_CASUALTIES: &str = "casualties";
/// Payload key carrying the other party of a bilateral event.
pub const KEY_TARGET: &str = "target";
/// Payload key carrying the number of claimants to a throne.
pub const KEY_CLAIMANTS: &str = "claimants";

/// Casualty count that adds the full casualty boost to severity.
const CASUALTY_SCALE: f64 = 10_000.0;

/// Largest severity boost a payload can add on top of the type default.
const MAX_PAYLOAD_BOOST: f64 = 0.3;

/// An event as reported by a gameplay system.
#[derive(Debug, Clone, PartialEq)]
pub struct EventReport {
    /// Loose event kind, e.g. `"MilitaryEvent"` or `"famine"`.
    pub kind: String,
    /// Region where it happened.
    pub source_region: RegionId,
    /// Who caused it, or [`EntityId::NONE`].
    pub originator: EntityId,
    /// Free-text description.
    pub description: String,
    /// Numeric payload.
    pub numeric: BTreeMap<String, f64>,
    /// Text payload.
    pub text: BTreeMap<String, String>,
    /// Game date of the event.
    pub occurred_at: NaiveDateTime,
}

impl EventReport {
    /// Start a report with an empty payload.
    pub fn new(
        kind: impl Into<String>,
        source_region: RegionId,
        originator: EntityId,
        occurred_at: NaiveDateTime,
    ) -> Self {
        Self {
            kind: kind.into(),
            source_region,
            originator,
            description: String::new(),
            numeric: BTreeMap::new(),
            text: BTreeMap::new(),
            occurred_at,
        }
    }

    /// Add a numeric payload entry.
    #[must_use]
    pub fn with_numeric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.numeric.insert(key.into(), value);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Classify a loose event kind string into an [`InformationType`].
///
/// Matching is case-insensitive on keywords; unknown kinds are treated as
/// diplomatic news.
pub fn classify_event(kind: &str) -> InformationType {
    const TABLE: &[(&[&str], InformationType)] = &[
        (&["rebel", "revolt", "uprising"], InformationType::Rebellion),
        (&["succession", "heir", "throne"], InformationType::SuccessionCrisis),
        (&["alliance"], InformationType::AllianceFormation),
        (&["plague", "disease", "epidemic"], InformationType::Plague),
        (
            &["disaster", "earthquake", "flood", "fire"],
            InformationType::NaturalDisaster,
        ),
        (&["trade", "embargo"], InformationType::TradeDisruption),
        (
            &["economic", "famine", "bankrupt", "debt"],
            InformationType::EconomicCrisis,
        ),
        (&["tech", "invent", "discover"], InformationType::TechnologyAdvance),
        (&["religio", "heresy", "faith"], InformationType::ReligiousEvent),
        (&["cultur"], InformationType::CulturalShift),
        (
            &["war", "battle", "siege", "military", "raid"],
            InformationType::MilitaryAction,
        ),
        (
            &["diplomatic", "treaty", "embassy"],
            InformationType::DiplomaticChange,
        ),
    ];

    let lower = kind.to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(InformationType::DiplomaticChange, |(_, kind)| *kind)
}

/// Work out the severity of an event from its type and payload.
///
/// An explicit `severity` entry wins. Otherwise the type default is raised
/// by casualties or economic impact, by at most 0.3.
pub fn event_severity(kind: InformationType, numeric: &BTreeMap<String, f64>) -> f64 {
    if let Some(explicit) = numeric.get(KEY_SEVERITY) {
        return explicit.clamp(0.0, 1.0);
    }

    let mut boost: f64 = 0.0;
    if let Some(casualties) = numeric.get(KEY_CASUALTIES) {
        boost = boost.max((casualties.max(0.0) / CASUALTY_SCALE) * MAX_PAYLOAD_BOOST);
    }
    if let Some(impact) = numeric.get(KEY_ECONOMIC_IMPACT) {
        boost = boost.max(impact.clamp(0.0, 1.0) * MAX_PAYLOAD_BOOST);
    }
    (kind.default_severity() + boost.min(MAX_PAYLOAD_BOOST)).clamp(0.0, 1.0)
}

/// Normalize a report into a packet at its source region.
pub fn packet_from_report(report: EventReport) -> Packet {
    let kind = classify_event(&report.kind);
    let severity = event_severity(kind, &report.numeric);
    let description = if report.description.is_empty() {
        format!("{kind} reported in region {}", report.source_region)
    } else {
        report.description
    };
    let mut packet = Packet::new(
        kind,
        report.source_region,
        report.originator,
        severity,
        report.occurred_at,
    )
    .with_description(description);
    packet.numeric = report.numeric;
    packet.text = report.text;
    packet
}

/// A battle, siege, or declaration of war.
pub fn military_event(
    region: RegionId,
    aggressor: EntityId,
    defender: EntityId,
    severity: f64,
    at: NaiveDateTime,
) -> Packet {
    Packet::new(
        InformationType::MilitaryAction,
        region,
        aggressor,
        severity,
        at,
    )
    .with_description(format!("Realm {aggressor} moves against realm {defender}"))
    .with_numeric(KEY_TARGET, f64::from(defender.0))
}

/// A change in relations between two realms.
///
/// A change that forms an alliance is reported as an alliance formation.
pub fn diplomatic_event(
    region: RegionId,
    actor: EntityId,
    other: EntityId,
    change: &str,
    at: NaiveDateTime,
) -> Packet {
    let kind = if change.to_ascii_lowercase().contains("alliance") {
        InformationType::AllianceFormation
    } else {
        InformationType::DiplomaticChange
    };
    Packet::new(kind, region, actor, kind.default_severity(), at)
        .with_description(format!("Realm {actor}: {change} with realm {other}"))
        .with_numeric(KEY_TARGET, f64::from(other.0))
        .with_text("change", change)
}

/// An economic shock in a region.
pub fn economic_event(
    region: RegionId,
    nation: EntityId,
    impact: f64,
    at: NaiveDateTime,
) -> Packet {
    let mut numeric = BTreeMap::new();
    numeric.insert(KEY_ECONOMIC_IMPACT.to_owned(), impact);
    let severity = event_severity(InformationType::EconomicCrisis, &numeric);
    Packet::new(InformationType::EconomicCrisis, region, nation, severity, at)
        .with_description(format!("Economic crisis in region {region}"))
        .with_numeric(KEY_ECONOMIC_IMPACT, impact)
}

/// A disputed throne. More claimants make for a more severe crisis.
pub fn succession_crisis(
    region: RegionId,
    realm: EntityId,
    claimants: u32,
    at: NaiveDateTime,
) -> Packet {
    let extra = f64::from(claimants.saturating_sub(1)) * 0.05;
    let severity = (InformationType::SuccessionCrisis.default_severity() + extra).min(1.0);
    Packet::new(InformationType::SuccessionCrisis, region, realm, severity, at)
        .with_description(format!("Succession crisis in realm {realm}"))
        .with_numeric(KEY_TARGET, f64::from(realm.0))
        .with_numeric(KEY_CLAIMANTS, f64::from(claimants))
}

/// Read the bilateral target entity stored in a packet's payload, if any.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn packet_target(packet: &Packet) -> Option<EntityId> {
    packet
        .numeric(KEY_TARGET)
        .filter(|v| v.is_finite() && *v >= 1.0 && *v <= f64::from(u32::MAX))
        .map(|v| EntityId(v.round() as u32))
}
