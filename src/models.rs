// =============================================================================
// models.rs — THE SACRED DATA STRUCTURES OF LEAD GENERATION
// =============================================================================
//
// These structs represent the fundamental building blocks of our lead
// discovery system. Raw crime reports go in one end, verified addresses and
// scored sales leads come out the other, and every intermediate form lives
// here.
//
// Is it overkill to have a confidence score on an address guess?
// Yes. Do we care? Absolutely not.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Placeholder strings that upstream feeds use when they have nothing to say.
/// "unknown" is not an address. "N/A" is not an address. We have standards.
const SENTINEL_VALUES: &[&str] = &["unknown", "not specified", "", "n/a", "none"];

/// Normalize an optional upstream field: trim it, and treat sentinel
/// placeholders as absent. Every field read in the fallback chain goes
/// through here so "unknown" can never masquerade as a real address.
pub fn clean_field(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if SENTINEL_VALUES
        .iter()
        .any(|s| trimmed.eq_ignore_ascii_case(s))
    {
        return None;
    }
    Some(trimmed.to_string())
}

/// Everything the text analyzer managed to dig out of one incident
/// description. Produced once per text, never mutated, never cached.
///
/// The sets are BTreeSets so iteration order is deterministic — identical
/// input text must produce identical candidate lists downstream, and a
/// HashSet would shuffle the cartesian product on every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationClues {
    /// Cities, states, zip codes, street fragments, directional
    /// neighborhoods — anything that smells like a place.
    pub geographic_entities: BTreeSet<String>,

    /// Business names and business-type vocabulary hits.
    /// May include capitalized-phrase guesses of questionable accuracy.
    pub business_entities: BTreeSet<String>,

    /// Spatial-relation phrases like "near" and "corner of" that glue
    /// a business to a place in the original prose.
    pub contextual_info: BTreeSet<String>,

    /// Best-effort regex extraction of a complete street address,
    /// if the text contained one. This is the jackpot field.
    pub extracted_address: Option<String>,
}

impl LocationClues {
    /// True when the analyzer found nothing at all. An incident with
    /// empty clues cannot proceed to inference.
    pub fn is_empty(&self) -> bool {
        self.geographic_entities.is_empty()
            && self.business_entities.is_empty()
            && self.contextual_info.is_empty()
            && self.extracted_address.is_none()
    }
}

impl fmt::Display for LocationClues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} geo / {} business / {} contextual / address: {}",
            self.geographic_entities.len(),
            self.business_entities.len(),
            self.contextual_info.len(),
            self.extracted_address.as_deref().unwrap_or("none")
        )
    }
}

/// An unverified address/business query produced by the inferrer.
/// Think of it as a hypothesis: "maybe the incident happened at a
/// jewelry store in Frisco, TX." The confirmer's job is to find out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressCandidate {
    /// The query string we will hand to the place-search provider.
    pub query: String,

    /// The business-name half of the query, when the query splits
    /// cleanly into business + location. Used for name matching
    /// against confirmed places.
    pub business_name: Option<String>,

    /// The location half of the query, same deal.
    pub location: Option<String>,

    /// Heuristic confidence in [0, 1]. Longer, more specific queries
    /// score higher. This is a prior, not a promise.
    pub confidence: f64,
}

impl fmt::Display for AddressCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({:.0}%)", self.query, self.confidence * 100.0)
    }
}

/// A candidate that survived external confirmation: a real place with a
/// real address, blessed by the provider and scored above threshold.
/// This is the terminal success of the address-resolution pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedAddress {
    pub place_id: String,
    pub name: String,
    pub formatted_address: String,
    pub lat: f64,
    pub lng: f64,
    /// Final combined confidence after place matching, capped at 1.0.
    pub confidence: f64,
    /// Best-effort enrichment from a details lookup. Absence is fine.
    pub phone: Option<String>,
    /// Same deal as phone.
    pub website: Option<String>,
    /// The candidate query that produced this confirmation, kept for
    /// audit trails and postmortems.
    pub original_query: String,
}

impl fmt::Display for ConfirmedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} (confidence: {:.1}%)",
            self.name,
            self.formatted_address,
            self.confidence * 100.0
        )
    }
}

/// Every way the address-resolution pipeline can come up empty-handed.
///
/// These are EXPECTED outcomes, not exceptions — a vague incident
/// description is a data-quality problem, not a bug. The #[error]
/// strings are the exact reason strings surfaced to callers and logs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Empty text provided")]
    EmptyText,

    #[error("No location clues found")]
    NoLocationClues,

    #[error("No candidate addresses inferred")]
    NoCandidates,

    #[error("No candidate addresses provided")]
    NoCandidatesProvided,

    #[error("No candidates could be confirmed")]
    NotConfirmed,
}

/// The business categories we actually sell to. Everything else is an
/// `Other` and gets unceremoniously scored to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessCategory {
    /// Jewelry stores. The bread and butter. Nothing motivates a
    /// security-system purchase like the jeweler across the street
    /// getting cleaned out.
    Jewelry,
    /// Luxury goods — designer handbags, watches, the works.
    LuxuryGoods,
    /// Sports memorabilia. Signed jerseys walk out of stores more
    /// often than you'd think.
    SportsMemorabilia,
    /// Anything the provider returned that we don't sell to.
    /// Hardware stores, nail salons, the occasional church.
    Other(String),
}

impl BusinessCategory {
    /// The wire-format string for this category.
    pub fn as_str(&self) -> &str {
        match self {
            BusinessCategory::Jewelry => "jewelry",
            BusinessCategory::LuxuryGoods => "luxury_goods",
            BusinessCategory::SportsMemorabilia => "sports_memorabilia",
            BusinessCategory::Other(s) => s.as_str(),
        }
    }

    /// Only the three named categories are eligible to become leads.
    pub fn is_target(&self) -> bool {
        !matches!(self, BusinessCategory::Other(_))
    }
}

impl fmt::Display for BusinessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tag distinguishing the two record shapes we hand to persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Incident,
    Nearby,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Incident => write!(f, "incident"),
            RecordType::Nearby => write!(f, "nearby"),
        }
    }
}

/// The output record. One per incident, plus one per surviving lead.
/// This is what gets serialized to a JSON line and handed to the
/// external persistence collaborator. Field names follow the
/// collaborator's schema, camelCase warts and all.
#[derive(Debug, Clone, Serialize)]
pub struct LeadRecord {
    /// A UUID v4, because even a robbed jewelry store deserves to feel
    /// unique and special.
    pub id: String,

    #[serde(rename = "businessName")]
    pub business_name: String,

    /// The resolved incident address. Absent when resolution failed
    /// all the way down the fallback chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// A nearby lead's verified street address.
    #[serde(rename = "exactAddress", skip_serializing_if = "Option::is_none")]
    pub exact_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    /// Target category of a nearby lead. Incident records carry none.
    #[serde(rename = "businessType", skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,

    /// Great-circle miles from the incident, rounded to 2 decimals.
    /// Always 0.0 on incident records.
    pub distance_from_incident: f64,

    /// 0..=6. Always 0 on incident records.
    pub lead_score: u8,

    pub record_type: RecordType,

    /// Back-reference from a nearby lead to its incident record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,

    /// When OUR pipeline produced this record. Not when the crime
    /// happened — upstream owns that timeline.
    pub detected_at: DateTime<Utc>,
}

impl LeadRecord {
    /// Build the anchor record for an incident. Emitted even when the
    /// address could not be resolved, so downstream always sees the
    /// incident itself.
    pub fn incident(
        business_name: String,
        address: Option<String>,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            business_name,
            address,
            exact_address: None,
            lat,
            lng,
            business_type: None,
            distance_from_incident: 0.0,
            lead_score: 0,
            record_type: RecordType::Incident,
            incident_id: None,
            detected_at: Utc::now(),
        }
    }

    /// Build a nearby-lead record. Caller has already verified the
    /// category gate and the score; this is pure assembly.
    #[allow(clippy::too_many_arguments)]
    pub fn nearby(
        business_name: String,
        exact_address: String,
        category: &BusinessCategory,
        distance_miles: f64,
        lead_score: u8,
        incident_id: &str,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            business_name,
            address: None,
            exact_address: Some(exact_address),
            lat,
            lng,
            business_type: Some(category.as_str().to_string()),
            distance_from_incident: distance_miles,
            lead_score,
            record_type: RecordType::Nearby,
            incident_id: Some(incident_id.to_string()),
            detected_at: Utc::now(),
        }
    }
}

impl fmt::Display for LeadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record_type {
            RecordType::Incident => write!(
                f,
                "[incident] {} @ {}",
                self.business_name,
                self.address.as_deref().unwrap_or("unresolved")
            ),
            RecordType::Nearby => write!(
                f,
                "[nearby] {} ({}) — {:.2} mi, score {}",
                self.business_name,
                self.business_type.as_deref().unwrap_or("?"),
                self.distance_from_incident,
                self.lead_score
            ),
        }
    }
}

/// A raw incident record from the upstream analysis collaborator.
/// Field names arrive in whatever casing the upstream felt like that
/// day, hence the alias pile. Every string field may hold a sentinel
/// placeholder instead of a value — read them through `clean_field`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IncidentReport {
    #[serde(alias = "businessName")]
    pub business_name: Option<String>,

    #[serde(alias = "storeType")]
    pub store_type: Option<String>,

    #[serde(alias = "crimeType")]
    pub crime_type: Option<String>,

    /// Pre-extracted address, when upstream already did the work.
    #[serde(alias = "incidentAddress")]
    pub incident_address: Option<String>,

    #[serde(alias = "exactAddress")]
    pub exact_address: Option<String>,

    #[serde(alias = "businessAddress")]
    pub business_address: Option<String>,

    pub address: Option<String>,

    pub location: Option<String>,

    /// One upstream field, two historical spellings.
    #[serde(alias = "detailedLocation")]
    pub detailed_location: Option<String>,

    pub description: Option<String>,

    pub content: Option<String>,
}

impl IncidentReport {
    /// The display name for this incident's business, sentinel-cleaned,
    /// falling back to a fixed label so records always have a name.
    pub fn display_name(&self) -> String {
        clean_field(self.business_name.as_deref())
            .unwrap_or_else(|| "Unknown Business".to_string())
    }

    /// The free text worth analyzing: description, else content.
    pub fn narrative(&self) -> Option<String> {
        clean_field(self.description.as_deref())
            .or_else(|| clean_field(self.content.as_deref()))
    }
}
