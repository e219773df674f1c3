// =============================================================================
// inferrer.rs — THE CANDIDATE FACTORY
// =============================================================================
//
// The analyzer hands us loose clues: a pile of business names, a pile of
// places, a handful of spatial phrases. This module welds them into search
// queries the place provider can actually answer.
//
// The query design philosophy:
// - Always pair a business entity with a geographic entity when we have both
// - Generate one extra variant per contextual phrase, because "pawn shop
//   near Frisco" and "pawn shop in Frisco" hit different provider results
// - Longer, more specific queries outrank shorter ones — "Diamond Jewelers
//   in Dallas, TX" is a better bet than "jewelry"
//
// Everything here is pure, deterministic string assembly. Identical clues
// in, identical candidate list out, every single time. The external world
// does not get consulted until the confirmer.
// =============================================================================

use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

use crate::models::{AddressCandidate, LocationClues};
use crate::text_analyzer::{self, CONTEXTUAL_PHRASES};

/// Combine location clues into a ranked list of address candidates.
///
/// The list comes back deduplicated and sorted by descending confidence;
/// equal-confidence candidates keep their descending-length order, so the
/// most specific query is always checked first.
pub fn infer_addresses(clues: &LocationClues) -> Vec<AddressCandidate> {
    let mut queries: Vec<String> = Vec::new();

    // The regex-extracted address, when present, enters the pool as a
    // query of its own. It competes under the same scoring as everything
    // else and usually wins, as it should.
    if let Some(addr) = &clues.extracted_address {
        queries.push(addr.clone());
    }

    let has_business = !clues.business_entities.is_empty();
    let has_geo = !clues.geographic_entities.is_empty();

    if has_business && has_geo {
        // Cartesian combination: every business crossed with every place.
        // The " in " form is the base; each contextual phrase adds a
        // variant on top of it, never instead of it.
        for business in &clues.business_entities {
            for geo in &clues.geographic_entities {
                queries.push(format!("{business} in {geo}"));
                for phrase in &clues.contextual_info {
                    queries.push(format!("{business} {phrase} {geo}"));
                }
            }
        }
    } else if has_business {
        queries.extend(clues.business_entities.iter().cloned());
    } else if has_geo {
        queries.extend(clues.geographic_entities.iter().cloned());
    }

    // Dedupe by exact string, first occurrence wins.
    let mut seen: HashSet<&str> = HashSet::new();
    let mut unique: Vec<String> = Vec::new();
    for q in &queries {
        if seen.insert(q.as_str()) {
            unique.push(q.clone());
        }
    }

    // Longest first. Length is a crude but honest proxy for specificity,
    // and it makes the confidence sort's tie-break meaningful.
    unique.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut candidates: Vec<AddressCandidate> = unique
        .into_iter()
        .map(|query| {
            let confidence = score_query(&query);
            let (business_name, location) = split_query(&query);
            AddressCandidate {
                query,
                business_name,
                location,
                confidence,
            }
        })
        .collect();

    // Stable sort: candidates with equal confidence keep the
    // descending-length order established above.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    debug!(
        candidates = candidates.len(),
        top = candidates
            .first()
            .map(|c| c.query.as_str())
            .unwrap_or("none"),
        "Address inference complete"
    );

    candidates
}

/// Heuristic confidence for a candidate query.
///
/// Base 0.5, plus:
/// - length bonus: +0.2 over 30 chars, +0.1 for 15-30
/// - +0.1 for a " in " joint (business-place structure)
/// - +0.1 for a street-suffix word (smells like a real address)
/// - +0.1 for a business-vocabulary hit (smells like a real business)
/// capped at 1.0.
fn score_query(query: &str) -> f64 {
    let mut confidence: f64 = 0.5;

    let len = query.len();
    if len > 30 {
        confidence += 0.2;
    } else if len >= 15 {
        confidence += 0.1;
    }

    if query.contains(" in ") {
        confidence += 0.1;
    }

    if text_analyzer::contains_street_type(query) {
        confidence += 0.1;
    }

    if text_analyzer::contains_business_vocab(query) {
        confidence += 0.1;
    }

    confidence.min(1.0)
}

/// Re-parse a query into its (business_name, location) halves.
///
/// Split on " in " first, then on any contextual phrase; a query with
/// neither is a bare location. The confirmer uses these halves for
/// name- and address-matching against returned places.
fn split_query(query: &str) -> (Option<String>, Option<String>) {
    if let Some(idx) = query.find(" in ") {
        let business = query[..idx].trim();
        let location = query[idx + 4..].trim();
        if !business.is_empty() && !location.is_empty() {
            return (Some(business.to_string()), Some(location.to_string()));
        }
    }

    for phrase in CONTEXTUAL_PHRASES {
        let needle = format!(" {phrase} ");
        if let Some(idx) = query.find(&needle) {
            let business = query[..idx].trim();
            let location = query[idx + needle.len()..].trim();
            if !business.is_empty() && !location.is_empty() {
                return (Some(business.to_string()), Some(location.to_string()));
            }
        }
    }

    (None, Some(query.to_string()))
}
