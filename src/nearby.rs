// =============================================================================
// nearby.rs — THE NEIGHBORHOOD CANVASSER
// =============================================================================
//
// Given one crime incident, this module answers the only question the
// sales team cares about: which businesses NEAR that incident are worth
// a phone call?
//
// The per-incident routine:
//
// 1. Resolve the best available address through a fixed fallback chain —
//    an explicit ordered list of resolver strategies, tried in sequence,
//    ending with the full text-resolution pipeline. No nested conditionals,
//    no reflection, no cleverness. A list.
// 2. Geocode the resolved address.
// 3. Run one nearby search per target category, 200 ms apart, capped
//    per category, inside the configured radius.
// 4. Score every returned place: a distance term plus a category term,
//    where a non-target category zeroes the WHOLE score. The category
//    gate is exclusive, not additive — a hardware store ten feet from
//    the crime scene is still a hardware store.
// 5. Keep only score > 0 AND target category. Everything else is dropped
//    before anyone downstream ever sees it.
//
// An incident whose address cannot be resolved still produces its
// incident record. One bad report must never take down a batch.
// =============================================================================

use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::{Config, PACING_DELAY};
use crate::finder::EnhancedAddressFinder;
use crate::geo::{GeoLocationService, GeoProvider, LatLng};
use crate::models::{clean_field, BusinessCategory, IncidentReport, LeadRecord};

/// Mean Earth radius in statute miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// One nearby search per entry, in this order. The provider search type
/// on the left, the category we expect back on the right.
const NEARBY_CATEGORIES: &[(&str, BusinessCategory)] = &[
    ("jewelry_store", BusinessCategory::Jewelry),
    ("luxury_goods_store", BusinessCategory::LuxuryGoods),
    ("sports_memorabilia_store", BusinessCategory::SportsMemorabilia),
];

/// The address-resolution fallback chain. Tried strictly in order; the
/// first strategy that yields a non-sentinel value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolverStrategy {
    /// Upstream already extracted an address for us. Trust but verify —
    /// well, mostly trust.
    PreExtracted,
    /// The structured address-ish fields, most specific first.
    StructuredFields,
    /// Glue "<businessName>, <location>" together and hope the geocoder
    /// is feeling generous.
    ConstructedQuery,
    /// The full analyzer -> inferrer -> confirmer pipeline over the
    /// free-text narrative. Last because it's the expensive one.
    EnhancedFinder,
}

const RESOLVER_CHAIN: [ResolverStrategy; 4] = [
    ResolverStrategy::PreExtracted,
    ResolverStrategy::StructuredFields,
    ResolverStrategy::ConstructedQuery,
    ResolverStrategy::EnhancedFinder,
];

impl std::fmt::Display for ResolverStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverStrategy::PreExtracted => write!(f, "pre_extracted"),
            ResolverStrategy::StructuredFields => write!(f, "structured_fields"),
            ResolverStrategy::ConstructedQuery => write!(f, "constructed_query"),
            ResolverStrategy::EnhancedFinder => write!(f, "enhanced_finder"),
        }
    }
}

/// Great-circle distance between two coordinates, in statute miles.
/// Symmetric by construction, zero for identical points.
pub fn haversine_miles(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

/// Round to 2 decimals — the precision the output schema promises.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// The 0-6 lead score.
///
/// Distance term: 3 under a quarter mile, 2 under half, 1 under one,
/// 0 beyond or unknown. Category term: 3 for any target category.
/// A non-target category is an exclusive gate — the entire score goes
/// to 0 no matter how close the place is.
pub fn lead_score(distance_miles: Option<f64>, category: &BusinessCategory) -> u8 {
    if !category.is_target() {
        return 0;
    }

    let distance_term = match distance_miles {
        Some(d) if d < 0.25 => 3,
        Some(d) if d < 0.5 => 2,
        Some(d) if d < 1.0 => 1,
        _ => 0,
    };

    distance_term + 3
}

/// Structured address-bearing fields, most specific first. The first
/// non-sentinel value wins.
fn structured_field_address(report: &IncidentReport) -> Option<String> {
    [
        report.exact_address.as_deref(),
        report.business_address.as_deref(),
        report.address.as_deref(),
        report.location.as_deref(),
        report.detailed_location.as_deref(),
    ]
    .into_iter()
    .find_map(clean_field)
}

/// "<businessName>, <location>" — a geocoder query, not an address.
/// Note the overlap with the structured-field list: whenever location
/// carries a value, the previous strategy already claimed it, so this
/// one fires only for field combinations the structured pass skipped.
fn constructed_query(report: &IncidentReport) -> Option<String> {
    match (
        clean_field(report.business_name.as_deref()),
        clean_field(report.location.as_deref()),
    ) {
        (Some(business), Some(location)) => Some(format!("{business}, {location}")),
        _ => None,
    }
}

/// Map a place's provider types onto our category universe. The first
/// recognized target type wins; a place with none of them is an Other
/// and will never survive scoring.
fn categorize_place(types: &[String]) -> BusinessCategory {
    for t in types {
        for (search_type, category) in NEARBY_CATEGORIES {
            if t == search_type {
                return category.clone();
            }
        }
    }
    BusinessCategory::Other(
        types
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
    )
}

/// Aggregate counters across a run — the only state shared between
/// incidents, and it's write-only from the pipeline's point of view.
/// Atomics because locks are for the weak.
#[derive(Default)]
pub struct PipelineStats {
    pub incidents_processed: AtomicU64,
    pub addresses_resolved: AtomicU64,
    pub geocode_failures: AtomicU64,
    pub leads_emitted: AtomicU64,
    pub incident_failures: AtomicU64,
}

/// A serializable snapshot for end-of-run reporting.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSnapshot {
    pub incidents_processed: u64,
    pub addresses_resolved: u64,
    pub geocode_failures: u64,
    pub leads_emitted: u64,
    pub incident_failures: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            incidents_processed: self.incidents_processed.load(Ordering::Relaxed),
            addresses_resolved: self.addresses_resolved.load(Ordering::Relaxed),
            geocode_failures: self.geocode_failures.load(Ordering::Relaxed),
            leads_emitted: self.leads_emitted.load(Ordering::Relaxed),
            incident_failures: self.incident_failures.load(Ordering::Relaxed),
        }
    }
}

/// The per-incident engine. Owns the fail-soft geo service; everything
/// else is borrowed per call and thrown away, so no state leaks from one
/// incident into the next.
pub struct NearbyBusinessFinder<P: GeoProvider> {
    geo: GeoLocationService<P>,
    config: Config,
    pub stats: PipelineStats,
}

impl<P: GeoProvider> NearbyBusinessFinder<P> {
    pub fn new(geo: GeoLocationService<P>, config: Config) -> Self {
        Self {
            geo,
            config,
            stats: PipelineStats::default(),
        }
    }

    /// Process one incident end to end: resolve, geocode, canvass, score,
    /// filter. Always returns at least the incident record; any
    /// unexpected failure is caught here so the batch keeps moving.
    pub async fn process_incident(&self, report: &IncidentReport) -> Vec<LeadRecord> {
        self.stats.incidents_processed.fetch_add(1, Ordering::Relaxed);

        match self.try_process(report).await {
            Ok(records) => records,
            Err(e) => {
                self.stats.incident_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    business = %report.display_name(),
                    error = %e,
                    "incident processing failed — emitting bare incident record and moving on"
                );
                vec![LeadRecord::incident(report.display_name(), None, None, None)]
            }
        }
    }

    async fn try_process(&self, report: &IncidentReport) -> anyhow::Result<Vec<LeadRecord>> {
        let Some(address) = self.resolve_address(report).await else {
            info!(
                business = %report.display_name(),
                "no resolvable address — incident recorded without nearby search"
            );
            return Ok(vec![LeadRecord::incident(
                report.display_name(),
                None,
                None,
                None,
            )]);
        };

        self.stats.addresses_resolved.fetch_add(1, Ordering::Relaxed);

        let coords = self.geo.geocode(&address).await;
        let incident = LeadRecord::incident(
            report.display_name(),
            Some(address.clone()),
            coords.map(|c| c.lat),
            coords.map(|c| c.lng),
        );
        let incident_id = incident.id.clone();

        let mut records = vec![incident];

        match coords {
            Some(origin) => {
                let leads = self.discover_nearby(origin, &incident_id).await;
                self.stats
                    .leads_emitted
                    .fetch_add(leads.len() as u64, Ordering::Relaxed);
                info!(
                    business = %report.display_name(),
                    address = %address,
                    leads = leads.len(),
                    "incident canvassed"
                );
                records.extend(leads);
            }
            None => {
                self.stats.geocode_failures.fetch_add(1, Ordering::Relaxed);
                debug!(address = %address, "geocode came back empty — skipping nearby search");
            }
        }

        Ok(records)
    }

    /// Walk the resolver chain and return the first usable address.
    async fn resolve_address(&self, report: &IncidentReport) -> Option<String> {
        for strategy in RESOLVER_CHAIN {
            let resolved = match strategy {
                ResolverStrategy::PreExtracted => clean_field(report.incident_address.as_deref()),

                ResolverStrategy::StructuredFields => structured_field_address(report),

                ResolverStrategy::ConstructedQuery => constructed_query(report),

                ResolverStrategy::EnhancedFinder => {
                    let Some(text) = report.narrative() else {
                        continue;
                    };
                    let finder = EnhancedAddressFinder::new(&self.geo, &self.config);
                    match finder.find_address(&text).await {
                        Ok(found) => Some(found.confirmed.formatted_address)
                            .filter(|a| !a.is_empty()),
                        Err(reason) => {
                            debug!(%reason, "text resolution failed");
                            None
                        }
                    }
                }
            };

            if let Some(address) = resolved {
                info!(strategy = %strategy, address = %address, "address resolved");
                return Some(address);
            }
        }
        None
    }

    /// One nearby search per target category, paced 200 ms apart, each
    /// capped at max_results_per_category. Returns only the survivors of
    /// the score/category filter.
    async fn discover_nearby(&self, origin: LatLng, incident_id: &str) -> Vec<LeadRecord> {
        let mut leads = Vec::new();

        for (i, (search_type, _)) in NEARBY_CATEGORIES.iter().enumerate() {
            if i > 0 {
                sleep(PACING_DELAY).await;
            }

            let places = self
                .geo
                .nearby_search(
                    origin.lat,
                    origin.lng,
                    self.config.search_radius_meters,
                    search_type,
                )
                .await;

            for place in places
                .into_iter()
                .take(self.config.max_results_per_category)
            {
                // Classify from the place's OWN types, not from the
                // search we happened to find it with. Nearby search
                // returns plenty of places that merely live next door
                // to the category we asked about.
                let category = categorize_place(&place.types);

                let distance = match (place.lat, place.lng) {
                    (Some(lat), Some(lng)) => {
                        Some(round2(haversine_miles(origin, LatLng { lat, lng })))
                    }
                    _ => None,
                };

                let score = lead_score(distance, &category);
                if score == 0 || !category.is_target() {
                    debug!(
                        place = place.name.as_deref().unwrap_or("?"),
                        category = %category,
                        distance = ?distance,
                        "place dropped by score/category filter"
                    );
                    continue;
                }

                leads.push(LeadRecord::nearby(
                    place
                        .name
                        .unwrap_or_else(|| "Unknown Business".to_string()),
                    place.formatted_address.unwrap_or_default(),
                    &category,
                    distance.unwrap_or(0.0),
                    score,
                    incident_id,
                    place.lat,
                    place.lng,
                ));
            }
        }

        leads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::testing::ScriptedProvider;
    use crate::geo::Place;
    use crate::models::RecordType;
    use std::sync::atomic::Ordering as AtomicOrdering;

    const SF: LatLng = LatLng {
        lat: 37.7749,
        lng: -122.4194,
    };

    fn place_at(name: &str, lat: f64, lng: f64, types: &[&str]) -> Place {
        Place {
            place_id: format!("pid_{name}"),
            name: Some(name.to_string()),
            formatted_address: Some(format!("{name} Address")),
            lat: Some(lat),
            lng: Some(lng),
            rating: Some(4.2),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn finder(provider: ScriptedProvider) -> NearbyBusinessFinder<ScriptedProvider> {
        let config = Config::from_env();
        let geo = GeoLocationService::new(provider, &config);
        NearbyBusinessFinder::new(geo, config)
    }

    // ---- distance ----------------------------------------------------------

    #[test]
    fn test_haversine_zero_for_identical_points() {
        assert_eq!(haversine_miles(SF, SF), 0.0);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let la = LatLng {
            lat: 34.0522,
            lng: -118.2437,
        };
        let ab = haversine_miles(SF, la);
        let ba = haversine_miles(la, SF);
        assert!((ab - ba).abs() < 1e-9);
        // SF to LA is about 347 statute miles as the crow flies.
        assert!(ab > 340.0 && ab < 355.0, "got {ab}");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.20049), 0.2);
        assert_eq!(round2(0.205), 0.21);
        assert_eq!(round2(1.0), 1.0);
    }

    // ---- scoring -----------------------------------------------------------

    #[test]
    fn test_lead_score_distance_ladder() {
        let jewelry = BusinessCategory::Jewelry;
        assert_eq!(lead_score(Some(0.2), &jewelry), 6);
        assert_eq!(lead_score(Some(0.3), &jewelry), 5);
        assert_eq!(lead_score(Some(0.7), &jewelry), 4);
        assert_eq!(lead_score(Some(1.0), &jewelry), 3);
        assert_eq!(lead_score(Some(5.0), &jewelry), 3);
        assert_eq!(lead_score(None, &jewelry), 3);
    }

    #[test]
    fn test_non_target_category_zeroes_everything() {
        let hardware = BusinessCategory::Other("hardware_store".to_string());
        // Distance does not matter. At all.
        assert_eq!(lead_score(Some(0.01), &hardware), 0);
        assert_eq!(lead_score(Some(0.0), &hardware), 0);
        assert_eq!(lead_score(None, &hardware), 0);
    }

    #[test]
    fn test_lead_score_range() {
        for d in [None, Some(0.0), Some(0.3), Some(0.9), Some(10.0)] {
            for cat in [
                BusinessCategory::Jewelry,
                BusinessCategory::LuxuryGoods,
                BusinessCategory::SportsMemorabilia,
                BusinessCategory::Other("bar".to_string()),
            ] {
                let s = lead_score(d, &cat);
                assert!(s <= 6, "score {s} out of range");
            }
        }
    }

    #[test]
    fn test_categorize_place_prefers_target_types() {
        assert_eq!(
            categorize_place(&["jewelry_store".to_string(), "store".to_string()]),
            BusinessCategory::Jewelry
        );
        assert_eq!(
            categorize_place(&["store".to_string(), "luxury_goods_store".to_string()]),
            BusinessCategory::LuxuryGoods
        );
        assert_eq!(
            categorize_place(&["hardware_store".to_string()]),
            BusinessCategory::Other("hardware_store".to_string())
        );
        assert_eq!(
            categorize_place(&[]),
            BusinessCategory::Other("unknown".to_string())
        );
    }

    // ---- fallback chain ----------------------------------------------------

    #[tokio::test]
    async fn test_sentinels_never_win_the_fallback_chain() {
        let f = finder(ScriptedProvider::default());
        let report = IncidentReport {
            business_name: Some("Acme Jewelers".to_string()),
            incident_address: Some("unknown".to_string()),
            exact_address: Some("N/A".to_string()),
            business_address: Some("Not specified".to_string()),
            address: Some("456 Oak Ave, Dallas, TX".to_string()),
            ..IncidentReport::default()
        };
        assert_eq!(
            f.resolve_address(&report).await.as_deref(),
            Some("456 Oak Ave, Dallas, TX")
        );
    }

    #[tokio::test]
    async fn test_pre_extracted_address_outranks_structured_fields() {
        let f = finder(ScriptedProvider::default());
        let report = IncidentReport {
            incident_address: Some("789 Pre St, Plano, TX".to_string()),
            exact_address: Some("456 Oak Ave, Dallas, TX".to_string()),
            ..IncidentReport::default()
        };
        assert_eq!(
            f.resolve_address(&report).await.as_deref(),
            Some("789 Pre St, Plano, TX")
        );
    }

    #[tokio::test]
    async fn test_sentinel_location_resolves_nothing() {
        let f = finder(ScriptedProvider::default());
        let report = IncidentReport {
            business_name: Some("Acme Jewelers".to_string()),
            location: Some("unknown".to_string()),
            ..IncidentReport::default()
        };
        // location is a sentinel, so neither the structured pass nor the
        // constructed query can form, and there is no narrative.
        assert_eq!(f.resolve_address(&report).await, None);
    }

    #[test]
    fn test_constructed_query_shape() {
        let report = IncidentReport {
            business_name: Some("Acme Jewelers".to_string()),
            location: Some("Frisco, TX".to_string()),
            ..IncidentReport::default()
        };
        assert_eq!(
            constructed_query(&report).as_deref(),
            Some("Acme Jewelers, Frisco, TX")
        );

        let nameless = IncidentReport {
            location: Some("Frisco, TX".to_string()),
            ..IncidentReport::default()
        };
        assert_eq!(constructed_query(&nameless), None);
    }

    #[tokio::test]
    async fn test_structured_location_outranks_constructed_query() {
        // The structured pass owns the location field; the constructed
        // query never gets a turn when location carries a value.
        let f = finder(ScriptedProvider::default());
        let report = IncidentReport {
            business_name: Some("Acme Jewelers".to_string()),
            location: Some("Frisco, TX".to_string()),
            ..IncidentReport::default()
        };
        assert_eq!(f.resolve_address(&report).await.as_deref(), Some("Frisco, TX"));
    }

    #[tokio::test]
    async fn test_enhanced_finder_is_the_last_resort() {
        let mut provider = ScriptedProvider::default();
        provider.search_responses.insert(
            "jewelry store in Frisco".to_string(),
            vec![place_at("Frisco Jewelry Exchange", 33.15, -96.82, &["jewelry_store"])],
        );
        let f = finder(provider);

        // No address fields at all — only a narrative. Strategies 1-3
        // come up empty and the full text pipeline takes over.
        let report = IncidentReport {
            business_name: Some("Frisco Jewelry Exchange".to_string()),
            description: Some("a jewelry store near Frisco was robbed at gunpoint".to_string()),
            ..IncidentReport::default()
        };
        assert_eq!(
            f.resolve_address(&report).await.as_deref(),
            Some("Frisco Jewelry Exchange Address")
        );
    }

    // ---- end-to-end per-incident processing --------------------------------

    #[tokio::test]
    async fn test_unresolvable_incident_still_emits_incident_record() {
        let f = finder(ScriptedProvider::default());
        let report = IncidentReport {
            business_name: Some("Mystery Store".to_string()),
            ..IncidentReport::default()
        };
        let records = f.process_incident(&report).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type, RecordType::Incident);
        assert_eq!(records[0].business_name, "Mystery Store");
        assert!(records[0].address.is_none());
        // No address means no geocode and no nearby calls at all.
        assert_eq!(f.geo.provider().nearby_calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_geocode_failure_skips_nearby_search() {
        let f = finder(ScriptedProvider::default());
        let report = IncidentReport {
            business_name: Some("Acme Jewelers".to_string()),
            exact_address: Some("123 Main St, Dallas, TX".to_string()),
            ..IncidentReport::default()
        };
        let records = f.process_incident(&report).await;

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].address.as_deref(),
            Some("123 Main St, Dallas, TX")
        );
        assert!(records[0].lat.is_none());
        assert_eq!(f.geo.provider().nearby_calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_close_jewelry_store_scores_six() {
        let mut provider = ScriptedProvider::default();
        provider
            .geocode_responses
            .insert("123 Main St, San Francisco, CA".to_string(), SF);
        // ~0.2 miles due north of the incident.
        provider.nearby_responses.insert(
            "jewelry_store".to_string(),
            vec![place_at(
                "Golden Gate Jewelers",
                37.7749 + 0.00289,
                -122.4194,
                &["jewelry_store"],
            )],
        );
        let f = finder(provider);
        let report = IncidentReport {
            business_name: Some("Robbed Jewelers".to_string()),
            exact_address: Some("123 Main St, San Francisco, CA".to_string()),
            ..IncidentReport::default()
        };
        let records = f.process_incident(&report).await;

        assert_eq!(records.len(), 2);
        let lead = &records[1];
        assert_eq!(lead.record_type, RecordType::Nearby);
        assert_eq!(lead.business_name, "Golden Gate Jewelers");
        assert_eq!(lead.business_type.as_deref(), Some("jewelry"));
        assert!(lead.distance_from_incident < 0.25);
        assert_eq!(lead.lead_score, 6);
        assert_eq!(lead.incident_id.as_deref(), Some(records[0].id.as_str()));

        // One nearby call per target category.
        assert_eq!(f.geo.provider().nearby_calls.load(AtomicOrdering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_nearby_hardware_store_is_excluded() {
        let mut provider = ScriptedProvider::default();
        provider
            .geocode_responses
            .insert("123 Main St, San Francisco, CA".to_string(), SF);
        // 0.1 miles away and completely unsellable-to.
        provider.nearby_responses.insert(
            "jewelry_store".to_string(),
            vec![place_at(
                "Bob's Hardware",
                37.7749 + 0.00145,
                -122.4194,
                &["hardware_store"],
            )],
        );
        let f = finder(provider);
        let report = IncidentReport {
            business_name: Some("Robbed Jewelers".to_string()),
            exact_address: Some("123 Main St, San Francisco, CA".to_string()),
            ..IncidentReport::default()
        };
        let records = f.process_incident(&report).await;

        // Only the incident record survives.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type, RecordType::Incident);
    }

    #[tokio::test]
    async fn test_per_category_result_cap() {
        let mut provider = ScriptedProvider::default();
        provider
            .geocode_responses
            .insert("123 Main St, San Francisco, CA".to_string(), SF);
        // Eight close jewelry stores; only max_results_per_category (5)
        // may be considered.
        let stores: Vec<Place> = (0..8)
            .map(|i| {
                place_at(
                    &format!("Jeweler {i}"),
                    37.7749 + 0.001 * (i as f64 + 1.0),
                    -122.4194,
                    &["jewelry_store"],
                )
            })
            .collect();
        provider
            .nearby_responses
            .insert("jewelry_store".to_string(), stores);
        let f = finder(provider);
        let report = IncidentReport {
            exact_address: Some("123 Main St, San Francisco, CA".to_string()),
            ..IncidentReport::default()
        };
        let records = f.process_incident(&report).await;

        let leads = records
            .iter()
            .filter(|r| r.record_type == RecordType::Nearby)
            .count();
        assert_eq!(leads, 5);
    }

    #[tokio::test]
    async fn test_identical_input_yields_identical_lead_content() {
        let build = || {
            let mut provider = ScriptedProvider::default();
            provider
                .geocode_responses
                .insert("123 Main St, San Francisco, CA".to_string(), SF);
            provider.nearby_responses.insert(
                "jewelry_store".to_string(),
                vec![place_at(
                    "Golden Gate Jewelers",
                    37.7749 + 0.00289,
                    -122.4194,
                    &["jewelry_store"],
                )],
            );
            finder(provider)
        };
        let report = IncidentReport {
            business_name: Some("Robbed Jewelers".to_string()),
            exact_address: Some("123 Main St, San Francisco, CA".to_string()),
            ..IncidentReport::default()
        };

        let a = build().process_incident(&report).await;
        let b = build().process_incident(&report).await;

        assert_eq!(a.len(), b.len());
        for (ra, rb) in a.iter().zip(b.iter()) {
            // Identity and timestamp fields are freshly stamped per
            // record; every content field must match exactly.
            assert_eq!(ra.business_name, rb.business_name);
            assert_eq!(ra.address, rb.address);
            assert_eq!(ra.exact_address, rb.exact_address);
            assert_eq!(ra.business_type, rb.business_type);
            assert_eq!(ra.distance_from_incident, rb.distance_from_incident);
            assert_eq!(ra.lead_score, rb.lead_score);
            assert_eq!(ra.record_type, rb.record_type);
            assert_eq!(ra.lat, rb.lat);
            assert_eq!(ra.lng, rb.lng);
        }
    }
}
