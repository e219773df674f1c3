// =============================================================================
// confirmer.rs — THE REALITY CHECKPOINT
// =============================================================================
//
// The inferrer produces hypotheses. This module spends actual API quota
// finding out which one is real, under a hard budget:
//
// - At most MAX_API_CALLS_PER_INFERENCE place searches per invocation,
//   taken from the top of the ranked candidate list. The budget is
//   deterministic: feed in a thousand candidates, we still make three calls.
// - A fixed 200 ms pacing delay separates consecutive calls. Manners.
// - Only the FIRST place returned per query is considered. The provider
//   ranks its results; whether trusting that ranking outright is wisdom
//   or an oversight is an open review question — the behavior stands.
//
// Each checked place earns a combined confidence (candidate prior plus
// match bonuses), survivors clear the threshold, and the best survivor
// wins. Ties go to the earlier candidate, which by construction was the
// more specific query.
// =============================================================================

use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{Config, PACING_DELAY};
use crate::geo::{GeoLocationService, GeoProvider, Place};
use crate::models::{AddressCandidate, ConfirmedAddress, ResolveError};

pub struct AddressConfirmer<'a, P: GeoProvider> {
    geo: &'a GeoLocationService<P>,
    max_calls: usize,
    threshold: f64,
}

impl<'a, P: GeoProvider> AddressConfirmer<'a, P> {
    pub fn new(geo: &'a GeoLocationService<P>, config: &Config) -> Self {
        Self {
            geo,
            max_calls: config.max_confirmation_calls,
            threshold: config.confidence_threshold,
        }
    }

    /// Verify the top-ranked candidates against the place provider and
    /// pick a winner.
    ///
    /// Expected failures come back as `ResolveError` values with their
    /// reason strings intact; nothing in here throws.
    pub async fn confirm_addresses(
        &self,
        candidates: &[AddressCandidate],
    ) -> Result<ConfirmedAddress, ResolveError> {
        if candidates.is_empty() {
            return Err(ResolveError::NoCandidatesProvided);
        }

        let mut best: Option<(f64, Place, &AddressCandidate)> = None;

        for (i, candidate) in candidates.iter().take(self.max_calls).enumerate() {
            if i > 0 {
                // Self-imposed rate limiting, not coordination.
                sleep(PACING_DELAY).await;
            }

            let places = self.geo.search_places(&candidate.query).await;

            // First result only. Everything after it is ignored.
            let Some(place) = places.into_iter().next() else {
                debug!(candidate = %candidate, "no places returned — candidate dead");
                continue;
            };

            let score = score_place(candidate, &place);
            debug!(
                candidate = %candidate,
                place = place.name.as_deref().unwrap_or("?"),
                score = format!("{score:.2}"),
                "candidate checked"
            );

            if score < self.threshold {
                continue;
            }

            // Strictly greater, so the first survivor keeps ties. The
            // candidate list is ranked most-specific-first and that
            // ordering is worth preserving.
            if best.as_ref().map(|(s, _, _)| score > *s).unwrap_or(true) {
                best = Some((score, place, candidate));
            }
        }

        let Some((score, place, candidate)) = best else {
            return Err(ResolveError::NotConfirmed);
        };

        // Best-effort enrichment. A place with no phone listing is still
        // a confirmed place.
        let contact = if place.place_id.is_empty() {
            None
        } else {
            self.geo.place_details(&place.place_id).await
        };

        let confirmed = ConfirmedAddress {
            place_id: place.place_id,
            name: place
                .name
                .unwrap_or_else(|| candidate.query.clone()),
            formatted_address: place.formatted_address.unwrap_or_default(),
            lat: place.lat.unwrap_or_default(),
            lng: place.lng.unwrap_or_default(),
            confidence: score,
            phone: contact.as_ref().and_then(|c| c.phone.clone()),
            website: contact.and_then(|c| c.website),
            original_query: candidate.query.clone(),
        };

        info!(confirmed = %confirmed, "address confirmed");
        Ok(confirmed)
    }
}

/// Combined confidence for a candidate/place pairing.
///
/// Starts from the candidate's prior and adds:
/// - +0.1 the place has a name at all
/// - +0.2 the candidate's business name appears in the place name
///   (case-insensitive substring)
/// - +0.1 the place has an address at all
/// - +0.2 the candidate's location appears in the place address
/// - +0.1 the place is rated above 4.0
/// capped at 1.0.
fn score_place(candidate: &AddressCandidate, place: &Place) -> f64 {
    let mut score = candidate.confidence;

    if place.name.is_some() {
        score += 0.1;
    }

    if let (Some(business), Some(name)) = (&candidate.business_name, &place.name) {
        if name.to_lowercase().contains(&business.to_lowercase()) {
            score += 0.2;
        }
    }

    if place.formatted_address.is_some() {
        score += 0.1;
    }

    if let (Some(location), Some(address)) = (&candidate.location, &place.formatted_address) {
        if address.to_lowercase().contains(&location.to_lowercase()) {
            score += 0.2;
        }
    }

    if place.rating.map(|r| r > 4.0).unwrap_or(false) {
        score += 0.1;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::testing::ScriptedProvider;
    use crate::geo::PlaceContact;
    use std::sync::atomic::Ordering;

    fn candidate(query: &str, confidence: f64) -> AddressCandidate {
        let business_name = query
            .find(" in ")
            .map(|idx| query[..idx].to_string());
        let location = query
            .find(" in ")
            .map(|idx| query[idx + 4..].to_string())
            .or_else(|| Some(query.to_string()));
        AddressCandidate {
            query: query.to_string(),
            business_name,
            location,
            confidence,
        }
    }

    fn place(name: &str, address: &str, rating: f64) -> Place {
        Place {
            place_id: format!("pid_{name}"),
            name: Some(name.to_string()),
            formatted_address: Some(address.to_string()),
            lat: Some(33.15),
            lng: Some(-96.82),
            rating: Some(rating),
            types: vec!["jewelry_store".to_string()],
        }
    }

    fn service(provider: ScriptedProvider) -> GeoLocationService<ScriptedProvider> {
        GeoLocationService::new(provider, &Config::from_env())
    }

    #[tokio::test]
    async fn test_empty_input_is_a_tagged_failure() {
        let geo = service(ScriptedProvider::default());
        let confirmer = AddressConfirmer::new(&geo, &Config::from_env());
        let err = confirmer.confirm_addresses(&[]).await.unwrap_err();
        assert_eq!(err, ResolveError::NoCandidatesProvided);
        assert_eq!(err.to_string(), "No candidate addresses provided");
    }

    #[tokio::test]
    async fn test_call_budget_is_hard_capped_at_three() {
        let geo = service(ScriptedProvider::default());
        let confirmer = AddressConfirmer::new(&geo, &Config::from_env());

        // Ten candidates, zero scripted responses. The confirmer may
        // issue at most three searches no matter how long the list is.
        let candidates: Vec<AddressCandidate> = (0..10)
            .map(|i| candidate(&format!("query number {i}"), 0.9))
            .collect();
        let result = confirmer.confirm_addresses(&candidates).await;

        assert_eq!(result.unwrap_err(), ResolveError::NotConfirmed);
        assert_eq!(geo.provider().search_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_strong_match_clips_to_one_and_confirms() {
        let mut provider = ScriptedProvider::default();
        provider.search_responses.insert(
            "jewelry store in Frisco, TX".to_string(),
            vec![place("Diamond Jewelers", "123 Elm St, Frisco, TX 75034", 4.5)],
        );
        let geo = service(provider);
        let confirmer = AddressConfirmer::new(&geo, &Config::from_env());

        // 0.8 prior + 0.1 name + 0.1 address + 0.2 location match
        // + 0.1 rating = 1.3, clipped to 1.0 — comfortably confirmed.
        let confirmed = confirmer
            .confirm_addresses(&[candidate("jewelry store in Frisco, TX", 0.8)])
            .await
            .unwrap();

        assert_eq!(confirmed.name, "Diamond Jewelers");
        assert!((confirmed.confidence - 1.0).abs() < 1e-9);
        assert_eq!(confirmed.original_query, "jewelry store in Frisco, TX");
    }

    #[tokio::test]
    async fn test_below_threshold_places_are_discarded() {
        let mut provider = ScriptedProvider::default();
        // A nameless, addressless place adds nothing to a weak prior:
        // 0.5 + 0 = 0.5 < 0.7.
        provider.search_responses.insert(
            "pawn".to_string(),
            vec![Place {
                place_id: "pid_x".to_string(),
                ..Place::default()
            }],
        );
        let geo = service(provider);
        let confirmer = AddressConfirmer::new(&geo, &Config::from_env());

        let err = confirmer
            .confirm_addresses(&[candidate("pawn", 0.5)])
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::NotConfirmed);
    }

    #[tokio::test]
    async fn test_only_first_place_is_considered() {
        let mut provider = ScriptedProvider::default();
        // The first result is junk; the second would have been perfect.
        // The second must be ignored.
        provider.search_responses.insert(
            "watch store in Plano".to_string(),
            vec![
                Place {
                    place_id: "pid_junk".to_string(),
                    ..Place::default()
                },
                place("Plano Watch Store", "200 Legacy Dr, Plano, TX", 4.9),
            ],
        );
        let geo = service(provider);
        let confirmer = AddressConfirmer::new(&geo, &Config::from_env());

        let err = confirmer
            .confirm_addresses(&[candidate("watch store in Plano", 0.5)])
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::NotConfirmed);
    }

    #[tokio::test]
    async fn test_ties_go_to_the_earlier_candidate() {
        let mut provider = ScriptedProvider::default();
        provider.search_responses.insert(
            "jewelry store in Frisco".to_string(),
            vec![place("First Jewelers", "1 Main St, Frisco, TX", 4.5)],
        );
        provider.search_responses.insert(
            "jewelry store in Plano".to_string(),
            vec![place("Second Jewelers", "2 Main St, Plano, TX", 4.5)],
        );
        let geo = service(provider);
        let confirmer = AddressConfirmer::new(&geo, &Config::from_env());

        // Identical priors, identically-scoring places. First wins.
        let confirmed = confirmer
            .confirm_addresses(&[
                candidate("jewelry store in Frisco", 0.8),
                candidate("jewelry store in Plano", 0.8),
            ])
            .await
            .unwrap();
        assert_eq!(confirmed.name, "First Jewelers");
    }

    #[tokio::test]
    async fn test_details_enrichment_is_best_effort() {
        let mut provider = ScriptedProvider::default();
        provider.search_responses.insert(
            "jewelry store in Frisco, TX".to_string(),
            vec![place("Diamond Jewelers", "123 Elm St, Frisco, TX", 4.5)],
        );
        provider.details_responses.insert(
            "pid_Diamond Jewelers".to_string(),
            PlaceContact {
                phone: Some("(972) 555-0147".to_string()),
                website: Some("https://diamondjewelers.example".to_string()),
            },
        );
        let geo = service(provider);
        let confirmer = AddressConfirmer::new(&geo, &Config::from_env());

        let confirmed = confirmer
            .confirm_addresses(&[candidate("jewelry store in Frisco, TX", 0.8)])
            .await
            .unwrap();
        assert_eq!(confirmed.phone.as_deref(), Some("(972) 555-0147"));

        // Same setup, no details scripted: still a success, just bare.
        let mut provider = ScriptedProvider::default();
        provider.search_responses.insert(
            "jewelry store in Frisco, TX".to_string(),
            vec![place("Diamond Jewelers", "123 Elm St, Frisco, TX", 4.5)],
        );
        let geo = service(provider);
        let confirmer = AddressConfirmer::new(&geo, &Config::from_env());
        let confirmed = confirmer
            .confirm_addresses(&[candidate("jewelry store in Frisco, TX", 0.8)])
            .await
            .unwrap();
        assert!(confirmed.phone.is_none());
        assert!(confirmed.website.is_none());
    }
}
