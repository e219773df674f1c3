// =============================================================================
// geo.rs — THE GEOCODING FRONTIER
// =============================================================================
//
// Everything that talks to the outside world lives behind this module.
// The layering, from the inside out:
//
// 1. `GeoProvider` — the capability trait. Four operations: geocode a
//    string, search places by text, search places near a point, fetch
//    contact details. One production implementation, any number of
//    scripted test doubles.
//
// 2. `GoogleMapsProvider` — the production implementation, speaking the
//    Maps Web Services JSON dialect over reqwest.
//
// 3. `GeoLocationService` — the fail-soft wrapper. Every transport error,
//    parse error, and provider tantrum is caught HERE, logged HERE, and
//    converted to an empty result HERE. Callers see Option/Vec, never an
//    error. "Empty" means "not found." That's the whole contract.
//
// A provider-health guard sits inside the wrapper: enough consecutive
// failures and lookups short-circuit to empty for a cooldown period.
// The API gets a breather, the pipeline keeps walking, and nobody throws.
// =============================================================================

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;

/// A plain coordinate pair. The earth is round; these pretend it isn't.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One place as the provider describes it. Every field except the id is
/// optional because provider data is optional in spirit, whatever the
/// docs claim.
#[derive(Debug, Clone, Default)]
pub struct Place {
    pub place_id: String,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub rating: Option<f64>,
    pub types: Vec<String>,
}

/// Contact enrichment from a details lookup.
#[derive(Debug, Clone, Default)]
pub struct PlaceContact {
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// The geocoding/place-search capability. The pipeline depends on this
/// trait, not on any HTTP client, so tests can script the outside world.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Resolve a free-text address to coordinates. `None` = not found.
    async fn geocode(&self, address: &str) -> anyhow::Result<Option<LatLng>>;

    /// Text-query place search, provider-ranked.
    async fn search_places(&self, query: &str) -> anyhow::Result<Vec<Place>>;

    /// Category search around a point, radius in meters.
    async fn nearby_search(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
        category: &str,
    ) -> anyhow::Result<Vec<Place>>;

    /// Phone/website for a known place. `None` = provider has nothing.
    async fn place_details(&self, place_id: &str) -> anyhow::Result<Option<PlaceContact>>;
}

// =============================================================================
// Production provider — Maps Web Services
// =============================================================================

/// Raw response shapes for the Maps Web Services. The provider wraps
/// everything in { status, results } because apparently one level of
/// nesting is the minimum buy-in for a government-grade API aesthetic.
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: Option<String>,
    results: Option<Vec<GeocodeResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    status: Option<String>,
    results: Option<Vec<RawPlace>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawPlace {
    place_id: Option<String>,
    name: Option<String>,
    formatted_address: Option<String>,
    /// Nearby-search responses say "vicinity" where text search says
    /// "formatted_address". Same data, different hat.
    vicinity: Option<String>,
    rating: Option<f64>,
    geometry: Option<RawGeometry>,
    types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGeometry {
    location: Option<RawLatLng>,
}

#[derive(Debug, Deserialize)]
struct RawLatLng {
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    result: Option<RawDetails>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDetails {
    formatted_phone_number: Option<String>,
    website: Option<String>,
}

impl RawPlace {
    fn into_place(self) -> Place {
        let (lat, lng) = match self.geometry.and_then(|g| g.location) {
            Some(loc) => (loc.lat, loc.lng),
            None => (None, None),
        };
        Place {
            place_id: self.place_id.unwrap_or_default(),
            name: self.name.filter(|n| !n.is_empty()),
            formatted_address: self
                .formatted_address
                .filter(|a| !a.is_empty())
                .or(self.vicinity.filter(|a| !a.is_empty())),
            lat,
            lng,
            rating: self.rating,
            types: self.types.unwrap_or_default(),
        }
    }
}

/// The real deal: Maps Web Services over HTTPS. Requires an API key;
/// without one, every call comes back as a provider error and the
/// fail-soft layer turns it into silence.
pub struct GoogleMapsProvider {
    client: reqwest::Client,
    api_key: String,
    geocode_base_url: String,
    places_base_url: String,
}

impl GoogleMapsProvider {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        // We identify ourselves because we were raised right.
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent("LeadHoundEngine/1.0 (lead-discovery; sales-research)")
            .build()?;

        Ok(Self {
            client,
            api_key: config.maps_api_key.clone(),
            geocode_base_url: config.geocode_base_url.clone(),
            places_base_url: config.places_base_url.clone(),
        })
    }

    /// GET a provider URL and parse the JSON body, converting HTTP-level
    /// failures into errors the fail-soft layer will swallow.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("provider returned HTTP {status}");
        }
        Ok(response.json::<T>().await?)
    }
}

/// Interpret the provider's in-band status field. `Ok(true)` means
/// results are present, `Ok(false)` means a legitimate empty answer,
/// and anything else is a provider error for the fail-soft layer.
fn ensure_ok(status: Option<&str>, op: &str) -> anyhow::Result<bool> {
    match status {
        Some("OK") => Ok(true),
        Some("ZERO_RESULTS") | None => Ok(false),
        Some(other) => anyhow::bail!("{op} returned status {other}"),
    }
}

#[async_trait]
impl GeoProvider for GoogleMapsProvider {
    async fn geocode(&self, address: &str) -> anyhow::Result<Option<LatLng>> {
        let url = format!(
            "{}/json?address={}&key={}",
            self.geocode_base_url,
            urlencoding::encode(address),
            self.api_key,
        );
        let body: GeocodeResponse = self.get_json(&url).await?;

        if !ensure_ok(body.status.as_deref(), "geocode")? {
            return Ok(None);
        }

        let first = body.results.and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.remove(0))
            }
        });

        Ok(first
            .and_then(|r| r.geometry)
            .and_then(|g| g.location)
            .and_then(|loc| match (loc.lat, loc.lng) {
                (Some(lat), Some(lng)) => Some(LatLng { lat, lng }),
                _ => None,
            }))
    }

    async fn search_places(&self, query: &str) -> anyhow::Result<Vec<Place>> {
        let url = format!(
            "{}/textsearch/json?query={}&key={}",
            self.places_base_url,
            urlencoding::encode(query),
            self.api_key,
        );
        let body: PlacesResponse = self.get_json(&url).await?;

        if !ensure_ok(body.status.as_deref(), "place search")? {
            return Ok(Vec::new());
        }

        Ok(body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(RawPlace::into_place)
            .collect())
    }

    async fn nearby_search(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
        category: &str,
    ) -> anyhow::Result<Vec<Place>> {
        let url = format!(
            "{}/nearbysearch/json?location={lat},{lng}&radius={radius_m}&type={}&key={}",
            self.places_base_url,
            urlencoding::encode(category),
            self.api_key,
        );
        let body: PlacesResponse = self.get_json(&url).await?;

        if !ensure_ok(body.status.as_deref(), "nearby search")? {
            return Ok(Vec::new());
        }

        Ok(body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(RawPlace::into_place)
            .collect())
    }

    async fn place_details(&self, place_id: &str) -> anyhow::Result<Option<PlaceContact>> {
        let url = format!(
            "{}/details/json?place_id={}&fields=formatted_phone_number,website&key={}",
            self.places_base_url,
            urlencoding::encode(place_id),
            self.api_key,
        );
        let body: DetailsResponse = self.get_json(&url).await?;

        Ok(body.result.map(|d| PlaceContact {
            phone: d.formatted_phone_number,
            website: d.website,
        }))
    }
}

// =============================================================================
// Provider health guard
// =============================================================================

struct HealthInner {
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

/// Consecutive-failure tracker with a cooldown window. When the provider
/// fails enough times in a row, lookups short-circuit to empty until the
/// window passes. No half-open ceremony: the first call after the
/// cooldown simply goes through, and its outcome speaks for itself.
pub struct ProviderHealth {
    inner: RwLock<HealthInner>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl ProviderHealth {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: RwLock::new(HealthInner {
                consecutive_failures: 0,
                open_until: None,
            }),
            failure_threshold,
            cooldown,
        }
    }

    /// May a call proceed right now?
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.write();
        match inner.open_until {
            Some(until) if Instant::now() < until => false,
            Some(_) => {
                // Cooldown expired. Back to normal operation.
                info!("Provider health guard cooldown expired — lookups resume");
                inner.open_until = None;
                inner.consecutive_failures = 0;
                true
            }
            None => true,
        }
    }

    pub fn record_success(&self) {
        self.inner.write().consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.write();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold && inner.open_until.is_none() {
            inner.open_until = Some(Instant::now() + self.cooldown);
            warn!(
                failures = inner.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Provider health guard OPEN — lookups will return empty until the cooldown passes"
            );
        }
    }
}

// =============================================================================
// Fail-soft service wrapper
// =============================================================================

/// The boundary the rest of the pipeline talks to. Catches everything,
/// logs everything, returns empty for everything that went wrong.
/// Callers must treat empty as "not found," never as an exception —
/// and with this wrapper in front, they have no other choice.
pub struct GeoLocationService<P: GeoProvider> {
    provider: P,
    health: ProviderHealth,
}

impl<P: GeoProvider> GeoLocationService<P> {
    pub fn new(provider: P, config: &Config) -> Self {
        Self {
            provider,
            health: ProviderHealth::new(
                config.provider_failure_threshold,
                config.provider_cooldown,
            ),
        }
    }

    /// Direct access to the wrapped provider, for call-count assertions.
    #[cfg(test)]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn geocode(&self, address: &str) -> Option<LatLng> {
        if !self.health.allow() {
            debug!(address, "geocode skipped — health guard open");
            return None;
        }
        match self.provider.geocode(address).await {
            Ok(result) => {
                self.health.record_success();
                debug!(address, found = result.is_some(), "geocode complete");
                result
            }
            Err(e) => {
                self.health.record_failure();
                warn!(address, error = %e, "geocode failed — treating as not found");
                None
            }
        }
    }

    pub async fn search_places(&self, query: &str) -> Vec<Place> {
        if !self.health.allow() {
            debug!(query, "place search skipped — health guard open");
            return Vec::new();
        }
        match self.provider.search_places(query).await {
            Ok(places) => {
                self.health.record_success();
                debug!(query, results = places.len(), "place search complete");
                places
            }
            Err(e) => {
                self.health.record_failure();
                warn!(query, error = %e, "place search failed — treating as no results");
                Vec::new()
            }
        }
    }

    pub async fn nearby_search(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
        category: &str,
    ) -> Vec<Place> {
        if !self.health.allow() {
            debug!(category, "nearby search skipped — health guard open");
            return Vec::new();
        }
        match self.provider.nearby_search(lat, lng, radius_m, category).await {
            Ok(places) => {
                self.health.record_success();
                debug!(
                    category,
                    results = places.len(),
                    "nearby search complete"
                );
                places
            }
            Err(e) => {
                self.health.record_failure();
                warn!(category, error = %e, "nearby search failed — treating as no results");
                Vec::new()
            }
        }
    }

    pub async fn place_details(&self, place_id: &str) -> Option<PlaceContact> {
        if !self.health.allow() {
            debug!(place_id, "details lookup skipped — health guard open");
            return None;
        }
        match self.provider.place_details(place_id).await {
            Ok(details) => {
                self.health.record_success();
                details
            }
            Err(e) => {
                self.health.record_failure();
                warn!(place_id, error = %e, "details lookup failed — continuing without enrichment");
                None
            }
        }
    }
}

// =============================================================================
// Scripted test double
// =============================================================================

/// A fully scripted in-memory provider for tests. Responses are fixed at
/// construction; every call is counted so tests can assert call budgets.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct ScriptedProvider {
        pub geocode_responses: HashMap<String, LatLng>,
        pub search_responses: HashMap<String, Vec<Place>>,
        pub nearby_responses: HashMap<String, Vec<Place>>,
        pub details_responses: HashMap<String, PlaceContact>,
        /// When set, every call errors. For exercising the fail-soft layer.
        pub always_fail: bool,
        pub geocode_calls: AtomicUsize,
        pub search_calls: AtomicUsize,
        pub nearby_calls: AtomicUsize,
        pub details_calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub fn failing() -> Self {
            Self {
                always_fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl GeoProvider for ScriptedProvider {
        async fn geocode(&self, address: &str) -> anyhow::Result<Option<LatLng>> {
            self.geocode_calls.fetch_add(1, Ordering::SeqCst);
            if self.always_fail {
                anyhow::bail!("scripted transport failure");
            }
            Ok(self.geocode_responses.get(address).copied())
        }

        async fn search_places(&self, query: &str) -> anyhow::Result<Vec<Place>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            if self.always_fail {
                anyhow::bail!("scripted transport failure");
            }
            Ok(self.search_responses.get(query).cloned().unwrap_or_default())
        }

        async fn nearby_search(
            &self,
            _lat: f64,
            _lng: f64,
            _radius_m: u32,
            category: &str,
        ) -> anyhow::Result<Vec<Place>> {
            self.nearby_calls.fetch_add(1, Ordering::SeqCst);
            if self.always_fail {
                anyhow::bail!("scripted transport failure");
            }
            Ok(self
                .nearby_responses
                .get(category)
                .cloned()
                .unwrap_or_default())
        }

        async fn place_details(&self, place_id: &str) -> anyhow::Result<Option<PlaceContact>> {
            self.details_calls.fetch_add(1, Ordering::SeqCst);
            if self.always_fail {
                anyhow::bail!("scripted transport failure");
            }
            Ok(self.details_responses.get(place_id).cloned())
        }
    }
}
