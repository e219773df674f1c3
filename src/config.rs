// =============================================================================
// config.rs — THE GRAND CONFIGURATION CATHEDRAL
// =============================================================================
//
// Every system needs configuration, but not every system needs THIS MUCH
// configuration. We have knobs for knobs. Thresholds for thresholds.
//
// All values can be overridden via environment variables, because hardcoding
// configuration is how you end up on the front page of Hacker News for the
// wrong reasons.
//
// Default values have been carefully chosen through a rigorous process of
// "that seems about right" and "the Maps API will probably rate-limit us
// if we go faster than this."
// =============================================================================

use std::env;
use std::time::Duration;

/// Hard ceiling on place-search calls per confirmation pass. Three
/// candidates is enough to know whether the inference was any good;
/// a fourth call is just burning quota on wishful thinking.
pub const MAX_API_CALLS_PER_INFERENCE: usize = 3;

/// A confirmed place below this combined confidence is discarded.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Self-imposed politeness delay between consecutive calls to the
/// provider. Not coordination, not backoff — just manners.
pub const PACING_DELAY: Duration = Duration::from_millis(200);

/// The Grand Configuration Struct. Every tunable parameter in the entire
/// engine lives here. Think of it as the cockpit of a fighter jet, except
/// instead of controlling weapons systems, you're controlling how
/// aggressively we canvass the neighborhood around a smash-and-grab.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // GEO PROVIDER CONFIGURATION
    // =========================================================================
    /// API key for the Maps Web Services. Without one, every lookup
    /// fails soft and the pipeline politely resolves nothing.
    pub maps_api_key: String,

    /// Geocoding endpoint base URL.
    pub geocode_base_url: String,

    /// Places endpoints base URL (text search, nearby search, details
    /// are all paths under this).
    pub places_base_url: String,

    /// HTTP timeout for provider calls. The transport layer's problem,
    /// not the pipeline's — we add no timeout of our own on top.
    pub http_timeout: Duration,

    // =========================================================================
    // NEARBY SEARCH CONFIGURATION
    // =========================================================================
    /// Search radius in meters around a resolved incident.
    /// Default: 1609 — one statute mile, the sales team's idea of "nearby."
    pub search_radius_meters: u32,

    /// Cap on leads taken per category per incident. Default: 5.
    /// The provider will happily return twenty nail-salon-adjacent
    /// jewelers; the sales team will not happily call all of them.
    pub max_results_per_category: usize,

    // =========================================================================
    // CONFIRMATION CONFIGURATION
    // =========================================================================
    /// Max place-search calls per confirmation pass. Default: 3.
    pub max_confirmation_calls: usize,

    /// Minimum combined confidence for a confirmed place. Default: 0.7.
    pub confidence_threshold: f64,

    // =========================================================================
    // PROVIDER HEALTH GUARD
    // =========================================================================
    /// Consecutive failures before the guard opens. Default: 5,
    /// because everyone deserves five chances.
    pub provider_failure_threshold: u32,

    /// How long lookups stay short-circuited once the guard opens.
    /// Default: 60 seconds. Long enough for the API to catch its breath.
    pub provider_cooldown: Duration,

    // =========================================================================
    // INPUT
    // =========================================================================
    /// Path to a JSON-lines file of incident reports. Absent means stdin.
    pub input_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    /// "Sensible" here meaning "will work out of the box without any env vars
    /// but will also respect your wishes if you set them."
    ///
    /// Every parameter can be overridden via environment variables prefixed
    /// with LEAD_HOUND_. Because namespacing your env vars is what separates
    /// the professionals from the amateurs.
    pub fn from_env() -> Self {
        // Try to load .env file if it exists. Fail silently if it doesn't,
        // because not everyone has their life together enough to create one.
        let _ = dotenvy::dotenv();

        Config {
            maps_api_key: env_or_default("LEAD_HOUND_MAPS_API_KEY", ""),
            geocode_base_url: env_or_default(
                "LEAD_HOUND_GEOCODE_BASE_URL",
                "https://maps.googleapis.com/maps/api/geocode",
            ),
            places_base_url: env_or_default(
                "LEAD_HOUND_PLACES_BASE_URL",
                "https://maps.googleapis.com/maps/api/place",
            ),
            http_timeout: Duration::from_secs(
                env_or_default("LEAD_HOUND_HTTP_TIMEOUT_SECS", "15")
                    .parse()
                    .unwrap_or(15),
            ),

            search_radius_meters: env_or_default("LEAD_HOUND_SEARCH_RADIUS_M", "1609")
                .parse()
                .unwrap_or(1609),
            max_results_per_category: env_or_default("LEAD_HOUND_MAX_RESULTS_PER_CATEGORY", "5")
                .parse()
                .unwrap_or(5),

            max_confirmation_calls: env_or_default(
                "LEAD_HOUND_MAX_CONFIRMATION_CALLS",
                &MAX_API_CALLS_PER_INFERENCE.to_string(),
            )
            .parse()
            .unwrap_or(MAX_API_CALLS_PER_INFERENCE),
            confidence_threshold: env_or_default(
                "LEAD_HOUND_CONFIDENCE_THRESHOLD",
                &CONFIDENCE_THRESHOLD.to_string(),
            )
            .parse()
            .unwrap_or(CONFIDENCE_THRESHOLD),

            provider_failure_threshold: env_or_default("LEAD_HOUND_PROVIDER_FAILURE_THRESHOLD", "5")
                .parse()
                .unwrap_or(5),
            provider_cooldown: Duration::from_secs(
                env_or_default("LEAD_HOUND_PROVIDER_COOLDOWN_SECS", "60")
                    .parse()
                    .unwrap_or(60),
            ),

            input_path: env::var("LEAD_HOUND_INPUT").ok(),
        }
    }
}

/// Helper function to read an environment variable with a default fallback.
/// Because unwrap_or on env::var is ugly and we have standards.
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
