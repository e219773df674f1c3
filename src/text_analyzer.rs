// =============================================================================
// text_analyzer.rs — THE SIMD-ACCELERATED CLUE EXTRACTOR
// =============================================================================
//
// This module is where we do the actual "where on earth did this crime
// happen?" determination. And we do it FAST. How fast? We use:
//
// 1. Aho-Corasick automatons — multi-pattern gazetteer matching that scans
//    text for ALL cities, states, business terms, and contextual phrases
//    simultaneously in a single pass. O(n + m). This is how antivirus
//    scanners work. We're using antivirus-grade technology to find
//    robbed jewelry stores. Let that sink in.
//
// 2. memchr — SIMD-accelerated byte scanning for cheap preliminary checks
//    before firing up the full automatons.
//
// 3. Compiled regex patterns for the things a fixed keyword list cannot
//    express: zip codes, street addresses, and the composite
//    address-extraction patterns.
//
// The gazetteers are process-wide, read-only LazyLock statics. Built once,
// used forever, mutated never.
// =============================================================================

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::LocationClues;

/// Cities we know about. Skewed toward the metros where our incident feed
/// actually reports from; a city missing from this list just means the
/// state/zip/address patterns have to carry the weight.
static CITY_GAZETTEER: &[&str] = &[
    "Dallas",
    "Fort Worth",
    "Frisco",
    "Plano",
    "Arlington",
    "Irving",
    "Garland",
    "McKinney",
    "Richardson",
    "Denton",
    "Houston",
    "Austin",
    "San Antonio",
    "El Paso",
    "Oklahoma City",
    "Tulsa",
    "New York",
    "Brooklyn",
    "Chicago",
    "Los Angeles",
    "San Francisco",
    "San Diego",
    "San Jose",
    "Seattle",
    "Portland",
    "Denver",
    "Phoenix",
    "Scottsdale",
    "Las Vegas",
    "Miami",
    "Orlando",
    "Tampa",
    "Atlanta",
    "Boston",
    "Philadelphia",
    "Memphis",
    "Nashville",
    "Charlotte",
    "Detroit",
    "Minneapolis",
    "St. Louis",
    "Kansas City",
    "New Orleans",
    "Baltimore",
    "Washington",
];

/// Two-letter state codes. Matched CASE-SENSITIVELY, because a
/// case-insensitive automaton would happily tag every "in", "or", and
/// "me" in the English language as a state of the union.
static STATE_ABBREVS: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

/// Full state names. These get the case-insensitive treatment.
static STATE_NAMES: &[&str] = &[
    "Alabama",
    "Alaska",
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Hawaii",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "North Dakota",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

/// Business-type vocabulary for the categories we sell to, plus the
/// generic retail words that tell us a business was involved at all.
/// The more of these appear, the more excited the sales team gets.
static BUSINESS_VOCAB: &[&str] = &[
    "jewelry store",
    "jewelry",
    "jewellery",
    "jeweler",
    "jewelers",
    "diamond district",
    "diamonds",
    "diamond",
    "gold exchange",
    "gold buyer",
    "pawn shop",
    "pawnbroker",
    "watch store",
    "watch dealer",
    "watches",
    "luxury goods",
    "luxury boutique",
    "luxury retailer",
    "boutique",
    "designer handbags",
    "handbags",
    "high-end retailer",
    "sports memorabilia",
    "memorabilia",
    "sports cards",
    "trading cards",
    "card shop",
    "collectibles",
    "autograph",
    "bullion",
    "precious metals",
];

/// Spatial-relation phrases. When one of these appears in prose, the words
/// around it are usually a business on one side and a place on the other.
/// The inferrer leans on this list to stitch candidates together.
pub static CONTEXTUAL_PHRASES: &[&str] = &[
    "at the intersection of",
    "down the street from",
    "corner of",
    "across from",
    "in front of",
    "next to",
    "close to",
    "adjacent to",
    "located at",
    "behind",
    "near",
    "off of",
];

/// Street-suffix words, shared with the inferrer's confidence scoring.
pub static STREET_TYPE_WORDS: &[&str] = &[
    "street", "st", "avenue", "ave", "boulevard", "blvd", "drive", "dr", "road", "rd", "lane",
    "ln", "way", "court", "ct", "place", "pl", "plaza", "parkway", "pkwy", "highway", "hwy",
    "trail", "trl", "circle", "cir", "expressway", "expy",
];

// The automatons. Built once, used forever. LeftmostLongest so that
// "San Francisco" wins over the "Frisco" hiding inside it.
static CITY_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(CITY_GAZETTEER)
        .expect("Failed to build city automaton — the gazetteer is invalid somehow")
});

static STATE_ABBREV_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(STATE_ABBREVS)
        .expect("Failed to build state-abbreviation automaton")
});

static STATE_NAME_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(STATE_NAMES)
        .expect("Failed to build state-name automaton")
});

static BUSINESS_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(BUSINESS_VOCAB)
        .expect("Failed to build business-vocabulary automaton")
});

static CONTEXTUAL_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(CONTEXTUAL_PHRASES)
        .expect("Failed to build contextual-phrase automaton")
});

// The regex armory. Address shapes are too free-form for keyword lists,
// so these carry the structural half of the extraction.

static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{5}(?:-\d{4})?\b").expect("zip regex"));

/// "123 Main Street" with no city attached. Feeds the geographic set.
static STREET_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d{1,6}\s+(?:[A-Z0-9][A-Za-z0-9'.-]*\s+){1,5}(?:Street|St|Avenue|Ave|Boulevard|Blvd|Drive|Dr|Road|Rd|Lane|Ln|Way|Court|Ct|Place|Pl|Plaza|Parkway|Pkwy|Highway|Hwy|Trail|Trl|Circle|Cir)\b",
    )
    .expect("street fragment regex")
});

/// The full monty: street number + name + suffix + city + state, with an
/// optional zip. If this matches, the reporter did our job for us.
static FULL_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d{1,6}\s+(?:[A-Z0-9][A-Za-z0-9'.-]*\s+){1,5}(?:Street|St|Avenue|Ave|Boulevard|Blvd|Drive|Dr|Road|Rd|Lane|Ln|Way|Court|Ct|Place|Pl|Plaza|Parkway|Pkwy|Highway|Hwy|Trail|Trl|Circle|Cir)\.?,\s*[A-Z][A-Za-z .'-]+,\s*[A-Z]{2}(?:\s+\d{5}(?:-\d{4})?)?)",
    )
    .expect("full address regex")
});

/// "located at 4040 Preston Rd" — the phrase every police blotter loves.
static LOCATED_AT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blocated\s+at\s+(\d[^.;\n]*)").expect("located-at regex"));

/// "Diamond Jewelers at 123 Main Street" — business name, then "at",
/// then something that starts with a street number.
static BUSINESS_AT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][A-Za-z'&.-]*(?:\s+[A-Z][A-Za-z'&.-]*){0,4})\s+at\s+(\d[^.;\n]*)")
        .expect("business-at regex")
});

/// A parenthetical that starts with a digit is an address more often
/// than it is anything else.
static PAREN_ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d[^)]*)\)").expect("parenthetical address regex"));

/// "North Dallas", "Downtown Chicago" — a direction word glued to a city
/// we recognize names a neighborhood worth geocoding.
static DIRECTIONAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(North|South|East|West|Downtown|Uptown|Midtown)\s+([A-Z][A-Za-z.]+(?:\s+[A-Z][A-Za-z.]+)?)",
    )
    .expect("directional neighborhood regex")
});

/// Capitalized phrase ending in a business suffix word, e.g.
/// "Diamond Jewelers" or "Lone Star Pawn". Known false-positive source;
/// precision depends entirely on the suffix list.
static CAP_BUSINESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b((?:[A-Z][A-Za-z'&-]+\s+){1,3}(?:Jewelers?|Jewellers?|Jewelry|Pawn|Diamonds?|Gold|Watches|Boutique|Collectibles|Memorabilia|Cards|Gallery|Exchange))\b",
    )
    .expect("capitalized business-name regex")
});

/// Quick check if a text contains ANY business-flavored byte patterns.
/// Uses memchr SIMD scanning for maximum speed. If this returns false,
/// the business automaton and the capitalized-phrase regex can both
/// stay in bed.
pub fn quick_business_check(text: &str) -> bool {
    let bytes = text.as_bytes();
    memchr::memmem::find(bytes, b"jewel").is_some()
        || memchr::memmem::find(bytes, b"Jewel").is_some()
        || memchr::memmem::find(bytes, b"JEWEL").is_some()
        || memchr::memmem::find(bytes, b"pawn").is_some()
        || memchr::memmem::find(bytes, b"Pawn").is_some()
        || memchr::memmem::find(bytes, b"luxur").is_some()
        || memchr::memmem::find(bytes, b"Luxur").is_some()
        || memchr::memmem::find(bytes, b"memorabilia").is_some()
        || memchr::memmem::find(bytes, b"Memorabilia").is_some()
        || memchr::memmem::find(bytes, b"watch").is_some()
        || memchr::memmem::find(bytes, b"Watch").is_some()
        || memchr::memmem::find(bytes, b"boutique").is_some()
        || memchr::memmem::find(bytes, b"Boutique").is_some()
        || memchr::memmem::find(bytes, b"diamond").is_some()
        || memchr::memmem::find(bytes, b"Diamond").is_some()
        || memchr::memmem::find(bytes, b"gold").is_some()
        || memchr::memmem::find(bytes, b"Gold").is_some()
        || memchr::memmem::find(bytes, b"card").is_some()
        || memchr::memmem::find(bytes, b"Card").is_some()
        || memchr::memmem::find(bytes, b"collect").is_some()
        || memchr::memmem::find(bytes, b"Collect").is_some()
        || memchr::memmem::find(bytes, b"handbag").is_some()
        || memchr::memmem::find(bytes, b"Handbag").is_some()
        || memchr::memmem::find(bytes, b"bullion").is_some()
        || memchr::memmem::find(bytes, b"Bullion").is_some()
}

/// True when any word of `text` is a street-suffix word. Used by the
/// inferrer's confidence scoring.
pub fn contains_street_type(text: &str) -> bool {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .any(|w| STREET_TYPE_WORDS.contains(&w.as_str()))
}

/// True when the business-vocabulary automaton fires anywhere in `text`.
pub fn contains_business_vocab(text: &str) -> bool {
    BUSINESS_AUTOMATON
        .find_iter(text)
        .any(|m| is_word_bounded(text, m.start(), m.end()))
}

/// Automaton matches are substring matches, and "Frisco" living inside
/// "San Franciscophile" is not a match we want. Both edges of the span
/// must sit on non-alphanumeric neighbors.
fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let left_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
    let right_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
    left_ok && right_ok
}

/// Strip the junk a greedy capture drags along: trailing punctuation
/// and whitespace.
fn tidy_capture(s: &str) -> String {
    s.trim().trim_end_matches([',', '.', ';', ' ']).to_string()
}

/// Extract every location/business/context clue from one incident text.
///
/// This is the main entry point for text analysis. Empty or blank text
/// returns all-empty clues — a report with no description is a
/// data-quality shrug, not an error.
///
/// The extracted_address field tries an ordered list of composite
/// patterns and returns the first match of the first pattern that
/// matches. The order IS the priority: a full street+city+state match
/// beats a "located at" fragment beats a parenthetical guess.
pub fn analyze_text(text: &str) -> LocationClues {
    let text = text.trim();
    if text.is_empty() {
        return LocationClues::default();
    }

    let mut clues = LocationClues::default();

    // ---- geographic entities ------------------------------------------------

    for m in ZIP_RE.find_iter(text) {
        clues.geographic_entities.insert(m.as_str().to_string());
    }

    for m in STREET_FRAGMENT_RE.find_iter(text) {
        clues.geographic_entities.insert(m.as_str().to_string());
    }

    for m in CITY_AUTOMATON.find_iter(text) {
        if is_word_bounded(text, m.start(), m.end()) {
            // Insert the canonical gazetteer spelling, not whatever
            // casing the reporter used.
            clues
                .geographic_entities
                .insert(CITY_GAZETTEER[m.pattern().as_usize()].to_string());
        }
    }

    for m in STATE_ABBREV_AUTOMATON.find_iter(text) {
        if is_word_bounded(text, m.start(), m.end()) {
            clues
                .geographic_entities
                .insert(STATE_ABBREVS[m.pattern().as_usize()].to_string());
        }
    }

    for m in STATE_NAME_AUTOMATON.find_iter(text) {
        if is_word_bounded(text, m.start(), m.end()) {
            clues
                .geographic_entities
                .insert(STATE_NAMES[m.pattern().as_usize()].to_string());
        }
    }

    for cap in DIRECTIONAL_RE.captures_iter(text) {
        let city = cap[2].trim_end_matches('.');
        if CITY_GAZETTEER.iter().any(|c| c.eq_ignore_ascii_case(city)) {
            clues
                .geographic_entities
                .insert(format!("{} {}", &cap[1], city));
        }
    }

    // ---- business entities --------------------------------------------------

    // SIMD-accelerated bouncer at the door: if no business-flavored
    // bytes exist, skip the automaton and the capitalized-phrase regex.
    if quick_business_check(text) {
        for m in BUSINESS_AUTOMATON.find_iter(text) {
            if is_word_bounded(text, m.start(), m.end()) {
                clues
                    .business_entities
                    .insert(text[m.start()..m.end()].to_lowercase());
            }
        }

        for cap in CAP_BUSINESS_RE.captures_iter(text) {
            clues.business_entities.insert(cap[1].trim().to_string());
        }
    }

    // ---- contextual phrases -------------------------------------------------

    for m in CONTEXTUAL_AUTOMATON.find_iter(text) {
        if is_word_bounded(text, m.start(), m.end()) {
            clues
                .contextual_info
                .insert(CONTEXTUAL_PHRASES[m.pattern().as_usize()].to_string());
        }
    }

    // ---- composite address extraction --------------------------------------

    clues.extracted_address = extract_address(text);

    debug!(
        geo = clues.geographic_entities.len(),
        business = clues.business_entities.len(),
        contextual = clues.contextual_info.len(),
        address = clues.extracted_address.as_deref().unwrap_or("none"),
        "Text analysis complete"
    );

    clues
}

/// Ordered composite patterns, most specific first. The first capture of
/// the first matching pattern wins outright.
fn extract_address(text: &str) -> Option<String> {
    // Every pattern's address half starts with a digit, so a text with
    // no digits cannot contain an extractable address.
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let patterns: &[(&Regex, usize)] = &[
        (&FULL_ADDRESS_RE, 1),
        (&LOCATED_AT_RE, 1),
        (&BUSINESS_AT_RE, 2),
        (&PAREN_ADDRESS_RE, 1),
    ];

    for (re, group) in patterns {
        if let Some(cap) = re.captures(text) {
            if let Some(m) = cap.get(*group) {
                let addr = tidy_capture(m.as_str());
                if !addr.is_empty() {
                    return Some(addr);
                }
            }
        }
    }
    None
}
