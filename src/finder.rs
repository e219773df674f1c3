// =============================================================================
// finder.rs — THE ADDRESS RESOLUTION STATE MACHINE
// =============================================================================
//
// One call, four stages, no exceptions:
//
//   INPUT_VALIDATION -> TEXT_ANALYSIS -> ADDRESS_INFERENCE
//                    -> ADDRESS_CONFIRMATION -> success / failure
//
// Each stage either produces the input for the next or short-circuits
// with its own specific reason. The reasons are data, not exceptions —
// a description too vague to resolve is Tuesday, not an emergency.
//
// Only the final stage touches the network, which means the first three
// stages can reject garbage for free.
// =============================================================================

use std::fmt;
use tracing::{debug, info};

use crate::config::Config;
use crate::confirmer::AddressConfirmer;
use crate::geo::{GeoLocationService, GeoProvider};
use crate::inferrer::infer_addresses;
use crate::models::{ConfirmedAddress, LocationClues, ResolveError};
use crate::text_analyzer::analyze_text;

/// The pipeline stages, named for the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    InputValidation,
    TextAnalysis,
    AddressInference,
    AddressConfirmation,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStage::InputValidation => write!(f, "INPUT_VALIDATION"),
            ResolutionStage::TextAnalysis => write!(f, "TEXT_ANALYSIS"),
            ResolutionStage::AddressInference => write!(f, "ADDRESS_INFERENCE"),
            ResolutionStage::AddressConfirmation => write!(f, "ADDRESS_CONFIRMATION"),
        }
    }
}

/// A successful resolution, carrying the provenance a human would want
/// when second-guessing the machine: the text we started from and the
/// clues the answer was built on.
#[derive(Debug, Clone)]
pub struct FoundAddress {
    pub confirmed: ConfirmedAddress,
    pub original_text: String,
    pub clues: LocationClues,
}

/// Analyzer -> inferrer -> confirmer, packaged as a single resolve call.
pub struct EnhancedAddressFinder<'a, P: GeoProvider> {
    geo: &'a GeoLocationService<P>,
    config: &'a Config,
}

impl<'a, P: GeoProvider> EnhancedAddressFinder<'a, P> {
    pub fn new(geo: &'a GeoLocationService<P>, config: &'a Config) -> Self {
        Self { geo, config }
    }

    /// Resolve a free-text description to a confirmed address.
    ///
    /// Every failure mode is a `ResolveError` with a specific reason;
    /// the error type's Display strings are the stage reasons verbatim.
    pub async fn find_address(&self, text: &str) -> Result<FoundAddress, ResolveError> {
        debug!(stage = %ResolutionStage::InputValidation, "resolution started");
        if text.trim().is_empty() {
            return Err(ResolveError::EmptyText);
        }

        debug!(stage = %ResolutionStage::TextAnalysis, "analyzing text");
        let clues = analyze_text(text);
        if clues.is_empty() {
            return Err(ResolveError::NoLocationClues);
        }
        debug!(clues = %clues, "clues extracted");

        debug!(stage = %ResolutionStage::AddressInference, "inferring candidates");
        let candidates = infer_addresses(&clues);
        if candidates.is_empty() {
            return Err(ResolveError::NoCandidates);
        }

        debug!(
            stage = %ResolutionStage::AddressConfirmation,
            candidates = candidates.len(),
            "confirming against provider"
        );
        let confirmer = AddressConfirmer::new(self.geo, self.config);
        let confirmed = confirmer.confirm_addresses(&candidates).await?;

        info!(
            address = %confirmed.formatted_address,
            confidence = format!("{:.2}", confirmed.confidence),
            "address resolved"
        );

        Ok(FoundAddress {
            confirmed,
            original_text: text.to_string(),
            clues,
        })
    }
}
