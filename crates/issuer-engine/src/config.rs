//! Engine tuning knobs.

use std::time::Duration;

/// Runtime configuration of the issuance engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on sub-requests processed at the same time.
    pub max_concurrent_issuances: usize,
    /// Budget for resolving one attestation.
    pub attestation_timeout: Duration,
    /// Budget for one call into the signing boundary.
    pub signing_timeout: Duration,
    /// Key used when a credential definition names none.
    pub default_key_alias: String,
    /// Reject requests for holders that are not registered in the context.
    pub require_registered_holder: bool,
    /// Mode applied when a request does not choose one.
    pub independent_by_default: bool,
    /// How long a request that issued nothing stays pollable after its
    /// last sub-request failed.
    pub failed_request_retention: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_issuances: 16,
            attestation_timeout: Duration::from_secs(5),
            signing_timeout: Duration::from_secs(5),
            default_key_alias: "issuer".to_string(),
            require_registered_holder: false,
            independent_by_default: false,
            failed_request_retention: Duration::from_secs(3600),
        }
    }
}

impl EngineConfig {
    /// Concurrency bound actually used; never zero.
    pub fn permits(&self) -> usize {
        self.max_concurrent_issuances.max(1)
    }
}
