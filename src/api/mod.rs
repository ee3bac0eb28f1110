// ============================================================================
// Module : api
// ============================================================================
// Sources externes : le flux du taux de change USD/UYU
// ============================================================================

pub mod rates;  // Client du flux de taux + drapeau de vie

// Re-export des éléments principaux
pub use rates::{spawn_rate_fetch, LivenessGuard, LivenessToken, RateError, RateStatus};
