// ============================================================================
// Estimativos - Library
// ============================================================================
// Moteur d'estimation (mois, registre, sélection, projections) et interface
// terminal qui le pilote. Exposé pour le binaire et les tests d'intégration.
// ============================================================================

pub mod api;    // Taux de change USD/UYU
pub mod app;    // État de l'application TUI
pub mod config; // Configuration (env)
pub mod engine; // Sélection, projections, conteneur d'état
pub mod models; // Structures de données
pub mod ui;     // Interface utilisateur

#[cfg(test)]
mod log_capture; // Messages tracing pour les tests
