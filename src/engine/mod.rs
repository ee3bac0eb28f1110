// ============================================================================
// Module : engine
// ============================================================================
// Logique de l'estimateur : sélection, projections, conteneur d'état.
// ============================================================================

pub mod estimator;  // Conteneur d'état et actions
pub mod projection; // Sommes, nets, épargne cumulée, USD
pub mod selection;  // Sélection de cases/lignes, glisser, menu contextuel

pub use estimator::{Estimator, DEFAULT_EXPENSE_NAME};
pub use projection::{round2, running_totals, to_usd, MonthSummary, ProjectionEngine, UsdFigure};
pub use selection::{
    ContextMenu, DragState, Position, SelectionController, SelectionKind, SelectionSet,
};
