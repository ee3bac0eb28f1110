// ============================================================================
// Module : ui
// ============================================================================
// Interface terminal : événements, géométrie partagée, rendu
// ============================================================================

pub mod dashboard; // Rendu de l'écran principal
pub mod events;    // Clavier et souris
pub mod layout;    // Zones de l'écran et hit-testing

// Re-exports pour simplifier les imports
pub use dashboard::render;
pub use events::{Event, EventHandler, PointerIntent};
pub use layout::ScreenLayout;
