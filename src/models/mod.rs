// ============================================================================
// Module : models
// ============================================================================
// Structures de données de l'estimateur : mois, grille, registre, comptes,
// valeurs de jour.
// ============================================================================

pub mod account;    // Comptes et soldes UYU
pub mod calendar;   // Grille à 7 colonnes d'un mois
pub mod day_values; // Texte numérique saisi par case
pub mod ledger;     // Lignes, résultats dérivés, registre par mois
pub mod month;      // Clés de mois/jour et séquence de mois

// Re-exports pour simplifier les imports
pub use account::{Account, AccountBook, AccountId, DEFAULT_ACCOUNT_COUNT};
pub use calendar::{build_month_cells, CalendarCell, GRID_COLUMNS};
pub use day_values::DayValues;
pub use ledger::{
    AggregateResult, BinaryCalc, CalcField, CalcMode, DerivedResult, Expense, ExpenseField,
    ExpenseId, LedgerStore, Mode, MonthState, ResultId,
};
pub use month::{generate_months, generate_months_from_now, CellKey, MonthDescriptor, MonthKey, WEEK_DAYS};
