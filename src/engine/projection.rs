// ============================================================================
// ProjectionEngine : valeurs dérivées
// ============================================================================
// Couche pure : lit le registre, les valeurs de jour, la sélection, les
// comptes et le taux, et calcule sommes, nets, épargne cumulée et
// projections. Aucun état caché : tout est recalculé depuis l'instantané.
// ============================================================================

use std::fmt;

use crate::engine::selection::SelectionController;
use crate::models::{AccountBook, CalcMode, DayValues, LedgerStore, MonthDescriptor, MonthKey, MonthState};

// ============================================================================
// Conversion UYU -> USD
// ============================================================================

/// Montant en dollars, ou marqueur explicite tant que le taux manque
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UsdFigure {
    Available(f64),
    Unavailable,
}

impl UsdFigure {
    pub fn amount(&self) -> Option<f64> {
        match self {
            UsdFigure::Available(v) => Some(*v),
            UsdFigure::Unavailable => None,
        }
    }
}

impl fmt::Display for UsdFigure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsdFigure::Available(v) => write!(f, "USD {v:.2}"),
            UsdFigure::Unavailable => write!(f, "USD -"),
        }
    }
}

/// Divise par le taux (UYU par USD) ; taux absent ou invalide : Unavailable
pub fn to_usd(uyu: f64, rate: Option<f64>) -> UsdFigure {
    match rate {
        Some(rate) if rate.is_finite() && rate > 0.0 => UsdFigure::Available(uyu / rate),
        _ => UsdFigure::Unavailable,
    }
}

/// Arrondi à deux décimales
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Résumé mensuel
// ============================================================================

/// Chiffres affichés à côté d'un mois
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthSummary {
    pub key: MonthKey,
    pub net: f64,
    /// Épargne cumulée jusqu'à ce mois inclus
    pub cumulative: f64,
    /// Épargne cumulée jusqu'au mois précédent (0 pour le premier)
    pub previous_saving: f64,
    pub result_total: f64,
    /// accountTotal - resultTotal
    pub difference_current: f64,
    /// accountTotal + previousSaving - resultTotal
    pub remaining_savings: f64,
}

/// Épargne cumulée : préfixe des nets, dans l'ordre chronologique
pub fn running_totals(nets: &[f64]) -> Vec<f64> {
    nets.iter()
        .scan(0.0, |acc, net| {
            *acc += net;
            Some(*acc)
        })
        .collect()
}

// ============================================================================
// ProjectionEngine
// ============================================================================

/// Vue en lecture seule sur un instantané de l'Estimator
pub struct ProjectionEngine<'a> {
    months: &'a [MonthDescriptor],
    ledger: &'a LedgerStore,
    day_values: &'a DayValues,
    selection: &'a SelectionController,
    accounts: &'a AccountBook,
    rate: Option<f64>,
    mode: CalcMode,
}

impl<'a> ProjectionEngine<'a> {
    pub fn new(
        months: &'a [MonthDescriptor],
        ledger: &'a LedgerStore,
        day_values: &'a DayValues,
        selection: &'a SelectionController,
        accounts: &'a AccountBook,
        rate: Option<f64>,
        mode: CalcMode,
    ) -> Self {
        Self { months, ledger, day_values, selection, accounts, rate, mode }
    }

    fn state(&self, month: MonthKey) -> Option<&MonthState> {
        self.ledger.get(month).map(|s| s.as_ref())
    }

    /// Somme des valeurs numériques des cases sélectionnées du mois
    pub fn selected_cell_sum(&self, month: MonthKey) -> f64 {
        self.selection
            .selected_cells()
            .iter()
            .filter(|key| key.belongs_to(month))
            .filter_map(|key| self.day_values.numeric(*key))
            .sum()
    }

    /// Net signé du mois ; en mode binaire, plus la somme des calculs vivants
    pub fn month_net(&self, month: MonthKey) -> f64 {
        let Some(state) = self.state(month) else {
            return 0.0;
        };
        match self.mode {
            CalcMode::Aggregate => state.expense_net(),
            CalcMode::Binary => state.expense_net() + state.result_total(),
        }
    }

    /// Total des résultats dérivés du mois
    pub fn result_total(&self, month: MonthKey) -> f64 {
        self.state(month).map_or(0.0, MonthState::result_total)
    }

    /// Épargne cumulée pour chaque mois de la séquence
    pub fn cumulative_savings(&self) -> Vec<f64> {
        let nets: Vec<f64> = self.months.iter().map(|m| self.month_net(m.key)).collect();
        running_totals(&nets)
    }

    /// Somme des soldes des comptes
    pub fn account_total(&self) -> f64 {
        self.accounts.total_uyu()
    }

    pub fn account_total_usd(&self) -> UsdFigure {
        to_usd(self.account_total(), self.rate)
    }

    pub fn usd(&self, uyu: f64) -> UsdFigure {
        to_usd(uyu, self.rate)
    }

    /// Résumé de chaque mois de la séquence
    pub fn month_summaries(&self) -> Vec<MonthSummary> {
        let account_total = self.account_total();
        let cumulative = self.cumulative_savings();

        self.months
            .iter()
            .enumerate()
            .map(|(i, month)| {
                let previous_saving = if i == 0 { 0.0 } else { cumulative[i - 1] };
                let result_total = self.result_total(month.key);
                MonthSummary {
                    key: month.key,
                    net: self.month_net(month.key),
                    cumulative: cumulative[i],
                    previous_saving,
                    result_total,
                    difference_current: account_total - result_total,
                    remaining_savings: account_total + previous_saving - result_total,
                }
            })
            .collect()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
