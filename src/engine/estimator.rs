// ============================================================================
// Estimator : conteneur d'état explicite
// ============================================================================
// Regroupe la séquence de mois (figée), le registre, les valeurs de jour,
// les comptes, la sélection et le statut du taux. Toute mutation passe par
// une méthode de l'Estimator ; les lectures dérivées passent par
// `projection()`.
//
// PATTERN : "Application State" sans globales
// - l'Estimator est construit une fois puis injecté dans l'UI
// - chaque entrée du registre est remplacée en entier (copy-on-write)
// ============================================================================

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::api::RateStatus;
use crate::config::EstimatorConfig;
use crate::engine::projection::{round2, ProjectionEngine};
use crate::engine::selection::{Position, SelectionController, SelectionKind};
use crate::models::{
    generate_months, AccountBook, AccountId, AggregateResult, BinaryCalc, CalcField, CalcMode,
    CellKey, DayValues, DerivedResult, Expense, ExpenseField, ExpenseId, LedgerStore, Mode,
    MonthDescriptor, MonthKey, MonthState, ResultId,
};

/// Nom par défaut d'une ligne créée depuis la sélection de cases
pub const DEFAULT_EXPENSE_NAME: &str = "nuevo gasto";

/// État complet d'une session d'estimation
#[derive(Debug, Clone)]
pub struct Estimator {
    months: Vec<MonthDescriptor>,
    mode: CalcMode,
    ledger: LedgerStore,
    day_values: DayValues,
    accounts: AccountBook,
    selection: SelectionController,
    rate: RateStatus,
}

impl Estimator {
    /// Crée l'Estimator sur une séquence de mois déjà générée
    ///
    /// Chaque mois de la séquence reçoit son état initial, pour que les
    /// identifiants des lignes vides restent stables d'un rendu à l'autre.
    pub fn new(months: Vec<MonthDescriptor>, mode: CalcMode, accounts: AccountBook) -> Self {
        let mut ledger = LedgerStore::new();
        for month in &months {
            ledger.ensure(month.key);
        }
        info!(months = months.len(), ?mode, "Estimator created");
        Self {
            months,
            mode,
            ledger,
            day_values: DayValues::new(),
            accounts,
            selection: SelectionController::new(),
            rate: RateStatus::Loading,
        }
    }

    /// Séquence de `count` mois ancrée sur `today`, comptes par défaut
    pub fn starting(today: NaiveDate, count: usize, mode: CalcMode) -> Self {
        Self::new(generate_months(today, count), mode, AccountBook::with_defaults())
    }

    /// Construit l'Estimator décrit par la configuration
    pub fn from_config(config: &EstimatorConfig, today: NaiveDate) -> Self {
        Self::new(
            generate_months(today, config.month_count),
            config.calc_mode,
            AccountBook::numbered(config.initial_accounts),
        )
    }

    // ========================================================================
    // Lecture
    // ========================================================================

    pub fn months(&self) -> &[MonthDescriptor] {
        &self.months
    }

    pub fn calc_mode(&self) -> CalcMode {
        self.mode
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// État du mois ; un mois jamais touché se lit comme son état initial
    pub fn month_state(&self, month: MonthKey) -> Arc<MonthState> {
        self.ledger
            .get(month)
            .cloned()
            .unwrap_or_else(|| Arc::new(MonthState::initial()))
    }

    pub fn day_values(&self) -> &DayValues {
        &self.day_values
    }

    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn rate(&self) -> &RateStatus {
        &self.rate
    }

    /// Couche de calcul en lecture seule sur l'état courant
    pub fn projection(&self) -> ProjectionEngine<'_> {
        ProjectionEngine::new(
            &self.months,
            &self.ledger,
            &self.day_values,
            &self.selection,
            &self.accounts,
            self.rate.rate(),
            self.mode,
        )
    }

    // ========================================================================
    // Taux de change
    // ========================================================================

    /// Applique le statut livré par la récupération du taux
    pub fn commit_rate(&mut self, status: RateStatus) {
        info!(label = status.label(), "Exchange rate status committed");
        self.rate = status;
    }

    // ========================================================================
    // Valeurs de jour
    // ========================================================================

    /// Saisie dans une case ; retourne false si la saisie est rejetée
    pub fn set_day_value(&mut self, key: CellKey, text: &str) -> bool {
        self.day_values.set(key, text)
    }

    // ========================================================================
    // Sélection (délégation au SelectionController)
    // ========================================================================

    pub fn press_cell(&mut self, grid_month: MonthKey, key: CellKey, toggle: bool) {
        self.selection.press_cell(grid_month, key, toggle);
    }

    pub fn enter_cell(&mut self, grid_month: MonthKey, key: CellKey) {
        self.selection.enter_cell(grid_month, key);
    }

    pub fn press_expense(&mut self, month: MonthKey, id: ExpenseId, toggle: bool) {
        self.selection.press_expense(month, id, toggle);
    }

    pub fn enter_expense(&mut self, month: MonthKey, id: ExpenseId) {
        self.selection.enter_expense(month, id);
    }

    pub fn release(&mut self) {
        self.selection.release();
    }

    pub fn open_menu(&mut self, kind: SelectionKind, month: MonthKey, cursor: Position) {
        self.selection.open_menu(kind, month, cursor);
    }

    pub fn close_menu(&mut self) {
        self.selection.close_menu();
    }

    /// Retourne true si l'appui tombe dans le menu ouvert
    pub fn pointer_down_at(&mut self, pos: Position) -> bool {
        self.selection.pointer_down_at(pos)
    }

    // ========================================================================
    // Registre : lignes
    // ========================================================================

    pub fn add_expense(&mut self, month: MonthKey) -> Arc<MonthState> {
        self.ledger.add_expense(month)
    }

    pub fn update_expense(&mut self, month: MonthKey, id: ExpenseId, field: ExpenseField) -> Arc<MonthState> {
        self.ledger.update_expense_field(month, id, field)
    }

    pub fn remove_expenses(&mut self, month: MonthKey, ids: &[ExpenseId]) -> Arc<MonthState> {
        let state = self.ledger.remove_expenses(month, ids);
        self.selection.forget_expenses(month, ids);
        state
    }

    /// Supprime les lignes sélectionnées du mois et vide sa sélection
    pub fn remove_selected_expenses(&mut self, month: MonthKey) -> Arc<MonthState> {
        let ids = self.selection.selected_expenses(month).to_vec();
        let state = self.ledger.remove_expenses(month, &ids);
        self.selection.clear_expenses(month);
        state
    }

    // ========================================================================
    // Actions du menu "cases"
    // ========================================================================

    /// Ajoute une dépense valant la somme (arrondie) des cases sélectionnées
    /// du mois, puis ferme le menu
    pub fn create_expense_from_selected_cells(&mut self, month: MonthKey, name: &str) -> ExpenseId {
        let sum = round2(self.projection().selected_cell_sum(month));
        let name = match name.trim() {
            "" => DEFAULT_EXPENSE_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        let expense = Expense::new(name, sum, Mode::Minus);
        let id = expense.id;
        info!(month = %month, expense = %id, value = sum, "Expense created from selected cells");
        self.ledger.push_expense(month, expense);
        self.selection.close_menu();
        id
    }

    /// Écrit `value` dans toutes les cases sélectionnées, puis ferme le menu
    pub fn apply_bulk_value(&mut self, value: f64) {
        let cells = self.selection.selected_cells();
        debug!(cells = cells.len(), value, "Applying bulk value");
        self.day_values.set_many(cells.iter(), value);
        self.selection.close_menu();
    }

    /// Efface les valeurs des cases sélectionnées, puis ferme le menu
    pub fn clear_selected_cell_values(&mut self) {
        let cells = self.selection.selected_cells();
        debug!(cells = cells.len(), "Clearing selected cell values");
        self.day_values.clear_many(cells.iter());
        self.selection.close_menu();
    }

    // ========================================================================
    // Résultats dérivés
    // ========================================================================

    /// Crée un résultat dérivé depuis les lignes sélectionnées du mois
    ///
    /// - Aggregate : somme signée figée ; sélection vide -> rien
    /// - Binary : gauche/droite = première/deuxième ligne sélectionnée
    ///
    /// Ferme le menu dans les deux cas où un résultat est créé.
    pub fn add_derived_result(&mut self, month: MonthKey, name: &str) -> Option<ResultId> {
        let selected = self.selection.selected_expenses(month).to_vec();
        let state = self.ledger.ensure(month);
        let position = state.results.len() + 1;

        let result = match self.mode {
            CalcMode::Aggregate => {
                if selected.is_empty() {
                    debug!(month = %month, "No expense selected, result not created");
                    return None;
                }
                DerivedResult::Aggregate(AggregateResult {
                    id: ResultId::new(),
                    name: name_or(name, format!("resultado {position}")),
                    value: state.signed_sum_of(&selected),
                    sources: selected,
                })
            }
            CalcMode::Binary => DerivedResult::Binary(BinaryCalc {
                id: ResultId::new(),
                name: name_or(name, format!("calculo {position}")),
                left: selected.first().copied(),
                op: Mode::Plus,
                right: selected.get(1).copied(),
            }),
        };

        let id = result.id();
        self.ledger.add_derived_result(month, result);
        self.selection.close_menu();
        Some(id)
    }

    pub fn remove_derived_result(&mut self, month: MonthKey, id: ResultId) -> Arc<MonthState> {
        self.ledger.remove_derived_result(month, id)
    }

    /// Modifie un champ de calcul ; les références et l'opérateur ne
    /// s'appliquent qu'en mode binaire
    pub fn update_calc(&mut self, month: MonthKey, id: ResultId, field: CalcField) -> Arc<MonthState> {
        self.ledger.update_calc_field(month, id, field)
    }

    // ========================================================================
    // Comptes
    // ========================================================================

    pub fn add_account(&mut self) -> AccountId {
        self.accounts.add()
    }

    pub fn rename_account(&mut self, id: AccountId, name: &str) {
        self.accounts.rename(id, name);
    }

    pub fn set_account_balance(&mut self, id: AccountId, balance_uyu: f64) {
        self.accounts.set_balance(id, balance_uyu);
    }
}

fn name_or(input: &str, fallback: String) -> String {
    match input.trim() {
        "" => fallback,
        trimmed => trimmed.to_string(),
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rates::RateError;

    fn may_2024(mode: CalcMode) -> Estimator {
        Estimator::starting(NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(), 18, mode)
    }

    fn may() -> MonthKey {
        MonthKey::new(2024, 4).unwrap()
    }

    #[test]
    fn test_every_month_starts_with_one_blank_expense() {
        let est = may_2024(CalcMode::Aggregate);
        assert_eq!(est.months().len(), 18);
        for month in est.months() {
            assert_eq!(est.month_state(month.key).expenses.len(), 1);
        }
    }

    #[test]
    fn test_from_config() {
        let config = EstimatorConfig {
            month_count: 6,
            calc_mode: CalcMode::Binary,
            initial_accounts: 2,
            ..EstimatorConfig::default()
        };
        let est = Estimator::from_config(&config, NaiveDate::from_ymd_opt(2024, 11, 2).unwrap());

        assert_eq!(est.months().len(), 6);
        assert_eq!(est.months()[2].label, "enero de 2025");
        assert_eq!(est.calc_mode(), CalcMode::Binary);
        assert_eq!(est.accounts().len(), 2);
        assert_eq!(est.rate(), &RateStatus::Loading);
    }

    #[test]
    fn test_create_expense_from_selected_cells() {
        let mut est = may_2024(CalcMode::Aggregate);
        est.set_day_value(may().day(1), "10.25");
        est.set_day_value(may().day(2), "20");
        est.press_cell(may(), may().day(1), false);
        est.enter_cell(may(), may().day(2));
        est.release();
        est.open_menu(SelectionKind::Cells, may(), Position::new(3, 3));

        let id = est.create_expense_from_selected_cells(may(), "   ");

        let state = est.month_state(may());
        let expense = state.expense(id).unwrap();
        assert_eq!(expense.name, DEFAULT_EXPENSE_NAME);
        assert_eq!(expense.value, 30.25);
        assert_eq!(expense.mode, Mode::Minus);
        assert!(est.selection().menu().is_none());
    }

    #[test]
    fn test_bulk_value_and_clear() {
        let mut est = may_2024(CalcMode::Aggregate);
        let june = may().next();
        est.press_cell(may(), may().day(31), false);
        est.press_cell(june, june.day(1), true);

        est.apply_bulk_value(7.5);
        assert_eq!(est.day_values().get(may().day(31)), "7.5");
        assert_eq!(est.day_values().get(june.day(1)), "7.5");

        est.clear_selected_cell_values();
        assert!(est.day_values().is_empty());
    }

    #[test]
    fn test_aggregate_result_is_frozen() {
        let mut est = may_2024(CalcMode::Aggregate);
        assert_eq!(est.add_derived_result(may(), ""), None);

        let first = est.month_state(may()).expenses[0].id;
        est.update_expense(may(), first, ExpenseField::Value(200.0));
        let second_state = est.add_expense(may());
        let second = second_state.expenses[1].id;
        est.update_expense(may(), second, ExpenseField::Value(50.0));
        est.update_expense(may(), second, ExpenseField::Mode(Mode::Plus));

        est.press_expense(may(), first, false);
        est.enter_expense(may(), second);
        est.release();

        let id = est.add_derived_result(may(), "").unwrap();
        let state = est.month_state(may());
        assert_eq!(state.result(id).unwrap().name(), "resultado 1");
        assert_eq!(state.result_total(), -150.0);

        est.update_expense(may(), first, ExpenseField::Value(1000.0));
        assert_eq!(est.month_state(may()).result_total(), -150.0);
    }

    #[test]
    fn test_binary_calc_uses_first_two_selected() {
        let mut est = may_2024(CalcMode::Binary);
        let a = est.month_state(may()).expenses[0].id;
        let b = est.add_expense(may()).expenses[1].id;
        est.update_expense(may(), a, ExpenseField::Value(80.0));
        est.update_expense(may(), b, ExpenseField::Value(30.0));

        est.press_expense(may(), a, false);
        est.press_expense(may(), b, true);
        let id = est.add_derived_result(may(), "neto").unwrap();

        assert_eq!(est.month_state(may()).result_total(), 110.0);

        est.update_calc(may(), id, CalcField::Op(Mode::Minus));
        assert_eq!(est.month_state(may()).result_total(), 50.0);

        est.remove_expenses(may(), &[a]);
        assert_eq!(est.month_state(may()).result_total(), -30.0);
        assert_eq!(est.selection().selected_expenses(may()), &[b]);
    }

    #[test]
    fn test_remove_selected_expenses_clears_selection() {
        let mut est = may_2024(CalcMode::Aggregate);
        let a = est.month_state(may()).expenses[0].id;
        est.add_expense(may());
        est.press_expense(may(), a, false);

        let state = est.remove_selected_expenses(may());
        assert_eq!(state.expenses.len(), 1);
        assert!(est.selection().selected_expenses(may()).is_empty());
    }

    #[test]
    fn test_commit_rate() {
        let mut est = may_2024(CalcMode::Aggregate);
        let first = est.accounts().accounts()[0].id;
        est.set_account_balance(first, 4000.0);
        assert_eq!(est.projection().account_total_usd().to_string(), "USD -");

        est.commit_rate(RateStatus::from_outcome(Ok(40.0)));
        assert_eq!(est.projection().account_total_usd().to_string(), "USD 100.00");

        est.commit_rate(RateStatus::from_outcome(Err(RateError::MissingQuote)));
        assert!(est.rate().rate().is_none());
    }
}
