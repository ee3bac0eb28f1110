// ============================================================================
// Structure : App
// ============================================================================
// État de l'interface TUI autour de l'Estimator : mois affiché, focus,
// curseurs, saisie modale et confirmations.
//
// PATTERN : "Application State"
// - le rendu lit App (et l'Estimator qu'il contient)
// - clavier et souris passent par les méthodes de App, qui traduisent
//   l'intention en appel sur l'Estimator
// ============================================================================

use std::sync::Arc;

use ratatui::layout::Rect;
use tracing::{debug, info, warn};

use crate::engine::{Estimator, Position, SelectionKind};
use crate::models::{
    build_month_cells, AccountId, CalcField, CalcMode, CalendarCell, CellKey, DerivedResult,
    ExpenseField, ExpenseId, MonthDescriptor, MonthKey, MonthState, ResultId,
};
use crate::ui::events::CalcSide;
use crate::ui::layout::ScreenLayout;

// ============================================================================
// Enums : écran, focus, cible de saisie, actions du menu
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : grille, registre, résumé
    Dashboard,

    /// Mode saisie (Vim-like) : Enter valide, ESC annule
    InputMode,
}

/// Zone qui reçoit les touches de navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Grid,
    Ledger,
    Results,
    Accounts,
}

impl Focus {
    /// Grid → Ledger → Results → Accounts → Grid
    pub fn next(self) -> Self {
        match self {
            Focus::Grid => Focus::Ledger,
            Focus::Ledger => Focus::Results,
            Focus::Results => Focus::Accounts,
            Focus::Accounts => Focus::Grid,
        }
    }
}

/// Ce que la valeur saisie va modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    DayValue(CellKey),
    ExpenseName { month: MonthKey, id: ExpenseId },
    ExpenseValue { month: MonthKey, id: ExpenseId },
    /// Nom de la dépense créée depuis les cases sélectionnées
    CellsExpense { month: MonthKey },
    BulkValue,
    /// Nom du résultat généré depuis les lignes sélectionnées
    ResultName { month: MonthKey },
    CalcName { month: MonthKey, id: ResultId },
    AccountName(AccountId),
    AccountBalance(AccountId),
}

/// Entrées du menu contextuel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    CreateExpense,
    ApplyBulkValue,
    ClearValues,
    GenerateResult,
    RemoveSelected,
}

const CELL_ACTIONS: [MenuAction; 3] = [
    MenuAction::CreateExpense,
    MenuAction::ApplyBulkValue,
    MenuAction::ClearValues,
];

const EXPENSE_ACTIONS: [MenuAction; 2] = [MenuAction::GenerateResult, MenuAction::RemoveSelected];

impl MenuAction {
    pub fn for_kind(kind: SelectionKind) -> &'static [MenuAction] {
        match kind {
            SelectionKind::Cells => &CELL_ACTIONS,
            SelectionKind::Expenses => &EXPENSE_ACTIONS,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::CreateExpense => "crear gasto con la suma",
            MenuAction::ApplyBulkValue => "aplicar valor a las celdas",
            MenuAction::ClearValues => "limpiar valores",
            MenuAction::GenerateResult => "generar resultado",
            MenuAction::RemoveSelected => "borrar seleccion",
        }
    }
}

/// Montant saisi : vide = 0, non fini = 0, illisible = None
pub fn parse_amount(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let value: f64 = trimmed.parse().ok()?;
    Some(if value.is_finite() { value } else { 0.0 })
}

// ============================================================================
// App
// ============================================================================

/// État principal de l'application
pub struct App {
    pub running: bool,

    /// Conteneur d'état injecté au démarrage
    pub estimator: Estimator,

    /// Index du mois affiché dans la séquence
    pub current_month: usize,

    pub current_screen: Screen,
    pub focus: Focus,

    /// Jour (1-based) sous le curseur de la grille
    pub cursor_day: u32,
    pub cursor_expense: usize,
    pub cursor_result: usize,
    pub cursor_account: usize,
    /// Action surlignée dans le menu ouvert
    pub menu_cursor: usize,
    /// Première ligne visible du registre
    pub ledger_scroll: usize,

    /// Taille du dernier rendu, pour résoudre les clics
    pub viewport: Rect,

    /// Two-step quit : première pression de 'q' arme, deuxième quitte
    pub confirm_quit: bool,
    /// Two-step delete, même principe avec 'd'
    pub confirm_delete: bool,

    pub input_buffer: String,
    pub input_prompt: String,
    pub input_target: Option<InputTarget>,

    /// Message ponctuel affiché dans le footer
    pub status_message: Option<String>,
}

impl App {
    pub fn new(estimator: Estimator) -> Self {
        Self {
            running: true,
            estimator,
            current_month: 0,
            current_screen: Screen::Dashboard,
            focus: Focus::default(),
            cursor_day: 1,
            cursor_expense: 0,
            cursor_result: 0,
            cursor_account: 0,
            menu_cursor: 0,
            ledger_scroll: 0,
            viewport: Rect::default(),
            confirm_quit: false,
            confirm_delete: false,
            input_buffer: String::new(),
            input_prompt: String::new(),
            input_target: None,
            status_message: None,
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick(&mut self) {}

    pub fn set_viewport(&mut self, area: Rect) {
        self.viewport = area;
    }

    pub fn layout(&self) -> ScreenLayout {
        ScreenLayout::new(self.viewport)
    }

    // ========================================================================
    // Mois affiché
    // ========================================================================

    pub fn current_descriptor(&self) -> Option<&MonthDescriptor> {
        self.estimator.months().get(self.current_month)
    }

    pub fn current_key(&self) -> Option<MonthKey> {
        self.current_descriptor().map(|m| m.key)
    }

    pub fn current_state(&self) -> Arc<MonthState> {
        match self.current_key() {
            Some(key) => self.estimator.month_state(key),
            None => Arc::new(MonthState::initial()),
        }
    }

    /// Cases de la grille du mois affiché
    pub fn cells(&self) -> Vec<CalendarCell> {
        self.current_key().map(build_month_cells).unwrap_or_default()
    }

    pub fn next_month(&mut self) {
        let last = self.estimator.months().len().saturating_sub(1);
        self.current_month = (self.current_month + 1).min(last);
        self.reset_cursors();
    }

    pub fn previous_month(&mut self) {
        self.current_month = self.current_month.saturating_sub(1);
        self.reset_cursors();
    }

    fn reset_cursors(&mut self) {
        let days = self.current_key().map_or(1, |k| k.days_in_month());
        self.cursor_day = self.cursor_day.clamp(1, days);
        self.cursor_expense = 0;
        self.cursor_result = 0;
        self.ledger_scroll = 0;
        debug!(month = ?self.current_key(), "Month changed");
    }

    // ========================================================================
    // Focus et curseurs
    // ========================================================================

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focused_cell(&self) -> Option<CellKey> {
        self.current_key().map(|k| k.day(self.cursor_day))
    }

    pub fn focused_expense(&self) -> Option<ExpenseId> {
        self.current_state().expenses.get(self.cursor_expense).map(|e| e.id)
    }

    pub fn focused_result(&self) -> Option<ResultId> {
        self.current_state().results.get(self.cursor_result).map(DerivedResult::id)
    }

    pub fn focused_account(&self) -> Option<AccountId> {
        self.estimator.accounts().accounts().get(self.cursor_account).map(|a| a.id)
    }

    pub fn move_up(&mut self) {
        match self.focus {
            Focus::Grid if self.cursor_day > 7 => self.cursor_day -= 7,
            Focus::Grid => {}
            Focus::Ledger => {
                self.cursor_expense = self.cursor_expense.saturating_sub(1);
                self.ensure_expense_visible();
            }
            Focus::Results => self.cursor_result = self.cursor_result.saturating_sub(1),
            Focus::Accounts => self.cursor_account = self.cursor_account.saturating_sub(1),
        }
    }

    pub fn move_down(&mut self) {
        match self.focus {
            Focus::Grid => {
                let days = self.current_key().map_or(1, |k| k.days_in_month());
                if self.cursor_day + 7 <= days {
                    self.cursor_day += 7;
                }
            }
            Focus::Ledger => {
                let max = self.current_state().expenses.len().saturating_sub(1);
                self.cursor_expense = (self.cursor_expense + 1).min(max);
                self.ensure_expense_visible();
            }
            Focus::Results => {
                let max = self.current_state().results.len().saturating_sub(1);
                self.cursor_result = (self.cursor_result + 1).min(max);
            }
            Focus::Accounts => {
                let max = self.estimator.accounts().len().saturating_sub(1);
                self.cursor_account = (self.cursor_account + 1).min(max);
            }
        }
    }

    pub fn move_left(&mut self) {
        match self.focus {
            Focus::Grid => self.cursor_day = self.cursor_day.saturating_sub(1).max(1),
            Focus::Accounts => self.move_up(),
            _ => {}
        }
    }

    pub fn move_right(&mut self) {
        match self.focus {
            Focus::Grid => {
                let days = self.current_key().map_or(1, |k| k.days_in_month());
                self.cursor_day = (self.cursor_day + 1).min(days);
            }
            Focus::Accounts => self.move_down(),
            _ => {}
        }
    }

    /// Garde la ligne courante du registre dans la zone visible
    pub fn ensure_expense_visible(&mut self) {
        let capacity = self.layout().ledger_capacity().max(1);
        if self.cursor_expense < self.ledger_scroll {
            self.ledger_scroll = self.cursor_expense;
        } else if self.cursor_expense >= self.ledger_scroll + capacity {
            self.ledger_scroll = self.cursor_expense + 1 - capacity;
        }
    }

    fn clamp_cursors(&mut self) {
        let state = self.current_state();
        self.cursor_expense = self.cursor_expense.min(state.expenses.len().saturating_sub(1));
        self.cursor_result = self.cursor_result.min(state.results.len().saturating_sub(1));
        self.ensure_expense_visible();
    }

    // ========================================================================
    // Actions clavier sur l'élément focus
    // ========================================================================

    /// Espace : ajoute/retire l'élément focus de la sélection
    pub fn toggle_focused(&mut self) {
        let Some(month) = self.current_key() else {
            return;
        };
        match self.focus {
            Focus::Grid => {
                if let Some(key) = self.focused_cell() {
                    self.estimator.press_cell(month, key, true);
                }
            }
            Focus::Ledger => {
                if let Some(id) = self.focused_expense() {
                    self.estimator.press_expense(month, id, true);
                }
            }
            Focus::Results | Focus::Accounts => {}
        }
        self.estimator.release();
    }

    /// Enter : édite la valeur de l'élément focus
    pub fn edit_focused(&mut self) {
        let Some(month) = self.current_key() else {
            return;
        };
        match self.focus {
            Focus::Grid => {
                if let Some(key) = self.focused_cell() {
                    let current = self.estimator.day_values().get(key).to_string();
                    self.start_input_with(format!("Valor {key}: "), InputTarget::DayValue(key), current);
                }
            }
            Focus::Ledger => {
                if let Some(id) = self.focused_expense() {
                    self.start_input("Valor del gasto: ", InputTarget::ExpenseValue { month, id });
                }
            }
            Focus::Results => {
                if let Some(id) = self.focused_result() {
                    self.start_input("Nombre del calculo: ", InputTarget::CalcName { month, id });
                }
            }
            Focus::Accounts => {
                if let Some(id) = self.focused_account() {
                    self.start_input("Saldo UYU: ", InputTarget::AccountBalance(id));
                }
            }
        }
    }

    /// 'n' : renomme l'élément focus
    pub fn rename_focused(&mut self) {
        let Some(month) = self.current_key() else {
            return;
        };
        match self.focus {
            Focus::Ledger => {
                if let Some(id) = self.focused_expense() {
                    self.start_input("Nombre del gasto: ", InputTarget::ExpenseName { month, id });
                }
            }
            Focus::Results => {
                if let Some(id) = self.focused_result() {
                    self.start_input("Nombre del calculo: ", InputTarget::CalcName { month, id });
                }
            }
            Focus::Accounts => {
                if let Some(id) = self.focused_account() {
                    self.start_input("Nombre de la cuenta: ", InputTarget::AccountName(id));
                }
            }
            Focus::Grid => {}
        }
    }

    /// 'm' : bascule +/- (ligne) ou l'opérateur (calcul binaire)
    pub fn toggle_mode_focused(&mut self) {
        let Some(month) = self.current_key() else {
            return;
        };
        let state = self.current_state();
        match self.focus {
            Focus::Ledger => {
                if let Some(expense) = state.expenses.get(self.cursor_expense) {
                    let mode = expense.mode.toggled();
                    self.estimator.update_expense(month, expense.id, ExpenseField::Mode(mode));
                }
            }
            Focus::Results => {
                if let Some(DerivedResult::Binary(calc)) = state.results.get(self.cursor_result) {
                    let op = calc.op.toggled();
                    self.estimator.update_calc(month, calc.id, CalcField::Op(op));
                }
            }
            Focus::Grid | Focus::Accounts => {}
        }
    }

    /// 'a' : nouvelle ligne ou nouveau compte
    pub fn add_focused(&mut self) {
        match self.focus {
            Focus::Accounts => {
                self.estimator.add_account();
                self.cursor_account = self.estimator.accounts().len().saturating_sub(1);
            }
            _ => {
                if let Some(month) = self.current_key() {
                    let state = self.estimator.add_expense(month);
                    self.focus = Focus::Ledger;
                    self.cursor_expense = state.expenses.len().saturating_sub(1);
                    self.ensure_expense_visible();
                }
            }
        }
    }

    /// 'd' confirmé : supprime la sélection du registre (ou la ligne focus
    /// si rien n'est sélectionné) ou le résultat focus
    pub fn delete_focused(&mut self) {
        self.confirm_delete = false;
        let Some(month) = self.current_key() else {
            return;
        };
        match self.focus {
            Focus::Ledger => {
                if self.estimator.selection().selected_expenses(month).is_empty() {
                    if let Some(id) = self.focused_expense() {
                        self.estimator.remove_expenses(month, &[id]);
                    }
                } else {
                    self.estimator.remove_selected_expenses(month);
                }
            }
            Focus::Results => {
                if let Some(id) = self.focused_result() {
                    self.estimator.remove_derived_result(month, id);
                }
            }
            Focus::Grid | Focus::Accounts => {}
        }
        self.clamp_cursors();
    }

    /// '1'/'2' : la référence du calcul focus devient la première ligne
    /// sélectionnée du mois (aucune sélection : référence vidée)
    pub fn set_calc_side(&mut self, side: CalcSide) {
        if self.focus != Focus::Results || self.estimator.calc_mode() != CalcMode::Binary {
            return;
        }
        let (Some(month), Some(id)) = (self.current_key(), self.focused_result()) else {
            return;
        };
        let reference = self.estimator.selection().selected_expenses(month).first().copied();
        let field = match side {
            CalcSide::Left => CalcField::Left(reference),
            CalcSide::Right => CalcField::Right(reference),
        };
        self.estimator.update_calc(month, id, field);
    }

    // ========================================================================
    // Menu contextuel
    // ========================================================================

    pub fn is_menu_open(&self) -> bool {
        self.estimator.selection().menu().is_some()
    }

    /// 'c' : ouvre le menu sur l'élément focus, comme un clic secondaire
    pub fn open_menu_for_focus(&mut self) {
        let Some(month) = self.current_key() else {
            return;
        };
        let layout = self.layout();
        let anchor = match self.focus {
            Focus::Grid => {
                let focused = self.focused_cell();
                self.cells()
                    .iter()
                    .position(|c| c.in_month && Some(c.key) == focused)
                    .map(|i| (SelectionKind::Cells, layout.cell_rect(i)))
            }
            Focus::Ledger => layout
                .expense_row_rect(self.cursor_expense, self.ledger_scroll)
                .map(|r| (SelectionKind::Expenses, r)),
            Focus::Results | Focus::Accounts => None,
        };
        if let Some((kind, rect)) = anchor {
            self.estimator.open_menu(kind, month, Position::new(rect.x, rect.y));
            self.menu_cursor = 0;
        }
    }

    fn menu_actions(&self) -> &'static [MenuAction] {
        self.estimator
            .selection()
            .menu()
            .map(|menu| MenuAction::for_kind(menu.kind))
            .unwrap_or(&[])
    }

    pub fn menu_up(&mut self) {
        self.menu_cursor = self.menu_cursor.saturating_sub(1);
    }

    pub fn menu_down(&mut self) {
        let max = self.menu_actions().len().saturating_sub(1);
        self.menu_cursor = (self.menu_cursor + 1).min(max);
    }

    pub fn close_menu(&mut self) {
        self.estimator.close_menu();
    }

    /// Exécute l'action `index` du menu ouvert
    pub fn activate_menu_item(&mut self, index: usize) {
        let Some(menu) = self.estimator.selection().menu().copied() else {
            return;
        };
        let Some(action) = MenuAction::for_kind(menu.kind).get(index).copied() else {
            return;
        };
        info!(?action, month = %menu.month, "Menu action");
        match action {
            MenuAction::CreateExpense => self.start_input(
                "Nombre del gasto: ",
                InputTarget::CellsExpense { month: menu.month },
            ),
            MenuAction::ApplyBulkValue => {
                self.start_input("Valor para las celdas: ", InputTarget::BulkValue)
            }
            MenuAction::ClearValues => self.estimator.clear_selected_cell_values(),
            MenuAction::GenerateResult => {
                if self.estimator.calc_mode() == CalcMode::Aggregate
                    && self.estimator.selection().selected_expenses(menu.month).is_empty()
                {
                    self.status_message = Some("sin gastos seleccionados".to_string());
                } else {
                    self.start_input(
                        "Nombre del resultado: ",
                        InputTarget::ResultName { month: menu.month },
                    );
                }
            }
            MenuAction::RemoveSelected => {
                self.estimator.remove_selected_expenses(menu.month);
                self.estimator.close_menu();
                self.clamp_cursors();
            }
        }
    }

    pub fn activate_menu_cursor(&mut self) {
        self.activate_menu_item(self.menu_cursor);
    }

    // ========================================================================
    // Souris
    // ========================================================================

    /// Appui du pointeur ; le menu ouvert voit l'appui en premier
    pub fn pointer_down(&mut self, pos: Position, secondary: bool, toggle: bool) {
        if self.is_in_input_mode() {
            return;
        }
        let layout = self.layout();
        let menu = self.estimator.selection().menu().copied();
        if self.estimator.pointer_down_at(pos) {
            if let (false, Some(menu)) = (secondary, menu) {
                if let Some(index) = layout.menu_item_at(&menu, pos) {
                    self.menu_cursor = index;
                    self.activate_menu_item(index);
                }
            }
            return;
        }

        let Some(month) = self.current_key() else {
            return;
        };

        let cell = layout.cell_index_at(pos).and_then(|i| self.cells().get(i).copied());
        if let Some(cell) = cell {
            self.focus = Focus::Grid;
            if cell.in_month {
                self.cursor_day = cell.date_number;
            }
            if secondary {
                self.estimator.open_menu(SelectionKind::Cells, month, pos);
                self.menu_cursor = 0;
            } else {
                self.estimator.press_cell(month, cell.key, toggle);
            }
            return;
        }

        let state = self.current_state();
        let row = layout
            .expense_index_at(pos, self.ledger_scroll)
            .and_then(|i| state.expenses.get(i).map(|e| (i, e.id)));
        if let Some((index, id)) = row {
            self.focus = Focus::Ledger;
            self.cursor_expense = index;
            if secondary {
                self.estimator.open_menu(SelectionKind::Expenses, month, pos);
                self.menu_cursor = 0;
            } else {
                self.estimator.press_expense(month, id, toggle);
            }
        }
    }

    /// Le pointeur entre dans une case ou une ligne, bouton enfoncé
    pub fn pointer_drag(&mut self, pos: Position) {
        let Some(month) = self.current_key() else {
            return;
        };
        let layout = self.layout();
        if let Some(cell) = layout.cell_index_at(pos).and_then(|i| self.cells().get(i).copied()) {
            self.estimator.enter_cell(month, cell.key);
            return;
        }
        let state = self.current_state();
        if let Some(expense) = layout
            .expense_index_at(pos, self.ledger_scroll)
            .and_then(|i| state.expenses.get(i))
        {
            self.estimator.enter_expense(month, expense.id);
        }
    }

    pub fn pointer_up(&mut self) {
        self.estimator.release();
    }

    // ========================================================================
    // Confirmations
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    pub fn request_delete(&mut self) {
        self.confirm_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub fn is_awaiting_delete_confirmation(&self) -> bool {
        self.confirm_delete
    }

    // ========================================================================
    // Input Mode Management
    // ========================================================================

    pub fn start_input(&mut self, prompt: &str, target: InputTarget) {
        self.start_input_with(prompt.to_string(), target, String::new());
    }

    fn start_input_with(&mut self, prompt: String, target: InputTarget, initial: String) {
        self.current_screen = Screen::InputMode;
        self.input_buffer = initial;
        self.input_prompt = prompt;
        self.input_target = Some(target);
    }

    pub fn cancel_input(&mut self) {
        self.current_screen = Screen::Dashboard;
        self.input_buffer.clear();
        self.input_prompt.clear();
        self.input_target = None;
    }

    /// Valide la saisie et l'applique à sa cible
    pub fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input_buffer);
        let target = self.input_target.take();
        self.current_screen = Screen::Dashboard;
        self.input_prompt.clear();
        if let Some(target) = target {
            self.apply_input(target, &text);
        }
    }

    fn apply_input(&mut self, target: InputTarget, text: &str) {
        debug!(?target, input = text, "Applying input");
        match target {
            InputTarget::DayValue(key) => {
                if !self.estimator.set_day_value(key, text.trim()) {
                    self.reject(text);
                }
            }
            InputTarget::ExpenseName { month, id } => {
                self.estimator.update_expense(month, id, ExpenseField::Name(text.to_string()));
            }
            InputTarget::ExpenseValue { month, id } => match parse_amount(text) {
                Some(value) => {
                    self.estimator.update_expense(month, id, ExpenseField::Value(value));
                }
                None => self.reject(text),
            },
            InputTarget::CellsExpense { month } => {
                self.estimator.create_expense_from_selected_cells(month, text);
                self.clamp_cursors();
            }
            InputTarget::BulkValue => match parse_amount(text) {
                Some(value) => self.estimator.apply_bulk_value(value),
                None => self.reject(text),
            },
            InputTarget::ResultName { month } => {
                if self.estimator.add_derived_result(month, text).is_none() {
                    self.status_message = Some("sin gastos seleccionados".to_string());
                }
            }
            InputTarget::CalcName { month, id } => {
                self.estimator.update_calc(month, id, CalcField::Name(text.to_string()));
            }
            InputTarget::AccountName(id) => self.estimator.rename_account(id, text),
            InputTarget::AccountBalance(id) => match parse_amount(text) {
                Some(value) => self.estimator.set_account_balance(id, value),
                None => self.reject(text),
            },
        }
    }

    fn reject(&mut self, text: &str) {
        warn!(input = text, "Rejected input");
        self.status_message = Some(format!("valor invalido: {text:?}"));
    }

    pub fn append_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_input_mode(&self) -> bool {
        self.current_screen == Screen::InputMode
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
