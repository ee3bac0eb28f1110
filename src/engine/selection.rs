// ============================================================================
// SelectionController : sélection multiple des cases et des lignes
// ============================================================================
// Deux domaines indépendants :
// - cases du calendrier : un seul ensemble global (la clé contient le mois)
// - lignes du registre : un ensemble par mois
//
// Trois modes d'interaction par domaine :
// - clic simple : remplace la sélection par la cible
// - clic avec modificateur : bascule la cible (ajout / retrait)
// - glisser : chaque élément survolé est ajouté (jamais retiré)
//
// CONCEPT RUST : Enum pour state machine
// - DragState::Idle -> Cells/Expenses à l'appui
// - retour à Idle au relâchement, n'importe où
// - le glisser est limité au mois (et au domaine) où il a commencé
// ============================================================================

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{CellKey, ExpenseId, MonthKey};

// ============================================================================
// SelectionSet : ensemble ordonné par ordre d'ajout
// ============================================================================

/// Ensemble qui conserve l'ordre d'ajout (utile pour "première/deuxième
/// ligne sélectionnée") ; l'égalité ignore l'ordre
#[derive(Debug, Clone)]
pub struct SelectionSet<K> {
    items: Vec<K>,
}

impl<K: PartialEq + Copy> SelectionSet<K> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.items.contains(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.items
    }

    /// Ajoute si absent
    pub fn insert(&mut self, key: K) {
        if !self.contains(&key) {
            self.items.push(key);
        }
    }

    /// Retire si présent, ajoute sinon
    pub fn toggle(&mut self, key: K) {
        if self.contains(&key) {
            self.items.retain(|k| *k != key);
        } else {
            self.items.push(key);
        }
    }

    /// Remplace tout par un seul élément
    pub fn replace(&mut self, key: K) {
        self.items.clear();
        self.items.push(key);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn retain<F: FnMut(&K) -> bool>(&mut self, f: F) {
        self.items.retain(f);
    }
}

impl<K: PartialEq + Copy> Default for SelectionSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq + Copy> PartialEq for SelectionSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.items.iter().all(|k| other.contains(k))
    }
}

impl<K: PartialEq + Copy> FromIterator<K> for SelectionSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

// ============================================================================
// Drag et menu contextuel
// ============================================================================

/// Domaine d'une sélection (et type de menu contextuel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Cells,
    Expenses,
}

/// État du glisser en cours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Glisser sur la grille du mois `month`
    Cells { month: MonthKey },
    /// Glisser sur les lignes du mois `month`
    Expenses { month: MonthKey },
}

/// Position du pointeur (colonne, ligne du terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Décalage du menu par rapport au curseur
pub const MENU_OFFSET: u16 = 1;
/// Taille du menu contextuel (colonnes, lignes)
pub const MENU_WIDTH: u16 = 46;
pub const MENU_HEIGHT: u16 = 10;

/// Menu ouvert par un clic secondaire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextMenu {
    pub kind: SelectionKind,
    pub month: MonthKey,
    /// Coin supérieur gauche du menu
    pub origin: Position,
    pub width: u16,
    pub height: u16,
}

impl ContextMenu {
    pub fn new(kind: SelectionKind, month: MonthKey, cursor: Position) -> Self {
        Self {
            kind,
            month,
            origin: Position::new(
                cursor.x.saturating_add(MENU_OFFSET),
                cursor.y.saturating_add(MENU_OFFSET),
            ),
            width: MENU_WIDTH,
            height: MENU_HEIGHT,
        }
    }

    /// Vrai si `pos` tombe dans les bornes du menu
    pub fn contains(&self, pos: Position) -> bool {
        let right = u32::from(self.origin.x) + u32::from(self.width);
        let bottom = u32::from(self.origin.y) + u32::from(self.height);
        pos.x >= self.origin.x
            && u32::from(pos.x) < right
            && pos.y >= self.origin.y
            && u32::from(pos.y) < bottom
    }
}

// ============================================================================
// SelectionController
// ============================================================================

/// État transitoire de sélection, jamais persisté avec le registre
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    cells: SelectionSet<CellKey>,
    expenses: BTreeMap<MonthKey, SelectionSet<ExpenseId>>,
    drag: DragState,
    menu: Option<ContextMenu>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Lecture
    // ------------------------------------------------------------------------

    pub fn selected_cells(&self) -> &SelectionSet<CellKey> {
        &self.cells
    }

    pub fn is_cell_selected(&self, key: CellKey) -> bool {
        self.cells.contains(&key)
    }

    /// Lignes sélectionnées du mois, dans l'ordre de sélection
    pub fn selected_expenses(&self, month: MonthKey) -> &[ExpenseId] {
        self.expenses
            .get(&month)
            .map(SelectionSet::as_slice)
            .unwrap_or_default()
    }

    pub fn is_expense_selected(&self, month: MonthKey, id: ExpenseId) -> bool {
        self.expenses.get(&month).is_some_and(|s| s.contains(&id))
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != DragState::Idle
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    // ------------------------------------------------------------------------
    // Cases
    // ------------------------------------------------------------------------

    /// Appui sur une case affichée dans la grille de `grid_month`
    ///
    /// `toggle` : modificateur (Ctrl) maintenu
    pub fn press_cell(&mut self, grid_month: MonthKey, key: CellKey, toggle: bool) {
        self.drag = DragState::Cells { month: grid_month };
        if toggle {
            self.cells.toggle(key);
        } else {
            self.cells.replace(key);
        }
        debug!(cell = %key, toggle, selected = self.cells.len(), "Cell pressed");
    }

    /// Le pointeur entre dans une case ; étend le glisser du même mois
    pub fn enter_cell(&mut self, grid_month: MonthKey, key: CellKey) {
        if self.drag == (DragState::Cells { month: grid_month }) {
            self.cells.insert(key);
            debug!(cell = %key, selected = self.cells.len(), "Cell drag extended");
        }
    }

    // ------------------------------------------------------------------------
    // Lignes du registre
    // ------------------------------------------------------------------------

    pub fn press_expense(&mut self, month: MonthKey, id: ExpenseId, toggle: bool) {
        self.drag = DragState::Expenses { month };
        let set = self.expenses.entry(month).or_default();
        if toggle {
            set.toggle(id);
        } else {
            set.replace(id);
        }
        debug!(month = %month, expense = %id, toggle, selected = set.len(), "Expense pressed");
    }

    pub fn enter_expense(&mut self, month: MonthKey, id: ExpenseId) {
        if self.drag == (DragState::Expenses { month }) {
            let set = self.expenses.entry(month).or_default();
            set.insert(id);
            debug!(month = %month, expense = %id, selected = set.len(), "Expense drag extended");
        }
    }

    /// Vide la sélection de lignes d'un mois
    pub fn clear_expenses(&mut self, month: MonthKey) {
        if let Some(set) = self.expenses.get_mut(&month) {
            set.clear();
        }
    }

    /// Retire des ids supprimés de la sélection du mois
    pub fn forget_expenses(&mut self, month: MonthKey, ids: &[ExpenseId]) {
        if let Some(set) = self.expenses.get_mut(&month) {
            set.retain(|id| !ids.contains(id));
        }
    }

    // ------------------------------------------------------------------------
    // Relâchement et menu
    // ------------------------------------------------------------------------

    /// Relâchement n'importe où dans le document
    pub fn release(&mut self) {
        if self.is_dragging() {
            debug!(drag = ?self.drag, "Drag released");
        }
        self.drag = DragState::Idle;
    }

    /// Ouvre le menu contextuel sans toucher à la sélection
    pub fn open_menu(&mut self, kind: SelectionKind, month: MonthKey, cursor: Position) {
        debug!(?kind, month = %month, x = cursor.x, y = cursor.y, "Context menu opened");
        self.menu = Some(ContextMenu::new(kind, month, cursor));
    }

    pub fn close_menu(&mut self) {
        if self.menu.take().is_some() {
            debug!("Context menu closed");
        }
    }

    /// Appui (primaire ou secondaire) vu au niveau du document, avant la
    /// cible : ferme le menu si l'appui tombe hors de ses bornes.
    ///
    /// Retourne true si l'appui est dans le menu ouvert.
    pub fn pointer_down_at(&mut self, pos: Position) -> bool {
        match self.menu {
            Some(menu) if menu.contains(pos) => true,
            Some(_) => {
                self.close_menu();
                false
            }
            None => false,
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn may() -> MonthKey {
        MonthKey::new(2024, 4).unwrap()
    }

    fn june() -> MonthKey {
        MonthKey::new(2024, 5).unwrap()
    }

    #[test]
    fn test_single_select_replaces() {
        let mut sel = SelectionController::new();
        sel.press_cell(may(), may().day(1), false);
        sel.release();
        sel.press_cell(may(), may().day(2), false);

        let expected: SelectionSet<CellKey> = [may().day(2)].into_iter().collect();
        assert_eq!(*sel.selected_cells(), expected);
    }

    #[test]
    fn test_toggle_twice_is_identity() {
        let mut sel = SelectionController::new();
        sel.press_cell(may(), may().day(1), false);
        sel.press_cell(may(), may().day(5), true);
        sel.release();
        let before = sel.selected_cells().clone();

        for key in [may().day(9), may().day(5)] {
            sel.press_cell(may(), key, true);
            sel.release();
            sel.press_cell(may(), key, true);
            sel.release();
            assert_eq!(*sel.selected_cells(), before);
        }
    }

    #[test]
    fn test_drag_extension_is_logged() {
        let mut sel = SelectionController::new();
        let june_id = ExpenseId::new();
        let logs = crate::log_capture::capture(|| {
            sel.press_cell(may(), may().day(1), false);
            sel.enter_cell(may(), may().day(2));
            sel.enter_cell(june(), june().day(2));
            sel.release();

            sel.press_expense(june(), june_id, false);
            sel.enter_expense(june(), ExpenseId::new());
        });
        assert_eq!(logs.count("Cell drag extended"), 1);
        assert_eq!(logs.count("Expense drag extended"), 1);
    }

    #[test]
    fn test_drag_extends_then_plain_press_resets() {
        let mut sel = SelectionController::new();
        let (a, b, c, d) = (may().day(1), may().day(2), may().day(3), may().day(10));

        sel.press_cell(may(), a, false);
        sel.enter_cell(may(), b);
        sel.enter_cell(may(), c);
        sel.enter_cell(may(), b);
        let expected: SelectionSet<CellKey> = [a, b, c].into_iter().collect();
        assert_eq!(*sel.selected_cells(), expected);

        sel.release();
        sel.enter_cell(may(), may().day(20));
        assert_eq!(sel.selected_cells().len(), 3);

        sel.press_cell(may(), d, false);
        let expected: SelectionSet<CellKey> = [d].into_iter().collect();
        assert_eq!(*sel.selected_cells(), expected);
    }

    #[test]
    fn test_drag_does_not_cross_months() {
        let mut sel = SelectionController::new();
        sel.press_cell(may(), may().day(30), false);
        sel.enter_cell(june(), june().day(1));
        assert_eq!(sel.selected_cells().len(), 1);

        // une case empruntée au mois voisin, dans la même grille, s'ajoute
        sel.enter_cell(may(), june().day(1));
        assert_eq!(sel.selected_cells().len(), 2);
    }

    #[test]
    fn test_expense_selection_is_per_month() {
        let mut sel = SelectionController::new();
        let (x, y, z) = (ExpenseId::new(), ExpenseId::new(), ExpenseId::new());

        sel.press_expense(may(), x, false);
        sel.enter_expense(may(), y);
        sel.enter_expense(june(), z);
        sel.release();

        assert_eq!(sel.selected_expenses(may()), &[x, y]);
        assert!(sel.selected_expenses(june()).is_empty());

        sel.press_expense(june(), z, false);
        assert_eq!(sel.selected_expenses(may()), &[x, y]);
        assert_eq!(sel.selected_expenses(june()), &[z]);
    }

    #[test]
    fn test_cell_drag_does_not_extend_expenses() {
        let mut sel = SelectionController::new();
        let id = ExpenseId::new();
        sel.press_cell(may(), may().day(1), false);
        sel.enter_expense(may(), id);
        assert!(sel.selected_expenses(may()).is_empty());
    }

    #[test]
    fn test_expense_toggle_and_forget() {
        let mut sel = SelectionController::new();
        let (x, y) = (ExpenseId::new(), ExpenseId::new());
        sel.press_expense(may(), x, true);
        sel.press_expense(may(), y, true);
        sel.press_expense(may(), x, true);
        assert_eq!(sel.selected_expenses(may()), &[y]);

        sel.forget_expenses(may(), &[y]);
        assert!(sel.selected_expenses(may()).is_empty());
    }

    #[test]
    fn test_menu_keeps_selection_and_closes_outside() {
        let mut sel = SelectionController::new();
        sel.press_cell(may(), may().day(1), false);
        sel.release();

        sel.open_menu(SelectionKind::Cells, may(), Position::new(10, 5));
        assert_eq!(sel.selected_cells().len(), 1);
        let menu = *sel.menu().unwrap();
        assert_eq!(menu.origin, Position::new(11, 6));

        assert!(sel.pointer_down_at(Position::new(12, 7)));
        assert!(sel.menu().is_some());

        assert!(!sel.pointer_down_at(Position::new(0, 0)));
        assert!(sel.menu().is_none());
    }

    #[test]
    fn test_release_returns_to_idle() {
        let mut sel = SelectionController::new();
        sel.press_expense(may(), ExpenseId::new(), false);
        assert_eq!(sel.drag(), DragState::Expenses { month: may() });
        sel.release();
        assert_eq!(sel.drag(), DragState::Idle);
    }
}
