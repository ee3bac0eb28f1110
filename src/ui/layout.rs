// ============================================================================
// Géométrie de l'écran
// ============================================================================
// Une seule source pour les zones : le rendu dessine dedans, et les clics
// souris sont résolus avec les mêmes rectangles.
//
// CONCEPT RATATUI : Layout sans Frame
// - Layout::split() ne dépend que d'un Rect
// - on peut donc recalculer les zones hors du draw() pour le hit-testing
// ============================================================================

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::engine::{ContextMenu, Position};
use crate::models::GRID_COLUMNS;

/// Largeur d'une case de la grille (colonnes terminal)
pub const CELL_WIDTH: u16 = 10;
/// Hauteur d'une case : numéro du jour + valeur
pub const CELL_HEIGHT: u16 = 2;
/// En-tête : bordures + total, taux, comptes
pub const HEADER_HEIGHT: u16 = 5;
pub const FOOTER_HEIGHT: u16 = 3;
/// Grille : 7 colonnes + bordures
pub const GRID_WIDTH: u16 = GRID_COLUMNS as u16 * CELL_WIDTH + 2;
/// Bloc résumé du mois
pub const SUMMARY_HEIGHT: u16 = 11;
/// Lignes du menu avant la première action (bordure + ligne d'info)
pub const MENU_ITEMS_TOP: u16 = 2;

/// Zones de l'écran principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub area: Rect,
    pub header: Rect,
    pub grid: Rect,
    pub ledger: Rect,
    pub results: Rect,
    pub summary: Rect,
    pub footer: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(GRID_WIDTH), Constraint::Min(0)])
            .split(rows[1]);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),
                Constraint::Length(7),
                Constraint::Length(SUMMARY_HEIGHT),
            ])
            .split(body[1]);

        Self {
            area,
            header: rows[0],
            grid: body[0],
            ledger: side[0],
            results: side[1],
            summary: side[2],
            footer: rows[2],
        }
    }

    // ========================================================================
    // Grille
    // ========================================================================

    /// Zone des cases (sous la ligne des jours de la semaine)
    fn cells_area(&self) -> Rect {
        let inner = inset(self.grid);
        Rect {
            y: inner.y + 1,
            height: inner.height.saturating_sub(1),
            ..inner
        }
    }

    /// Ligne des jours de la semaine
    pub fn weekday_row(&self) -> Rect {
        let inner = inset(self.grid);
        Rect { height: inner.height.min(1), ..inner }
    }

    /// Rectangle de la case d'indice `index` (ordre ligne par ligne)
    pub fn cell_rect(&self, index: usize) -> Rect {
        let cells = self.cells_area();
        let col = (index % GRID_COLUMNS) as u16;
        let row = (index / GRID_COLUMNS) as u16;
        let rect = Rect {
            x: cells.x + col * CELL_WIDTH,
            y: cells.y + row * CELL_HEIGHT,
            width: CELL_WIDTH,
            height: CELL_HEIGHT,
        };
        rect.intersection(cells)
    }

    /// Indice de la case sous le pointeur
    pub fn cell_index_at(&self, pos: Position) -> Option<usize> {
        let cells = self.cells_area();
        if !contains(cells, pos) {
            return None;
        }
        let col = ((pos.x - cells.x) / CELL_WIDTH) as usize;
        let row = ((pos.y - cells.y) / CELL_HEIGHT) as usize;
        (col < GRID_COLUMNS).then_some(row * GRID_COLUMNS + col)
    }

    // ========================================================================
    // Registre
    // ========================================================================

    /// Lignes de dépenses visibles (sous l'en-tête de colonnes)
    fn ledger_rows(&self) -> Rect {
        let inner = inset(self.ledger);
        Rect {
            y: inner.y + 1,
            height: inner.height.saturating_sub(1),
            ..inner
        }
    }

    pub fn ledger_header_row(&self) -> Rect {
        let inner = inset(self.ledger);
        Rect { height: inner.height.min(1), ..inner }
    }

    /// Nombre de lignes de dépenses affichables
    pub fn ledger_capacity(&self) -> usize {
        self.ledger_rows().height as usize
    }

    /// Rectangle de la ligne `index`, compte tenu du défilement
    pub fn expense_row_rect(&self, index: usize, scroll: usize) -> Option<Rect> {
        let rows = self.ledger_rows();
        let visible = index.checked_sub(scroll)?;
        if visible >= rows.height as usize {
            return None;
        }
        Some(Rect {
            y: rows.y + visible as u16,
            height: 1,
            ..rows
        })
    }

    /// Indice de la ligne sous le pointeur
    pub fn expense_index_at(&self, pos: Position, scroll: usize) -> Option<usize> {
        let rows = self.ledger_rows();
        contains(rows, pos).then(|| scroll + (pos.y - rows.y) as usize)
    }

    // ========================================================================
    // Menu contextuel
    // ========================================================================

    /// Rectangle du menu, rogné à l'écran
    pub fn menu_rect(&self, menu: &ContextMenu) -> Rect {
        Rect {
            x: menu.origin.x,
            y: menu.origin.y,
            width: menu.width,
            height: menu.height,
        }
        .intersection(self.area)
    }

    /// Indice de l'action du menu sous le pointeur
    pub fn menu_item_at(&self, menu: &ContextMenu, pos: Position) -> Option<usize> {
        if !menu.contains(pos) {
            return None;
        }
        let top = menu.origin.y + MENU_ITEMS_TOP;
        (pos.y >= top).then(|| (pos.y - top) as usize)
    }
}

/// Intérieur d'un Block avec bordures
pub fn inset(rect: Rect) -> Rect {
    Rect {
        x: rect.x.saturating_add(1),
        y: rect.y.saturating_add(1),
        width: rect.width.saturating_sub(2),
        height: rect.height.saturating_sub(2),
    }
}

fn contains(rect: Rect, pos: Position) -> bool {
    pos.x >= rect.x
        && pos.x < rect.x.saturating_add(rect.width)
        && pos.y >= rect.y
        && pos.y < rect.y.saturating_add(rect.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SelectionKind;
    use crate::models::MonthKey;

    fn layout() -> ScreenLayout {
        ScreenLayout::new(Rect::new(0, 0, 140, 40))
    }

    #[test]
    fn test_cell_hit_testing_matches_rects() {
        let layout = layout();
        for index in [0, 6, 7, 20, 34] {
            let rect = layout.cell_rect(index);
            let pos = Position::new(rect.x + 1, rect.y + 1);
            assert_eq!(layout.cell_index_at(pos), Some(index));
        }
        // Bordure et ligne des jours : hors cases
        assert_eq!(layout.cell_index_at(Position::new(0, layout.grid.y)), None);
        let weekday = layout.weekday_row();
        assert_eq!(layout.cell_index_at(Position::new(weekday.x + 2, weekday.y)), None);
    }

    #[test]
    fn test_expense_rows_with_scroll() {
        let layout = layout();
        let rect = layout.expense_row_rect(3, 2).unwrap();
        assert_eq!(layout.expense_index_at(Position::new(rect.x, rect.y), 2), Some(3));
        assert!(layout.expense_row_rect(1, 2).is_none());
    }

    #[test]
    fn test_menu_items() {
        let layout = layout();
        let month = MonthKey::new(2024, 4).unwrap();
        let menu = ContextMenu::new(SelectionKind::Cells, month, Position::new(10, 10));
        let first = Position::new(menu.origin.x + 2, menu.origin.y + MENU_ITEMS_TOP);

        assert_eq!(layout.menu_item_at(&menu, first), Some(0));
        assert_eq!(layout.menu_item_at(&menu, Position::new(first.x, first.y + 2)), Some(2));
        assert_eq!(layout.menu_item_at(&menu, Position::new(0, 0)), None);
    }
}
