// ============================================================================
// Grille calendaire : CalendarCell
// ============================================================================
// Construit la grille à 7 colonnes d'un mois, semaine commençant le lundi,
// complétée par les derniers jours du mois précédent et les premiers jours
// du mois suivant.
// ============================================================================

use chrono::Datelike;

use crate::models::month::{CellKey, MonthKey};

/// Une case de la grille
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub key: CellKey,
    pub date_number: u32,
    /// false pour les jours empruntés aux mois voisins
    pub in_month: bool,
}

/// Nombre de colonnes de la grille
pub const GRID_COLUMNS: usize = 7;

/// Construit la grille du mois `month`
///
/// Algorithme :
/// 1. lead = jour de la semaine du 1er, indexé depuis lundi
/// 2. `lead` jours de fin du mois précédent
/// 3. jours 1..=N du mois
/// 4. jours 1, 2, ... du mois suivant jusqu'au prochain multiple de 7
pub fn build_month_cells(month: MonthKey) -> Vec<CalendarCell> {
    let lead = month
        .first_day()
        .map_or(0, |d| d.weekday().num_days_from_monday());
    let days = month.days_in_month();

    let prev = month.previous();
    let prev_days = prev.days_in_month();

    let mut cells: Vec<CalendarCell> = (0..lead)
        .rev()
        .map(|offset| {
            let day = prev_days - offset;
            CalendarCell { key: prev.day(day), date_number: day, in_month: false }
        })
        .collect();

    cells.extend((1..=days).map(|day| CalendarCell {
        key: month.day(day),
        date_number: day,
        in_month: true,
    }));

    let needed = cells.len().div_ceil(GRID_COLUMNS) * GRID_COLUMNS;
    let next = month.next();
    let trailing = (needed - cells.len()) as u32;
    cells.extend((1..=trailing).map(|day| CalendarCell {
        key: next.day(day),
        date_number: day,
        in_month: false,
    }));

    cells
}

/// Nombre de semaines (lignes) de la grille
pub fn week_count(cells: &[CalendarCell]) -> usize {
    cells.len() / GRID_COLUMNS
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(year: i32, index: u32) -> MonthKey {
        MonthKey::new(year, index).unwrap()
    }

    #[test]
    fn test_grid_is_multiple_of_seven_for_many_months() {
        let mut month = key(1999, 0);
        for _ in 0..(12 * 30) {
            let cells = build_month_cells(month);
            assert_eq!(cells.len() % GRID_COLUMNS, 0, "{month}");
            assert!(cells.len() >= month.days_in_month() as usize);

            let in_month: Vec<u32> = cells
                .iter()
                .filter(|c| c.in_month)
                .map(|c| c.date_number)
                .collect();
            let expected: Vec<u32> = (1..=month.days_in_month()).collect();
            assert_eq!(in_month, expected, "{month}");

            month = month.next();
        }
    }

    #[test]
    fn test_may_2024_starts_on_wednesday() {
        // 1er mai 2024 : mercredi -> 2 jours d'avril en tête
        let cells = build_month_cells(key(2024, 4));
        assert_eq!(cells[0].key.to_string(), "2024-04-29");
        assert_eq!(cells[1].key.to_string(), "2024-04-30");
        assert!(!cells[0].in_month);
        assert_eq!(cells[2].key.to_string(), "2024-05-01");
        assert!(cells[2].in_month);

        // 2 + 31 = 33 -> 35 : deux jours de juin
        assert_eq!(cells.len(), 35);
        assert_eq!(cells[33].key.to_string(), "2024-06-01");
        assert_eq!(cells[34].date_number, 2);
        assert_eq!(week_count(&cells), 5);
    }

    #[test]
    fn test_january_borrows_from_previous_december() {
        // 1er janvier 2025 : mercredi
        let cells = build_month_cells(key(2025, 0));
        assert_eq!(cells[0].key.to_string(), "2024-12-30");
        assert_eq!(cells[1].key.to_string(), "2024-12-31");
    }

    #[test]
    fn test_december_borrows_from_next_january() {
        let cells = build_month_cells(key(2024, 11));
        let last = cells.last().unwrap();
        assert!(!last.in_month);
        assert_eq!(last.key.month(), key(2025, 0));
    }

    #[test]
    fn test_month_starting_on_monday_has_no_lead() {
        // 1er avril 2024 : lundi
        let cells = build_month_cells(key(2024, 3));
        assert!(cells[0].in_month);
        assert_eq!(cells[0].date_number, 1);
    }

    #[test]
    fn test_february_exactly_four_weeks() {
        // février 2021 : commence un lundi, 28 jours
        let cells = build_month_cells(key(2021, 1));
        assert_eq!(cells.len(), 28);
        assert!(cells.iter().all(|c| c.in_month));
    }
}
