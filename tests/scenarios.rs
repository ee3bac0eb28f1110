// ============================================================================
// Tests d'intégration : scénarios de bout en bout sur la bibliothèque
// ============================================================================

use chrono::NaiveDate;

use estimativos::api::RateStatus;
use estimativos::engine::{Estimator, Position, SelectionKind, UsdFigure};
use estimativos::models::{
    build_month_cells, generate_months, Account, AccountBook, CalcField, CalcMode, CellKey,
    ExpenseField, Mode, MonthKey,
};

fn cell(text: &str) -> CellKey {
    text.parse().unwrap()
}

fn month(text: &str) -> MonthKey {
    text.parse().unwrap()
}

fn estimator(mode: CalcMode) -> Estimator {
    Estimator::starting(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(), 18, mode)
}

#[test]
fn selected_cell_sum_ignores_blank_cells() {
    let mut est = estimator(CalcMode::Aggregate);
    let may = month("2024-05");

    assert!(est.set_day_value(cell("2024-05-01"), "100"));
    assert!(est.set_day_value(cell("2024-05-02"), "-30"));
    assert!(est.set_day_value(cell("2024-05-03"), ""));

    est.press_cell(may, cell("2024-05-01"), false);
    est.press_cell(may, cell("2024-05-02"), true);
    est.release();

    assert_eq!(est.projection().selected_cell_sum(may), 70.0);

    // Une case d'un autre mois sélectionnée ne compte pas pour mai
    est.set_day_value(cell("2024-06-01"), "5");
    est.press_cell(month("2024-06"), cell("2024-06-01"), true);
    assert_eq!(est.projection().selected_cell_sum(may), 70.0);
}

#[test]
fn account_total_without_rate_is_unavailable_in_usd() {
    let accounts = AccountBook::new(vec![
        Account::new("Cuenta 1", 1000.0),
        Account::new("Cuenta 2", 500.0),
    ]);
    let months = generate_months(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 18);
    let mut est = Estimator::new(months, CalcMode::Aggregate, accounts);

    assert_eq!(est.projection().account_total(), 1500.0);
    assert_eq!(est.projection().account_total_usd(), UsdFigure::Unavailable);
    assert_eq!(est.projection().account_total_usd().to_string(), "USD -");

    est.commit_rate(RateStatus::from_outcome(Ok(40.0)));
    assert_eq!(est.projection().account_total_usd(), UsdFigure::Available(37.5));
}

#[test]
fn month_net_is_signed_sum_of_expenses() {
    let mut est = estimator(CalcMode::Aggregate);
    let may = month("2024-05");

    let rent = est.month_state(may).expenses[0].id;
    est.update_expense(may, rent, ExpenseField::Value(200.0));
    let state = est.add_expense(may);
    let bonus = state.expenses[1].id;
    est.update_expense(may, bonus, ExpenseField::Value(50.0));
    est.update_expense(may, bonus, ExpenseField::Mode(Mode::Plus));

    assert_eq!(est.projection().month_net(may), -150.0);
}

#[test]
fn drag_extends_until_release() {
    let mut est = estimator(CalcMode::Aggregate);
    let may = month("2024-05");
    let (a, b, c, d) = (may.day(6), may.day(7), may.day(8), may.day(20));

    est.press_cell(may, a, false);
    est.enter_cell(may, b);
    est.enter_cell(may, c);
    let selected = est.selection().selected_cells();
    assert_eq!(selected.len(), 3);
    assert!([a, b, c].iter().all(|k| selected.contains(k)));

    est.release();
    est.press_cell(may, d, false);
    let selected = est.selection().selected_cells();
    assert_eq!(selected.len(), 1);
    assert!(selected.contains(&d));

    // Entrer dans une case hors glisser n'étend rien
    est.release();
    est.enter_cell(may, a);
    assert_eq!(est.selection().selected_cells().len(), 1);
}

#[test]
fn drag_does_not_cross_months() {
    let mut est = estimator(CalcMode::Aggregate);
    let may = month("2024-05");
    let june = month("2024-06");

    est.press_cell(may, may.day(30), false);
    est.enter_cell(june, june.day(3));
    est.enter_cell(may, may.day(31));

    let selected = est.selection().selected_cells();
    assert_eq!(selected.len(), 2);
    assert!(!selected.contains(&june.day(3)));
}

#[test]
fn toggle_twice_restores_selection() {
    let mut est = estimator(CalcMode::Aggregate);
    let may = month("2024-05");
    est.press_cell(may, may.day(1), false);
    est.press_cell(may, may.day(2), true);
    est.release();
    let before = est.selection().selected_cells().clone();

    est.press_cell(may, may.day(9), true);
    est.press_cell(may, may.day(9), true);
    est.release();

    assert_eq!(est.selection().selected_cells(), &before);
}

#[test]
fn secondary_press_keeps_selection_and_outside_press_closes_menu() {
    let mut est = estimator(CalcMode::Aggregate);
    let may = month("2024-05");
    est.press_cell(may, may.day(3), false);
    est.release();

    est.open_menu(SelectionKind::Cells, may, Position::new(20, 10));
    assert!(est.selection().menu().is_some());
    assert_eq!(est.selection().selected_cells().len(), 1);

    assert!(est.pointer_down_at(Position::new(25, 12)));
    assert!(est.selection().menu().is_some());

    assert!(!est.pointer_down_at(Position::new(0, 0)));
    assert!(est.selection().menu().is_none());
}

#[test]
fn cumulative_savings_is_running_sum_of_nets() {
    let mut est = estimator(CalcMode::Aggregate);
    let keys: Vec<MonthKey> = est.months().iter().map(|m| m.key).collect();

    for (i, key) in keys.iter().enumerate().step_by(3) {
        let id = est.month_state(*key).expenses[0].id;
        est.update_expense(*key, id, ExpenseField::Value(10.0 * (i as f64 + 1.0)));
        if i % 2 == 0 {
            est.update_expense(*key, id, ExpenseField::Mode(Mode::Plus));
        }
    }

    let projection = est.projection();
    let cumulative = projection.cumulative_savings();
    assert_eq!(cumulative.len(), 18);
    assert_eq!(cumulative[0], projection.month_net(keys[0]));
    for i in 1..keys.len() {
        assert_eq!(cumulative[i], cumulative[i - 1] + projection.month_net(keys[i]));
    }

    let summaries = projection.month_summaries();
    assert_eq!(summaries[0].previous_saving, 0.0);
    assert_eq!(summaries[5].previous_saving, cumulative[4]);
}

#[test]
fn removed_reference_contributes_zero() {
    let mut est = estimator(CalcMode::Binary);
    let may = month("2024-05");
    let salary = est.month_state(may).expenses[0].id;
    est.update_expense(may, salary, ExpenseField::Value(900.0));
    let rent = est.add_expense(may).expenses[1].id;
    est.update_expense(may, rent, ExpenseField::Value(300.0));

    est.press_expense(may, salary, false);
    est.press_expense(may, rent, true);
    est.release();
    let calc = est.add_derived_result(may, "").unwrap();
    est.update_calc(may, calc, CalcField::Op(Mode::Minus));
    assert_eq!(est.projection().result_total(may), 600.0);

    est.remove_expenses(may, &[rent]);
    assert_eq!(est.projection().result_total(may), 900.0);

    est.remove_expenses(may, &[salary]);
    assert_eq!(est.projection().result_total(may), 0.0);
    assert!(est.month_state(may).result(calc).is_some());
}

#[test]
fn month_window_wraps_years() {
    let months = generate_months(NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(), 18);
    assert_eq!(months.len(), 18);
    assert_eq!(months[0].key, month("2024-11"));
    assert_eq!(months[2].key, month("2025-01"));
    assert_eq!(months[17].key, month("2026-04"));
    for pair in months.windows(2) {
        assert_eq!(pair[0].key.next(), pair[1].key);
    }

    for descriptor in &months {
        let cells = build_month_cells(descriptor.key);
        assert_eq!(cells.len() % 7, 0);
        let days: Vec<u32> = cells.iter().filter(|c| c.in_month).map(|c| c.date_number).collect();
        assert_eq!(days, (1..=descriptor.key.days_in_month()).collect::<Vec<_>>());
    }
}
