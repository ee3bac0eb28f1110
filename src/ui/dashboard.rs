// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// En-tête (comptes, taux), grille du mois, registre, résultats, résumé,
// footer, et le menu contextuel par-dessus.
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Widgets : Block, Paragraph, Clear
// 3. Les zones viennent de ScreenLayout, partagé avec le hit-testing
// ============================================================================

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::api::RateStatus;
use crate::app::{App, Focus, MenuAction};
use crate::engine::{ContextMenu, ProjectionEngine, SelectionKind, UsdFigure};
use crate::models::{CalcMode, DerivedResult, ExpenseId, Mode, MonthState, WEEK_DAYS};
use crate::ui::layout::{ScreenLayout, CELL_WIDTH};

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &App) {
    let layout = ScreenLayout::new(frame.size());
    let projection = app.estimator.projection();
    let state = app.current_state();

    render_header(frame, app, &projection, layout.header);
    render_grid(frame, app, &layout);
    render_ledger(frame, app, &state, &layout);
    render_results(frame, app, &state, layout.results);
    render_summary(frame, app, &projection, layout.summary);

    if app.is_in_input_mode() {
        render_input_footer(frame, app, layout.footer);
    } else {
        render_footer(frame, app, layout.footer);
    }

    if let Some(menu) = app.estimator.selection().menu() {
        render_menu(frame, app, &projection, &layout, menu);
    }
}

fn focus_border(app: &App, focus: Focus) -> Style {
    if app.focus == focus && !app.is_menu_open() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn money(uyu: f64, usd: UsdFigure) -> String {
    format!("UYU {uyu:.2} ({usd})")
}

fn fit(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

// ============================================================================
// Header : comptes et taux
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, projection: &ProjectionEngine, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_border(app, Focus::Accounts))
        .title(" Estimativos ")
        .title_alignment(Alignment::Center);

    let rate = app.estimator.rate();
    let rate_style = match rate {
        RateStatus::Loading => Style::default().fg(Color::Gray),
        RateStatus::Available { .. } => Style::default().fg(Color::Cyan),
        RateStatus::Unavailable { .. } => Style::default().fg(Color::Red),
    };

    let total = Line::from(vec![
        Span::styled(
            format!("Total cuentas: UYU {:.2}", projection.account_total()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            projection.account_total_usd().to_string(),
            Style::default().fg(Color::Green),
        ),
        Span::raw("   "),
        Span::styled(rate.label().to_string(), rate_style),
    ]);

    let mut accounts = Vec::new();
    for (index, account) in app.estimator.accounts().accounts().iter().enumerate() {
        let mut style = Style::default().fg(Color::White);
        if app.focus == Focus::Accounts && index == app.cursor_account {
            style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
        }
        accounts.push(Span::styled(
            format!(" {}: {:.2} ", account.name, account.balance_uyu),
            style,
        ));
        accounts.push(Span::raw("  "));
    }

    let mode = match app.estimator.calc_mode() {
        CalcMode::Aggregate => "modo: resultados agregados",
        CalcMode::Binary => "modo: calculos binarios",
    };

    let paragraph = Paragraph::new(vec![
        total,
        Line::from(accounts),
        Line::from(Span::styled(mode, Style::default().fg(Color::DarkGray))),
    ])
    .block(block);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Grille du mois
// ============================================================================

fn render_grid(frame: &mut Frame, app: &App, layout: &ScreenLayout) {
    let title = match app.current_descriptor() {
        Some(month) => format!(
            " {} ({}/{}) ",
            month.label,
            app.current_month + 1,
            app.estimator.months().len()
        ),
        None => " - ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_border(app, Focus::Grid))
        .title(title);
    frame.render_widget(block, layout.grid);

    let weekdays: Vec<Span> = WEEK_DAYS
        .iter()
        .map(|day| {
            Span::styled(
                format!(" {:<width$}", day, width = CELL_WIDTH as usize - 1),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(weekdays)), layout.weekday_row());

    let focused = app.focused_cell();
    let selection = app.estimator.selection();
    let values = app.estimator.day_values();

    for (index, cell) in app.cells().iter().enumerate() {
        let rect = layout.cell_rect(index);
        if rect.height == 0 || rect.width == 0 {
            continue;
        }

        let mut style = if cell.in_month {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if selection.is_cell_selected(cell.key) {
            style = style.bg(Color::Blue).add_modifier(Modifier::BOLD);
        }
        if app.focus == Focus::Grid && cell.in_month && Some(cell.key) == focused {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let value = fit(values.get(cell.key), CELL_WIDTH as usize - 2);
        let lines = vec![
            Line::from(format!(" {:>2}", cell.date_number)),
            Line::from(format!(" {value}")),
        ];
        frame.render_widget(Paragraph::new(lines).style(style), rect);
    }
}

// ============================================================================
// Registre
// ============================================================================

fn render_ledger(frame: &mut Frame, app: &App, state: &MonthState, layout: &ScreenLayout) {
    let Some(month) = app.current_key() else {
        return;
    };
    let selected = app.estimator.selection().selected_expenses(month);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_border(app, Focus::Ledger))
        .title(format!(" Gastos (seleccionados: {}) ", selected.len()));
    frame.render_widget(block, layout.ledger);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {:<3} {:<24} {:>12}", "+/-", "nombre", "valor"),
            Style::default().fg(Color::Yellow),
        ))),
        layout.ledger_header_row(),
    );

    for (index, expense) in state.expenses.iter().enumerate() {
        let Some(rect) = layout.expense_row_rect(index, app.ledger_scroll) else {
            continue;
        };

        let mut style = match expense.mode {
            Mode::Plus => Style::default().fg(Color::Green),
            Mode::Minus => Style::default().fg(Color::Red),
        };
        if selected.contains(&expense.id) {
            style = style.bg(Color::Blue).add_modifier(Modifier::BOLD);
        }
        if app.focus == Focus::Ledger && index == app.cursor_expense {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let line = format!(
            " {:^3} {:<24} {:>12.2}",
            expense.mode.symbol(),
            fit(&expense.name, 24),
            expense.value
        );
        frame.render_widget(Paragraph::new(line).style(style), rect);
    }
}

// ============================================================================
// Résultats générés
// ============================================================================

fn render_results(frame: &mut Frame, app: &App, state: &MonthState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_border(app, Focus::Results))
        .title(" Resultados generados ");

    let name_of = |id: ExpenseId| {
        state
            .expense(id)
            .map(|e| if e.name.is_empty() { "(sin nombre)".to_string() } else { e.name.clone() })
            .unwrap_or_else(|| "-".to_string())
    };

    let mut lines: Vec<Line> = state
        .results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let text = match result {
                DerivedResult::Aggregate(r) => format!(
                    " {:<24} {:>12.2}  ({} gastos)",
                    fit(&r.name, 24),
                    result.value(state),
                    r.sources.len()
                ),
                DerivedResult::Binary(c) => format!(
                    " {:<16} {} {} {} = {:.2}",
                    fit(&c.name, 16),
                    c.left.map_or_else(|| "-".to_string(), name_of),
                    c.op.symbol(),
                    c.right.map_or_else(|| "-".to_string(), name_of),
                    result.value(state)
                ),
            };
            let mut style = Style::default().fg(Color::White);
            if app.focus == Focus::Results && index == app.cursor_result {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(Span::styled(text, style))
        })
        .collect();

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            " sin resultados",
            Style::default().fg(Color::Gray),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// Résumé du mois
// ============================================================================

fn render_summary(frame: &mut Frame, app: &App, projection: &ProjectionEngine, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Resumen ");

    let summaries = projection.month_summaries();
    let Some(summary) = summaries.get(app.current_month) else {
        frame.render_widget(block, area);
        return;
    };

    let row = |label: &str, uyu: f64| {
        Line::from(vec![
            Span::styled(format!(" {label:<30}"), Style::default().fg(Color::Gray)),
            Span::styled(
                money(uyu, projection.usd(uyu)),
                Style::default().fg(if uyu < 0.0 { Color::Red } else { Color::Green }),
            ),
        ])
    };

    let mut lines = vec![
        row("neto del mes", summary.net),
        row("ahorro acumulado", summary.cumulative),
        row("ahorro mes anterior", summary.previous_saving),
        row("Resultados generados", summary.result_total),
        row("diferencia con cuenta actual", summary.difference_current),
        row("ahorros restantes", summary.remaining_savings),
        Line::from(Span::styled(
            format!(
                " seleccion celdas ({}): {:.2}",
                summary.key,
                projection.selected_cell_sum(summary.key)
            ),
            Style::default().fg(Color::Cyan),
        )),
    ];

    if let Some(next) = app.estimator.months().get(app.current_month + 1) {
        lines.push(Line::from(Span::styled(
            format!(" continua con {}", next.label),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// Menu contextuel
// ============================================================================

fn render_menu(
    frame: &mut Frame,
    app: &App,
    projection: &ProjectionEngine,
    layout: &ScreenLayout,
    menu: &ContextMenu,
) {
    let area = layout.menu_rect(menu);
    if area.width == 0 || area.height == 0 {
        return;
    }

    let label = app
        .estimator
        .months()
        .iter()
        .find(|m| m.key == menu.month)
        .map_or_else(|| menu.month.to_string(), |m| m.label.clone());

    let (title, info) = match menu.kind {
        SelectionKind::Cells => (
            format!(" Celdas {label} "),
            format!(
                " {} celdas, suma {:.2}",
                app.estimator.selection().selected_cells().len(),
                projection.selected_cell_sum(menu.month)
            ),
        ),
        SelectionKind::Expenses => (
            format!(" Gastos {label} "),
            format!(
                " {} gastos seleccionados",
                app.estimator.selection().selected_expenses(menu.month).len()
            ),
        ),
    };

    let mut lines = vec![Line::from(Span::styled(info, Style::default().fg(Color::Gray)))];
    for (index, action) in MenuAction::for_kind(menu.kind).iter().enumerate() {
        let mut style = Style::default().fg(Color::White);
        if index == app.menu_cursor {
            style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
        }
        lines.push(Line::from(Span::styled(format!(" {}", action.label()), style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " [Enter] ejecutar  [ESC] cerrar",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(title);

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// Footer
// ============================================================================

fn key_style(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn warning_line(key: &str, message: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("⚠  Presione ", key_style(Color::Yellow)),
        Span::styled(
            key.to_string(),
            key_style(Color::Red).add_modifier(Modifier::SLOW_BLINK),
        ),
        Span::styled(message.to_string(), key_style(Color::Yellow)),
    ])
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let line = if app.is_awaiting_delete_confirmation() {
        warning_line("[d]", " de nuevo para borrar, otra tecla para cancelar ⚠")
    } else if app.is_awaiting_quit_confirmation() {
        warning_line("[q]", " de nuevo para salir, otra tecla para cancelar ⚠")
    } else if let Some(message) = &app.status_message {
        Line::from(Span::styled(message.clone(), key_style(Color::Yellow)))
    } else {
        Line::from(vec![
            Span::styled("[q]", key_style(Color::Yellow)),
            Span::raw(" Salir  "),
            Span::styled("[Tab]", key_style(Color::Yellow)),
            Span::raw(" Foco  "),
            Span::styled("[[ ]]", key_style(Color::Yellow)),
            Span::raw(" Mes  "),
            Span::styled("[Space]", key_style(Color::Yellow)),
            Span::raw(" Sel  "),
            Span::styled("[Enter]", key_style(Color::Yellow)),
            Span::raw(" Editar  "),
            Span::styled("[n]", key_style(Color::Yellow)),
            Span::raw(" Nombre  "),
            Span::styled("[m]", key_style(Color::Yellow)),
            Span::raw(" +/-  "),
            Span::styled("[c]", key_style(Color::Magenta)),
            Span::raw(" Menu  "),
            Span::styled("[a]", key_style(Color::Green)),
            Span::raw(" Agregar  "),
            Span::styled("[d]", key_style(Color::Red)),
            Span::raw(" Borrar"),
        ])
    };

    frame.render_widget(
        Paragraph::new(vec![line]).block(block).alignment(Alignment::Center),
        area,
    );
}

fn render_input_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let input_line = Line::from(vec![
        Span::styled(
            app.input_prompt.as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.input_buffer.as_str(), Style::default().fg(Color::White)),
        Span::styled(
            "█",
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ),
        Span::raw("   "),
        Span::styled("[Enter]", key_style(Color::Green)),
        Span::raw(" Confirmar  "),
        Span::styled("[ESC]", key_style(Color::Red)),
        Span::raw(" Cancelar"),
    ]);

    frame.render_widget(
        Paragraph::new(vec![input_line]).block(block).alignment(Alignment::Left),
        area,
    );
}
