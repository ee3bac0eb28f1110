// ============================================================================
// Estimativos - grille d'estimation budgétaire mensuelle
// ============================================================================
// Programme TUI : fenêtre glissante de mois, grille de jours, registre de
// dépenses et projections d'épargne. Le taux USD/UYU est récupéré une fois
// au démarrage, en arrière-plan.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode + capture souris
// 2. Event loop : résultats, rendu, entrée, tick
// 3. Async dans sync : thread dédié avec son runtime tokio pour le taux
// 4. RAII : la garde de vie est détruite avant la restauration du terminal
// ============================================================================

use std::io;
use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info};

use estimativos::api::{spawn_rate_fetch, LivenessGuard, RateStatus};
use estimativos::app::App;
use estimativos::config::EstimatorConfig;
use estimativos::engine::Estimator;
use estimativos::ui::{events::EventHandler, render};

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers un
// fichier à rotation quotidienne.
//
// # Utilisation
// ```bash
// tail -f ~/.local/share/estimativos/logs/estimativos.log.*
// RUST_LOG=estimativos=trace cargo run
// ```
// ============================================================================

fn init_logging(log_dir: &Path) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "estimativos.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "estimativos=debug,info".into()),
        )
        .try_init()
        .context("Échec de l'installation du subscriber tracing")?;

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let config = EstimatorConfig::from_env().context("Configuration invalide")?;

    init_logging(&config.log_dir).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {e:#}");
        eprintln!("   Continuing without logging...");
    });

    info!(?config, "Estimativos starting up");

    // La séquence de mois est figée ici pour toute la session
    let estimator = Estimator::from_config(&config, Local::now().date_naive());
    let mut app = App::new(estimator);

    // CONCEPT : fire-and-forget avec drapeau de vie
    // - la garde vit aussi longtemps que la vue
    // - une réponse arrivée après sa destruction est jetée par le worker
    let liveness = LivenessGuard::new();
    let (rate_tx, rate_rx) = mpsc::channel::<RateStatus>();
    info!(url = %config.rate_url, "Spawning exchange rate fetch");
    spawn_rate_fetch(config.rate_url.clone(), liveness.token(), rate_tx);

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &rate_rx);

    // Vue démontée : plus aucun statut ne doit être appliqué
    drop(liveness);

    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. applique le statut du taux s'il est arrivé
//   1. dessine
//   2. traite un événement
//   3. tick
// Tout l'état est muté sur ce seul thread : pas de Mutex.
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    rate_rx: &mpsc::Receiver<RateStatus>,
) -> Result<()> {
    while app.is_running() {
        // ========================================
        // 0. RÉSULTATS : statut du taux
        // ========================================
        match rate_rx.try_recv() {
            Ok(status) => app.estimator.commit_rate(status),
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                // Le worker a terminé ; le statut reste tel quel
            }
        }

        // ========================================
        // 1. RENDER
        // ========================================
        terminal.draw(|frame| {
            app.set_viewport(frame.size());
            render(frame, app);
        })?;

        // ========================================
        // 2. INPUT
        // ========================================
        match events.next() {
            Ok(event) => handle_event(app, event),
            Err(e) => error!(error = ?e, "Failed to read terminal event"),
        }

        // ========================================
        // 3. UPDATE
        // ========================================
        app.tick();
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================
// Ordre des priorités :
// 1. souris (le menu ouvert voit l'appui avant la cible)
// 2. mode saisie
// 3. menu ouvert
// 4. raccourcis du dashboard
// ============================================================================

fn handle_event(app: &mut App, event: estimativos::ui::events::Event) {
    use estimativos::ui::events::{
        calc_side_from_event, get_char_from_event, is_add_event, is_backspace_event,
        is_delete_event, is_down_event, is_enter_event, is_escape_event, is_left_event,
        is_menu_event, is_mode_event, is_next_month_event, is_previous_month_event,
        is_quit_event, is_rename_event, is_right_event, is_space_event, is_tab_event,
        is_up_event, Event, PointerIntent,
    };

    if let Event::Key(_) = event {
        app.status_message = None;
    }

    match event {
        // ========================================
        // Souris
        // ========================================
        Event::Pointer(PointerIntent::Down { pos, secondary, toggle }) => {
            app.cancel_quit();
            app.cancel_delete();
            app.pointer_down(pos, secondary, toggle);
        }
        Event::Pointer(PointerIntent::Drag(pos)) => app.pointer_drag(pos),
        Event::Pointer(PointerIntent::Up) => app.pointer_up(),

        // ========================================
        // Input Mode
        // ========================================
        Event::Key(_) if is_escape_event(&event) && app.is_in_input_mode() => {
            info!("User cancelled input");
            app.cancel_input();
        }
        Event::Key(_) if is_enter_event(&event) && app.is_in_input_mode() => {
            app.submit_input();
        }
        Event::Key(_) if is_backspace_event(&event) && app.is_in_input_mode() => {
            app.backspace();
        }
        Event::Key(_) if app.is_in_input_mode() => {
            if let Some(c) = get_char_from_event(&event) {
                app.append_char(c);
            }
        }

        // ========================================
        // Menu contextuel ouvert
        // ========================================
        Event::Key(_) if is_escape_event(&event) && app.is_menu_open() => app.close_menu(),
        Event::Key(_) if is_up_event(&event) && app.is_menu_open() => app.menu_up(),
        Event::Key(_) if is_down_event(&event) && app.is_menu_open() => app.menu_down(),
        Event::Key(_) if is_enter_event(&event) && app.is_menu_open() => {
            app.activate_menu_cursor();
        }

        // ========================================
        // Dashboard
        // ========================================
        Event::Key(_) if is_quit_event(&event) => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
        }

        Event::Key(_) if is_delete_event(&event) => {
            app.cancel_quit();
            if app.is_awaiting_delete_confirmation() {
                info!(focus = ?app.focus, "User confirmed delete");
                app.delete_focused();
            } else {
                app.request_delete();
            }
        }

        Event::Key(_) => {
            app.cancel_quit();
            app.cancel_delete();

            if is_tab_event(&event) {
                app.cycle_focus();
            } else if is_up_event(&event) {
                app.move_up();
            } else if is_down_event(&event) {
                app.move_down();
            } else if is_left_event(&event) {
                app.move_left();
            } else if is_right_event(&event) {
                app.move_right();
            } else if is_next_month_event(&event) {
                app.next_month();
            } else if is_previous_month_event(&event) {
                app.previous_month();
            } else if is_space_event(&event) {
                app.toggle_focused();
            } else if is_enter_event(&event) {
                app.edit_focused();
            } else if is_rename_event(&event) {
                app.rename_focused();
            } else if is_mode_event(&event) {
                app.toggle_mode_focused();
            } else if is_add_event(&event) {
                app.add_focused();
            } else if is_menu_event(&event) {
                app.open_menu_for_focus();
            } else if let Some(side) = calc_side_from_event(&event) {
                app.set_calc_side(side);
            }
        }

        Event::Tick => {}
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Échec de l'activation du raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Échec de l'entrée dans l'alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Échec de la création du terminal")?;

    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("Échec de la désactivation du raw mode")?;

    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Échec de la sortie de l'alternate screen")?;

    terminal.show_cursor().context("Échec de l'affichage du curseur")?;

    Ok(())
}
