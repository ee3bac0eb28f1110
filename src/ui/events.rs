// ============================================================================
// Gestion des événements
// ============================================================================
// Lit clavier et souris depuis crossterm et les convertit en événements de
// l'application. Les clics sont ensuite résolus par App avec ScreenLayout.
//
// CONCEPTS RUST :
// 1. Enums avec données : Key(KeyEvent), Pointer(PointerIntent)
// 2. Pattern matching sur les modifiers (Ctrl)
// 3. Result et ? pour les erreurs d'I/O
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};

use crate::engine::Position;

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Action du pointeur déjà filtrée
    Pointer(PointerIntent),

    /// Tick régulier
    Tick,
}

/// Ce que fait le pointeur, indépendamment du terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerIntent {
    /// Appui ; `secondary` = bouton droit, `toggle` = Ctrl maintenu
    Down {
        pos: Position,
        secondary: bool,
        toggle: bool,
    },
    /// Le pointeur se déplace bouton enfoncé
    Drag(Position),
    /// Relâchement, où qu'il soit
    Up,
}

impl PointerIntent {
    /// Convertit un événement souris crossterm ; None pour ce qu'on ignore
    /// (survol, molette, bouton du milieu)
    pub fn from_mouse(mouse: &MouseEvent) -> Option<Self> {
        let pos = Position::new(mouse.column, mouse.row);
        let toggle = mouse.modifiers.contains(KeyModifiers::CONTROL);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(PointerIntent::Down {
                pos,
                secondary: false,
                toggle,
            }),
            MouseEventKind::Down(MouseButton::Right) => Some(PointerIntent::Down {
                pos,
                secondary: true,
                toggle,
            }),
            MouseEventKind::Drag(MouseButton::Left) => Some(PointerIntent::Drag(pos)),
            MouseEventKind::Up(_) => Some(PointerIntent::Up),
            _ => None,
        }
    }
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self { tick_rate: Duration::from_millis(250) }
    }

    /// Lit le prochain événement (bloquant avec timeout)
    ///
    /// CONCEPT : Non-blocking I/O avec timeout
    /// - pas d'événement pendant tick_rate : Event::Tick
    /// - les Release clavier (certains OS) sont ignorés
    pub fn next(&self) -> Result<Event> {
        if !event::poll(self.tick_rate)? {
            return Ok(Event::Tick);
        }

        let event = match event::read()? {
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
            CrosstermEvent::Mouse(mouse) => PointerIntent::from_mouse(&mouse)
                .map(Event::Pointer)
                .unwrap_or(Event::Tick),
            _ => Event::Tick,
        };
        Ok(event)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers clavier
// ============================================================================

fn key_code(event: &Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) => Some(key.code),
        _ => None,
    }
}

/// 'q' : quitter (avec confirmation)
pub fn is_quit_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('q') | KeyCode::Char('Q')))
}

pub fn is_escape_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Esc))
}

pub fn is_enter_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Enter))
}

pub fn is_space_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char(' ')))
}

pub fn is_tab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Tab))
}

pub fn is_backspace_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Backspace))
}

/// Flèche haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Up | KeyCode::Char('k')))
}

/// Flèche bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Down | KeyCode::Char('j')))
}

/// Flèche gauche ou 'h' (vim)
pub fn is_left_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Left | KeyCode::Char('h')))
}

/// Flèche droite ou 'l' (vim)
pub fn is_right_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Right | KeyCode::Char('l')))
}

/// ']' ou PageDown : mois suivant
pub fn is_next_month_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char(']') | KeyCode::PageDown))
}

/// '[' ou PageUp : mois précédent
pub fn is_previous_month_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('[') | KeyCode::PageUp))
}

/// 'a' : ajouter une ligne ou un compte
pub fn is_add_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('a') | KeyCode::Char('A')))
}

/// 'd' : supprimer (avec confirmation)
pub fn is_delete_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('d') | KeyCode::Char('D')))
}

/// 'n' : renommer
pub fn is_rename_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('n') | KeyCode::Char('N')))
}

/// 'm' : basculer le mode +/-
pub fn is_mode_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('m') | KeyCode::Char('M')))
}

/// 'c' : menu contextuel au clavier
pub fn is_menu_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('c') | KeyCode::Char('C')))
}

/// '1' / '2' : référence gauche / droite d'un calcul
pub fn calc_side_from_event(event: &Event) -> Option<CalcSide> {
    match key_code(event) {
        Some(KeyCode::Char('1')) => Some(CalcSide::Left),
        Some(KeyCode::Char('2')) => Some(CalcSide::Right),
        _ => None,
    }
}

/// Côté d'un calcul binaire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcSide {
    Left,
    Right,
}

/// Caractère imprimable pour le buffer de saisie
pub fn get_char_from_event(event: &Event) -> Option<char> {
    match event {
        Event::Key(key) if !key.modifiers.contains(KeyModifiers::CONTROL) => match key.code {
            KeyCode::Char(c) if !c.is_control() => Some(c),
            _ => None,
        },
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    fn mouse(kind: MouseEventKind, modifiers: KeyModifiers) -> MouseEvent {
        MouseEvent { kind, column: 12, row: 7, modifiers }
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_pointer_intents() {
        let down = mouse(MouseEventKind::Down(MouseButton::Left), KeyModifiers::CONTROL);
        assert_eq!(
            PointerIntent::from_mouse(&down),
            Some(PointerIntent::Down { pos: Position::new(12, 7), secondary: false, toggle: true })
        );

        let right = mouse(MouseEventKind::Down(MouseButton::Right), KeyModifiers::empty());
        assert!(matches!(
            PointerIntent::from_mouse(&right),
            Some(PointerIntent::Down { secondary: true, toggle: false, .. })
        ));

        let drag = mouse(MouseEventKind::Drag(MouseButton::Left), KeyModifiers::empty());
        assert_eq!(PointerIntent::from_mouse(&drag), Some(PointerIntent::Drag(Position::new(12, 7))));

        let up = mouse(MouseEventKind::Up(MouseButton::Right), KeyModifiers::empty());
        assert_eq!(PointerIntent::from_mouse(&up), Some(PointerIntent::Up));

        let moved = mouse(MouseEventKind::Moved, KeyModifiers::empty());
        assert_eq!(PointerIntent::from_mouse(&moved), None);
    }

    #[test]
    fn test_char_from_event() {
        assert_eq!(get_char_from_event(&key(KeyCode::Char('7'))), Some('7'));
        let ctrl = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(get_char_from_event(&ctrl), None);
        assert_eq!(calc_side_from_event(&key(KeyCode::Char('2'))), Some(CalcSide::Right));
    }
}
