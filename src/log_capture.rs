// ============================================================================
// Capture des événements tracing (tests uniquement)
// ============================================================================
// Un Layer minimal qui garde le message de chaque événement émis pendant
// l'exécution d'une closure.
// ============================================================================

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Debug, Clone, Default)]
pub struct CapturedMessages(Arc<Mutex<Vec<String>>>);

impl CapturedMessages {
    pub fn contains(&self, message: &str) -> bool {
        self.0.lock().unwrap().iter().any(|m| m == message)
    }

    pub fn count(&self, message: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|m| *m == message).count()
    }
}

struct MessageVisitor<'a>(&'a mut Option<String>);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedMessages {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = None;
        event.record(&mut MessageVisitor(&mut message));
        if let Some(message) = message {
            self.0.lock().unwrap().push(message);
        }
    }
}

/// Exécute `f` avec un subscriber local et retourne les messages émis
pub fn capture<F: FnOnce()>(f: F) -> CapturedMessages {
    let captured = CapturedMessages::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());
    tracing::subscriber::with_default(subscriber, f);
    captured
}
