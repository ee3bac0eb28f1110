// ============================================================================
// Valeurs de jour : DayValues
// ============================================================================
// Texte numérique libre saisi dans chaque case du calendrier. Seules les
// chaînes qui respectent le motif `-?\d*\.?\d*` (ou la chaîne vide) sont
// stockées ; une frappe invalide laisse la valeur précédente en place.
// ============================================================================

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::models::month::CellKey;

/// Motif des saisies autorisées, y compris les saisies en cours ("-", "3.")
static NUMERIC_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d*\.?\d*$").expect("motif numérique valide"));

/// Vrai si `text` peut être stocké comme valeur de jour
pub fn is_valid_day_input(text: &str) -> bool {
    text.is_empty() || NUMERIC_INPUT.is_match(text)
}

/// Texte canonique d'un nombre ("5" pour 5.0, "0.1" pour 0.1)
pub fn canonical_number(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        "0".to_string()
    }
}

/// Valeurs saisies par case, indexées par CellKey
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayValues {
    values: BTreeMap<CellKey, String>,
}

impl DayValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texte saisi pour la case, "" si rien
    pub fn get(&self, key: CellKey) -> &str {
        self.values.get(&key).map_or("", String::as_str)
    }

    /// Valeur numérique de la case ; None si vide ou non interprétable
    /// ("-", ".")
    pub fn numeric(&self, key: CellKey) -> Option<f64> {
        self.values
            .get(&key)
            .and_then(|text| text.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Enregistre la saisie si elle respecte le motif ; retourne false sinon
    pub fn set(&mut self, key: CellKey, text: &str) -> bool {
        if !is_valid_day_input(text) {
            trace!(cell = %key, input = text, "Rejected day input");
            return false;
        }
        debug!(cell = %key, input = text, "Day value set");
        self.values.insert(key, text.to_string());
        true
    }

    /// Écrit la même valeur dans toutes les cases données
    pub fn set_many<'a, I>(&mut self, keys: I, value: f64)
    where
        I: IntoIterator<Item = &'a CellKey>,
    {
        let text = canonical_number(value);
        debug!(value = %text, "Bulk day value");
        for key in keys {
            self.values.insert(*key, text.clone());
        }
    }

    /// Efface la valeur des cases données
    pub fn clear_many<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a CellKey>,
    {
        debug!("Clearing day values");
        for key in keys {
            self.values.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
