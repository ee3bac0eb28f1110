// ============================================================================
// Structures : MonthKey, CellKey, MonthDescriptor
// ============================================================================
// Clés typées des mois ("YYYY-MM") et des jours ("YYYY-MM-DD"), plus la
// génération de la fenêtre glissante de mois à partir d'aujourd'hui.
//
// CONCEPTS RUST :
// 1. Newtypes : une clé de mois ne peut pas être confondue avec une clé de jour
// 2. Ord dérivé : l'ordre (year, month_index) est l'ordre chronologique
// 3. Display / FromStr : format canonique aller-retour
// ============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Noms des mois tels que les affiche la locale es-UY
const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "setiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Jours de la semaine, lundi en premier
pub const WEEK_DAYS: [&str; 7] = ["Lun", "Mar", "Mie", "Jue", "Vie", "Sab", "Dom"];

// ============================================================================
// MonthKey
// ============================================================================

/// Identifie un mois calendaire. `month_index` va de 0 (janvier) à 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    year: i32,
    month_index: u32,
}

impl MonthKey {
    /// Retourne None si `month_index` sort de 0..=11
    pub fn new(year: i32, month_index: u32) -> Option<Self> {
        (month_index < 12).then_some(Self { year, month_index })
    }

    /// Mois contenant la date donnée
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month_index: date.month0(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month_index(&self) -> u32 {
        self.month_index
    }

    /// Mois suivant (décembre -> janvier de l'année suivante)
    pub fn next(&self) -> Self {
        if self.month_index == 11 {
            Self { year: self.year + 1, month_index: 0 }
        } else {
            Self { year: self.year, month_index: self.month_index + 1 }
        }
    }

    /// Mois précédent (janvier -> décembre de l'année précédente)
    pub fn previous(&self) -> Self {
        if self.month_index == 0 {
            Self { year: self.year - 1, month_index: 11 }
        } else {
            Self { year: self.year, month_index: self.month_index - 1 }
        }
    }

    /// Premier jour du mois
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month_index + 1, 1)
    }

    /// Nombre de jours du mois (années bissextiles comprises)
    ///
    /// CONCEPT : on laisse chrono faire le calcul
    /// - premier jour du mois suivant, moins un jour
    pub fn days_in_month(&self) -> u32 {
        self.next()
            .first_day()
            .and_then(|d| d.pred_opt())
            .map_or(0, |d| d.day())
    }

    /// Clé du jour `day` de ce mois
    pub fn day(&self, day: u32) -> CellKey {
        CellKey { month: *self, day }
    }

    /// Libellé localisé, ex: "mayo de 2024"
    pub fn label(&self) -> String {
        format!("{} de {}", MONTH_NAMES[self.month_index as usize], self.year)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month_index + 1)
    }
}

/// Lit un segment d'exactement `width` chiffres ASCII ("2024", "05")
///
/// Seule la forme canonique est acceptée : relire `to_string()` redonne la
/// même clé, et aucune autre graphie ne désigne le même mois.
fn fixed_digits(part: &str, width: usize, key: &str) -> anyhow::Result<u32> {
    if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
        anyhow::bail!("clé non canonique : {key}");
    }
    Ok(part.parse()?)
}

impl FromStr for MonthKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("clé de mois invalide : {s}"))?;
        let year = fixed_digits(year, 4, s)? as i32;
        let month = fixed_digits(month, 2, s)?;
        month
            .checked_sub(1)
            .and_then(|index| MonthKey::new(year, index))
            .ok_or_else(|| anyhow::anyhow!("mois hors limites : {s}"))
    }
}

// ============================================================================
// CellKey
// ============================================================================

/// Identifie un jour du calendrier, y compris les jours empruntés aux mois
/// voisins dans la grille
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    month: MonthKey,
    day: u32,
}

impl CellKey {
    /// Mois auquel appartient réellement ce jour
    pub fn month(&self) -> MonthKey {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Équivalent typé de `key.startsWith("YYYY-MM")`
    pub fn belongs_to(&self, month: MonthKey) -> bool {
        self.month == month
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.month, self.day)
    }
}

impl FromStr for CellKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (month, day) = s
            .rsplit_once('-')
            .ok_or_else(|| anyhow::anyhow!("clé de jour invalide : {s}"))?;
        let month: MonthKey = month.parse()?;
        let day = fixed_digits(day, 2, s)?;
        if day == 0 || day > month.days_in_month() {
            anyhow::bail!("jour hors limites : {s}");
        }
        Ok(month.day(day))
    }
}

// ============================================================================
// MonthDescriptor et séquence de mois
// ============================================================================

/// Un mois de la fenêtre glissante
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthDescriptor {
    pub key: MonthKey,
    pub label: String,
}

impl MonthDescriptor {
    pub fn new(key: MonthKey) -> Self {
        Self { key, label: key.label() }
    }

    pub fn year(&self) -> i32 {
        self.key.year()
    }

    pub fn month_index(&self) -> u32 {
        self.key.month_index()
    }
}

/// Génère `count` mois consécutifs à partir du mois de `today`
///
/// Fonction pure : la séquence ne dépend que de la date d'ancrage.
pub fn generate_months(today: NaiveDate, count: usize) -> Vec<MonthDescriptor> {
    std::iter::successors(Some(MonthKey::from_date(today)), |key| Some(key.next()))
        .take(count)
        .map(MonthDescriptor::new)
        .collect()
}

/// Séquence ancrée sur la date locale courante
///
/// À appeler une seule fois par session : la séquence est ensuite figée
/// dans l'Estimator.
pub fn generate_months_from_now(count: usize) -> Vec<MonthDescriptor> {
    generate_months(Local::now().date_naive(), count)
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
    fn test_month_key_format() {
        assert_eq!(key(2024, 4).to_string(), "2024-05");
        assert_eq!(key(2024, 4).day(3).to_string(), "2024-05-03");
        assert!(MonthKey::new(2024, 12).is_none());
    }

    #[test]
    fn test_month_key_parse() {
        assert_eq!("2024-12".parse::<MonthKey>().unwrap(), key(2024, 11));
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("2024-00".parse::<MonthKey>().is_err());

        let cell: CellKey = "2024-02-29".parse().unwrap();
        assert_eq!(cell.month(), key(2024, 1));
        assert_eq!(cell.day(), 29);
        assert!("2023-02-29".parse::<CellKey>().is_err());
    }

    #[test]
    fn test_parse_requires_canonical_form() {
        for text in ["2024-5", "2024-005", "24-05", "+024-05", "2024-+5", "2024-05 "] {
            assert!(text.parse::<MonthKey>().is_err(), "{text}");
        }
        for text in ["2024-05-3", "2024-5-03", "2024-05-003", "2024-05-+3"] {
            assert!(text.parse::<CellKey>().is_err(), "{text}");
        }

        for text in ["0999-01", "2024-05", "2025-12"] {
            assert_eq!(text.parse::<MonthKey>().unwrap().to_string(), text);
        }
        assert_eq!("2024-05-03".parse::<CellKey>().unwrap().to_string(), "2024-05-03");
    }

    #[test]
    fn test_next_and_previous_wrap_year() {
        assert_eq!(key(2024, 11).next(), key(2025, 0));
        assert_eq!(key(2025, 0).previous(), key(2024, 11));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(key(2024, 1).days_in_month(), 29);
        assert_eq!(key(2023, 1).days_in_month(), 28);
        assert_eq!(key(1900, 1).days_in_month(), 28);
        assert_eq!(key(2000, 1).days_in_month(), 29);
        assert_eq!(key(2024, 11).days_in_month(), 31);
        assert_eq!(key(2024, 3).days_in_month(), 30);
    }

    #[test]
    fn test_label() {
        assert_eq!(key(2024, 4).label(), "mayo de 2024");
        assert_eq!(key(2025, 8).label(), "setiembre de 2025");
    }

    #[test]
    fn test_generate_months_advances_one_by_one() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 17).unwrap();
        let months = generate_months(today, 18);

        assert_eq!(months.len(), 18);
        assert_eq!(months[0].key, key(2024, 8));
        assert_eq!(months[3].key, key(2024, 11));
        assert_eq!(months[4].key, key(2025, 0));
        assert_eq!(months[17].key, key(2026, 1));

        for pair in months.windows(2) {
            assert_eq!(pair[0].key.next(), pair[1].key);
            assert!(pair[0].key < pair[1].key);
        }
    }

    #[test]
    fn test_cell_belongs_to() {
        let cell = key(2024, 4).day(1);
        assert!(cell.belongs_to(key(2024, 4)));
        assert!(!cell.belongs_to(key(2024, 5)));
    }
}
