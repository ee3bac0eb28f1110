// ============================================================================
// Registre mensuel : Expense, DerivedResult, MonthState, LedgerStore
// ============================================================================
// Chaque mois possède une liste ordonnée de lignes signées (dépenses et
// revenus) et une liste de résultats dérivés de ces lignes.
//
// CONCEPTS RUST :
// 1. Copy-on-write : chaque modification produit un nouveau MonthState,
//    l'entrée du mois est remplacée en entier (Arc<MonthState>)
// 2. Enums avec données : les deux variantes de résultat dérivé
// 3. Tolérance aux ids périmés : un id inconnu ne fait rien
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::month::MonthKey;

// ============================================================================
// Identifiants
// ============================================================================

/// Identifiant d'une ligne du registre
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpenseId(Uuid);

impl ExpenseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e-{}", self.0.simple())
    }
}

/// Identifiant d'un résultat dérivé
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultId(Uuid);

impl ResultId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r-{}", self.0.simple())
    }
}

// ============================================================================
// Mode (signe)
// ============================================================================

/// Signe d'une ligne, et opérateur d'un calcul binaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// "+" : revenu
    #[serde(rename = "+")]
    Plus,
    /// "-" : dépense
    #[default]
    #[serde(rename = "-")]
    Minus,
}

impl Mode {
    pub fn symbol(&self) -> &'static str {
        match self {
            Mode::Plus => "+",
            Mode::Minus => "-",
        }
    }

    /// Libellé du sélecteur de mode
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Plus => "ingreso (+)",
            Mode::Minus => "gasto (-)",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Mode::Plus => Mode::Minus,
            Mode::Minus => Mode::Plus,
        }
    }

    /// Applique le signe à un accumulateur
    pub fn apply(&self, acc: f64, value: f64) -> f64 {
        match self {
            Mode::Plus => acc + value,
            Mode::Minus => acc - value,
        }
    }
}

/// Remplace NaN et ±inf par 0
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ============================================================================
// Expense
// ============================================================================

/// Ligne signée du registre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub name: String,
    pub value: f64,
    pub mode: Mode,
}

impl Expense {
    /// Ligne vide : nom vide, valeur 0, mode "-"
    pub fn blank() -> Self {
        Self::new(String::new(), 0.0, Mode::Minus)
    }

    pub fn new(name: String, value: f64, mode: Mode) -> Self {
        Self {
            id: ExpenseId::new(),
            name,
            value: finite_or_zero(value),
            mode,
        }
    }

    /// Contribution signée au net du mois
    pub fn signed_value(&self) -> f64 {
        self.mode.apply(0.0, finite_or_zero(self.value))
    }
}

/// Champ modifiable d'une ligne
#[derive(Debug, Clone, PartialEq)]
pub enum ExpenseField {
    Name(String),
    Value(f64),
    Mode(Mode),
}

// ============================================================================
// Résultats dérivés
// ============================================================================

/// Variante de résultat dérivé, choisie une fois pour tout l'Estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalcMode {
    /// Agrégat figé des lignes sélectionnées au moment de la création
    #[default]
    Aggregate,
    /// Opération binaire vivante entre deux lignes
    Binary,
}

/// Agrégat nommé, valeur calculée une seule fois
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub id: ResultId,
    pub name: String,
    pub value: f64,
    /// Lignes agrégées (informatif, la valeur ne suit pas leurs changements)
    pub sources: Vec<ExpenseId>,
}

/// Opération nommée `left op right`, recalculée en continu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryCalc {
    pub id: ResultId,
    pub name: String,
    pub left: Option<ExpenseId>,
    pub op: Mode,
    pub right: Option<ExpenseId>,
}

/// Valeur dérivée d'autres lignes du même mois
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DerivedResult {
    Aggregate(AggregateResult),
    Binary(BinaryCalc),
}

impl DerivedResult {
    pub fn id(&self) -> ResultId {
        match self {
            DerivedResult::Aggregate(r) => r.id,
            DerivedResult::Binary(c) => c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DerivedResult::Aggregate(r) => &r.name,
            DerivedResult::Binary(c) => &c.name,
        }
    }

    pub fn kind(&self) -> CalcMode {
        match self {
            DerivedResult::Aggregate(_) => CalcMode::Aggregate,
            DerivedResult::Binary(_) => CalcMode::Binary,
        }
    }

    /// Valeur courante : stockée pour un agrégat, recalculée pour un calcul
    /// binaire (référence manquante = 0)
    pub fn value(&self, month: &MonthState) -> f64 {
        match self {
            DerivedResult::Aggregate(r) => finite_or_zero(r.value),
            DerivedResult::Binary(c) => {
                let left = month.expense_value(c.left);
                let right = month.expense_value(c.right);
                c.op.apply(left, right)
            }
        }
    }
}

/// Champ modifiable d'un résultat dérivé
///
/// Les références et l'opérateur n'existent que pour les calculs binaires ;
/// sur un agrégat ils sont ignorés.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcField {
    Name(String),
    Left(Option<ExpenseId>),
    Right(Option<ExpenseId>),
    Op(Mode),
}

// ============================================================================
// MonthState
// ============================================================================

/// État d'un mois : lignes et résultats, dans l'ordre d'insertion
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthState {
    pub expenses: Vec<Expense>,
    pub results: Vec<DerivedResult>,
}

impl MonthState {
    /// État initial : une seule ligne vide
    pub fn initial() -> Self {
        Self {
            expenses: vec![Expense::blank()],
            results: Vec::new(),
        }
    }

    pub fn expense(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    pub fn result(&self, id: ResultId) -> Option<&DerivedResult> {
        self.results.iter().find(|r| r.id() == id)
    }

    /// Valeur d'une ligne référencée, 0 si absente ou supprimée
    pub fn expense_value(&self, id: Option<ExpenseId>) -> f64 {
        id.and_then(|id| self.expense(id))
            .map_or(0.0, |e| finite_or_zero(e.value))
    }

    /// Somme signée des lignes `ids` qui existent encore
    pub fn signed_sum_of(&self, ids: &[ExpenseId]) -> f64 {
        self.expenses
            .iter()
            .filter(|e| ids.contains(&e.id))
            .map(Expense::signed_value)
            .sum()
    }

    /// Somme signée de toutes les lignes
    pub fn expense_net(&self) -> f64 {
        self.expenses.iter().map(Expense::signed_value).sum()
    }

    /// Somme des valeurs courantes des résultats
    pub fn result_total(&self) -> f64 {
        self.results.iter().map(|r| r.value(self)).sum()
    }

    pub fn with_expense(&self, expense: Expense) -> Self {
        let mut next = self.clone();
        next.expenses.push(expense);
        next
    }

    pub fn without_expenses(&self, ids: &[ExpenseId]) -> Self {
        Self {
            expenses: self
                .expenses
                .iter()
                .filter(|e| !ids.contains(&e.id))
                .cloned()
                .collect(),
            results: self.results.clone(),
        }
    }

    pub fn with_expense_field(&self, id: ExpenseId, field: ExpenseField) -> Self {
        let mut next = self.clone();
        if let Some(expense) = next.expenses.iter_mut().find(|e| e.id == id) {
            match field {
                ExpenseField::Name(name) => expense.name = name,
                ExpenseField::Value(value) => expense.value = finite_or_zero(value),
                ExpenseField::Mode(mode) => expense.mode = mode,
            }
        }
        next
    }

    pub fn with_result(&self, result: DerivedResult) -> Self {
        let mut next = self.clone();
        next.results.push(result);
        next
    }

    pub fn without_result(&self, id: ResultId) -> Self {
        Self {
            expenses: self.expenses.clone(),
            results: self.results.iter().filter(|r| r.id() != id).cloned().collect(),
        }
    }

    pub fn with_calc_field(&self, id: ResultId, field: CalcField) -> Self {
        let mut next = self.clone();
        // Une opérande ne peut désigner qu'une dépense de ce mois
        let foreign = |operand: &Option<ExpenseId>| {
            operand.is_some_and(|expense| self.expense(expense).is_none())
        };
        if let CalcField::Left(operand) | CalcField::Right(operand) = &field {
            if foreign(operand) {
                return next;
            }
        }
        let Some(result) = next.results.iter_mut().find(|r| r.id() == id) else {
            return next;
        };
        match (result, field) {
            (DerivedResult::Aggregate(r), CalcField::Name(name)) => r.name = name,
            (DerivedResult::Binary(c), CalcField::Name(name)) => c.name = name,
            (DerivedResult::Binary(c), CalcField::Left(left)) => c.left = left,
            (DerivedResult::Binary(c), CalcField::Right(right)) => c.right = right,
            (DerivedResult::Binary(c), CalcField::Op(op)) => c.op = op,
            (DerivedResult::Aggregate(_), _) => {}
        }
        next
    }
}

// ============================================================================
// LedgerStore
// ============================================================================

/// Registre de tous les mois, indexé par MonthKey
///
/// Les entrées sont créées à la demande par `ensure` et jamais supprimées.
#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    months: BTreeMap<MonthKey, Arc<MonthState>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lecture sans création
    pub fn get(&self, key: MonthKey) -> Option<&Arc<MonthState>> {
        self.months.get(&key)
    }

    /// Retourne l'état du mois, en le créant (une ligne vide) si absent
    pub fn ensure(&mut self, key: MonthKey) -> Arc<MonthState> {
        self.months
            .entry(key)
            .or_insert_with(|| {
                debug!(month = %key, "Initializing month state");
                Arc::new(MonthState::initial())
            })
            .clone()
    }

    /// Remplace l'entrée du mois par `f(état courant)`
    ///
    /// CONCEPT : substitution d'entrée complète
    /// - f reçoit une référence immuable et construit un nouvel état
    /// - un lecteur qui détient l'ancien Arc ne voit jamais d'état partiel
    pub fn update<F>(&mut self, key: MonthKey, f: F) -> Arc<MonthState>
    where
        F: FnOnce(&MonthState) -> MonthState,
    {
        let current = self.ensure(key);
        let next = Arc::new(f(&current));
        self.months.insert(key, next.clone());
        next
    }

    pub fn add_expense(&mut self, key: MonthKey) -> Arc<MonthState> {
        self.push_expense(key, Expense::blank())
    }

    pub fn push_expense(&mut self, key: MonthKey, expense: Expense) -> Arc<MonthState> {
        debug!(month = %key, expense = %expense.id, "Adding expense");
        self.update(key, |state| state.with_expense(expense))
    }

    pub fn remove_expenses(&mut self, key: MonthKey, ids: &[ExpenseId]) -> Arc<MonthState> {
        debug!(month = %key, count = ids.len(), "Removing expenses");
        self.update(key, |state| state.without_expenses(ids))
    }

    pub fn update_expense_field(
        &mut self,
        key: MonthKey,
        id: ExpenseId,
        field: ExpenseField,
    ) -> Arc<MonthState> {
        debug!(month = %key, expense = %id, ?field, "Updating expense");
        self.update(key, |state| state.with_expense_field(id, field))
    }

    pub fn add_derived_result(&mut self, key: MonthKey, result: DerivedResult) -> Arc<MonthState> {
        debug!(month = %key, result = %result.id(), name = result.name(), "Adding derived result");
        self.update(key, |state| state.with_result(result))
    }

    pub fn remove_derived_result(&mut self, key: MonthKey, id: ResultId) -> Arc<MonthState> {
        debug!(month = %key, result = %id, "Removing derived result");
        self.update(key, |state| state.without_result(id))
    }

    pub fn update_calc_field(
        &mut self,
        key: MonthKey,
        id: ResultId,
        field: CalcField,
    ) -> Arc<MonthState> {
        debug!(month = %key, result = %id, ?field, "Updating derived result");
        self.update(key, |state| state.with_calc_field(id, field))
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
