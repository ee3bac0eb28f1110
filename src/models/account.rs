// ============================================================================
// Comptes : Account, AccountBook
// ============================================================================
// Liste plate et ordonnée des soldes en UYU, indépendante des mois.
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::ledger::finite_or_zero;

/// Identifiant d'un compte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a-{}", self.0.simple())
    }
}

/// Un compte et son solde en pesos uruguayens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub balance_uyu: f64,
}

impl Account {
    pub fn new(name: impl Into<String>, balance_uyu: f64) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            balance_uyu,
        }
    }
}

/// Nombre de comptes créés au démarrage
pub const DEFAULT_ACCOUNT_COUNT: usize = 3;

/// Ensemble ordonné des comptes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountBook {
    accounts: Vec<Account>,
}

impl AccountBook {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// `count` comptes vides "Cuenta 1" à "Cuenta N"
    pub fn numbered(count: usize) -> Self {
        Self::new((1..=count).map(|n| Account::new(format!("Cuenta {n}"), 0.0)).collect())
    }

    /// Trois comptes vides "Cuenta 1" à "Cuenta 3"
    pub fn with_defaults() -> Self {
        Self::numbered(DEFAULT_ACCOUNT_COUNT)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Ajoute "Cuenta N" avec un solde nul et retourne son id
    pub fn add(&mut self) -> AccountId {
        let account = Account::new(format!("Cuenta {}", self.accounts.len() + 1), 0.0);
        let id = account.id;
        debug!(account = %id, name = %account.name, "Adding account");
        self.accounts.push(account);
        id
    }

    /// Renomme un compte ; id inconnu : aucun effet
    pub fn rename(&mut self, id: AccountId, name: impl Into<String>) {
        let name = name.into();
        self.replace(id, |a| Account { name, ..a.clone() });
    }

    /// Change le solde d'un compte ; id inconnu : aucun effet
    pub fn set_balance(&mut self, id: AccountId, balance_uyu: f64) {
        self.replace(id, |a| Account { balance_uyu, ..a.clone() });
    }

    /// Somme des soldes, valeurs non finies comptées comme 0
    pub fn total_uyu(&self) -> f64 {
        self.accounts.iter().map(|a| finite_or_zero(a.balance_uyu)).sum()
    }

    fn replace<F>(&mut self, id: AccountId, f: F)
    where
        F: FnOnce(&Account) -> Account,
    {
        if let Some(slot) = self.accounts.iter_mut().find(|a| a.id == id) {
            *slot = f(slot);
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let book = AccountBook::with_defaults();
        let names: Vec<&str> = book.accounts().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Cuenta 1", "Cuenta 2", "Cuenta 3"]);
        assert_eq!(book.total_uyu(), 0.0);
    }

    #[test]
    fn test_add_names_next_account() {
        let mut book = AccountBook::with_defaults();
        let id = book.add();
        assert_eq!(book.get(id).unwrap().name, "Cuenta 4");
        assert_eq!(book.len(), 4);
    }

    #[test]
    fn test_total_ignores_non_finite() {
        let book = AccountBook::new(vec![
            Account::new("a", 1000.0),
            Account::new("b", 500.0),
            Account::new("c", f64::NAN),
            Account::new("d", f64::INFINITY),
        ]);
        assert_eq!(book.total_uyu(), 1500.0);
    }

    #[test]
    fn test_updates_by_id() {
        let mut book = AccountBook::with_defaults();
        let id = book.accounts()[1].id;

        book.rename(id, "Ahorro");
        book.set_balance(id, 2500.5);
        book.set_balance(AccountId::new(), 99.0);

        assert_eq!(book.accounts()[1].name, "Ahorro");
        assert_eq!(book.total_uyu(), 2500.5);
    }
}
