// ============================================================================
// Configuration : EstimatorConfig
// ============================================================================
// Valeurs par défaut raisonnables, surchargées par variables d'environnement :
// - ESTIMATIVOS_MONTHS     : nombre de mois de la fenêtre (défaut 18)
// - ESTIMATIVOS_CALC_MODE  : "aggregate" ou "binary"
// - ESTIMATIVOS_RATE_URL   : URL du flux de taux
// - ESTIMATIVOS_LOG_DIR    : répertoire des logs
// - ESTIMATIVOS_ACCOUNTS   : nombre de comptes initiaux (défaut 3)
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::api::rates::DEFAULT_RATE_URL;
use crate::models::{CalcMode, DEFAULT_ACCOUNT_COUNT};

/// Longueur par défaut de la fenêtre glissante
pub const MONTH_COUNT: usize = 18;

/// Configuration de l'application
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub month_count: usize,
    pub calc_mode: CalcMode,
    pub rate_url: String,
    pub log_dir: PathBuf,
    /// Comptes "Cuenta 1..N" créés au démarrage, solde nul
    pub initial_accounts: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            month_count: MONTH_COUNT,
            calc_mode: CalcMode::default(),
            rate_url: DEFAULT_RATE_URL.to_string(),
            log_dir: default_log_dir(),
            initial_accounts: DEFAULT_ACCOUNT_COUNT,
        }
    }
}

/// ~/.local/share/estimativos/logs sous Linux, ./logs à défaut
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("estimativos").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

impl EstimatorConfig {
    /// Lit la configuration depuis l'environnement du processus
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Construit la configuration à partir d'une fonction de lecture
    ///
    /// CONCEPT : injection de la source
    /// - from_env() passe std::env::var
    /// - les tests passent une table en mémoire
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(months) = lookup("ESTIMATIVOS_MONTHS") {
            config.month_count = months
                .trim()
                .parse()
                .with_context(|| format!("ESTIMATIVOS_MONTHS invalide : {months:?}"))?;
            if config.month_count == 0 {
                anyhow::bail!("ESTIMATIVOS_MONTHS doit être supérieur à 0");
            }
        }

        if let Some(mode) = lookup("ESTIMATIVOS_CALC_MODE") {
            config.calc_mode = serde_json::from_value(serde_json::Value::String(
                mode.trim().to_lowercase(),
            ))
            .with_context(|| format!("ESTIMATIVOS_CALC_MODE invalide : {mode:?}"))?;
        }

        if let Some(url) = lookup("ESTIMATIVOS_RATE_URL") {
            config.rate_url = url;
        }

        if let Some(dir) = lookup("ESTIMATIVOS_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        if let Some(count) = lookup("ESTIMATIVOS_ACCOUNTS") {
            config.initial_accounts = count
                .trim()
                .parse()
                .with_context(|| format!("ESTIMATIVOS_ACCOUNTS invalide : {count:?}"))?;
        }

        Ok(config)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EstimatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.month_count, 18);
        assert_eq!(config.calc_mode, CalcMode::Aggregate);
        assert_eq!(config.rate_url, DEFAULT_RATE_URL);
        assert_eq!(config.initial_accounts, 3);
    }

    #[test]
    fn test_overrides() {
        let config = EstimatorConfig::from_lookup(lookup(&[
            ("ESTIMATIVOS_MONTHS", "6"),
            ("ESTIMATIVOS_CALC_MODE", "Binary"),
            ("ESTIMATIVOS_RATE_URL", "http://localhost:9/rates"),
            ("ESTIMATIVOS_LOG_DIR", "/tmp/estimativos"),
            ("ESTIMATIVOS_ACCOUNTS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.month_count, 6);
        assert_eq!(config.calc_mode, CalcMode::Binary);
        assert_eq!(config.rate_url, "http://localhost:9/rates");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/estimativos"));
        assert_eq!(config.initial_accounts, 1);
    }

    #[test]
    fn test_invalid_overrides() {
        assert!(EstimatorConfig::from_lookup(lookup(&[("ESTIMATIVOS_MONTHS", "dix")])).is_err());
        assert!(EstimatorConfig::from_lookup(lookup(&[("ESTIMATIVOS_MONTHS", "0")])).is_err());
        assert!(EstimatorConfig::from_lookup(lookup(&[("ESTIMATIVOS_CALC_MODE", "sum")])).is_err());
    }
}
