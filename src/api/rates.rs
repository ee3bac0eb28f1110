// ============================================================================
// API Client : taux de change USD/UYU
// ============================================================================
// Une seule requête, sans cache, au démarrage. Le résultat n'est appliqué
// que si la vue qui l'a demandé est toujours vivante.
//
// CONCEPTS RUST :
// 1. async/await avec reqwest
// 2. thiserror : une variante d'erreur par cause, chacune avec son libellé
// 3. Arc<AtomicBool> : drapeau de vie partagé entre la vue et le worker
// 4. RAII : le drapeau passe à false quand la garde est détruite
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Flux par défaut (taux base USD)
pub const DEFAULT_RATE_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Libellé pendant le chargement
pub const LOADING_LABEL: &str = "cargando...";
/// Libellé quand la réponse ne contient pas de taux utilisable
pub const NO_RATE_LABEL: &str = "sin tasa disponible";
/// Libellé quand la requête elle-même échoue
pub const OFFLINE_LABEL: &str = "sin conexion para tasa USD/UYU";

// ============================================================================
// Erreurs
// ============================================================================

/// Causes d'échec de la récupération du taux
#[derive(Debug, Error)]
pub enum RateError {
    #[error("requête HTTP échouée : {0}")]
    Network(#[from] reqwest::Error),

    #[error("le flux a retourné HTTP {0}")]
    Status(u16),

    #[error("réponse illisible : {0}")]
    Parse(#[from] serde_json::Error),

    #[error("aucune cotation UYU dans la réponse")]
    MissingQuote,

    #[error("taux non fini")]
    NonFinite,

    #[error("taux non positif : {0}")]
    NonPositive(f64),
}

impl RateError {
    /// Libellé visible par l'utilisateur
    pub fn label(&self) -> &'static str {
        match self {
            RateError::Network(_) | RateError::Status(_) | RateError::Parse(_) => OFFLINE_LABEL,
            RateError::MissingQuote | RateError::NonFinite | RateError::NonPositive(_) => {
                NO_RATE_LABEL
            }
        }
    }
}

// ============================================================================
// Statut du taux
// ============================================================================

/// État du taux tel que l'affiche l'en-tête
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RateStatus {
    #[default]
    Loading,
    Available { uyu_per_usd: f64, label: String },
    Unavailable { label: String },
}

impl RateStatus {
    /// Convertit le résultat d'une récupération en statut affichable
    pub fn from_outcome(outcome: Result<f64, RateError>) -> Self {
        match outcome.and_then(checked_rate) {
            Ok(rate) => RateStatus::Available {
                uyu_per_usd: rate,
                label: format!("1 USD = {rate:.2} UYU"),
            },
            Err(e) => RateStatus::Unavailable { label: e.label().to_string() },
        }
    }

    /// Taux chargé, None tant qu'il n'est pas disponible
    pub fn rate(&self) -> Option<f64> {
        match self {
            RateStatus::Available { uyu_per_usd, .. } => Some(*uyu_per_usd),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RateStatus::Loading => LOADING_LABEL,
            RateStatus::Available { label, .. } | RateStatus::Unavailable { label } => label,
        }
    }
}

// ============================================================================
// Réponse JSON
// ============================================================================

/// Réponse de open.er-api.com (seul le champ utile est lu)
#[derive(Debug, Deserialize)]
struct RateResponse {
    rates: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Extrait le taux UYU d'un corps JSON brut
///
/// La cotation peut arriver en nombre ou en texte ; elle doit être finie
/// et strictement positive.
pub fn parse_rate_body(body: &str) -> Result<f64, RateError> {
    let response: RateResponse = serde_json::from_str(body)?;
    let quote = response
        .rates
        .as_ref()
        .and_then(|rates| rates.get("UYU"))
        .ok_or(RateError::MissingQuote)?;

    let rate = match quote {
        serde_json::Value::Number(n) => n.as_f64().ok_or(RateError::NonFinite)?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().map_err(|_| RateError::NonFinite)?,
        _ => return Err(RateError::MissingQuote),
    };

    checked_rate(rate)
}

/// Un taux n'est retenu que s'il est fini et strictement positif
fn checked_rate(rate: f64) -> Result<f64, RateError> {
    if !rate.is_finite() {
        return Err(RateError::NonFinite);
    }
    if rate <= 0.0 {
        return Err(RateError::NonPositive(rate));
    }
    Ok(rate)
}

/// Récupère le nombre de UYU pour 1 USD
#[instrument]
pub async fn fetch_uyu_per_usd(url: &str) -> Result<f64, RateError> {
    debug!("Creating HTTP client");
    let client = reqwest::Client::builder()
        .user_agent(concat!("estimativos/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client
        .get(url)
        .header(reqwest::header::CACHE_CONTROL, "no-store")
        .send()
        .await?;

    let status = response.status();
    debug!(status = %status, "Received HTTP response");
    if !status.is_success() {
        return Err(RateError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    let rate = parse_rate_body(&body)?;
    info!(rate, "Exchange rate fetched");
    Ok(rate)
}

// ============================================================================
// Drapeau de vie
// ============================================================================

/// Garde détenue par la vue consommatrice ; sa destruction marque la vue
/// comme démontée
#[derive(Debug)]
pub struct LivenessGuard {
    alive: Arc<AtomicBool>,
}

/// Copie du drapeau transmise à la tâche asynchrone
#[derive(Debug, Clone)]
pub struct LivenessToken {
    alive: Arc<AtomicBool>,
}

impl LivenessGuard {
    pub fn new() -> Self {
        Self { alive: Arc::new(AtomicBool::new(true)) }
    }

    pub fn token(&self) -> LivenessToken {
        LivenessToken { alive: Arc::clone(&self.alive) }
    }
}

impl Default for LivenessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl LivenessToken {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Attend `fetch` puis envoie le statut, seulement si la vue est vivante
///
/// Retourne true si le statut a été livré.
pub async fn deliver_if_alive<F>(
    token: &LivenessToken,
    fetch: F,
    tx: &mpsc::Sender<RateStatus>,
) -> bool
where
    F: std::future::Future<Output = Result<f64, RateError>>,
{
    let outcome = fetch.await;
    if !token.is_alive() {
        debug!("View torn down before rate arrived, discarding");
        return false;
    }

    if let Err(e) = &outcome {
        warn!(error = %e, "Exchange rate unavailable");
    }
    tx.send(RateStatus::from_outcome(outcome)).is_ok()
}

/// Lance la récupération dans un thread dédié avec son propre runtime tokio
///
/// CONCEPT : fire-and-forget
/// - l'UI ne bloque jamais ; le statut arrive plus tard sur `tx`
/// - pas de retry, pas de timeout au-delà du drapeau de vie
pub fn spawn_rate_fetch(
    url: String,
    token: LivenessToken,
    tx: mpsc::Sender<RateStatus>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = ?e, "Failed to create tokio runtime for rate fetch");
                return;
            }
        };
        runtime.block_on(async {
            deliver_if_alive(&token, fetch_uyu_per_usd(&url), &tx).await;
        });
    })
}

// ============================================================================
// Tests unitaires
// ============================================================================
