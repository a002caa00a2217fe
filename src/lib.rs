//! # EOL Sentinel
//!
//! An end-of-life intelligence service: given a software product and
//! optional version, it answers how much runway remains before vendor
//! support lapses. A small set of vendor-specific agents (Microsoft, Red
//! Hat, Ubuntu, Apache, Node.js, Python, PHP, `PostgreSQL`, Oracle, VMware)
//! consult static lifecycle tables and live vendor pages; a generic
//! `endoflife.date` client and a headless-search fallback agent cover
//! everything else. The orchestrator routes each query to the right
//! candidates, scores their answers, and derives a risk level from the
//! resulting lifecycle dates.
//!
//! ## Architecture
//!
//! Every subsystem is built once at startup into a single [`App`] value
//! rather than reached for through global statics, the same explicit-
//! dependency shape this crate's own runtime construction uses:
//!
//! ```no_run
//! # async fn example() {
//! use eol_sentinel::{App, AppConfig};
//!
//! let config = AppConfig::default();
//! let app = App::new(config).await.expect("app wiring never fails");
//! let software = eol_sentinel::domain_types::SoftwareName::try_new("ubuntu").expect("non-empty");
//! let response = app.orchestrator.lookup(&software, None, None, false).await;
//! println!("{}", response.success);
//! # }
//! ```

pub mod agents;
pub mod cache;
pub mod config;
pub mod database;
pub mod domain_types;
pub mod error;
pub mod observability;
pub mod orchestrator;
pub mod rest_api;
pub mod server;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{EolError, EolResult};
pub use orchestrator::Orchestrator;

use cache::TieredCache;
use cache::persistent::PersistentTier;
use database::{DatabaseConfig, DatabaseConnection, DatabasePath};
use std::sync::Arc;
use std::time::Duration;
use telemetry::TelemetryCollector;
use tracing::warn;

/// The application's fully wired dependency graph: one cache, one telemetry
/// collector, one orchestrator, shared by every HTTP handler and the CLI
/// binary. Built once at startup and handed out by `Arc` clone, rather than
/// reached for through module-level statics.
pub struct App {
    /// The configuration this instance was built from.
    pub config: AppConfig,
    /// The two-tier cache shared by every agent.
    pub cache: Arc<TieredCache>,
    /// The per-agent request telemetry collector.
    pub telemetry: Arc<TelemetryCollector>,
    /// The routing/scoring/session layer every lookup goes through.
    pub orchestrator: Arc<Orchestrator>,
}

impl App {
    /// Build the full dependency graph from `config`.
    ///
    /// Every subsystem degrades gracefully rather than failing startup: if
    /// the persistent cache database cannot be opened or migrated, the
    /// cache falls back to memory-only operation and a warning is logged,
    ///
    ///
    /// # Errors
    ///
    /// This currently never fails — it is fallible in signature so a future
    /// subsystem that must hard-fail at startup can be added without
    /// breaking callers.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let telemetry = Arc::new(TelemetryCollector::new());

        let persistent = Self::open_persistent_tier(&config).await;
        let cache = TieredCache::new(persistent, config.cache_ttl_days).shared();

        let llm = config.llm_configured().then(|| agents::fallback::LlmConfig {
            endpoint: config.llm_endpoint.clone().unwrap_or_default(),
            deployment: config.llm_deployment.clone().unwrap_or_default(),
            api_version: config
                .llm_api_version
                .clone()
                .unwrap_or_else(|| "2024-02-01".to_string()),
        });

        let orchestrator = Arc::new(Orchestrator::new(
            cache.clone(),
            telemetry.clone(),
            Duration::from_secs(config.http_timeout_secs),
            Duration::from_secs(config.fetch_timeout_secs),
            llm,
        ));

        Ok(Self {
            config,
            cache,
            telemetry,
            orchestrator,
        })
    }

    async fn open_persistent_tier(config: &AppConfig) -> Option<PersistentTier> {
        let path = match DatabasePath::new(&config.cache_db_path) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, path = %config.cache_db_path.display(), "invalid cache database path, degrading to memory-only");
                return None;
            }
        };

        let db_config = DatabaseConfig::new(path);
        match DatabaseConnection::initialize(db_config).await {
            Ok(connection) => Some(PersistentTier::new(&connection)),
            Err(e) => {
                warn!(error = %e, "persistent cache unavailable at startup, degrading to memory-only");
                None
            }
        }
    }

    /// Spawn a background task that periodically re-warms the bulk-capable
    /// vendor agents' caches Returns the `JoinHandle` so the
    /// caller can abort it on shutdown.
    #[must_use]
    pub fn spawn_cache_warmer(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let app = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let results = app.orchestrator.warm_caches().await;
                for (agent, count) in results {
                    tracing::info!(agent, cycles = count, "cache warming complete");
                }
            }
        })
    }
}
