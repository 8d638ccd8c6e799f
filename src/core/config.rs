use crate::auth::JwtConfig;
use crate::inventory::ledger::StockPolicy;
use crate::inventory::reconcile::DEFAULT_BASELINE;

/// Server configuration
///
/// Every field can be overridden through an environment variable:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/comanda | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | development / staging / production |
/// | STOCK_POLICY | clamp | Checkout decrement policy: clamp / strict |
/// | RECONCILE_BASELINE | 100 | Starting stock for baseline recomputes |
/// | JWT_SECRET | (generated in dev) | Token signing secret, min 32 chars |
/// | JWT_EXPIRATION_MINUTES | 1440 | Token lifetime |
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    /// How checkout behaves when stock would go negative
    pub stock_policy: StockPolicy,
    /// Starting stock used by baseline recomputes
    pub reconcile_baseline: i64,
    pub jwt: JwtConfig,
}

impl Config {
    /// Load configuration from environment variables, defaulting the rest
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/comanda".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            stock_policy: std::env::var("STOCK_POLICY")
                .ok()
                .and_then(|v| StockPolicy::parse(&v))
                .unwrap_or_default(),
            reconcile_baseline: std::env::var("RECONCILE_BASELINE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BASELINE),
            jwt: JwtConfig::default(),
        }
    }

    /// Override the filesystem/port bindings (used by tests)
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
