use std::path::Path;
use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::dispatch::DeliveryDispatcher;
use crate::inventory::{StockLedger, StockReconciler};
use crate::orders::OrderStore;
use crate::utils::error::AppError;

/// Shared server state
///
/// Cloning is cheap: the database handle and JWT service are shared
/// references. Domain services are constructed on demand from the handle.
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// Initialize state: working directory, database, auth
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let data_dir = Path::new(&config.work_dir).join("database");
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| AppError::internal(format!("Failed to create work dir: {e}")))?;

        let db_service = DbService::new(&data_dir).await?;
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self {
            config: config.clone(),
            db: db_service.db,
            jwt_service,
        })
    }

    /// In-memory variant for tests
    pub async fn for_tests(config: Config) -> Result<Self, AppError> {
        let db_service = DbService::memory().await?;
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self {
            config,
            db: db_service.db,
            jwt_service,
        })
    }

    pub fn jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    pub fn order_store(&self) -> OrderStore {
        OrderStore::new(self.db.clone(), self.config.stock_policy)
    }

    pub fn ledger(&self) -> StockLedger {
        StockLedger::new(self.db.clone(), self.config.stock_policy)
    }

    pub fn reconciler(&self) -> StockReconciler {
        StockReconciler::new(self.db.clone(), self.config.reconcile_baseline)
    }

    pub fn dispatcher(&self) -> DeliveryDispatcher {
        DeliveryDispatcher::new(self.db.clone())
    }
}
