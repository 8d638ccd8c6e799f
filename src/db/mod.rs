//! Database Module
//!
//! Owns the embedded SurrealDB instance and index definitions.

pub mod models;
pub mod repository;

use crate::utils::AppError;
use std::path::Path;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

const NS: &str = "comanda";
const DB: &str = "main";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database under `data_dir`
    pub async fn new(data_dir: &Path) -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(data_dir)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        Self::prepare(db).await
    }

    /// Open an in-memory database (tests)
    pub async fn memory() -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;
        Self::prepare(db).await
    }

    async fn prepare(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns(NS)
            .use_db(DB)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        // Indexes for the hot query paths; tables stay schemaless
        let definitions = [
            "DEFINE INDEX IF NOT EXISTS product_name ON product FIELDS name",
            "DEFINE INDEX IF NOT EXISTS order_status ON order FIELDS status",
            "DEFINE INDEX IF NOT EXISTS order_table ON order FIELDS table_name",
            "DEFINE INDEX IF NOT EXISTS assignment_order ON delivery_assignment FIELDS `order`",
            "DEFINE INDEX IF NOT EXISTS assignment_driver ON delivery_assignment FIELDS driver",
            "DEFINE INDEX IF NOT EXISTS stock_change_product ON stock_change FIELDS product",
        ];
        for stmt in definitions {
            db.query(stmt)
                .await
                .map_err(|e| AppError::database(format!("Failed to define index: {e}")))?;
        }

        tracing::info!("Database ready (ns={}, db={})", NS, DB);
        Ok(Self { db })
    }
}
