//! Stock Change Repository
//!
//! Append-only audit trail. No update or delete operations exist here on
//! purpose.

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::StockChange;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "stock_change";

#[derive(Clone)]
pub struct StockChangeRepository {
    base: BaseRepository,
}

impl StockChangeRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Append an audit row
    pub async fn append(&self, change: StockChange) -> RepoResult<StockChange> {
        let created: Option<StockChange> = self.base.db().create(TABLE).content(change).await?;
        created.ok_or_else(|| RepoError::Database("Failed to record stock change".to_string()))
    }

    /// Recent changes, optionally scoped to one product
    pub async fn find_recent(
        &self,
        product_id: Option<String>,
        limit: i64,
    ) -> RepoResult<Vec<StockChange>> {
        let changes: Vec<StockChange> = match product_id {
            Some(pid) => {
                self.base
                    .db()
                    .query(
                        "SELECT * FROM stock_change WHERE product = $product \
                         ORDER BY created_at DESC LIMIT $limit",
                    )
                    .bind(("product", record_id("product", &pid)?))
                    .bind(("limit", limit))
                    .await?
                    .take(0)?
            }
            None => {
                self.base
                    .db()
                    .query("SELECT * FROM stock_change ORDER BY created_at DESC LIMIT $limit")
                    .bind(("limit", limit))
                    .await?
                    .take(0)?
            }
        };
        Ok(changes)
    }
}
