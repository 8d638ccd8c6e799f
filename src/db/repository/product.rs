//! Product Repository
//!
//! Includes the conditional stock UPDATE statements the inventory ledger is
//! built on. Each of those is a single atomic statement; check-then-write
//! races are resolved by the database, not by application locks.

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{Product, ProductCreate, ProductUpdate};
use crate::utils::time::now_rfc3339;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "product";

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all products (admin view)
    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product ORDER BY name")
            .await?
            .take(0)?;
        Ok(products)
    }

    /// Find available products (menu view)
    pub async fn find_available(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product WHERE is_available = true ORDER BY name")
            .await?
            .take(0)?;
        Ok(products)
    }

    /// Find product by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        let rid = record_id(TABLE, id)?;
        let product: Option<Product> = self.base.db().select(rid).await?;
        Ok(product)
    }

    /// Create a new product
    pub async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        let now = now_rfc3339();
        let product = Product {
            id: None,
            name: data.name,
            price: data.price,
            stock: data.stock.unwrap_or(0),
            category: data.category,
            is_available: data.is_available.unwrap_or(true),
            is_featured: data.is_featured.unwrap_or(false),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };

        let created: Option<Product> = self.base.db().create(TABLE).content(product).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    /// Update product fields (stock excluded; it moves through the ledger)
    pub async fn update(&self, id: &str, data: ProductUpdate) -> RepoResult<Product> {
        let rid = record_id(TABLE, id)?;
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))?;

        let name = data.name.unwrap_or(existing.name);
        let price = data.price.unwrap_or(existing.price);
        let category = data.category.or(existing.category);
        let is_available = data.is_available.unwrap_or(existing.is_available);
        let is_featured = data.is_featured.unwrap_or(existing.is_featured);

        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET name = $name, price = $price, category = $category, \
                 is_available = $is_available, is_featured = $is_featured, \
                 updated_at = $now RETURN AFTER",
            )
            .bind(("id", rid))
            .bind(("name", name))
            .bind(("price", price))
            .bind(("category", category))
            .bind(("is_available", is_available))
            .bind(("is_featured", is_featured))
            .bind(("now", now_rfc3339()))
            .await?;
        let products: Vec<Product> = result.take(0)?;
        products
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    /// Hard delete a product (admin-only destructive op)
    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        let rid = record_id(TABLE, id)?;
        let deleted: Option<Product> = self.base.db().delete(rid).await?;
        if deleted.is_none() {
            return Err(RepoError::NotFound(format!("Product {} not found", id)));
        }
        Ok(())
    }

    // =========================================================================
    // Stock counters (single-statement conditional updates)
    // =========================================================================

    /// Decrement stock, clamped at zero
    ///
    /// Returns `(previous, new)`; `None` when the product does not exist.
    /// The requested quantity may exceed recorded stock without erroring at
    /// this layer; sufficiency validation is the caller's responsibility.
    pub async fn decrement_stock_clamped(
        &self,
        id: &str,
        quantity: i64,
    ) -> RepoResult<Option<(i64, i64)>> {
        let rid = record_id(TABLE, id)?;
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET stock = math::max([0, stock - $qty]), updated_at = $now \
                 RETURN BEFORE",
            )
            .bind(("id", rid))
            .bind(("qty", quantity))
            .bind(("now", now_rfc3339()))
            .await?;
        let before: Vec<Product> = result.take(0)?;
        Ok(before
            .into_iter()
            .next()
            .map(|p| (p.stock, (p.stock - quantity).max(0))))
    }

    /// Decrement stock only when sufficient (compare-and-swap)
    ///
    /// Returns `(previous, new)`; `None` when the row was not updated, i.e.
    /// stock was insufficient or the product does not exist.
    pub async fn decrement_stock_checked(
        &self,
        id: &str,
        quantity: i64,
    ) -> RepoResult<Option<(i64, i64)>> {
        let rid = record_id(TABLE, id)?;
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET stock = stock - $qty, updated_at = $now \
                 WHERE stock >= $qty RETURN BEFORE",
            )
            .bind(("id", rid))
            .bind(("qty", quantity))
            .bind(("now", now_rfc3339()))
            .await?;
        let before: Vec<Product> = result.take(0)?;
        Ok(before
            .into_iter()
            .next()
            .map(|p| (p.stock, p.stock - quantity)))
    }

    /// Increment stock (no upper clamp)
    pub async fn increment_stock(&self, id: &str, quantity: i64) -> RepoResult<Option<(i64, i64)>> {
        let rid = record_id(TABLE, id)?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $id SET stock = stock + $qty, updated_at = $now RETURN BEFORE")
            .bind(("id", rid))
            .bind(("qty", quantity))
            .bind(("now", now_rfc3339()))
            .await?;
        let before: Vec<Product> = result.take(0)?;
        Ok(before
            .into_iter()
            .next()
            .map(|p| (p.stock, p.stock + quantity)))
    }

    /// Overwrite the stock counter (admin manual set, reconciliation writes)
    pub async fn set_stock(&self, id: &str, new_stock: i64) -> RepoResult<Option<(i64, i64)>> {
        let rid = record_id(TABLE, id)?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $id SET stock = $stock, updated_at = $now RETURN BEFORE")
            .bind(("id", rid))
            .bind(("stock", new_stock))
            .bind(("now", now_rfc3339()))
            .await?;
        let before: Vec<Product> = result.take(0)?;
        Ok(before.into_iter().next().map(|p| (p.stock, new_stock)))
    }
}
