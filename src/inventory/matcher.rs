//! Product matching for reconciliation
//!
//! Legacy order lines reference products loosely. Resolution runs in three
//! tiers, strongest first:
//!
//! 1. product id (record key)
//! 2. exact name, case-insensitive
//! 3. name with all whitespace removed, case-insensitive
//!
//! Checkout never uses the name tiers; only the reconciliation engine does.

use crate::db::models::Product;
use crate::orders::items::LineItem;
use std::collections::HashMap;

/// In-memory index over the full product list
pub struct ProductIndex {
    products: Vec<Product>,
    by_key: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    by_squashed_name: HashMap<String, usize>,
}

impl ProductIndex {
    pub fn new(products: Vec<Product>) -> Self {
        let mut by_key = HashMap::new();
        let mut by_name = HashMap::new();
        let mut by_squashed_name = HashMap::new();

        for (i, product) in products.iter().enumerate() {
            if let Some(id) = &product.id {
                by_key.insert(id.key().to_string(), i);
            }
            // first writer wins on duplicate names
            by_name.entry(product.name.to_lowercase()).or_insert(i);
            by_squashed_name
                .entry(squash(&product.name))
                .or_insert(i);
        }

        Self {
            products,
            by_key,
            by_name,
            by_squashed_name,
        }
    }

    /// Resolve a line item to a product, or `None` when no tier matches
    pub fn resolve(&self, item: &LineItem) -> Option<&Product> {
        if let Some(id) = &item.product_id
            && let Some(&i) = self.by_key.get(id.as_str())
        {
            return Some(&self.products[i]);
        }
        if let Some(name) = &item.name {
            if let Some(&i) = self.by_name.get(&name.to_lowercase()) {
                return Some(&self.products[i]);
            }
            if let Some(&i) = self.by_squashed_name.get(&squash(name)) {
                return Some(&self.products[i]);
            }
        }
        None
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrealdb::RecordId;

    fn product(key: &str, name: &str) -> Product {
        Product {
            id: Some(RecordId::from_table_key("product", key)),
            name: name.to_string(),
            price: 10.0,
            stock: 5,
            category: None,
            is_available: true,
            is_featured: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn item(product_id: Option<&str>, name: Option<&str>) -> LineItem {
        LineItem {
            product_id: product_id.map(|s| s.to_string()),
            name: name.map(|s| s.to_string()),
            quantity: 1,
            unit_price: 0.0,
        }
    }

    #[test]
    fn resolves_by_id_first() {
        let index = ProductIndex::new(vec![product("p1", "Tacos"), product("p2", "Tacos")]);
        let hit = index.resolve(&item(Some("p2"), Some("Tacos"))).unwrap();
        assert_eq!(hit.id.as_ref().unwrap().key().to_string(), "p2");
    }

    #[test]
    fn falls_back_to_case_insensitive_name() {
        let index = ProductIndex::new(vec![product("p1", "Café con Leche")]);
        let hit = index.resolve(&item(None, Some("café CON leche"))).unwrap();
        assert_eq!(hit.name, "Café con Leche");
    }

    #[test]
    fn falls_back_to_whitespace_stripped_name() {
        let index = ProductIndex::new(vec![product("p1", "Pan con Tomate")]);
        let hit = index.resolve(&item(None, Some("pancontomate"))).unwrap();
        assert_eq!(hit.name, "Pan con Tomate");
    }

    #[test]
    fn unknown_id_does_not_fall_through_to_wrong_product() {
        let index = ProductIndex::new(vec![product("p1", "Tacos")]);
        // id is unknown but the name still matches tier 2
        let hit = index.resolve(&item(Some("missing"), Some("tacos")));
        assert!(hit.is_some());
        // neither id nor name known
        assert!(index.resolve(&item(Some("missing"), Some("Burrito"))).is_none());
    }
}
