//! Line-item normalization
//!
//! Historical order rows store `items` in heterogeneous shapes: a JSON array,
//! a string containing JSON, ids and quantities as numbers or strings, and
//! lines carrying only a display name. Everything is normalized here, once,
//! at the persistence boundary; the rest of the call stack only ever sees
//! [`LineItem`].

use serde_json::Value;
use thiserror::Error;

/// A normalized order line
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    /// Product record key, when the line carries a resolvable id
    pub product_id: Option<String>,
    /// Display name, used as a matching fallback for legacy rows
    pub name: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
}

/// The whole blob is unusable (order counts as `invalid`)
#[derive(Debug, Error, PartialEq)]
pub enum ItemsError {
    #[error("items is a string but not valid JSON: {0}")]
    UnparseableJson(String),

    #[error("items is not an array (found {0})")]
    NotAnArray(&'static str),
}

/// A single line failed to coerce (skipped, never aborts the batch)
#[derive(Debug, Error, PartialEq)]
pub enum ItemError {
    #[error("line {0} is not an object")]
    NotAnObject(usize),

    #[error("line {0} has no numeric quantity")]
    BadQuantity(usize),

    #[error("line {0} has neither a product id nor a name")]
    Unidentifiable(usize),
}

/// Split an items blob into raw line values
///
/// Accepts an array directly or a string containing a JSON array. Anything
/// else makes the whole order invalid.
pub fn parse_items(raw: &Value) -> Result<Vec<Value>, ItemsError> {
    match raw {
        Value::Array(lines) => Ok(lines.clone()),
        Value::String(encoded) => {
            let parsed: Value = serde_json::from_str(encoded)
                .map_err(|e| ItemsError::UnparseableJson(e.to_string()))?;
            match parsed {
                Value::Array(lines) => Ok(lines),
                other => Err(ItemsError::NotAnArray(type_name(&other))),
            }
        }
        other => Err(ItemsError::NotAnArray(type_name(other))),
    }
}

/// Coerce one raw line into a [`LineItem`]
pub fn coerce_item(index: usize, raw: &Value) -> Result<LineItem, ItemError> {
    let obj = raw.as_object().ok_or(ItemError::NotAnObject(index))?;

    let product_id = ["product_id", "productId", "id"]
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(coerce_id);

    let name = ["name", "product_name", "nombre"]
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    if product_id.is_none() && name.is_none() {
        return Err(ItemError::Unidentifiable(index));
    }

    let quantity = ["quantity", "qty", "cantidad"]
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(coerce_quantity)
        .ok_or(ItemError::BadQuantity(index))?;
    if quantity < 1 {
        return Err(ItemError::BadQuantity(index));
    }

    let unit_price = ["unit_price", "price", "precio"]
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(coerce_number)
        .unwrap_or(0.0);

    Ok(LineItem {
        product_id,
        name,
        quantity,
        unit_price,
    })
}

/// Normalize an entire blob, separating usable lines from itemized failures
pub fn normalize_items(raw: &Value) -> Result<(Vec<LineItem>, Vec<ItemError>), ItemsError> {
    let lines = parse_items(raw)?;
    let mut items = Vec::with_capacity(lines.len());
    let mut skipped = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        match coerce_item(index, line) {
            Ok(item) => items.push(item),
            Err(e) => skipped.push(e),
        }
    }
    Ok((items, skipped))
}

/// Product ids appear as numbers, numeric strings, or "product:key" strings
fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            Some(s.strip_prefix("product:").unwrap_or(s).to_string())
        }
        _ => None,
    }
}

/// Quantities appear as integers, floats, and numeric strings
fn coerce_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_structured_array() {
        let raw = json!([{"product_id": "abc", "name": "Ribeye", "quantity": 2, "unit_price": 25.5}]);
        let (items, skipped) = normalize_items(&raw).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id.as_deref(), Some("abc"));
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_price, 25.5);
    }

    #[test]
    fn accepts_string_encoded_array() {
        let raw = json!(r#"[{"id": 7, "qty": "3", "price": "10.0"}]"#);
        let (items, skipped) = normalize_items(&raw).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(items[0].product_id.as_deref(), Some("7"));
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].unit_price, 10.0);
    }

    #[test]
    fn strips_table_prefix_from_id() {
        let raw = json!([{"product_id": "product:xyz", "quantity": 1}]);
        let (items, _) = normalize_items(&raw).unwrap();
        assert_eq!(items[0].product_id.as_deref(), Some("xyz"));
    }

    #[test]
    fn rejects_unparseable_string() {
        let raw = json!("not json at all");
        assert!(matches!(
            normalize_items(&raw),
            Err(ItemsError::UnparseableJson(_))
        ));
    }

    #[test]
    fn rejects_non_array_shapes() {
        assert!(matches!(
            normalize_items(&json!({"a": 1})),
            Err(ItemsError::NotAnArray("object"))
        ));
        assert!(matches!(
            normalize_items(&json!(42)),
            Err(ItemsError::NotAnArray("number"))
        ));
    }

    #[test]
    fn skips_bad_lines_without_aborting() {
        let raw = json!([
            {"product_id": 1, "quantity": 2},
            {"quantity": 5},
            {"product_id": 2, "quantity": "many"},
            {"name": "Flan", "cantidad": 1}
        ]);
        let (items, skipped) = normalize_items(&raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0], ItemError::Unidentifiable(1));
        assert_eq!(skipped[1], ItemError::BadQuantity(2));
        assert_eq!(items[1].name.as_deref(), Some("Flan"));
    }

    #[test]
    fn zero_and_negative_quantities_are_skipped() {
        let raw = json!([{"product_id": 1, "quantity": 0}, {"product_id": 2, "quantity": -3}]);
        let (items, skipped) = normalize_items(&raw).unwrap();
        assert!(items.is_empty());
        assert_eq!(skipped.len(), 2);
    }
}
