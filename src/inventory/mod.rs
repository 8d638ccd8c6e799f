//! Inventory: stock ledger, product matching, reconciliation

pub mod ledger;
pub mod matcher;
pub mod reconcile;

pub use ledger::{StockLedger, StockMovement, StockPolicy};
pub use matcher::ProductIndex;
pub use reconcile::{ReconcileReport, StockReconciler};
