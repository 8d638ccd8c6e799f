//! Comanda Server - restaurant order, inventory and delivery backend
//!
//! # Module structure
//!
//! ```text
//! src/
//! ├── core/       # configuration, shared state, server lifecycle
//! ├── auth/       # JWT validation, request identity
//! ├── api/        # HTTP routes and handlers
//! ├── orders/     # checkout, status lifecycle, item normalization
//! ├── inventory/  # stock ledger, product matching, reconciliation
//! ├── dispatch/   # driver assignment lifecycle
//! ├── db/         # embedded SurrealDB, models, repositories
//! └── utils/      # errors, logging, time
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod dispatch;
pub mod inventory;
pub mod orders;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use dispatch::DeliveryDispatcher;
pub use inventory::{StockLedger, StockPolicy, StockReconciler};
pub use orders::OrderStore;
pub use utils::error::{AppError, AppResponse};
pub use utils::logger::{init_logger, init_logger_with_file};
pub use utils::result::AppResult;

pub fn print_banner() {
    println!(
        r#"
   ______                                 __
  / ____/___  ____ ___  ____ _____  ____/ /___ _
 / /   / __ \/ __ `__ \/ __ `/ __ \/ __  / __ `/
/ /___/ /_/ / / / / / / /_/ / / / / /_/ / /_/ /
\____/\____/_/ /_/ /_/\__,_/_/ /_/\__,_/\__,_/
    "#
    );
}
