//! Utility module - common helpers and types
//!
//! # Contents
//!
//! - [`AppError`] - application error type
//! - [`AppResponse`] - API response envelope
//! - [`logger`] - tracing setup
//! - [`time`] - timestamp helpers

pub mod error;
pub mod logger;
pub mod result;
pub mod time;

pub use error::{AppError, AppResponse};
pub use error::{ok, ok_with_message};
pub use result::AppResult;
