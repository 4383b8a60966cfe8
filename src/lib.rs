//! ECommerce API
//!
//! Declares the customer and admin identity realms, the scopes they issue,
//! and the products and orders API guarded by them. The same surface drives
//! the synthesized manifest and the local edge that enforces it.

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod policy;
pub mod server;
pub mod stack;
pub mod surface;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, BuildError, Result};
