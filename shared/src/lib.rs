//! Shared types for the RestoPOS printer subsystem
//!
//! Data contracts exchanged with the order/settings backend and persisted by
//! the printer registry. Field names follow the backend's camelCase JSON.

pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};
