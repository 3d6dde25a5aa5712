//! Data models
//!
//! `Order` and `Settings` arrive from the backend REST API and are read-only
//! here. `PrinterDevice` / `ConfiguredPrinter` belong to the printer registry.

pub mod order;
pub mod printer;
pub mod settings;

// Re-exports
pub use order::*;
pub use printer::*;
pub use settings::*;
