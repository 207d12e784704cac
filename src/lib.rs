// Core modules
pub mod api;
pub mod config;
pub mod engine;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod persistence;
pub mod server;
pub mod strategy;

// Re-export commonly used types
pub use api::{Exchange, Notifier};
pub use config::Config;
pub use engine::{CycleSummary, Engine};
pub use models::*;
pub use persistence::{Ledger, TradeLedger};
pub use strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
