//! Shared types, config, and error definitions for the minerals dashboard.

pub mod catalogue;
pub mod config;
pub mod error;
pub mod types;

pub use catalogue::{MineralCatalogue, ALL_MINERALS_KEY};
pub use config::DashboardConfig;
pub use error::Error;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
