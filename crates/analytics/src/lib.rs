//! Analytics engine crate.
//!
//! Read-only rankings and concentration measures over the mineral cache.

pub mod concentration;
pub mod dominance;
pub mod engine;

pub use concentration::{herfindahl_index, Concentration, ConcentrationBand};
pub use dominance::DominanceEntry;
pub use engine::{AnalyticsEngine, MarketShare, ProducerEntry};
