//! Common types for the tabula client engine and data sources

pub use ciborium;

pub mod codec;
pub mod columns;
pub mod counter;
pub mod fetch;
pub mod ids;
pub mod preferences;
pub mod query;
