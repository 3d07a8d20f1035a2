//! Mock data sources for server side tables.
//!
//! Rows live in memory in a [table::TableStore]; a [source::MockDataSource]
//! answers page requests from it with simulated latency and optional
//! failures.

pub use tabula_common;

pub mod distribution;
pub mod source;
pub mod table;
