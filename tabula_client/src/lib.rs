//! Client side engine for server side tables.
//!
//! A [table::ServerSideTable] keeps pagination, sorting, filtering, selection
//! and preferences consistent while pages load asynchronously and possibly
//! out of order:
//! - First build a [preference_store::PreferenceStore] over a storage
//!   backend. It outlives individual tables.
//! - Then mount a table against a [tabula_common::fetch::DataSource].
//! - Feed it user interactions, drive it with
//!   [table::ServerSideTable::next_event], and render
//!   [table::ServerSideTable::view] snapshots.

pub use tabula_common;

pub mod clock;
pub mod columns;
pub mod filter;
pub mod orchestrator;
pub mod preference_store;
pub mod selection;
pub mod storage;
pub mod table;
pub mod view;
