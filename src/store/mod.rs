//! Tabular storage for the dashboard data files.
//!
//! This module reads and writes the institutions and demographics CSV
//! files and seeds them from bundled defaults on first access.

pub mod error;
pub mod tabular;

pub use error::{StoreError, StoreResult};
pub use tabular::{InstitutionSnapshot, TabularStore};
