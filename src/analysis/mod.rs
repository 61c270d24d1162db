//! Analysis modules.
//!
//! Summary views derived from the loaded records. Everything here is pure:
//! no I/O, no shared state.

pub mod aggregator;

pub use aggregator::*;
