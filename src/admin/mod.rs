//! Admin write path.
//!
//! Parses submitted form fields and applies them to the institution and
//! demographic collections before persisting through the store.

pub mod form;
pub mod mutator;

pub use form::FormFields;
pub use mutator::apply_admin_write;
