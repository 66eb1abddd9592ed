//! Salsa inputs.
pub mod catalog;
pub mod source;
