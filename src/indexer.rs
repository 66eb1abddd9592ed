//! Workspace indexing: discovers catalogs and sources and feeds them into the database.

pub mod types;
pub mod workspace;
