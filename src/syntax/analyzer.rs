//! Extraction of translatable strings from C++ sources and Designer forms.

pub mod context;
pub mod designer;
pub mod extractor;
pub mod literal;
pub mod query_loader;
pub mod types;
