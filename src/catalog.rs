//! Qt Linguist `.ts` translation catalogs.
/// Catalog errors
mod error;
/// Language detection
pub mod language;
/// Runtime lookup
mod lookup;
/// `lupdate`-style merge
mod merge;
/// Data model
mod model;
/// Plural rules
pub mod numerus;
/// XML reader
mod parser;
/// XML writer
mod writer;

pub use error::CatalogError;
pub use lookup::Translator;
pub use merge::{
    ExtractedMessage,
    UpdateOptions,
    UpdateSummary,
    update_catalog,
};
pub use model::{
    Catalog,
    CatalogStatistics,
    Context,
    LineRef,
    Location,
    Message,
    MessageId,
    TranslationStatus,
    TranslationText,
};
pub use numerus::PluralRule;
pub use parser::{
    SourceSpans,
    load_catalog,
    parse_catalog,
    parse_catalog_with_spans,
};
pub use writer::{
    LocationMode,
    WriteOptions,
    save_catalog,
    write_catalog,
};
