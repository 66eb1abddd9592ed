//! Translation catalog input definitions.

use std::path::Path;

use crate::catalog::{
    Catalog,
    CatalogError,
    Message,
    MessageId,
    PluralRule,
    SourceSpans,
    language::catalog_language,
    parse_catalog_with_spans,
};
use crate::db::I18nDatabase;
use crate::interned::MessageKey;
use crate::types::SourcePosition;

/// Salsa input holding one parsed `.ts` file.
#[salsa::input]
pub struct CatalogFile {
    pub language: String,

    #[returns(ref)]
    pub file_path: String,

    #[returns(ref)]
    pub catalog: Catalog,

    #[returns(ref)]
    pub text: String,

    /// Message key to `<source>` range, for go-to-definition.
    #[returns(ref)]
    pub source_spans: SourceSpans,
}

impl CatalogFile {
    /// Message whose `<source>` element contains `position`.
    pub fn message_at_position(
        self,
        db: &dyn I18nDatabase,
        position: SourcePosition,
    ) -> Option<MessageKey<'_>> {
        self.source_spans(db)
            .iter()
            .find(|(_, range)| range.contains(position))
            .map(|(id, _)| MessageKey::from_id(db, id))
    }

    /// Looks up a message; later duplicates in the file win.
    pub fn find_message<'db>(
        self,
        db: &'db dyn I18nDatabase,
        id: &MessageId,
    ) -> Option<&'db Message> {
        self.catalog(db).find(id)
    }

    #[must_use]
    pub fn plural_rule(self, db: &dyn I18nDatabase) -> PluralRule {
        PluralRule::for_language(&self.language(db))
    }
}

/// Parses catalog text into a new input.
///
/// # Errors
/// Returns `CatalogError` when the text is not a valid `.ts` document.
pub fn catalog_file_from_text(
    db: &dyn I18nDatabase,
    file_path: &Path,
    text: String,
) -> Result<CatalogFile, CatalogError> {
    let (catalog, spans) = parse_catalog_with_spans(&text)?;
    let language = catalog_language(&catalog, file_path);
    Ok(CatalogFile::new(
        db,
        language,
        file_path.to_string_lossy().to_string(),
        catalog,
        text,
        spans,
    ))
}

/// Loads a catalog file and creates a `CatalogFile` input.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_catalog_file(
    db: &dyn I18nDatabase,
    file_path: &Path,
) -> Result<CatalogFile, CatalogError> {
    let text = std::fs::read_to_string(file_path)?;
    catalog_file_from_text(db, file_path, text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;

    use super::*;
    use crate::db::I18nDatabaseImpl;

    const TEXT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.0">
<context>
    <name>Matrix</name>
    <message>
        <source>Rows</source>
        <translation>Righe</translation>
    </message>
</context>
</TS>
"#;

    #[googletest::test]
    fn language_comes_from_file_name_when_attribute_is_missing() {
        let db = I18nDatabaseImpl::default();

        let file =
            catalog_file_from_text(&db, Path::new("/ws/qtiplot_it.ts"), TEXT.to_string()).unwrap();

        expect_that!(file.language(&db), eq("it"));
        expect_that!(file.plural_rule(&db), eq(PluralRule::NotOne));
        expect_that!(file.catalog(&db).contexts.len(), eq(1));
    }

    #[googletest::test]
    fn finds_message_at_position() {
        let db = I18nDatabaseImpl::default();
        let file =
            catalog_file_from_text(&db, Path::new("/ws/qtiplot_it.ts"), TEXT.to_string()).unwrap();

        let key = file.message_at_position(&db, SourcePosition { line: 6, character: 18 });
        let outside = file.message_at_position(&db, SourcePosition { line: 7, character: 18 });

        expect_that!(key.map(|k| k.source(&db).as_str()), some(eq("Rows")));
        expect_that!(key.map(|k| k.context(&db).as_str()), some(eq("Matrix")));
        expect_that!(outside, none());
    }

    #[googletest::test]
    fn malformed_text_is_an_error() {
        let db = I18nDatabaseImpl::default();

        let result = catalog_file_from_text(&db, Path::new("/ws/a_it.ts"), "<TS><context>".into());

        expect_that!(result.is_err(), eq(true));
    }
}
