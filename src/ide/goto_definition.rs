//! Go to Definition implementation

use tower_lsp::lsp_types::{
    Location,
    Url,
};

use crate::db::I18nDatabase;
use crate::input::catalog::CatalogFile;
use crate::interned::MessageKey;

/// Find the `<source>` elements of a message
///
/// # Arguments
/// * `db` - Salsa database
/// * `key` - Message key
/// * `catalogs` - All loaded catalogs
///
/// # Returns
/// One location per catalog that contains the message
pub fn find_definitions(
    db: &dyn I18nDatabase,
    key: MessageKey<'_>,
    catalogs: &[CatalogFile],
) -> Vec<Location> {
    let id = key.to_id(db);
    let mut locations = Vec::new();

    for catalog in catalogs {
        let Some(range) = catalog.source_spans(db).get(&id) else {
            continue;
        };

        let file_path = catalog.file_path(db);
        let Ok(uri) = Url::from_file_path(file_path) else {
            tracing::warn!("Failed to create URI from file path: {}", file_path);
            continue;
        };

        locations.push(Location { uri, range: (*range).into() });
    }

    locations
}
