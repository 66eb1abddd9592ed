//! References implementation

use std::collections::HashMap;
use std::path::PathBuf;

use tower_lsp::lsp_types::Location;

use crate::db::I18nDatabase;
use crate::input::source::SourceFile;
use crate::interned::MessageKey;
use crate::syntax::analyze_source;

/// Find all usages of a message across all source files
///
/// `MessageKey` はインターン化されているため、同一キーの比較は ID の比較になる。
///
/// # Returns
/// List of locations sorted by URI and position
pub fn find_references<S: std::hash::BuildHasher>(
    db: &dyn I18nDatabase,
    key: MessageKey<'_>,
    source_files: &HashMap<PathBuf, SourceFile, S>,
) -> Vec<Location> {
    let mut locations = Vec::new();

    for source_file in source_files.values() {
        // Get usages for this file (cached by Salsa)
        let usages = analyze_source(db, *source_file);

        for usage in usages.into_iter().filter(|usage| usage.key(db) == key) {
            let uri = source_file.uri(db);

            // URI のパースに失敗した場合はスキップ
            let Ok(parsed_uri) = uri.parse() else {
                tracing::warn!("Failed to parse URI: {}", uri);
                continue;
            };

            locations.push(Location { uri: parsed_uri, range: usage.range(db).into() });
        }
    }

    locations.sort_by(|a, b| {
        a.uri
            .as_str()
            .cmp(b.uri.as_str())
            .then_with(|| a.range.start.line.cmp(&b.range.start.line))
            .then_with(|| a.range.start.character.cmp(&b.range.start.character))
    });
    locations
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;

    use super::*;
    use crate::db::I18nDatabaseImpl;
    use crate::test_utils::create_source;

    #[googletest::test]
    fn find_references_across_files() {
        let db = I18nDatabaseImpl::default();
        let graph = create_source(
            &db,
            "file:///ws/Graph.cpp",
            "void Graph::a() { tr(\"Title\"); }\nvoid Graph::b() { tr(\"Title\"); tr(\"Axis\"); }\n",
        );
        let header = create_source(
            &db,
            "file:///ws/Graph.h",
            "class Graph { void c() { tr(\"Title\"); } };\n",
        );
        let other = create_source(&db, "file:///ws/Matrix.cpp", "void Matrix::a() { tr(\"Title\"); }\n");
        let source_files = HashMap::from([
            (PathBuf::from("/ws/Graph.cpp"), graph),
            (PathBuf::from("/ws/Graph.h"), header),
            (PathBuf::from("/ws/Matrix.cpp"), other),
        ]);
        let key = MessageKey::new(&db, "Graph".to_string(), "Title".to_string(), None);

        let locations = find_references(&db, key, &source_files);

        assert_that!(locations.len(), eq(3));
        expect_that!(locations[0].uri.as_str(), eq("file:///ws/Graph.cpp"));
        expect_that!(locations[0].range.start.line, eq(0));
        expect_that!(locations[1].range.start.line, eq(1));
        expect_that!(locations[2].uri.as_str(), eq("file:///ws/Graph.h"));
    }

    #[googletest::test]
    fn find_references_none() {
        let db = I18nDatabaseImpl::default();
        let source = create_source(&db, "file:///ws/Graph.cpp", "void Graph::a() { tr(\"Axis\"); }");
        let source_files = HashMap::from([(PathBuf::from("/ws/Graph.cpp"), source)]);
        let key = MessageKey::new(&db, "Graph".to_string(), "Title".to_string(), None);

        expect_that!(find_references(&db, key, &source_files), is_empty());
    }
}
