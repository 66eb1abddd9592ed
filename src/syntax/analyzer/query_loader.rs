//! Load Tree-sitter queries from files.

use std::sync::OnceLock;

use tree_sitter::Query;

use crate::input::source::SourceKind;

struct QueryFile {
    content: &'static str,
    name: &'static str,
}

const CPP_QUERIES: &[QueryFile] =
    &[QueryFile { content: include_str!("../../../queries/cpp/qt-tr.scm"), name: "qt-tr" }];

static CPP_QUERY_CACHE: OnceLock<Vec<Query>> = OnceLock::new();

fn parse_queries(kind: SourceKind) -> Vec<Query> {
    let Some(tree_sitter_lang) = kind.tree_sitter_language() else {
        return Vec::new();
    };

    CPP_QUERIES
        .iter()
        .filter_map(|qf| {
            Query::new(&tree_sitter_lang, qf.content)
                .map_err(|e| tracing::error!("Failed to parse {} query: {e:?}", qf.name))
                .ok()
        })
        .collect()
}

/// Loads cached queries for a source kind. Queries are parsed once.
#[must_use]
pub fn load_queries(kind: SourceKind) -> &'static [Query] {
    match kind {
        SourceKind::Cpp => CPP_QUERY_CACHE.get_or_init(|| parse_queries(SourceKind::Cpp)),
        SourceKind::DesignerForm => &[],
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[googletest::test]
    fn cpp_queries_compile() {
        expect_that!(load_queries(SourceKind::Cpp).len(), eq(1));
        expect_that!(load_queries(SourceKind::DesignerForm).len(), eq(0));
    }
}
