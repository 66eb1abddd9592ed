pub mod analyzer;

use crate::db::I18nDatabase;
use crate::input::source::{
    SourceFile,
    SourceKind,
};
use crate::interned::MessageKey;
use crate::ir::tr_usage::TrUsage;
use crate::syntax::analyzer::types::{
    AnalyzerError,
    TrCall,
};
use crate::types::SourcePosition;

/// Extracts translatable strings from `text` without going through the database.
///
/// # Errors
/// Returns `AnalyzerError` when the text cannot be parsed.
pub fn extract_tr_calls(kind: SourceKind, text: &str) -> Result<Vec<TrCall>, AnalyzerError> {
    match kind {
        SourceKind::Cpp => {
            let Some(language) = kind.tree_sitter_language() else {
                return Ok(Vec::new());
            };
            let queries = analyzer::query_loader::load_queries(kind);
            analyzer::extractor::analyze_tr_calls(text, &language, queries)
        }
        SourceKind::DesignerForm => analyzer::designer::analyze_form(text),
    }
}

/// ソースファイルを解析して翻訳呼び出し箇所を抽出
#[salsa::tracked]
pub fn analyze_source(db: &dyn I18nDatabase, file: SourceFile) -> Vec<TrUsage<'_>> {
    let calls = match extract_tr_calls(file.kind(db), file.text(db)) {
        Ok(calls) => calls,
        Err(error) => {
            tracing::debug!(uri = %file.uri(db), "Failed to analyze source: {error}");
            return Vec::new();
        }
    };

    calls
        .into_iter()
        .map(|call| {
            let key = MessageKey::new(db, call.context, call.source, call.comment);
            TrUsage::new(db, key, call.source_range, call.numerus, call.extra_comment)
        })
        .collect()
}

/// カーソル位置にある翻訳呼び出しを取得
#[salsa::tracked]
pub fn usage_at_position(
    db: &dyn I18nDatabase,
    file: SourceFile,
    position: SourcePosition,
) -> Option<TrUsage<'_>> {
    let usages = analyze_source(db, file);
    usages.into_iter().find(|usage| usage.range(db).contains(position))
}
