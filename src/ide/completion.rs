//! Completion implementation

use std::collections::BTreeMap;

use tower_lsp::lsp_types::{
    CompletionItem,
    CompletionItemKind,
    CompletionTextEdit,
    Documentation,
    MarkupContent,
    MarkupKind,
    Position,
    Range,
    TextEdit,
};

use crate::db::I18nDatabase;
use crate::input::catalog::CatalogFile;
use crate::input::source::SourceKind;
use crate::syntax::extract_tr_calls;
use crate::types::SourcePosition;

/// 認識した呼び出しのソース文字列リテラル内にあるカーソル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionContext {
    /// 翻訳コンテキスト（クラス名、または `translate()` の第 1 引数）
    pub context: String,
    /// 引用符の内側でカーソルより前にある文字列
    pub partial_source: String,
    /// 置換範囲（引用符の内側全体）
    pub replace_range: Range,
}

/// Extracts the completion context using tree-sitter.
///
/// Only complete string literals are recognised, e.g. `tr("")` or `tr("Ti|tle")`.
#[must_use]
pub fn extract_completion_context(
    text: &str,
    kind: SourceKind,
    position: Position,
) -> Option<CompletionContext> {
    if kind != SourceKind::Cpp {
        return None;
    }

    let calls = extract_tr_calls(kind, text).unwrap_or_default();
    let cursor = SourcePosition::from(position);

    let call = calls.into_iter().find(|call| {
        let range = call.source_range;
        range.start.line == range.end.line
            && range.contains(cursor)
            && cursor.character > range.start.character
            && cursor.character < range.end.character
    })?;

    let range = call.source_range;
    // Skip the opening quote. Raw string and prefixed literals are not completed.
    let line_text = text.lines().nth(range.start.line as usize)?;
    let literal = utf16_slice(line_text, range.start.character, range.end.character)?;
    if !literal.starts_with('"') || !literal.ends_with('"') || literal.len() < 2 {
        return None;
    }

    let key_start = range.start.character + 1;
    let key_end = range.end.character - 1;
    let partial_source =
        utf16_slice(line_text, key_start, position.character.min(key_end))?.to_string();

    Some(CompletionContext {
        context: call.context,
        partial_source,
        replace_range: Range::new(
            Position::new(range.start.line, key_start),
            Position::new(range.start.line, key_end),
        ),
    })
}

/// Slice of `line` between two UTF-16 columns.
fn utf16_slice(line: &str, start: u32, end: u32) -> Option<&str> {
    let mut column = 0u32;
    let mut start_byte = None;
    let mut end_byte = None;
    for (byte, c) in line.char_indices() {
        if column == start {
            start_byte = Some(byte);
        }
        if column == end {
            end_byte = Some(byte);
            break;
        }
        column += u32::try_from(c.len_utf16()).unwrap_or(1);
    }
    if column == start && start_byte.is_none() {
        start_byte = Some(line.len());
    }
    if column == end && end_byte.is_none() {
        end_byte = Some(line.len());
    }
    line.get(start_byte?..end_byte?)
}

/// Escapes text for insertion inside a C++ string literal.
fn escape_cpp_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Generates completion items for the source strings of the context.
///
/// 候補は部分一致（大文字小文字を区別しない）で絞り込み、
/// obsolete / vanished なメッセージは除外する。
pub fn generate_completions(
    db: &dyn I18nDatabase,
    catalogs: &[CatalogFile],
    context: &CompletionContext,
    effective_language: Option<&str>,
) -> Vec<CompletionItem> {
    let partial = context.partial_source.to_lowercase();
    // source → [(language, translation)]
    let mut source_translations: BTreeMap<&str, Vec<(String, String)>> = BTreeMap::new();

    for catalog in catalogs {
        let Some(ctx) = catalog.catalog(db).context(&context.context) else {
            continue;
        };
        let language = catalog.language(db);

        for message in &ctx.messages {
            if message.status.is_retired() {
                continue;
            }
            if !partial.is_empty() && !message.source.to_lowercase().contains(&partial) {
                continue;
            }
            let value = message
                .usable_translation()
                .and_then(|text| text.primary())
                .unwrap_or_default()
                .to_string();
            source_translations
                .entry(message.source.as_str())
                .or_default()
                .push((language.clone(), value));
        }
    }

    source_translations
        .into_iter()
        .map(|(source, lang_values)| {
            let documentation_text = lang_values
                .iter()
                .map(|(lang, value)| {
                    if value.is_empty() {
                        format!("- **{lang}**: *(untranslated)*")
                    } else {
                        format!("- **{lang}**: {value}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");

            let detail = effective_language.and_then(|eff_lang| {
                lang_values
                    .iter()
                    .find(|(lang, value)| lang == eff_lang && !value.is_empty())
                    .map(|(_, value)| value.clone())
            });

            CompletionItem {
                label: source.to_string(),
                kind: Some(CompletionItemKind::TEXT),
                detail,
                documentation: Some(Documentation::MarkupContent(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: documentation_text,
                })),
                text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                    range: context.replace_range,
                    new_text: escape_cpp_literal(source),
                })),
                ..Default::default()
            }
        })
        .collect()
}
