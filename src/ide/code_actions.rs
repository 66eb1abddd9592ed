//! Code action generation for translatable messages

use std::collections::BTreeSet;

use tower_lsp::lsp_types::{
    CodeAction,
    CodeActionKind,
    CodeActionOrCommand,
    Command,
    Diagnostic,
    NumberOrString,
};

use crate::ide::diagnostics::MISSING_MESSAGE_CODE;

/// カタログ更新コマンド
pub const UPDATE_CATALOGS_COMMAND: &str = "qt-i18n.updateCatalogs";

/// `missing-message` 診断かどうか
fn is_missing_message(diagnostic: &Diagnostic) -> bool {
    matches!(
        &diagnostic.code,
        Some(NumberOrString::String(code)) if code == MISSING_MESSAGE_CODE
    )
}

/// 診断の `data.missing_languages` から不足している言語を収集
#[must_use]
pub fn extract_missing_languages(diagnostics: &[Diagnostic]) -> BTreeSet<String> {
    diagnostics
        .iter()
        .filter(|d| is_missing_message(d))
        .filter_map(|d| d.data.as_ref())
        .filter_map(|data| data.get("missing_languages"))
        .filter_map(|v| v.as_array())
        .flat_map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)))
        .collect()
}

/// Code Action を生成
///
/// `missing-message` 診断がある場合に、ソースを再抽出してカタログに
/// 追加するアクション（`qt-i18n.updateCatalogs` の実行）を返します。
#[must_use]
pub fn generate_code_actions(diagnostics: &[Diagnostic]) -> Vec<CodeActionOrCommand> {
    let missing: Vec<Diagnostic> =
        diagnostics.iter().filter(|d| is_missing_message(d)).cloned().collect();
    if missing.is_empty() {
        return Vec::new();
    }

    let languages = extract_missing_languages(&missing);
    let title = if languages.is_empty() {
        "Add to translation catalogs".to_string()
    } else {
        format!(
            "Add to translation catalogs ({})",
            languages.into_iter().collect::<Vec<_>>().join(", ")
        )
    };

    vec![CodeActionOrCommand::CodeAction(CodeAction {
        title: title.clone(),
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(missing),
        command: Some(Command { title, command: UPDATE_CATALOGS_COMMAND.to_string(), arguments: None }),
        is_preferred: Some(true),
        ..Default::default()
    })]
}
