//! 診断メッセージ生成モジュール

use std::collections::{
    HashMap,
    HashSet,
};
use std::path::PathBuf;

use tower_lsp::lsp_types::{
    Diagnostic,
    DiagnosticSeverity,
    DiagnosticTag,
    NumberOrString,
};

use crate::catalog::{
    MessageId,
    TranslationText,
};
use crate::config::{
    I18nSettings,
    Severity,
};
use crate::db::I18nDatabase;
use crate::input::catalog::CatalogFile;
use crate::input::source::SourceFile;
use crate::syntax::analyze_source;

/// 診断のソース名
const DIAGNOSTIC_SOURCE: &str = "qt-i18n";

/// カタログに存在しないメッセージ
pub const MISSING_MESSAGE_CODE: &str = "missing-message";
/// 翻訳されていないメッセージ
pub const UNTRANSLATED_MESSAGE_CODE: &str = "untranslated-message";
/// どのソースからも使われていないメッセージ
pub const UNUSED_MESSAGE_CODE: &str = "unused-message";
/// numerus 形式の数が言語の規則と合わない
pub const NUMERUS_FORM_COUNT_CODE: &str = "numerus-form-count";

impl From<Severity> for DiagnosticSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::ERROR,
            Severity::Warning => Self::WARNING,
            Severity::Information => Self::INFORMATION,
            Severity::Hint => Self::HINT,
        }
    }
}

/// メッセージの言語ごとの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageState {
    /// 有効な翻訳がある
    Translated,
    /// エントリはあるが翻訳が使えない（unfinished、空）
    Untranslated,
    /// エントリがない、または obsolete / vanished
    Missing,
}

/// 言語ごとにメッセージの状態を判定
///
/// 同じ言語のカタログが複数ある場合は、いずれかに有効な翻訳があれば翻訳済みとする。
fn message_states(
    db: &dyn I18nDatabase,
    id: &MessageId,
    catalogs: &[CatalogFile],
) -> Vec<(String, MessageState)> {
    let mut states: Vec<(String, MessageState)> = Vec::new();

    for catalog in catalogs {
        let language = catalog.language(db);
        let state = match catalog.find_message(db, id) {
            Some(message) if message.status.is_retired() => MessageState::Missing,
            Some(message) if message.usable_translation().is_some() => MessageState::Translated,
            Some(_) => MessageState::Untranslated,
            None => MessageState::Missing,
        };

        match states.iter_mut().find(|(lang, _)| *lang == language) {
            // Translated < Untranslated < Missing の順で良い方を残す
            Some(entry) => entry.1 = better_state(entry.1, state),
            None => states.push((language, state)),
        }
    }

    states
}

const fn better_state(a: MessageState, b: MessageState) -> MessageState {
    match (a, b) {
        (MessageState::Translated, _) | (_, MessageState::Translated) => MessageState::Translated,
        (MessageState::Untranslated, _) | (_, MessageState::Untranslated) => {
            MessageState::Untranslated
        }
        _ => MessageState::Missing,
    }
}

/// ソースファイルの診断メッセージを生成
///
/// ソースコード内の翻訳呼び出しについて、必須言語のカタログに
/// メッセージがあるか、翻訳済みかをチェックします。
///
/// # Arguments
/// * `db` - Salsa データベース
/// * `source_file` - チェック対象のソースファイル
/// * `catalogs` - 読み込み済みのカタログ
/// * `settings` - 重要度や必須言語の設定
pub fn generate_diagnostics(
    db: &dyn I18nDatabase,
    source_file: SourceFile,
    catalogs: &[CatalogFile],
    settings: &I18nSettings,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    // カタログがない場合は何も報告しない
    if catalogs.is_empty() {
        return diagnostics;
    }

    tracing::debug!("Generating diagnostics for source file '{}'", source_file.uri(db));
    let usages = analyze_source(db, source_file);
    let config = &settings.diagnostics;

    for usage in usages {
        let id = usage.key(db).to_id(db);
        if id.source.is_empty() {
            continue;
        }

        let states: Vec<(String, MessageState)> = message_states(db, &id, catalogs)
            .into_iter()
            .filter(|(language, _)| settings.is_required_language(language))
            .collect();

        let mut missing_languages = languages_in_state(&states, MessageState::Missing);
        let mut untranslated_languages = languages_in_state(&states, MessageState::Untranslated);
        missing_languages.sort();
        untranslated_languages.sort();

        let range = usage.range(db).into();

        if config.missing_message.enabled && !missing_languages.is_empty() {
            diagnostics.push(Diagnostic {
                range,
                severity: Some(config.missing_message.severity.into()),
                code: Some(NumberOrString::String(MISSING_MESSAGE_CODE.to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: format!(
                    "Message {id} not found in catalogs: {}",
                    missing_languages.join(", ")
                ),
                data: Some(serde_json::json!({
                    "context": id.context,
                    "source": id.source,
                    "comment": id.comment,
                    "missing_languages": missing_languages,
                })),
                ..Diagnostic::default()
            });
        } else if config.untranslated_message.enabled && !untranslated_languages.is_empty() {
            diagnostics.push(Diagnostic {
                range,
                severity: Some(config.untranslated_message.severity.into()),
                code: Some(NumberOrString::String(UNTRANSLATED_MESSAGE_CODE.to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: format!(
                    "Message {id} is not translated in: {}",
                    untranslated_languages.join(", ")
                ),
                ..Diagnostic::default()
            });
        }
    }

    diagnostics
}

fn languages_in_state(states: &[(String, MessageState)], wanted: MessageState) -> Vec<String> {
    states
        .iter()
        .filter(|(_, state)| *state == wanted)
        .map(|(language, _)| language.clone())
        .collect()
}

/// ワークスペース内のソースで使われているメッセージを収集
pub fn collect_used_messages(
    db: &dyn I18nDatabase,
    source_files: &HashMap<PathBuf, SourceFile>,
) -> HashSet<MessageId> {
    source_files
        .values()
        .flat_map(|file| analyze_source(db, *file))
        .map(|usage| usage.key(db).to_id(db))
        .collect()
}

/// カタログファイルの診断メッセージを生成
///
/// - どのソースからも使われていないメッセージ（obsolete / vanished は除く）
/// - numerus 形式の数が言語の規則と合わないメッセージ
pub fn generate_catalog_diagnostics(
    db: &dyn I18nDatabase,
    catalog_file: CatalogFile,
    used_messages: &HashSet<MessageId>,
    settings: &I18nSettings,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let catalog = catalog_file.catalog(db);
    let spans = catalog_file.source_spans(db);
    let unused_config = settings.diagnostics.unused_message;
    let form_count = catalog_file.plural_rule(db).form_count();

    for (context, message) in catalog.messages() {
        if message.status.is_retired() {
            continue;
        }
        let id = message.id_in(context);
        let Some(range) = spans.get(&id).copied() else {
            continue;
        };

        if unused_config.enabled && !used_messages.contains(&id) {
            diagnostics.push(Diagnostic {
                range: range.into(),
                severity: Some(unused_config.severity.into()),
                code: Some(NumberOrString::String(UNUSED_MESSAGE_CODE.to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: format!("Message {id} is not used in any source file"),
                tags: Some(vec![DiagnosticTag::UNNECESSARY]),
                ..Diagnostic::default()
            });
        }

        if let Some(TranslationText::Numerus(forms)) = &message.translation
            && message.has_translated_text()
            && forms.len() != form_count
        {
            diagnostics.push(Diagnostic {
                range: range.into(),
                severity: Some(DiagnosticSeverity::WARNING),
                code: Some(NumberOrString::String(NUMERUS_FORM_COUNT_CODE.to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: format!(
                    "Expected {form_count} numerus forms for '{}', found {}",
                    catalog_file.language(db),
                    forms.len()
                ),
                ..Diagnostic::default()
            });
        }
    }

    diagnostics
}
