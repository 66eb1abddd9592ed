//! Execute Command ハンドラー
//!
//! `workspace/executeCommand` リクエストを処理し、
//! カスタムコマンドを実行します。

use std::path::{
    Component,
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Value,
    json,
};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    ExecuteCommandParams,
    MessageType,
};

use super::super::backend::Backend;
use crate::catalog::{
    Catalog,
    CatalogStatistics,
    ExtractedMessage,
    LocationMode,
    Translator,
    UpdateSummary,
    WriteOptions,
    save_catalog,
    update_catalog,
};
use crate::catalog::language::resolve_language;
use crate::ide::code_actions::UPDATE_CATALOGS_COMMAND;
use crate::syntax::extract_tr_calls;

/// `qt-i18n.getTranslation`
const GET_TRANSLATION_COMMAND: &str = "qt-i18n.getTranslation";
/// `qt-i18n.getCurrentLanguage`
const GET_CURRENT_LANGUAGE_COMMAND: &str = "qt-i18n.getCurrentLanguage";
/// `qt-i18n.setCurrentLanguage`
const SET_CURRENT_LANGUAGE_COMMAND: &str = "qt-i18n.setCurrentLanguage";
/// `qt-i18n.catalogStatistics`
const CATALOG_STATISTICS_COMMAND: &str = "qt-i18n.catalogStatistics";

/// `initialize` で公開するコマンド一覧
pub const SUPPORTED_COMMANDS: [&str; 5] = [
    GET_TRANSLATION_COMMAND,
    GET_CURRENT_LANGUAGE_COMMAND,
    SET_CURRENT_LANGUAGE_COMMAND,
    UPDATE_CATALOGS_COMMAND,
    CATALOG_STATISTICS_COMMAND,
];

/// `workspace/executeCommand` リクエストを処理
pub async fn handle_execute_command(
    backend: &Backend,
    params: ExecuteCommandParams,
) -> Result<Option<Value>> {
    tracing::debug!(command = %params.command, "Execute Command request");

    let first_arg = params.arguments.into_iter().next();
    match params.command.as_str() {
        GET_TRANSLATION_COMMAND => handle_get_translation(backend, first_arg).await,
        GET_CURRENT_LANGUAGE_COMMAND => handle_get_current_language(backend).await,
        SET_CURRENT_LANGUAGE_COMMAND => handle_set_current_language(backend, first_arg).await,
        UPDATE_CATALOGS_COMMAND => handle_update_catalogs(backend).await,
        CATALOG_STATISTICS_COMMAND => handle_catalog_statistics(backend).await,
        _ => {
            tracing::warn!("Unknown command: {}", params.command);
            Ok(None)
        }
    }
}

/// 引数オブジェクトをパース（失敗時は警告を出して `None`）
fn parse_args<T: for<'de> Deserialize<'de>>(command: &str, arg: Option<Value>) -> Option<T> {
    let arg = arg?;
    match serde_json::from_value(arg) {
        Ok(args) => Some(args),
        Err(e) => {
            tracing::warn!("Invalid arguments for {}: {}", command, e);
            None
        }
    }
}

/// `qt-i18n.getTranslation` コマンドの引数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTranslationArgs {
    /// 翻訳コンテキスト
    context: String,
    /// ソース文字列
    source: String,
    /// 曖昧さ回避コメント
    comment: Option<String>,
    /// 言語（省略時は現在の表示言語）
    language: Option<String>,
    /// numerus の件数
    n: Option<i64>,
}

/// `qt-i18n.getTranslation` コマンドを実行
///
/// 指定言語のカタログを読み込み順に重ねて検索し、訳がなければソース文字列を返す。
/// 完全一致する言語がなければ基本言語 (`it` と `it_IT`) で探す。
async fn handle_get_translation(backend: &Backend, arg: Option<Value>) -> Result<Option<Value>> {
    let Some(args) = parse_args::<GetTranslationArgs>(GET_TRANSLATION_COMMAND, arg) else {
        return Ok(None);
    };

    if !backend.wait_for_catalogs().await {
        tracing::debug!("getTranslation - catalogs not loaded yet");
    }

    let language = match args.language {
        Some(language) => Some(language),
        None => backend.effective_language().await,
    };

    let (language, translator) = {
        let (db, catalogs) = backend.state.lock_db_and_catalogs().await;
        let languages: Vec<String> = catalogs.iter().map(|c| c.language(&*db)).collect();
        let available: Vec<&str> = languages.iter().map(String::as_str).collect();
        let resolved = language
            .as_deref()
            .and_then(|requested| resolve_language(requested, &available))
            .map(ToString::to_string);

        let mut translator = Translator::new();
        for (catalog, catalog_language) in catalogs.iter().zip(&languages) {
            if resolved.as_ref() == Some(catalog_language) {
                translator.load(catalog.catalog(&*db).clone());
            }
        }
        if resolved.is_none() {
            tracing::debug!(?language, "getTranslation - no catalog for language");
        }
        (resolved.or(language), translator)
    };

    let comment = args.comment.as_deref();
    let text = match args.n {
        Some(n) => translator.translate_plural(&args.context, &args.source, comment, n),
        None => translator.translate(&args.context, &args.source, comment).to_string(),
    };

    Ok(Some(json!({ "language": language, "translation": text })))
}

/// `qt-i18n.getCurrentLanguage` コマンドを実行
///
/// 明示的に設定された言語がなければ、優先度順の先頭の言語を返す。
async fn handle_get_current_language(backend: &Backend) -> Result<Option<Value>> {
    let language = backend.effective_language().await;
    Ok(Some(json!({ "language": language })))
}

/// `qt-i18n.setCurrentLanguage` コマンドの引数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetCurrentLanguageArgs {
    /// 設定する言語コード（null でリセット）
    language: Option<String>,
}

/// `qt-i18n.setCurrentLanguage` コマンドを実行
///
/// 現在の表示言語を変更する。ホバー、補完の表示順に使用される。
async fn handle_set_current_language(
    backend: &Backend,
    arg: Option<Value>,
) -> Result<Option<Value>> {
    // 引数なしの場合はリセット
    let parsed_args = match arg {
        None => SetCurrentLanguageArgs::default(),
        Some(arg) => {
            let Some(args) = parse_args::<SetCurrentLanguageArgs>(SET_CURRENT_LANGUAGE_COMMAND, Some(arg))
            else {
                return Ok(None);
            };
            args
        }
    };

    tracing::debug!(language = ?parsed_args.language, "Executing qt-i18n.setCurrentLanguage");

    let mut current_language = backend.state.current_language.lock().await;
    current_language.clone_from(&parsed_args.language);
    drop(current_language);

    backend
        .client
        .log_message(
            MessageType::INFO,
            format!("Current language set to: {:?}", parsed_args.language),
        )
        .await;

    Ok(None)
}

/// 1 カタログ分の更新結果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogUpdateResult {
    /// カタログのパス
    file: String,
    /// 追加・保持・削除の件数
    #[serde(flatten)]
    summary: UpdateSummary,
}

/// 更新対象のカタログと、その位置から見たソースの抽出結果
type UpdateJob = (PathBuf, Catalog, Vec<ExtractedMessage>);

/// `qt-i18n.updateCatalogs` コマンドを実行
///
/// ワークスペースのソースから翻訳可能文字列を抽出し直し、全カタログを更新して保存する。
async fn handle_update_catalogs(backend: &Backend) -> Result<Option<Value>> {
    if !backend.workspace_indexer.is_indexing_completed() {
        backend.client.log_message(MessageType::WARNING, "Indexing in progress; try again").await;
        return Ok(None);
    }

    let options = backend.settings().await.update;

    let jobs: Vec<UpdateJob> = {
        let (db, source_files, catalogs) = backend.state.lock_all().await;
        let mut sources: Vec<(&PathBuf, _)> = source_files.iter().collect();
        sources.sort_by(|a, b| a.0.cmp(b.0));

        let calls: Vec<(&PathBuf, Vec<_>)> = sources
            .into_iter()
            .filter_map(|(path, file)| {
                extract_tr_calls(file.kind(&*db), file.text(&*db)).ok().map(|calls| (path, calls))
            })
            .collect();

        catalogs
            .iter()
            .map(|catalog| {
                let catalog_path = PathBuf::from(catalog.file_path(&*db));
                let catalog_dir = catalog_path.parent().unwrap_or_else(|| Path::new(""));
                let extracted = calls
                    .iter()
                    .flat_map(|(path, calls)| {
                        let filename = relative_path(catalog_dir, path);
                        calls.iter().map(move |call| call.to_extracted(Some(filename.clone())))
                    })
                    .collect();
                (catalog_path, catalog.catalog(&*db).clone(), extracted)
            })
            .collect()
    };

    let write_options = WriteOptions { locations: LocationMode::Relative };
    let mut results = Vec::with_capacity(jobs.len());
    for (path, existing, extracted) in jobs {
        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || {
            let (updated, summary) = update_catalog(&existing, &extracted, &options);
            save_catalog(&target, &updated, &write_options).map(|()| summary)
        })
        .await;

        let outcome = match written {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(error)) => Err(format!("Failed to write {}: {error}", path.display())),
            Err(error) => {
                Err(format!("Catalog update task for {} failed: {error}", path.display()))
            }
        };
        let summary = match outcome {
            Ok(summary) => summary,
            Err(message) => {
                tracing::error!("{message}");
                backend.client.log_message(MessageType::ERROR, message).await;
                continue;
            }
        };
        tracing::info!(path = %path.display(), ?summary, "Catalog updated");
        backend.reload_catalog_file(&path).await;
        results.push(CatalogUpdateResult { file: path.to_string_lossy().into_owned(), summary });
    }

    backend.send_diagnostics_to_opened_files().await;
    backend.send_catalog_diagnostics().await;

    match serde_json::to_value(&results) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::error!("Failed to serialize update results: {}", e);
            Ok(None)
        }
    }
}

/// 1 カタログ分の統計
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogStatisticsResult {
    /// カタログのパス
    file: String,
    /// カタログの言語
    language: String,
    /// 状態ごとの件数
    #[serde(flatten)]
    statistics: CatalogStatistics,
}

/// `qt-i18n.catalogStatistics` コマンドを実行
async fn handle_catalog_statistics(backend: &Backend) -> Result<Option<Value>> {
    if !backend.wait_for_catalogs().await {
        return Ok(Some(json!([])));
    }

    let results: Vec<CatalogStatisticsResult> = {
        let (db, catalogs) = backend.state.lock_db_and_catalogs().await;
        catalogs
            .iter()
            .map(|catalog| CatalogStatisticsResult {
                file: catalog.file_path(&*db).clone(),
                language: catalog.language(&*db),
                statistics: catalog.catalog(&*db).statistics(),
            })
            .collect()
    };

    match serde_json::to_value(&results) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::error!("Failed to serialize statistics: {}", e);
            Ok(Some(json!([])))
        }
    }
}

/// `from` ディレクトリから見た `to` の相対パス（区切りは `/`）
fn relative_path(from: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let ups = from.iter().skip(common).map(|_| "..".to_string());
    let downs = to.iter().skip(common).map(|c| c.as_os_str().to_string_lossy().into_owned());
    ups.chain(downs).collect::<Vec<_>>().join("/")
}
