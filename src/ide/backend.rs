//! LSP Backend 実装

use std::collections::HashSet;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;
use std::time::Duration;

use salsa::Setter;
use serde_json::Value;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CodeActionParams,
    CodeActionResponse,
    CompletionParams,
    CompletionResponse,
    Diagnostic,
    DidChangeConfigurationParams,
    DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
    ExecuteCommandParams,
    FileChangeType,
    FileSystemWatcher,
    GlobPattern,
    GotoDefinitionParams,
    GotoDefinitionResponse,
    Hover,
    HoverParams,
    InitializeParams,
    InitializeResult,
    InitializedParams,
    Location,
    MessageType,
    NumberOrString,
    ProgressParams,
    ProgressParamsValue,
    ReferenceParams,
    Registration,
    Url,
    WorkDoneProgress,
    WorkDoneProgressBegin,
    WorkDoneProgressEnd,
    WorkDoneProgressReport,
    WorkspaceFolder,
    notification::Progress,
};
use tower_lsp::{
    Client,
    LanguageServer,
};

use super::handlers;
use crate::catalog::language::catalog_language;
use crate::catalog::{
    MessageId,
    parse_catalog_with_spans,
};
use crate::config::{
    CONFIG_FILE_NAME,
    ConfigManager,
    FileMatcher,
    I18nSettings,
};
use crate::db::{
    I18nDatabase,
    I18nDatabaseImpl,
};
use crate::ide::diagnostics::{
    collect_used_messages,
    generate_catalog_diagnostics,
    generate_diagnostics,
};
use crate::ide::state::ServerState;
use crate::indexer::types::IndexerError;
use crate::indexer::workspace::WorkspaceIndexer;
use crate::input::catalog::CatalogFile;
use crate::input::source::{
    SourceFile,
    SourceKind,
};
use crate::syntax::usage_at_position;
use crate::types::SourcePosition;

/// カタログ読み込みを待つ最大時間
const CATALOG_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// インデックス進捗の通知トークン
const INDEXING_PROGRESS_TOKEN: &str = "workspace-indexing";

/// LSP Backend
#[derive(Clone)]
pub struct Backend {
    /// LSP クライアント
    pub client: Client,
    /// 設定管理
    pub config_manager: Arc<Mutex<ConfigManager>>,
    /// ワークスペースインデクサー
    pub workspace_indexer: Arc<WorkspaceIndexer>,
    /// 共有状態
    pub state: ServerState,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("config_manager", &"<ConfigManager>")
            .field("workspace_indexer", &"<WorkspaceIndexer>")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// 言語一覧を優先度順に並べる（current → primary → アルファベット順）
#[must_use]
pub fn collect_sorted_languages(
    db: &dyn I18nDatabase,
    catalogs: &[CatalogFile],
    current_language: Option<&str>,
    primary_languages: Option<&[String]>,
) -> Vec<String> {
    let mut languages: Vec<(String, ())> = catalogs
        .iter()
        .map(|catalog| catalog.language(db))
        .collect::<HashSet<_>>()
        .into_iter()
        .map(|language| (language, ()))
        .collect();
    crate::ide::hover::sort_translations_by_priority(
        &mut languages,
        current_language,
        primary_languages,
    );
    languages.into_iter().map(|(language, ())| language).collect()
}

impl Backend {
    /// 新しい Backend を作成
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            config_manager: Arc::new(Mutex::new(ConfigManager::new())),
            workspace_indexer: Arc::new(WorkspaceIndexer::new()),
            state: ServerState::new(I18nDatabaseImpl::default()),
        }
    }

    /// ワークスペースフォルダを取得
    ///
    /// フォルダが設定されていない場合は空のVecを返します。
    pub(crate) async fn get_workspace_folders(&self) -> Result<Vec<WorkspaceFolder>> {
        self.client.workspace_folders().await.map(Option::unwrap_or_default)
    }

    /// URI をファイルパスに変換
    pub(crate) fn uri_to_path(uri: &Url) -> Option<PathBuf> {
        uri.to_file_path().map_or_else(
            |()| {
                tracing::warn!("Failed to convert URI to file path: {}", uri);
                None
            },
            Some,
        )
    }

    /// 設定ファイル（`.qt-i18n.json`）かどうか
    pub(crate) fn is_config_file(path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME)
    }

    /// 現在の設定でファイルマッチャーを作成
    async fn file_matcher(&self) -> Option<FileMatcher> {
        let config_manager = self.config_manager.lock().await;
        let root = config_manager.workspace_root()?.clone();
        match FileMatcher::new(root, config_manager.get_settings()) {
            Ok(matcher) => Some(matcher),
            Err(error) => {
                tracing::warn!(%error, "Failed to build file matcher");
                None
            }
        }
    }

    /// 翻訳カタログかどうか
    ///
    /// ワークスペースルートが不明な場合は拡張子 `.ts` で判定する。
    pub(crate) async fn is_translation_file(&self, path: &Path) -> bool {
        match self.file_matcher().await {
            Some(matcher) => matcher.is_translation_file(path),
            None => path.extension().is_some_and(|ext| ext == "ts"),
        }
    }

    /// 現在の設定のコピー
    pub(crate) async fn settings(&self) -> I18nSettings {
        self.config_manager.lock().await.get_settings().clone()
    }

    /// 1 つのワークスペースフォルダをインデックス（進捗通知付き）
    pub async fn index_folder(
        &self,
        workspace_path: &Path,
    ) -> std::result::Result<(), IndexerError> {
        let token = NumberOrString::String(INDEXING_PROGRESS_TOKEN.to_string());
        self.send_progress(
            &token,
            WorkDoneProgress::Begin(WorkDoneProgressBegin {
                title: "Indexing Workspace".to_string(),
                cancellable: Some(false),
                message: Some("Starting...".to_string()),
                percentage: Some(0),
            }),
        )
        .await;

        let config_manager = self.config_manager.lock().await;
        let db = self.state.db.lock().await.clone();
        let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<(u32, u32)>(100);

        let progress_task = {
            let backend = self.clone();
            let token = token.clone();
            tokio::spawn(async move {
                while let Some((current, total)) = progress_rx.recv().await {
                    let percentage = current.saturating_mul(100).checked_div(total).unwrap_or(0);
                    backend
                        .send_progress(
                            &token,
                            WorkDoneProgress::Report(WorkDoneProgressReport {
                                cancellable: Some(false),
                                message: Some(format!("Processing files: {current}/{total}")),
                                percentage: Some(percentage),
                            }),
                        )
                        .await;
                }
            })
        };

        let progress_callback = move |current: u32, total: u32| {
            let _ = progress_tx.try_send((current, total));
        };

        let result = self
            .workspace_indexer
            .index_workspace(
                db,
                workspace_path,
                &config_manager,
                self.state.source_files.clone(),
                self.state.catalogs.clone(),
                Some(progress_callback),
            )
            .await;
        drop(config_manager);
        let _ = progress_task.await;

        let message = match &result {
            Ok(()) => "Workspace indexing complete".to_string(),
            Err(error) => format!("Indexing failed: {error}"),
        };
        self.send_progress(&token, WorkDoneProgress::End(WorkDoneProgressEnd { message: Some(message) }))
            .await;

        result
    }

    /// `$/progress` 通知を送信
    async fn send_progress(&self, token: &NumberOrString, progress: WorkDoneProgress) {
        self.client
            .send_notification::<Progress>(ProgressParams {
                token: token.clone(),
                value: ProgressParamsValue::WorkDone(progress),
            })
            .await;
    }

    /// 全ワークスペースフォルダをインデックスし、診断を送信
    pub(crate) async fn index_all_folders(&self) {
        let workspace_folders = self.get_workspace_folders().await.unwrap_or_else(|error| {
            tracing::warn!("Failed to get workspace folders: {}", error);
            Vec::new()
        });

        for folder in workspace_folders {
            let Some(workspace_path) = Self::uri_to_path(&folder.uri) else {
                continue;
            };
            if let Err(error) = self.index_folder(&workspace_path).await {
                self.client
                    .log_message(MessageType::ERROR, format!("error indexing workspace: {error}"))
                    .await;
            }
        }
        self.workspace_indexer.mark_completed();

        self.process_pending_updates().await;
        self.send_diagnostics_to_opened_files().await;
        self.send_catalog_diagnostics().await;
    }

    /// ワークスペースを再インデックス
    ///
    /// 新しい Salsa データベースを作成して、全ファイルを再インデックスします。
    /// これにより、設定変更が反映され、古いキャッシュがクリアされます。
    pub(crate) async fn reindex_workspace(&self) {
        self.client.log_message(MessageType::INFO, "Reindexing workspace...").await;

        self.workspace_indexer.reset();
        {
            let (mut db, mut source_files, mut catalogs) = self.state.lock_all().await;
            *db = I18nDatabaseImpl::default();
            source_files.clear();
            catalogs.clear();
        }

        self.index_all_folders().await;
        self.client.log_message(MessageType::INFO, "Reindexing complete").await;
    }

    /// カタログの読み込み完了を待つ
    pub(crate) async fn wait_for_catalogs(&self) -> bool {
        self.workspace_indexer.wait_for_catalogs(CATALOG_WAIT_TIMEOUT).await
    }

    /// インデックス中に受け取った変更を反映
    pub(crate) async fn process_pending_updates(&self) {
        let pending: Vec<(Url, String)> = self.state.pending_updates.lock().await.drain().collect();
        for (uri, text) in pending {
            self.update_and_diagnose(uri, text).await;
        }
    }

    /// ファイル内容を更新し、診断を送信
    ///
    /// インデックス中は変更を保留し、完了後に反映します。
    pub(crate) async fn update_and_diagnose(&self, uri: Url, text: String) {
        if !self.workspace_indexer.is_indexing_completed() {
            tracing::debug!(uri = %uri, "Indexing in progress; deferring update");
            self.state.pending_updates.lock().await.insert(uri, text);
            return;
        }

        let Some(file_path) = Self::uri_to_path(&uri) else {
            return;
        };

        if self.is_translation_file(&file_path).await {
            if self.update_catalog_text(&file_path, text).await {
                self.send_diagnostics_to_opened_files().await;
                self.send_catalog_diagnostics().await;
            }
            return;
        }

        let Some(kind) = SourceKind::from_uri(uri.as_str()) else {
            return;
        };

        let settings = self.settings().await;
        let diagnostics = {
            let (mut db, mut source_files, catalogs) = self.state.lock_all().await;

            let source_file = if let Some(existing) = source_files.get(&file_path).copied() {
                // 既存の SourceFile がある場合、内容を更新（Salsa が自動的に依存クエリを無効化）
                existing.set_text(&mut *db).to(text);
                existing
            } else {
                let source_file = SourceFile::new(&*db, uri.to_string(), text, kind);
                source_files.insert(file_path, source_file);
                source_file
            };

            generate_diagnostics(&*db, source_file, &catalogs, &settings)
        };

        self.client.publish_diagnostics(uri.clone(), diagnostics, None).await;
        tracing::debug!(uri = %uri, "File changed and diagnostics sent");
    }

    /// カタログのテキストを解析して入力を更新（または追加）
    ///
    /// 解析に失敗した場合は既存の内容を維持し、`false` を返す。
    async fn update_catalog_text(&self, file_path: &Path, text: String) -> bool {
        let (catalog, spans) = match parse_catalog_with_spans(&text) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::debug!(path = %file_path.display(), "Catalog does not parse: {error}");
                return false;
            }
        };
        let language = catalog_language(&catalog, file_path);
        let path_text = file_path.to_string_lossy().into_owned();

        let (mut db, mut catalogs) = self.state.lock_db_and_catalogs().await;
        if let Some(existing) = catalogs.iter().copied().find(|c| *c.file_path(&*db) == path_text) {
            existing.set_language(&mut *db).to(language);
            existing.set_catalog(&mut *db).to(catalog);
            existing.set_text(&mut *db).to(text);
            existing.set_source_spans(&mut *db).to(spans);
        } else {
            let file = CatalogFile::new(&*db, language, path_text, catalog, text, spans);
            catalogs.push(file);
            let db: &I18nDatabaseImpl = &db;
            catalogs.sort_by(|a, b| a.file_path(db).cmp(b.file_path(db)));
        }
        true
    }

    /// ディスクからカタログを再読み込み
    pub(crate) async fn reload_catalog_file(&self, file_path: &Path) {
        match tokio::fs::read_to_string(file_path).await {
            Ok(text) => {
                if !self.update_catalog_text(file_path, text).await {
                    self.client
                        .log_message(
                            MessageType::WARNING,
                            format!("Failed to parse catalog {}", file_path.display()),
                        )
                        .await;
                }
            }
            Err(error) => tracing::warn!("Failed to read catalog {:?}: {}", file_path, error),
        }
    }

    /// カタログを削除
    pub(crate) async fn remove_catalog_file(&self, file_path: &Path) {
        let path_text = file_path.to_string_lossy();
        let (db, mut catalogs) = self.state.lock_db_and_catalogs().await;
        catalogs.retain(|catalog| *catalog.file_path(&*db) != path_text);
        drop((db, catalogs));

        // 削除されたファイルの診断をクリア
        if let Ok(uri) = Url::from_file_path(file_path) {
            self.client.publish_diagnostics(uri, Vec::new(), None).await;
        }
    }

    /// カーソル位置のメッセージを取得
    ///
    /// ソースファイルでは翻訳呼び出しのリテラル、カタログでは `<source>` 要素を対象にする。
    pub(crate) async fn message_at_position(
        &self,
        file_path: &Path,
        position: SourcePosition,
    ) -> Option<MessageId> {
        let (db, source_files, catalogs) = self.state.lock_all().await;

        if let Some(source_file) = source_files.get(file_path).copied() {
            let usage = usage_at_position(&*db, source_file, position)?;
            return Some(usage.key(&*db).to_id(&*db));
        }

        let path_text = file_path.to_string_lossy();
        let catalog =
            catalogs.iter().copied().find(|catalog| *catalog.file_path(&*db) == path_text)?;
        catalog.message_at_position(&*db, position).map(|key| key.to_id(&*db))
    }

    /// 開いている全ソースファイルに診断を送信
    pub(crate) async fn send_diagnostics_to_opened_files(&self) {
        let opened: Vec<Url> = self.state.opened_files.lock().await.iter().cloned().collect();
        let settings = self.settings().await;

        let results: Vec<(Url, Vec<Diagnostic>)> = {
            let (db, source_files, catalogs) = self.state.lock_all().await;
            opened
                .into_iter()
                .filter_map(|uri| {
                    let path = Self::uri_to_path(&uri)?;
                    let source_file = source_files.get(&path).copied()?;
                    let diagnostics = generate_diagnostics(&*db, source_file, &catalogs, &settings);
                    Some((uri, diagnostics))
                })
                .collect()
        };

        for (uri, diagnostics) in results {
            self.client.publish_diagnostics(uri, diagnostics, None).await;
        }
    }

    /// 全カタログに未使用メッセージ・numerus の診断を送信
    pub(crate) async fn send_catalog_diagnostics(&self) {
        if !self.workspace_indexer.is_indexing_completed() {
            return;
        }
        let settings = self.settings().await;

        let results: Vec<(Url, Vec<Diagnostic>)> = {
            let (db, source_files, catalogs) = self.state.lock_all().await;
            let used = collect_used_messages(&*db, &source_files);
            catalogs
                .iter()
                .filter_map(|catalog| {
                    let uri = Url::from_file_path(catalog.file_path(&*db)).ok()?;
                    Some((uri, generate_catalog_diagnostics(&*db, *catalog, &used, &settings)))
                })
                .collect()
        };

        tracing::debug!(catalogs = results.len(), "Sending catalog diagnostics");
        for (uri, diagnostics) in results {
            self.client.publish_diagnostics(uri, diagnostics, None).await;
        }
    }

    /// 有効な表示言語（current → primary → アルファベット順の先頭）
    pub(crate) async fn effective_language(&self) -> Option<String> {
        let primary_languages = self.config_manager.lock().await.get_settings().primary_languages.clone();
        let current_language = self.state.current_language.lock().await.clone();
        let (db, catalogs) = self.state.lock_db_and_catalogs().await;
        collect_sorted_languages(
            &*db,
            &catalogs,
            current_language.as_deref(),
            primary_languages.as_deref(),
        )
        .into_iter()
        .next()
    }

    /// カタログと設定ファイルの監視を登録
    pub(crate) async fn register_file_watchers(&self) {
        let settings = self.settings().await;
        let mut watchers: Vec<FileSystemWatcher> = settings
            .translation_files
            .include_patterns
            .iter()
            .map(|pattern| FileSystemWatcher {
                glob_pattern: GlobPattern::String(pattern.clone()),
                kind: None,
            })
            .collect();
        watchers.push(FileSystemWatcher {
            glob_pattern: GlobPattern::String(format!("**/{CONFIG_FILE_NAME}")),
            kind: None,
        });

        let register_options = match serde_json::to_value(DidChangeWatchedFilesRegistrationOptions { watchers }) {
            Ok(value) => value,
            Err(error) => {
                tracing::error!("Failed to serialize watcher options: {}", error);
                return;
            }
        };

        let registration = Registration {
            id: "qt-i18n-file-watcher".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(register_options),
        };

        if let Err(error) = self.client.register_capability(vec![registration]).await {
            tracing::warn!("Failed to register file watchers: {}", error);
        }
    }

    /// 設定ファイルの変更を処理
    pub(crate) async fn handle_config_file_change(&self, file_path: &Path, change: FileChangeType) {
        tracing::info!(path = %file_path.display(), ?change, "Configuration file changed");

        let result = {
            let mut config_manager = self.config_manager.lock().await;
            let root = config_manager.workspace_root().cloned();
            config_manager.load_settings(root)
        };

        match result {
            Ok(()) => self.reindex_workspace().await,
            Err(error) => {
                self.client
                    .log_message(MessageType::ERROR, format!("Configuration error: {error}"))
                    .await;
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        handlers::lifecycle::handle_initialize(self, params).await
    }

    async fn initialized(&self, params: InitializedParams) {
        handlers::lifecycle::handle_initialized(self, params).await;
    }

    async fn shutdown(&self) -> Result<()> {
        handlers::lifecycle::handle_shutdown().await
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        handlers::workspace::handle_did_change_configuration(self, params).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        handlers::workspace::handle_did_change_watched_files(self, params).await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        handlers::document_sync::handle_did_open(self, params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        handlers::document_sync::handle_did_change(self, params).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        handlers::document_sync::handle_did_save(self, params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        handlers::document_sync::handle_did_close(self, params).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        handlers::features::handle_completion(self, params).await
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        handlers::features::handle_hover(self, params).await
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        handlers::features::handle_goto_definition(self, params).await
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        handlers::features::handle_references(self, params).await
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        handlers::code_action::handle_code_action(self, params).await
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        handlers::execute_command::handle_execute_command(self, params).await
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;
    use crate::test_utils::create_catalog;

    #[rstest]
    #[case::config(".qt-i18n.json", true)]
    #[case::nested("/ws/sub/.qt-i18n.json", true)]
    #[case::other("/ws/qt-i18n.json", false)]
    fn test_is_config_file(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(Backend::is_config_file(Path::new(path)), expected);
    }

    #[rstest]
    fn collect_sorted_languages_dedupes_and_orders() {
        let db = I18nDatabaseImpl::default();
        let catalogs = vec![
            create_catalog(&db, "it", "/ws/a_it.ts", &[]),
            create_catalog(&db, "de", "/ws/a_de.ts", &[]),
            create_catalog(&db, "it", "/ws/b_it.ts", &[]),
            create_catalog(&db, "fr", "/ws/a_fr.ts", &[]),
        ];
        let primary = vec!["fr".to_string()];

        let languages = collect_sorted_languages(&db, &catalogs, Some("it"), Some(&primary));

        assert_that!(languages, elements_are![eq("it"), eq("fr"), eq("de")]);
    }
}
