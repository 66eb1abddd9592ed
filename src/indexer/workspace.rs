//! Workspace walk and concurrent loading of catalogs and sources.
use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool,
    AtomicU32,
    Ordering,
};
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use ignore::WalkBuilder;
use tokio::sync::{
    Mutex,
    Notify,
};
use tower_lsp::lsp_types::Url;

use crate::catalog::{
    Catalog,
    SourceSpans,
    language::catalog_language,
    parse_catalog_with_spans,
};
use crate::config::{
    ConfigManager,
    FileMatcher,
    IndexingConfig,
    WorkspaceFile,
};
use crate::db::I18nDatabaseImpl;
use crate::indexer::types::{
    DiscoveredFiles,
    IndexerError,
};
use crate::input::catalog::CatalogFile;
use crate::input::source::{
    SourceFile,
    SourceKind,
};

/// Parsed catalog waiting to become a database input.
type ParsedCatalog = (PathBuf, String, Catalog, SourceSpans);

/// ワークスペースのインデックス状態を管理
#[derive(Clone, Debug, Default)]
pub struct WorkspaceIndexer {
    /// カタログの読み込みが完了したか
    catalogs_loaded: Arc<AtomicBool>,
    /// ソースファイルを含む全インデックスが完了したか
    indexing_completed: Arc<AtomicBool>,
    /// カタログ読み込み完了の通知
    catalogs_notify: Arc<Notify>,
}

impl WorkspaceIndexer {
    /// 新しいインデクサーを作成
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 再インデックス前に状態をリセット
    pub fn reset(&self) {
        self.catalogs_loaded.store(false, Ordering::Release);
        self.indexing_completed.store(false, Ordering::Release);
    }

    /// インデックス対象がない場合や失敗した場合も、完了として扱う
    pub fn mark_completed(&self) {
        self.catalogs_loaded.store(true, Ordering::Release);
        self.indexing_completed.store(true, Ordering::Release);
        self.catalogs_notify.notify_waiters();
    }

    #[must_use]
    pub fn is_indexing_completed(&self) -> bool {
        self.indexing_completed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn are_catalogs_loaded(&self) -> bool {
        self.catalogs_loaded.load(Ordering::Acquire)
    }

    /// カタログの読み込み完了を待つ。タイムアウトした場合は `false`
    pub async fn wait_for_catalogs(&self, timeout: Duration) -> bool {
        if self.are_catalogs_loaded() {
            return true;
        }
        let notified = self.catalogs_notify.notified();
        if self.are_catalogs_loaded() {
            return true;
        }
        tokio::time::timeout(timeout, notified).await.is_ok() || self.are_catalogs_loaded()
    }

    /// 並列度（未設定時は CPU コア数の 80%、最低 1）
    #[must_use]
    pub fn num_threads(config: &IndexingConfig) -> usize {
        config.num_threads.unwrap_or_else(|| (num_cpus::get() * 4 / 5).max(1))
    }

    /// ワークスペースを走査してカタログとソースファイルを分類
    #[must_use]
    pub fn discover_files(workspace_path: &Path, matcher: &FileMatcher) -> DiscoveredFiles {
        let mut found = DiscoveredFiles::default();

        // ignore クレートでファイルを走査
        for result in WalkBuilder::new(workspace_path)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            // ファイルのみを対象
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            match matcher.classify(path) {
                Some(WorkspaceFile::Catalog) => found.catalogs.push(path.to_path_buf()),
                Some(WorkspaceFile::Source(_)) => found.sources.push(path.to_path_buf()),
                None => {}
            }
        }

        found.catalogs.sort();
        found.sources.sort();
        found
    }

    /// ワークスペースをインデックス
    ///
    /// カタログを先に読み込み、完了を通知してからソースファイルを読み込む。
    /// `progress` には `(処理済み, 総数)` が渡される。
    ///
    /// # Errors
    /// - 設定のパターンが不正
    /// - バックグラウンドタスクの失敗
    pub async fn index_workspace<F>(
        &self,
        db: I18nDatabaseImpl,
        workspace_path: &Path,
        config_manager: &ConfigManager,
        source_files: Arc<Mutex<HashMap<PathBuf, SourceFile>>>,
        catalogs: Arc<Mutex<Vec<CatalogFile>>>,
        progress: Option<F>,
    ) -> Result<(), IndexerError>
    where
        F: Fn(u32, u32) + Send + Sync,
    {
        tracing::debug!(workspace_path = %workspace_path.display(), "Indexing workspace");
        if !workspace_path.is_dir() {
            return Err(IndexerError::InvalidPath(workspace_path.display().to_string()));
        }

        let settings = config_manager.get_settings();
        let matcher = FileMatcher::new(workspace_path.to_path_buf(), settings)?;
        let threads = Self::num_threads(&settings.indexing);

        let root = workspace_path.to_path_buf();
        let files =
            tokio::task::spawn_blocking(move || Self::discover_files(&root, &matcher)).await?;
        tracing::info!(
            catalogs = files.catalogs.len(),
            sources = files.sources.len(),
            threads,
            "Discovered workspace files"
        );

        let total = u32::try_from(files.total()).unwrap_or(u32::MAX);
        let processed = AtomicU32::new(0);
        let report = || {
            let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = &progress {
                progress(current, total);
            }
        };

        // カタログは読み込み順が結果に影響するため順序を保つ
        let parsed: Vec<Option<ParsedCatalog>> = stream::iter(files.catalogs)
            .map(|path| async {
                let parsed = read_catalog(path).await;
                report();
                parsed
            })
            .buffered(threads)
            .collect()
            .await;

        let loaded: Vec<CatalogFile> = parsed
            .into_iter()
            .flatten()
            .map(|(path, text, catalog, spans)| {
                let language = catalog_language(&catalog, &path);
                CatalogFile::new(
                    &db,
                    language,
                    path.to_string_lossy().into_owned(),
                    catalog,
                    text,
                    spans,
                )
            })
            .collect();
        tracing::debug!(count = loaded.len(), "Catalogs loaded");
        catalogs.lock().await.extend(loaded);

        self.catalogs_loaded.store(true, Ordering::Release);
        self.catalogs_notify.notify_waiters();

        let sources: Vec<(PathBuf, String)> = stream::iter(files.sources)
            .map(|path| async {
                let text = match tokio::fs::read_to_string(&path).await {
                    Ok(text) => Some((path, text)),
                    Err(e) => {
                        tracing::warn!("Failed to read file {:?}: {}", path, e);
                        None
                    }
                };
                report();
                text
            })
            .buffer_unordered(threads)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        let mut source_files = source_files.lock().await;
        for (path, text) in sources {
            let Ok(uri) = Url::from_file_path(&path) else {
                tracing::warn!("Failed to create URI for file {:?}", path);
                continue;
            };
            let Some(kind) = SourceKind::from_uri(uri.as_str()) else {
                continue;
            };
            source_files.insert(path, SourceFile::new(&db, uri.to_string(), text, kind));
        }
        tracing::debug!(count = source_files.len(), "Source files indexed");
        drop(source_files);

        self.indexing_completed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Reads a catalog and parses it on the blocking pool. Failures are logged and skipped.
async fn read_catalog(path: PathBuf) -> Option<ParsedCatalog> {
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Failed to read catalog {:?}: {}", path, e);
            return None;
        }
    };

    let parsed = tokio::task::spawn_blocking(move || {
        parse_catalog_with_spans(&text).map(|(catalog, spans)| (text, catalog, spans))
    })
    .await;

    match parsed {
        Ok(Ok((text, catalog, spans))) => Some((path, text, catalog, spans)),
        Ok(Err(e)) => {
            tracing::warn!(path = %path.display(), "Failed to parse catalog: {e}");
            None
        }
        Err(e) => {
            tracing::error!(path = %path.display(), "Catalog parse task failed: {e}");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::config::I18nSettings;

    const CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.0" language="it_IT">
<context>
    <name>Graph</name>
    <message>
        <source>Title</source>
        <translation>Titolo</translation>
    </message>
</context>
</TS>
"#;

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("translations")).unwrap();
        fs::create_dir_all(dir.path().join("generated")).unwrap();
        fs::write(dir.path().join("translations/app_it.ts"), CATALOG).unwrap();
        fs::write(dir.path().join("translations/broken_de.ts"), "<TS><context>").unwrap();
        fs::write(dir.path().join("src/Graph.cpp"), r#"void Graph::f() { tr("Title"); }"#)
            .unwrap();
        fs::write(dir.path().join("src/Form.ui"), "<ui><class>Form</class></ui>").unwrap();
        fs::write(dir.path().join("generated/moc.cpp"), "").unwrap();
        fs::write(dir.path().join("README.md"), "# app").unwrap();
        fs::write(dir.path().join(".gitignore"), "generated/\n").unwrap();
        dir
    }

    #[rstest]
    fn discover_files_splits_roles() {
        let dir = workspace();
        let matcher = FileMatcher::new(dir.path().to_path_buf(), &I18nSettings::default()).unwrap();

        let files = WorkspaceIndexer::discover_files(dir.path(), &matcher);

        assert_that!(
            files.catalogs,
            elements_are![
                eq(&dir.path().join("translations/app_it.ts")),
                eq(&dir.path().join("translations/broken_de.ts"))
            ]
        );
        assert_that!(
            files.sources,
            elements_are![eq(&dir.path().join("src/Form.ui")), eq(&dir.path().join("src/Graph.cpp"))]
        );
    }

    #[rstest]
    #[case::configured(Some(3), 3)]
    fn num_threads_uses_setting(#[case] configured: Option<usize>, #[case] expected: usize) {
        let config = IndexingConfig { num_threads: configured };

        assert_that!(WorkspaceIndexer::num_threads(&config), eq(expected));
    }

    #[rstest]
    fn num_threads_default_is_positive() {
        assert_that!(WorkspaceIndexer::num_threads(&IndexingConfig::default()), gt(0));
    }

    #[tokio::test]
    async fn index_workspace_loads_catalogs_and_sources() {
        let dir = workspace();
        let db = I18nDatabaseImpl::default();
        let mut config_manager = ConfigManager::new();
        config_manager.load_settings(Some(dir.path().to_path_buf())).unwrap();
        let source_files = Arc::new(Mutex::new(HashMap::new()));
        let catalogs = Arc::new(Mutex::new(Vec::new()));
        let reported = Arc::new(AtomicU32::new(0));
        let reported_clone = reported.clone();

        let indexer = WorkspaceIndexer::new();
        let result = indexer
            .index_workspace(
                db.clone(),
                dir.path(),
                &config_manager,
                source_files.clone(),
                catalogs.clone(),
                Some(move |_current: u32, _total: u32| {
                    reported_clone.fetch_add(1, Ordering::Relaxed);
                }),
            )
            .await;

        assert!(result.is_ok());
        assert!(indexer.are_catalogs_loaded());
        assert!(indexer.is_indexing_completed());
        assert!(indexer.wait_for_catalogs(Duration::from_millis(1)).await);

        let catalogs = catalogs.lock().await;
        assert_eq!(catalogs.len(), 1);
        assert_eq!(catalogs[0].language(&db), "it_IT");
        assert_eq!(source_files.lock().await.len(), 2);
        assert_eq!(reported.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn wait_for_catalogs_times_out_before_indexing() {
        let indexer = WorkspaceIndexer::new();

        assert!(!indexer.wait_for_catalogs(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn index_workspace_rejects_missing_directory() {
        let indexer = WorkspaceIndexer::new();
        let result = indexer
            .index_workspace(
                I18nDatabaseImpl::default(),
                Path::new("/nonexistent/qt-i18n-workspace"),
                &ConfigManager::new(),
                Arc::new(Mutex::new(HashMap::new())),
                Arc::new(Mutex::new(Vec::new())),
                None::<fn(u32, u32)>,
            )
            .await;

        assert!(matches!(result, Err(IndexerError::InvalidPath(_))));
    }
}
