//! Document synchronization handlers.

use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
};

use super::super::backend::Backend;

pub async fn handle_did_open(backend: &Backend, params: DidOpenTextDocumentParams) {
    let uri = params.text_document.uri;
    tracing::debug!(uri = %uri, "didOpen");

    {
        let mut opened_files = backend.state.opened_files.lock().await;
        opened_files.insert(uri.clone());
    }

    backend.update_and_diagnose(uri, params.text_document.text).await;
}

pub async fn handle_did_change(backend: &Backend, params: DidChangeTextDocumentParams) {
    let uri = params.text_document.uri;

    // FULL 同期なので最後の変更が文書全体
    let Some(change) = params.content_changes.into_iter().next_back() else {
        return;
    };

    backend.update_and_diagnose(uri, change.text).await;
}

pub async fn handle_did_save(backend: &Backend, params: DidSaveTextDocumentParams) {
    tracing::debug!(uri = %params.text_document.uri, "didSave");

    // 保存されたカタログの未使用メッセージを更新
    if let Some(path) = Backend::uri_to_path(&params.text_document.uri)
        && backend.is_translation_file(&path).await
    {
        backend.send_catalog_diagnostics().await;
    }
}

pub async fn handle_did_close(backend: &Backend, params: DidCloseTextDocumentParams) {
    let uri = params.text_document.uri;
    tracing::debug!(uri = %uri, "didClose");

    {
        let mut opened_files = backend.state.opened_files.lock().await;
        opened_files.remove(&uri);
    }
}
