//! LSP 機能ハンドラー
//!
//! `completion`, `hover`, `goto_definition`, `references` の処理を担当します。

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionParams,
    CompletionResponse,
    GotoDefinitionParams,
    GotoDefinitionResponse,
    Hover,
    HoverContents,
    HoverParams,
    Location,
    MarkupContent,
    MarkupKind,
    ReferenceParams,
};

use super::super::backend::Backend;
use crate::interned::MessageKey;
use crate::types::SourcePosition;

/// `textDocument/completion` リクエストを処理
pub async fn handle_completion(
    backend: &Backend,
    params: CompletionParams,
) -> Result<Option<CompletionResponse>> {
    let uri = params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "Completion request");

    // カタログが必要なため、読み込み完了を待つ
    if !backend.wait_for_catalogs().await {
        tracing::debug!("Completion request - catalogs not loaded yet");
        return Ok(None);
    }

    let Some(file_path) = Backend::uri_to_path(&uri) else {
        return Ok(None);
    };

    let effective_language = backend.effective_language().await;

    let items = {
        let (db, source_files, catalogs) = backend.state.lock_all().await;
        let Some(source_file) = source_files.get(&file_path).copied() else {
            tracing::debug!("Source file not found: {}", file_path.display());
            return Ok(None);
        };

        let Some(context) = crate::ide::completion::extract_completion_context(
            source_file.text(&*db),
            source_file.kind(&*db),
            position,
        ) else {
            tracing::debug!("Not inside a translatable string literal");
            return Ok(None);
        };

        tracing::debug!(
            context = %context.context,
            partial_source = %context.partial_source,
            "Extracted completion context"
        );

        crate::ide::completion::generate_completions(
            &*db,
            &catalogs,
            &context,
            effective_language.as_deref(),
        )
    };

    tracing::debug!("Generated {} completion items", items.len());

    if items.is_empty() { Ok(None) } else { Ok(Some(CompletionResponse::Array(items))) }
}

/// `textDocument/hover` リクエストを処理
pub async fn handle_hover(backend: &Backend, params: HoverParams) -> Result<Option<Hover>> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "Hover request");

    // タイムアウトした場合は hover 情報なしを返す
    if !backend.wait_for_catalogs().await {
        tracing::debug!("Hover request timeout - catalogs not loaded yet");
        return Ok(None);
    }

    let Some(file_path) = Backend::uri_to_path(&uri) else {
        return Ok(None);
    };

    let Some(id) = backend.message_at_position(&file_path, SourcePosition::from(position)).await
    else {
        tracing::debug!("No translatable message found at position");
        return Ok(None);
    };

    let hover_text = {
        let primary_languages =
            backend.config_manager.lock().await.get_settings().primary_languages.clone();
        let current_language = backend.state.current_language.lock().await.clone();

        let (db, catalogs) = backend.state.lock_db_and_catalogs().await;
        let key = MessageKey::from_id(&*db, &id);
        crate::ide::hover::generate_hover_content(
            &*db,
            key,
            &catalogs,
            current_language.as_deref(),
            primary_languages.as_deref(),
        )
    };

    let Some(hover_text) = hover_text else {
        tracing::debug!("No catalog entries for {}", id);
        return Ok(None);
    };

    Ok(Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: hover_text,
        }),
        range: None,
    }))
}

/// `textDocument/definition` リクエストを処理
pub async fn handle_goto_definition(
    backend: &Backend,
    params: GotoDefinitionParams,
) -> Result<Option<GotoDefinitionResponse>> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "Goto Definition request");

    if !backend.wait_for_catalogs().await {
        tracing::debug!("Goto Definition request - catalogs not loaded yet");
        return Ok(None);
    }

    let Some(file_path) = Backend::uri_to_path(&uri) else {
        return Ok(None);
    };

    let Some(id) = backend.message_at_position(&file_path, SourcePosition::from(position)).await
    else {
        tracing::debug!("No translatable message found at position");
        return Ok(None);
    };

    // カタログ内の `<source>` を検索
    let locations = {
        let (db, catalogs) = backend.state.lock_db_and_catalogs().await;
        let key = MessageKey::from_id(&*db, &id);
        crate::ide::goto_definition::find_definitions(&*db, key, &catalogs)
    };

    tracing::debug!("Found {} definitions for {}", locations.len(), id);

    if locations.is_empty() { Ok(None) } else { Ok(Some(GotoDefinitionResponse::Array(locations))) }
}

/// `textDocument/references` リクエストを処理
pub async fn handle_references(
    backend: &Backend,
    params: ReferenceParams,
) -> Result<Option<Vec<Location>>> {
    let uri = params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "References request");

    // 全インデックス完了をチェック（待機しない）
    if !backend.workspace_indexer.is_indexing_completed() {
        tracing::debug!("References request - indexing not completed, returning empty results");
        return Ok(Some(vec![]));
    }

    let Some(file_path) = Backend::uri_to_path(&uri) else {
        return Ok(None);
    };

    let Some(id) = backend.message_at_position(&file_path, SourcePosition::from(position)).await
    else {
        tracing::debug!("No translatable message found at position");
        return Ok(None);
    };

    // 全ソースファイルから参照を検索
    let locations = {
        let (db, source_files) = backend.state.lock_db_and_source_files().await;
        let key = MessageKey::from_id(&*db, &id);
        crate::ide::references::find_references(&*db, key, &source_files)
    };

    tracing::debug!("Found {} references for {}", locations.len(), id);

    if locations.is_empty() { Ok(None) } else { Ok(Some(locations)) }
}
