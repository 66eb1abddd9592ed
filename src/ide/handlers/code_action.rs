//! Code Action ハンドラー
//!
//! `textDocument/codeAction` リクエストを処理し、
//! カタログに存在しないメッセージを追加するアクションを提供します。

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CodeActionParams,
    CodeActionResponse,
};

use super::super::backend::Backend;

/// `textDocument/codeAction` リクエストを処理
///
/// `missing-message` 診断が範囲内にある場合のみアクションを返します。
#[allow(clippy::unused_async)]
pub async fn handle_code_action(
    _backend: &Backend,
    params: CodeActionParams,
) -> Result<Option<CodeActionResponse>> {
    let uri = &params.text_document.uri;
    let position = params.range.start;
    tracing::debug!(uri = %uri, line = position.line, character = position.character, "Code Action request");

    let actions = crate::ide::code_actions::generate_code_actions(&params.context.diagnostics);

    tracing::debug!("Generated {} code actions", actions.len());

    Ok(Some(actions))
}
