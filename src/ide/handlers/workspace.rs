//! Workspace-related handlers.

use tower_lsp::lsp_types::{
    DidChangeConfigurationParams,
    DidChangeWatchedFilesParams,
    FileChangeType,
};

use super::super::backend::Backend;
use crate::config::{
    I18nSettings,
    ServerSettings,
};

/// クライアント設定を解釈する（`qtI18n` セクションでラップされていてもよい）
fn parse_client_settings(settings: serde_json::Value) -> Option<I18nSettings> {
    serde_json::from_value::<ServerSettings>(settings.clone())
        .map(|wrapped| wrapped.qt_i18n)
        .or_else(|_| serde_json::from_value::<I18nSettings>(settings))
        .ok()
}

pub async fn handle_did_change_configuration(
    backend: &Backend,
    params: DidChangeConfigurationParams,
) {
    tracing::info!(settings = %params.settings, "didChangeConfiguration received");

    let Some(new_settings) = parse_client_settings(params.settings) else {
        tracing::warn!("Ignoring unrecognised client settings");
        return;
    };

    let mut config_manager = backend.config_manager.lock().await;
    match config_manager.update_settings(new_settings) {
        Ok(()) => {
            drop(config_manager);
            tracing::info!("configuration updated successfully");

            backend.reindex_workspace().await;
        }
        Err(error) => {
            tracing::error!(%error, "configuration validation error");
        }
    }
}

pub async fn handle_did_change_watched_files(
    backend: &Backend,
    params: DidChangeWatchedFilesParams,
) {
    let mut catalogs_changed = false;

    for change in params.changes {
        let Some(file_path) = Backend::uri_to_path(&change.uri) else {
            continue;
        };

        if Backend::is_config_file(&file_path) {
            backend.handle_config_file_change(&file_path, change.typ).await;
            continue;
        }

        if backend.is_translation_file(&file_path).await {
            tracing::debug!("Catalog changed: {:?}, type: {:?}", file_path, change.typ);

            match change.typ {
                FileChangeType::CREATED | FileChangeType::CHANGED => {
                    // 開いているカタログはエディタの内容を正とする
                    if backend.state.opened_files.lock().await.contains(&change.uri) {
                        continue;
                    }
                    backend.reload_catalog_file(&file_path).await;
                    catalogs_changed = true;
                }
                FileChangeType::DELETED => {
                    backend.remove_catalog_file(&file_path).await;
                    catalogs_changed = true;
                }
                _ => {}
            }
        }
    }

    if catalogs_changed {
        backend.send_diagnostics_to_opened_files().await;
        backend.send_catalog_diagnostics().await;
    }
}
