//! テスト用ユーティリティ関数
//!
//! 複数のテストモジュールで使用される共通のヘルパー関数を提供します。
#![cfg(test)]
#![allow(clippy::unwrap_used)]

use std::path::Path;

use crate::catalog::{
    Catalog,
    Context,
    Message,
    TranslationStatus,
    TranslationText,
    WriteOptions,
    write_catalog,
};
use crate::db::I18nDatabaseImpl;
use crate::input::catalog::{
    CatalogFile,
    catalog_file_from_text,
};
use crate::input::source::{
    SourceFile,
    SourceKind,
};

/// テスト用の `CatalogFile` を作成する
///
/// `messages` は `(context, source, translation)`。翻訳が `None` のものは未翻訳になる。
/// 一度 XML に書き出してから読み込むので、`<source>` の位置情報も実際のものになる。
pub(crate) fn create_catalog(
    db: &I18nDatabaseImpl,
    language: &str,
    file_path: &str,
    messages: &[(&str, &str, Option<&str>)],
) -> CatalogFile {
    let mut catalog = Catalog {
        version: Some("2.1".to_string()),
        language: Some(language.to_string()),
        ..Catalog::default()
    };

    for (context, source, translation) in messages {
        let mut message = Message::new(*source);
        match translation {
            Some(text) => message.translation = Some(TranslationText::Single((*text).to_string())),
            None => {
                message.translation = Some(TranslationText::Single(String::new()));
                message.status = TranslationStatus::Unfinished;
            }
        }
        match catalog.contexts.iter_mut().find(|ctx| ctx.name == *context) {
            Some(ctx) => ctx.messages.push(message),
            None => catalog.contexts.push(Context {
                name: (*context).to_string(),
                comment: None,
                messages: vec![message],
            }),
        }
    }

    let text = write_catalog(&catalog, &WriteOptions::default());
    catalog_file_from_text(db, Path::new(file_path), text).unwrap()
}

/// テスト用の C++ `SourceFile` を作成する
pub(crate) fn create_source(db: &I18nDatabaseImpl, uri: &str, text: &str) -> SourceFile {
    SourceFile::new(db, uri.to_string(), text.to_string(), SourceKind::Cpp)
}
