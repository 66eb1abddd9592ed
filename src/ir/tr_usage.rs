//! 翻訳呼び出し箇所の中間表現

use crate::interned::MessageKey;
use crate::types::SourceRange;

/// ソースコード内の `tr()` / `translate()` / `QT_*_NOOP()` 呼び出し
#[salsa::interned]
pub struct TrUsage {
    /// メッセージキー（インターン化）
    pub key: MessageKey<'db>,

    /// ソース文字列リテラルの範囲（引用符を含む）
    pub range: SourceRange,

    /// 件数引数が渡されているか（numerus）
    pub numerus: bool,

    /// `//:` コメントから抽出した翻訳者向けコメント
    pub extra_comment: Option<String>,
}
