//! Types for the analyzer module

use std::ops::Range;
use std::str::FromStr;

use thiserror::Error;

use crate::catalog::ExtractedMessage;
use crate::types::SourceRange;

/// Tree-sitter クエリで使用するキャプチャ名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureName {
    /// 呼び出し全体 (e.g., `tr("Axis")`)
    Call,
    /// 呼び出される関数 (`tr`, `Graph::tr`, `qApp->translate`, `QT_TR_NOOP`)
    Function,
    /// 引数リスト
    Arguments,
    /// `//:` / `/*: */` 翻訳者向けコメント
    ExtraComment,
}

impl CaptureName {
    /// Tree-sitter クエリで使用する文字列表現を取得
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "qt.call",
            Self::Function => "qt.function",
            Self::Arguments => "qt.arguments",
            Self::ExtraComment => "qt.extra_comment",
        }
    }
}

/// 文字列から `CaptureName` への変換エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCaptureNameError;

impl FromStr for CaptureName {
    type Err = ParseCaptureNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qt.call" => Ok(Self::Call),
            "qt.function" => Ok(Self::Function),
            "qt.arguments" => Ok(Self::Arguments),
            "qt.extra_comment" => Ok(Self::ExtraComment),
            _ => Err(ParseCaptureNameError),
        }
    }
}

/// Which construct produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrCallKind {
    /// `tr()`, `trUtf8()`, `Class::tr()`
    Tr,
    /// `QCoreApplication::translate()` and friends
    Translate,
    /// `QT_TR_NOOP()`, `QT_TR_N_NOOP()`
    TrNoop,
    /// `QT_TRANSLATE_NOOP()`, `QT_TRANSLATE_NOOP3()`, `QT_TRANSLATE_N_NOOP()`
    TranslateNoop,
    /// `<string>` in a Qt Designer form
    Designer,
}

impl TrCallKind {
    /// Whether completion may offer sources of the enclosing context.
    #[must_use]
    pub const fn context_is_implicit(self) -> bool {
        matches!(self, Self::Tr | Self::TrNoop)
    }
}

/// A translatable string found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrCall {
    pub kind: TrCallKind,
    pub context: String,
    pub source: String,
    pub comment: Option<String>,
    pub numerus: bool,
    pub extra_comment: Option<String>,
    /// Range of the source literal, quotes included.
    pub source_range: SourceRange,
    /// Byte span of the whole call.
    pub call_bytes: Range<usize>,
}

impl TrCall {
    /// 1-based line of the source literal.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.source_range.start.line + 1
    }

    /// Converts the call into a merge input with `filename` as its location.
    #[must_use]
    pub fn to_extracted(&self, filename: Option<String>) -> ExtractedMessage {
        ExtractedMessage {
            context: self.context.clone(),
            source: self.source.clone(),
            comment: self.comment.clone(),
            extra_comment: self.extra_comment.clone(),
            numerus: self.numerus,
            filename,
            line: Some(self.line()),
        }
    }
}

/// Defines errors that may occur during the analysis process
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Error when failing to set the language for the parser
    #[error("Failed to set language for parser: {0}")]
    LanguageSetup(#[from] tree_sitter::LanguageError),
    /// Error when failing to parse source code
    #[error("Failed to parse source code")]
    ParseFailed,
    /// Error when a Designer form is not well-formed XML
    #[error("Malformed form at line {line}: {message}")]
    Form { line: u32, message: String },
}
