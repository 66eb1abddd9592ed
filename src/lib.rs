//! qt-i18n-language-server
//!
//! Qt Linguist の翻訳カタログ（`.ts`）ライブラリと、
//! Qt C++ プロジェクト向けの i18n Language Server Protocol (LSP) 実装

pub mod catalog;
pub mod config;
pub mod db;
pub mod ide;
pub mod indexer;
pub mod input;
pub mod interned;
pub mod ir;
pub mod syntax;
pub mod types;

#[cfg(test)]
mod test_utils;

// Backend を再エクスポート
pub use ide::backend::Backend;
