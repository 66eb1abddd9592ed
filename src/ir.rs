//! 中間表現
pub mod tr_usage;
