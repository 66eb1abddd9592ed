//! Workspace configuration (`.qt-i18n.json` and `qtI18n` client settings).
/// Configuration manager
mod manager;
/// Workspace file classification
mod matcher;
/// Configuration types and settings
mod types;

pub use manager::{
    CONFIG_FILE_NAME,
    ConfigManager,
    SettingsSource,
};
pub use matcher::{
    FileMatcher,
    MatcherError,
    WorkspaceFile,
};
pub use types::{
    ConfigError,
    DiagnosticsConfig,
    I18nSettings,
    IndexingConfig,
    MissingMessageConfig,
    ServerSettings,
    Severity,
    TranslationFilesConfig,
    UnusedMessageConfig,
    UntranslatedMessageConfig,
    ValidationError,
};
