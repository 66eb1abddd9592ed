//! 設定の読み込みと保持
//!
//! 設定は次のいずれかから来る:
//! - ワークスペースルートの `.qt-i18n.json`
//! - `workspace/didChangeConfiguration` の `qtI18n` セクション
//! - どちらもなければデフォルト値

use std::fmt;
use std::io::ErrorKind;
use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    I18nSettings,
};

/// ワークスペースルートに置く設定ファイル名
pub const CONFIG_FILE_NAME: &str = ".qt-i18n.json";

/// Where the active settings came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SettingsSource {
    #[default]
    Default,
    /// `.qt-i18n.json`
    File(PathBuf),
    /// Sent by the editor.
    Client,
}

impl fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("defaults"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Client => f.write_str("client settings"),
        }
    }
}

/// Reads `.qt-i18n.json` in `workspace_root`, `Ok(None)` when there is none.
fn read_config_file(workspace_root: &Path) -> Result<Option<(PathBuf, I18nSettings)>, ConfigError> {
    let path = workspace_root.join(CONFIG_FILE_NAME);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };
    let settings = serde_json::from_str(&content)?;
    Ok(Some((path, settings)))
}

/// 現在の設定とワークスペースルートを保持する
///
/// 不正な設定は受け付けず、直前の有効な設定を維持する。
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    settings: I18nSettings,
    /// 設定の出どころ
    source: SettingsSource,
    /// ワークスペースのルートパス
    workspace_root: Option<PathBuf>,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ワークスペースの `.qt-i18n.json` から設定を読み込む
    ///
    /// ファイルがなければデフォルト値を使う。
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self, workspace_root: Option<PathBuf>) -> Result<(), ConfigError> {
        let loaded = match &workspace_root {
            Some(root) => read_config_file(root)?,
            None => None,
        };
        let (settings, source) = match loaded {
            Some((path, settings)) => (settings, SettingsSource::File(path)),
            None => (I18nSettings::default(), SettingsSource::Default),
        };

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        tracing::info!(%source, "Settings loaded");
        self.settings = settings;
        self.source = source;
        self.workspace_root = workspace_root;
        Ok(())
    }

    /// エディタから送られた設定に置き換える
    ///
    /// # Errors
    /// - バリデーションエラー
    pub fn update_settings(&mut self, new_settings: I18nSettings) -> Result<(), ConfigError> {
        new_settings.validate().map_err(ConfigError::ValidationErrors)?;

        tracing::debug!(previous = %self.source, "Settings replaced by client settings");
        self.settings = new_settings;
        self.source = SettingsSource::Client;
        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &I18nSettings {
        &self.settings
    }

    #[must_use]
    pub const fn source(&self) -> &SettingsSource {
        &self.source
    }

    #[must_use]
    pub const fn workspace_root(&self) -> Option<&PathBuf> {
        self.workspace_root.as_ref()
    }
}
