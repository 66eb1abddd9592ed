use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::catalog::UpdateOptions;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "includePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `workspace/didChangeConfiguration` payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    pub qt_i18n: I18nSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct I18nSettings {
    pub translation_files: TranslationFilesConfig,

    /// C++ sources and Designer forms to scan for translatable strings.
    pub include_patterns: Vec<String>,
    /// Applies to both sources and catalogs.
    pub exclude_patterns: Vec<String>,

    pub indexing: IndexingConfig,

    /// Languages that must contain every message.
    ///
    /// - `None`: All detected languages are required (default)
    /// - `Some([...])`: Only specified languages are required
    ///
    /// Mutually exclusive with `optional_languages`.
    pub required_languages: Option<Vec<String>>,

    /// Languages where missing messages are ignored.
    ///
    /// Mutually exclusive with `required_languages`.
    pub optional_languages: Option<Vec<String>>,

    pub diagnostics: DiagnosticsConfig,

    /// Fallback language priority when `currentLanguage` is unset.
    pub primary_languages: Option<Vec<String>>,

    /// Options for `qt-i18n.updateCatalogs`.
    pub update: UpdateOptions,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexingConfig {
    /// Parallel thread count for indexing.
    /// Default: 80% of CPU cores (minimum 1).
    pub num_threads: Option<usize>,
}

/// Severity configurable for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingMessageConfig {
    pub enabled: bool,
    pub severity: Severity,
}

impl Default for MissingMessageConfig {
    fn default() -> Self {
        Self { enabled: true, severity: Severity::Warning }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UntranslatedMessageConfig {
    pub enabled: bool,
    pub severity: Severity,
}

impl Default for UntranslatedMessageConfig {
    fn default() -> Self {
        Self { enabled: true, severity: Severity::Information }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnusedMessageConfig {
    pub enabled: bool,
    pub severity: Severity,
}

impl Default for UnusedMessageConfig {
    fn default() -> Self {
        Self { enabled: true, severity: Severity::Hint }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticsConfig {
    pub missing_message: MissingMessageConfig,
    pub untranslated_message: UntranslatedMessageConfig,
    pub unused_message: UnusedMessageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationFilesConfig {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for TranslationFilesConfig {
    fn default() -> Self {
        Self { include_patterns: vec!["**/*.ts".to_string()], exclude_patterns: Vec::new() }
    }
}

fn validate_patterns(field: &str, patterns: &[String], errors: &mut Vec<ValidationError>) {
    for (index, pattern) in patterns.iter().enumerate() {
        if let Err(e) = globset::Glob::new(pattern) {
            errors.push(ValidationError::new(
                format!("{field}[{index}]"),
                format!("Invalid glob pattern '{pattern}': {e}"),
            ));
        }
    }
}

impl I18nSettings {
    /// # Errors
    /// - Required pattern list is empty
    /// - Invalid glob pattern
    /// - Both language lists given
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "includePatterns",
                "At least one pattern is required. Example: [\"**/*.{cpp,h,ui}\"]",
            ));
        }
        validate_patterns("includePatterns", &self.include_patterns, &mut errors);
        validate_patterns("excludePatterns", &self.exclude_patterns, &mut errors);

        if self.translation_files.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "translationFiles.includePatterns",
                "At least one pattern is required. Example: [\"translations/*.ts\"]",
            ));
        }
        validate_patterns(
            "translationFiles.includePatterns",
            &self.translation_files.include_patterns,
            &mut errors,
        );
        validate_patterns(
            "translationFiles.excludePatterns",
            &self.translation_files.exclude_patterns,
            &mut errors,
        );

        if self.required_languages.is_some() && self.optional_languages.is_some() {
            errors.push(ValidationError::new(
                "requiredLanguages/optionalLanguages",
                "Cannot specify both 'requiredLanguages' and 'optionalLanguages'. Please use only one",
            ));
        }

        if self.indexing.num_threads == Some(0) {
            errors.push(ValidationError::new(
                "indexing.numThreads",
                "Must be at least 1, or removed to use the default",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Whether missing messages in `language` are reported.
    #[must_use]
    pub fn is_required_language(&self, language: &str) -> bool {
        use crate::catalog::language::language_matches;

        if let Some(required) = &self.required_languages {
            return required.iter().any(|l| language_matches(l, language));
        }
        if let Some(optional) = &self.optional_languages {
            return !optional.iter().any(|l| language_matches(l, language));
        }
        true
    }
}

impl Default for I18nSettings {
    fn default() -> Self {
        Self {
            translation_files: TranslationFilesConfig::default(),
            include_patterns: vec!["**/*.{cpp,cc,cxx,c++,h,hh,hpp,hxx,ui}".to_string()],
            exclude_patterns: vec!["build/**".to_string(), "**/moc_*.cpp".to_string()],
            indexing: IndexingConfig::default(),
            required_languages: None,
            optional_languages: None,
            diagnostics: DiagnosticsConfig::default(),
            primary_languages: None,
            update: UpdateOptions::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn validate_valid_settings() {
        let settings = I18nSettings::default();

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn deserialize_partial_settings() {
        let json = r#"{"requiredLanguages": ["it"], "update": {"noObsolete": true}}"#;

        let settings: I18nSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.include_patterns, len(eq(1)));
        assert_that!(settings.required_languages, some(elements_are![eq("it")]));
        assert_that!(settings.update.no_obsolete, eq(true));
        assert_that!(settings.update.sort_contexts, eq(true));
    }

    #[rstest]
    fn deserialize_empty_settings() {
        let json = "{}";

        let settings: I18nSettings = serde_json::from_str(json).unwrap();

        assert_that!(
            settings.include_patterns,
            elements_are![eq("**/*.{cpp,cc,cxx,c++,h,hh,hpp,hxx,ui}")]
        );
        assert_that!(settings.translation_files.include_patterns, elements_are![eq("**/*.ts")]);
        assert_that!(settings.diagnostics.missing_message.severity, eq(Severity::Warning));
        assert_that!(settings.diagnostics.unused_message.severity, eq(Severity::Hint));
    }

    #[rstest]
    fn deserialize_server_settings() {
        let json = r#"{"qtI18n": {"diagnostics": {"unusedMessage": {"enabled": false}}}}"#;

        let settings: ServerSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.qt_i18n.diagnostics.unused_message.enabled, eq(false));
        assert_that!(settings.qt_i18n.diagnostics.missing_message.enabled, eq(true));
    }

    #[rstest]
    fn validate_invalid_include_patterns_empty() {
        let settings = I18nSettings { include_patterns: vec![], ..I18nSettings::default() };
        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("includePatterns")),
                field!(ValidationError.message, contains_substring("At least one pattern"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_include_pattern_invalid_glob() {
        let settings = I18nSettings {
            include_patterns: vec!["**/*.{cpp,h".to_string()],
            ..I18nSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("includePatterns[0]")),
                field!(ValidationError.message, contains_substring("Invalid glob pattern")),
                field!(ValidationError.message, contains_substring("**/*.{cpp,h"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_exclude_pattern_invalid_glob() {
        let settings = I18nSettings {
            exclude_patterns: vec![
                "build/**".to_string(),
                "3rdparty/**".to_string(),
                "invalid[pattern".to_string(),
            ],
            ..I18nSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("excludePatterns[2]")),
                field!(ValidationError.message, contains_substring("invalid[pattern"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_translation_patterns() {
        let settings = I18nSettings {
            translation_files: TranslationFilesConfig {
                include_patterns: vec!["translations/{a,b.ts".to_string()],
                exclude_patterns: vec![],
            },
            ..I18nSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![field!(
                ValidationError.field_path,
                eq("translationFiles.includePatterns[0]")
            )])
        );
    }

    #[rstest]
    fn validate_language_lists_are_exclusive() {
        let settings = I18nSettings {
            required_languages: Some(vec!["it".to_string()]),
            optional_languages: Some(vec!["de".to_string()]),
            ..I18nSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![field!(
                ValidationError.field_path,
                eq("requiredLanguages/optionalLanguages")
            )])
        );
    }

    #[rstest]
    fn validate_zero_threads() {
        let settings = I18nSettings {
            indexing: IndexingConfig { num_threads: Some(0) },
            ..I18nSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![field!(ValidationError.field_path, eq("indexing.numThreads"))])
        );
    }

    #[rstest]
    #[case::all_required(None, None, "it", true)]
    #[case::listed(Some(vec!["it"]), None, "it_IT", true)]
    #[case::not_listed(Some(vec!["it"]), None, "de", false)]
    #[case::optional(None, Some(vec!["de"]), "de", false)]
    #[case::not_optional(None, Some(vec!["de"]), "it", true)]
    fn required_language(
        #[case] required: Option<Vec<&str>>,
        #[case] optional: Option<Vec<&str>>,
        #[case] language: &str,
        #[case] expected: bool,
    ) {
        let to_owned = |v: Vec<&str>| v.into_iter().map(String::from).collect::<Vec<_>>();
        let settings = I18nSettings {
            required_languages: required.map(to_owned),
            optional_languages: optional.map(to_owned),
            ..I18nSettings::default()
        };

        assert_that!(settings.is_required_language(language), eq(expected));
    }

    #[rstest]
    fn config_error_validation_errors_format() {
        let settings = I18nSettings {
            include_patterns: vec![],
            translation_files: TranslationFilesConfig {
                include_patterns: vec![],
                exclude_patterns: vec![],
            },
            ..I18nSettings::default()
        };

        let errors = settings.validate().unwrap_err();
        let config_error = ConfigError::ValidationErrors(errors);

        let error_message = format!("{config_error}");
        assert_that!(error_message, contains_substring("Configuration validation failed"));
        assert_that!(error_message, contains_substring("1. includePatterns"));
        assert_that!(error_message, contains_substring("2. translationFiles.includePatterns"));
    }
}
