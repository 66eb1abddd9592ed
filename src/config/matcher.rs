//! Classifies workspace files into Linguist catalogs and translatable sources.

use std::path::{
    Path,
    PathBuf,
};

use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};

use super::I18nSettings;
use crate::input::source::SourceKind;

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid pattern in {setting} '{pattern}': {source}")]
    InvalidPattern {
        setting: &'static str,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to build glob set: {0}")]
    GlobSetBuild(#[from] globset::Error),
}

/// Role of a file in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceFile {
    /// `.ts` translation catalog
    Catalog,
    /// File scanned for `tr()` calls or `<string>` elements
    Source(SourceKind),
}

/// Include/exclude pair built from one settings section.
#[derive(Debug, Clone)]
struct PatternSet {
    /// Paths to consider.
    include: GlobSet,
    /// Paths to skip even when included.
    exclude: GlobSet,
}

impl PatternSet {
    /// Compiles `include` and `exclude`, naming `setting` in errors.
    fn new(
        setting: &'static str,
        include: &[String],
        exclude: &[String],
    ) -> Result<Self, MatcherError> {
        Ok(Self { include: compile(setting, include)?, exclude: compile(setting, exclude)? })
    }

    /// Included and not excluded.
    fn matches(&self, relative_path: &Path) -> bool {
        self.include.is_match(relative_path) && !self.exclude.is_match(relative_path)
    }
}

/// Builds one `GlobSet` from configured patterns.
fn compile(setting: &'static str, patterns: &[String]) -> Result<GlobSet, MatcherError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| MatcherError::InvalidPattern {
            setting,
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Matches workspace files against `includePatterns` / `excludePatterns`
/// and `translationFiles`.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    /// Patterns are relative to this directory.
    workspace_root: PathBuf,
    /// `includePatterns` / `excludePatterns`
    sources: PatternSet,
    /// `translationFiles`
    catalogs: PatternSet,
    /// `excludePatterns` applies to catalogs as well.
    global_exclude: GlobSet,
}

impl FileMatcher {
    /// Creates a matcher for the workspace at `workspace_root`.
    ///
    /// # Errors
    /// Returns `MatcherError` when a pattern does not compile.
    pub fn new(workspace_root: PathBuf, settings: &I18nSettings) -> Result<Self, MatcherError> {
        let sources = PatternSet::new(
            "includePatterns",
            &settings.include_patterns,
            &settings.exclude_patterns,
        )?;
        let catalogs = PatternSet::new(
            "translationFiles",
            &settings.translation_files.include_patterns,
            &settings.translation_files.exclude_patterns,
        )?;
        let global_exclude = compile("excludePatterns", &settings.exclude_patterns)?;

        Ok(Self { workspace_root, sources, catalogs, global_exclude })
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Classifies an absolute path under the workspace root.
    ///
    /// Catalog patterns take precedence. A source must also have an extension
    /// the extractor understands.
    #[must_use]
    pub fn classify(&self, absolute_path: &Path) -> Option<WorkspaceFile> {
        let relative_path = absolute_path.strip_prefix(&self.workspace_root).ok()?;
        self.classify_relative(relative_path)
    }

    /// [`Self::classify`] for a path relative to the workspace root.
    #[must_use]
    pub fn classify_relative(&self, relative_path: &Path) -> Option<WorkspaceFile> {
        if self.global_exclude.is_match(relative_path) {
            return None;
        }
        if self.catalogs.matches(relative_path) {
            return Some(WorkspaceFile::Catalog);
        }
        if self.sources.matches(relative_path) {
            let kind = SourceKind::from_uri(&relative_path.to_string_lossy())?;
            return Some(WorkspaceFile::Source(kind));
        }
        None
    }

    #[must_use]
    pub fn is_translation_file(&self, absolute_path: &Path) -> bool {
        self.classify(absolute_path) == Some(WorkspaceFile::Catalog)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;
    use crate::config::TranslationFilesConfig;

    fn matcher(settings: &I18nSettings) -> FileMatcher {
        FileMatcher::new(PathBuf::from("/workspace"), settings).unwrap()
    }

    #[rstest]
    #[case::cpp("qtiplot/src/plot2D/AddWidgetTool.cpp", Some(WorkspaceFile::Source(SourceKind::Cpp)))]
    #[case::header("src/Graph.h", Some(WorkspaceFile::Source(SourceKind::Cpp)))]
    #[case::form("src/ui/FitDialog.ui", Some(WorkspaceFile::Source(SourceKind::DesignerForm)))]
    #[case::catalog("translations/qtiplot_it.ts", Some(WorkspaceFile::Catalog))]
    #[case::compiled_catalog("translations/qtiplot_it.qm", None)]
    #[case::moc("src/moc_Graph.cpp", None)]
    #[case::build_dir("build/ui_FitDialog.h", None)]
    #[case::build_catalog("build/qtiplot_it.ts", None)]
    #[googletest::test]
    fn classifies_with_default_settings(
        #[case] relative: &str,
        #[case] expected: Option<WorkspaceFile>,
    ) {
        let matcher = matcher(&I18nSettings::default());

        expect_that!(matcher.classify(&Path::new("/workspace").join(relative)), eq(expected));
    }

    #[googletest::test]
    fn paths_outside_workspace_are_ignored() {
        let matcher = matcher(&I18nSettings::default());

        expect_that!(matcher.classify(Path::new("/other/src/Graph.cpp")), none());
        expect_that!(matcher.is_translation_file(Path::new("/qtiplot_it.ts")), eq(false));
    }

    #[googletest::test]
    fn catalog_excludes_apply_only_to_catalogs() {
        let settings = I18nSettings {
            translation_files: TranslationFilesConfig {
                include_patterns: vec!["**/*.ts".to_string()],
                exclude_patterns: vec!["**/qt_*.ts".to_string()],
            },
            include_patterns: vec!["**/*.cpp".to_string()],
            exclude_patterns: vec!["3rdparty/**".to_string()],
            ..I18nSettings::default()
        };
        let matcher = matcher(&settings);

        expect_that!(
            matcher.classify_relative(Path::new("translations/qtiplot_it.ts")),
            some(eq(WorkspaceFile::Catalog))
        );
        expect_that!(matcher.classify_relative(Path::new("translations/qt_it.ts")), none());
        expect_that!(
            matcher.classify_relative(Path::new("src/qt_main.cpp")),
            some(eq(WorkspaceFile::Source(SourceKind::Cpp)))
        );
        expect_that!(matcher.classify_relative(Path::new("3rdparty/qwt/qwt_plot.cpp")), none());
        expect_that!(matcher.classify_relative(Path::new("3rdparty/qwt/qwt_de.ts")), none());
    }

    #[googletest::test]
    fn source_pattern_needs_known_extension() {
        let settings =
            I18nSettings { include_patterns: vec!["src/**".to_string()], ..I18nSettings::default() };
        let matcher = matcher(&settings);

        expect_that!(
            matcher.classify_relative(Path::new("src/Graph.cpp")),
            some(eq(WorkspaceFile::Source(SourceKind::Cpp)))
        );
        expect_that!(matcher.classify_relative(Path::new("src/README.md")), none());
    }

    #[rstest]
    #[case::include(&["**/*.{cpp,h"], &[], &["**/*.ts"], "includePatterns")]
    #[case::exclude(&["**/*.cpp"], &["[invalid"], &["**/*.ts"], "includePatterns")]
    #[case::translation(&["**/*.cpp"], &[], &["**/*.{ts"], "translationFiles")]
    #[googletest::test]
    fn invalid_pattern_names_the_setting(
        #[case] include: &[&str],
        #[case] exclude: &[&str],
        #[case] translation: &[&str],
        #[case] setting: &str,
    ) {
        let to_vec = |patterns: &[&str]| patterns.iter().map(ToString::to_string).collect();
        let settings = I18nSettings {
            include_patterns: to_vec(include),
            exclude_patterns: to_vec(exclude),
            translation_files: TranslationFilesConfig {
                include_patterns: to_vec(translation),
                exclude_patterns: Vec::new(),
            },
            ..I18nSettings::default()
        };

        let result = FileMatcher::new(PathBuf::from("/workspace"), &settings);

        let setting_of = |error: MatcherError| match error {
            MatcherError::InvalidPattern { setting, .. } => Some(setting),
            MatcherError::GlobSetBuild(_) => None,
        };
        expect_that!(result.err().and_then(setting_of), some(eq(setting)));
    }
}
