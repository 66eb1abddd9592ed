//! Source file input definitions.

use std::path::Path;

#[salsa::input]
pub struct SourceFile {
    #[returns(ref)]
    pub uri: String,

    #[returns(ref)]
    pub text: String,

    pub kind: SourceKind,
}

/// Kinds of files translatable strings are extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// C++ sources and headers.
    Cpp,
    /// Qt Designer `.ui` forms.
    DesignerForm,
}

impl SourceKind {
    /// Infers the kind from the file extension.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        let file_path = Path::new(uri);
        let extension = file_path.extension().and_then(|ext| ext.to_str())?;
        match extension.to_ascii_lowercase().as_str() {
            "cpp" | "cc" | "cxx" | "c++" | "h" | "hh" | "hpp" | "hxx" => Some(Self::Cpp),
            "ui" => Some(Self::DesignerForm),
            _ => None,
        }
    }

    #[must_use]
    pub fn tree_sitter_language(self) -> Option<tree_sitter::Language> {
        match self {
            Self::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
            Self::DesignerForm => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::cpp("src/Graph.cpp", Some(SourceKind::Cpp))]
    #[case::header("src/Graph.h", Some(SourceKind::Cpp))]
    #[case::upper_case("src/Graph.CPP", Some(SourceKind::Cpp))]
    #[case::hpp("src/Graph.hpp", Some(SourceKind::Cpp))]
    #[case::form("src/MainWindow.ui", Some(SourceKind::DesignerForm))]
    #[case::catalog("translations/qtiplot_it.ts", None)]
    #[case::no_ext("Makefile", None)]
    fn test_from_uri(#[case] uri: &str, #[case] expected: Option<SourceKind>) {
        assert_eq!(SourceKind::from_uri(uri), expected);
    }
}
