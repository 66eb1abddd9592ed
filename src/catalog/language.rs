//! Language of a catalog, from its `TS language` attribute or its file name.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use super::model::Catalog;

/// ISO 639 codes Qt ships translations for, plus a few common extras.
static LANGUAGE_CODES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "af", "am", "ar", "as", "az", "be", "bg", "bn", "bo", "br", "bs", "ca", "cs", "cy", "da",
        "de", "dz", "el", "en", "eo", "es", "et", "eu", "fa", "fi", "fil", "fo", "fr", "ga", "gd",
        "gl", "gu", "he", "hi", "hr", "hu", "hy", "id", "is", "it", "ja", "ka", "kk", "km", "kn",
        "ko", "kok", "ky", "lo", "lt", "lv", "mi", "mk", "ml", "mn", "mr", "ms", "mt", "my", "nb",
        "ne", "nl", "nn", "no", "oc", "or", "pa", "pl", "ps", "pt", "qu", "ro", "ru", "sa", "se",
        "si", "sk", "sl", "sq", "sr", "sv", "sw", "syr", "ta", "te", "tg", "th", "ti", "tl", "tr",
        "tt", "ug", "uk", "ur", "uz", "vi", "wa", "xh", "yo", "zh", "zu",
    ]
    .into_iter()
    .collect()
});

/// True for `it`, `it_IT`, `pt-BR`, `zh_Hans` and similar.
fn is_language_code(candidate: &str) -> bool {
    let mut parts = candidate.split(['_', '-']);
    let Some(language) = parts.next() else {
        return false;
    };
    if !LANGUAGE_CODES.contains(language.to_ascii_lowercase().as_str()) {
        return false;
    }
    parts.all(|part| {
        matches!(part.len(), 2..=4) && part.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

/// Detects the language from a path such as `translations/qtiplot_it.ts`.
///
/// The file stem is split on `_`; the longest trailing run of parts that forms a language
/// code wins (`app_pt_BR.ts` → `pt_BR`). Parent directories are tried next.
///
/// # Examples
/// - `translations/qtiplot_it.ts` → `it`
/// - `i18n/app_pt_BR.ts` → `pt_BR`
/// - `locale/de/app.ts` → `de`
#[must_use]
pub fn detect_language_from_path(file_path: &Path) -> Option<String> {
    let stem = file_path.file_stem()?.to_string_lossy();
    let parts: Vec<&str> = stem.split('_').collect();
    for take in (1..=parts.len().min(3)).rev() {
        let tail = parts.get(parts.len() - take..).unwrap_or_default().join("_");
        if is_language_code(&tail) {
            return Some(tail);
        }
    }

    file_path
        .parent()?
        .ancestors()
        .filter_map(|dir| dir.file_name())
        .map(|name| name.to_string_lossy())
        .find(|name| is_language_code(name))
        .map(|name| name.into_owned())
}

/// Language of a loaded catalog, or `unknown`.
#[must_use]
pub fn catalog_language(catalog: &Catalog, file_path: &Path) -> String {
    catalog
        .language
        .clone()
        .filter(|language| !language.is_empty())
        .or_else(|| detect_language_from_path(file_path))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Loose comparison: `it` matches `it_IT`, `pt-BR` matches `pt_BR`.
#[must_use]
pub fn language_matches(configured: &str, actual: &str) -> bool {
    let normalize = |code: &str| code.to_ascii_lowercase().replace('-', "_");
    let configured = normalize(configured);
    let actual = normalize(actual);
    configured == actual
        || actual.split('_').next() == Some(configured.as_str())
        || configured.split('_').next() == Some(actual.as_str())
}

/// Catalog language to use for a `requested` one.
///
/// An exact match wins, then a case/separator-insensitive one, then the first
/// language sharing the base language (`it` finds `it_IT`, `it_CH` finds `it`).
#[must_use]
pub fn resolve_language<'a>(requested: &str, available: &[&'a str]) -> Option<&'a str> {
    let normalize = |code: &str| code.to_ascii_lowercase().replace('-', "_");
    let wanted = normalize(requested);
    available
        .iter()
        .find(|language| **language == requested)
        .or_else(|| available.iter().find(|language| normalize(**language) == wanted))
        .or_else(|| available.iter().find(|language| language_matches(requested, **language)))
        .copied()
}
