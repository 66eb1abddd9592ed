//! Plural form selection for numerus messages.

use serde::{
    Deserialize,
    Serialize,
};

/// Plural rule families, following the grouping Qt Linguist uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluralRule {
    /// One form for every count (Japanese, Chinese, Turkish, ...).
    Single,
    /// `n == 1` / other (English, Italian, German, ...).
    #[default]
    NotOne,
    /// `n <= 1` / other (French, Brazilian Portuguese, ...).
    OneOrZero,
    EastSlavic,
    CzechSlovak,
    Polish,
    Romanian,
    Slovenian,
    Lithuanian,
    Latvian,
    Arabic,
    Irish,
}

/// Languages without plural forms.
const SINGLE_FORM: &[&str] = &[
    "bi", "bo", "dz", "fa", "fj", "gn", "hu", "id", "ja", "jv", "km", "ko", "lo", "ms", "my",
    "na", "om", "su", "th", "tr", "tt", "vi", "yo", "za", "zh",
];

/// `n > 1` languages (0 and 1 share a form).
const ONE_OR_ZERO: &[&str] = &["br", "fil", "fr", "ti", "tl", "wa"];

impl PluralRule {
    /// Picks the rule for a locale name such as `it_IT`, `pt-BR` or `ru`.
    #[must_use]
    pub fn for_language(locale: &str) -> Self {
        let mut parts = locale.split(['_', '-', '.']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let territory = parts.next().unwrap_or_default().to_ascii_uppercase();

        if language == "pt" && territory == "BR" {
            return Self::OneOrZero;
        }
        if SINGLE_FORM.contains(&language.as_str()) {
            return Self::Single;
        }
        if ONE_OR_ZERO.contains(&language.as_str()) {
            return Self::OneOrZero;
        }
        match language.as_str() {
            "ru" | "uk" | "be" | "sr" | "hr" | "bs" => Self::EastSlavic,
            "cs" | "sk" => Self::CzechSlovak,
            "pl" => Self::Polish,
            "ro" | "mo" => Self::Romanian,
            "sl" => Self::Slovenian,
            "lt" => Self::Lithuanian,
            "lv" => Self::Latvian,
            "ar" => Self::Arabic,
            "ga" => Self::Irish,
            _ => Self::NotOne,
        }
    }

    /// Number of `<numerusform>` entries a translation should carry.
    #[must_use]
    pub const fn form_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::NotOne | Self::OneOrZero => 2,
            Self::EastSlavic
            | Self::CzechSlovak
            | Self::Polish
            | Self::Romanian
            | Self::Lithuanian
            | Self::Latvian
            | Self::Irish => 3,
            Self::Slovenian => 4,
            Self::Arabic => 6,
        }
    }

    /// Index of the form used for count `n`.
    #[must_use]
    pub const fn form_index(self, n: i64) -> usize {
        let n = n.unsigned_abs();
        let mod10 = n % 10;
        let mod100 = n % 100;
        match self {
            Self::Single => 0,
            Self::NotOne => {
                if n == 1 { 0 } else { 1 }
            }
            Self::OneOrZero => {
                if n <= 1 { 0 } else { 1 }
            }
            Self::EastSlavic => {
                if mod10 == 1 && mod100 != 11 {
                    0
                } else if matches!(mod10, 2..=4) && !matches!(mod100, 12..=14) {
                    1
                } else {
                    2
                }
            }
            Self::CzechSlovak => match n {
                1 => 0,
                2..=4 => 1,
                _ => 2,
            },
            Self::Polish => {
                if n == 1 {
                    0
                } else if matches!(mod10, 2..=4) && !matches!(mod100, 12..=14) {
                    1
                } else {
                    2
                }
            }
            Self::Romanian => {
                if n == 1 {
                    0
                } else if n == 0 || matches!(mod100, 1..=19) {
                    1
                } else {
                    2
                }
            }
            Self::Slovenian => match mod100 {
                1 => 0,
                2 => 1,
                3 | 4 => 2,
                _ => 3,
            },
            Self::Lithuanian => {
                if mod10 == 1 && mod100 != 11 {
                    0
                } else if mod10 >= 2 && (mod100 < 10 || mod100 >= 20) {
                    1
                } else {
                    2
                }
            }
            Self::Latvian => {
                if mod10 == 1 && mod100 != 11 {
                    0
                } else if n != 0 {
                    1
                } else {
                    2
                }
            }
            Self::Arabic => match (n, mod100) {
                (0, _) => 0,
                (1, _) => 1,
                (2, _) => 2,
                (_, 3..=10) => 3,
                (_, 11..=99) => 4,
                _ => 5,
            },
            Self::Irish => match n {
                1 => 0,
                2 => 1,
                _ => 2,
            },
        }
    }
}

/// Replaces the count placeholders `%n` and `%Ln` with `n`.
#[must_use]
pub fn substitute_count(text: &str, n: i64) -> String {
    let count = n.to_string();
    text.replace("%Ln", &count).replace("%n", &count)
}
