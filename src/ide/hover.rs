//! Hover implementation

use std::fmt::Write as _;

use crate::catalog::{
    Message,
    TranslationStatus,
    TranslationText,
};
use crate::db::I18nDatabase;
use crate::input::catalog::CatalogFile;
use crate::interned::MessageKey;

/// numerus の各形式で値を切り詰める最大長
const MAX_FORM_LENGTH: usize = 60;

/// Generate hover content for a translatable message
///
/// # ソート順
/// 言語は以下の順序でソートされます：
/// 1. `current_language`（設定されている場合）
/// 2. `primary_languages`（設定順）
/// 3. その他（アルファベット順）
///
/// 同じ言語のカタログが複数ある場合は、後から読み込まれたものが優先されます。
/// どのカタログにもメッセージがない場合は `None` を返します。
pub fn generate_hover_content(
    db: &dyn I18nDatabase,
    key: MessageKey<'_>,
    catalogs: &[CatalogFile],
    current_language: Option<&str>,
    primary_languages: Option<&[String]>,
) -> Option<String> {
    let id = key.to_id(db);

    let mut translations_found: Vec<(String, String)> = Vec::new();
    let mut extra_comment = None;

    for catalog in catalogs {
        let Some(message) = catalog.find_message(db, &id) else {
            continue;
        };
        let language = catalog.language(db);
        let value = format_translation(message);
        extra_comment = extra_comment.or(message.extra_comment.as_deref());

        match translations_found.iter_mut().find(|(lang, _)| *lang == language) {
            Some(entry) => entry.1 = value,
            None => translations_found.push((language, value)),
        }
    }

    if translations_found.is_empty() {
        return None;
    }

    let mut content = format!("**Context:** `{}`\n\n**Source:** {}\n", id.context, id.source);
    if let Some(comment) = &id.comment {
        let _ = write!(content, "\n**Comment:** {comment}\n");
    }
    if let Some(extra_comment) = extra_comment {
        let _ = write!(content, "\n_{extra_comment}_\n");
    }
    content.push('\n');

    sort_translations_by_priority(&mut translations_found, current_language, primary_languages);

    for (language, value) in translations_found {
        let _ = writeln!(content, "**{language}**: {value}");
    }

    Some(content)
}

/// 翻訳の表示用文字列（状態マーカー付き）
fn format_translation(message: &Message) -> String {
    let text = match &message.translation {
        Some(TranslationText::Numerus(forms)) if !forms.iter().all(String::is_empty) => {
            format_numerus_forms(forms)
        }
        Some(translation) => translation.primary().unwrap_or_default().to_string(),
        None => String::new(),
    };

    if text.is_empty() {
        return match message.status {
            TranslationStatus::Obsolete => "*(untranslated, obsolete)*".to_string(),
            TranslationStatus::Vanished => "*(untranslated, vanished)*".to_string(),
            TranslationStatus::Finished | TranslationStatus::Unfinished => {
                "*(untranslated)*".to_string()
            }
        };
    }

    match message.status {
        TranslationStatus::Finished => text,
        TranslationStatus::Unfinished => format!("{text} *(unfinished)*"),
        TranslationStatus::Obsolete => format!("{text} *(obsolete)*"),
        TranslationStatus::Vanished => format!("{text} *(vanished)*"),
    }
}

/// numerus 形式をフォーマット
fn format_numerus_forms(forms: &[String]) -> String {
    let mut result = String::from("(numerus)\n");

    for (index, form) in forms.iter().enumerate() {
        let _ = writeln!(result, "  `[{index}]`: {}", truncate_string(form, MAX_FORM_LENGTH));
    }

    result.trim_end().to_string()
}

/// 文字列を指定した長さに切り詰める
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// 翻訳結果を優先度順にソート
///
/// ソート順:
/// 1. `current_language`（設定されている場合）
/// 2. `primary_languages`（設定順）
/// 3. その他（アルファベット順）
pub(crate) fn sort_translations_by_priority<T>(
    translations: &mut [(String, T)],
    current_language: Option<&str>,
    primary_languages: Option<&[String]>,
) {
    translations.sort_by(|a, b| {
        let priority_a = get_language_priority(&a.0, current_language, primary_languages);
        let priority_b = get_language_priority(&b.0, current_language, primary_languages);
        priority_a.cmp(&priority_b)
    });
}

/// Language priority for sorting
///
/// Variants sort in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LanguagePriority<'a> {
    /// Current language (highest priority)
    Current,
    /// Primary language with its position index
    Primary(usize),
    /// Other language (sorted alphabetically)
    Other(&'a str),
}

/// 言語の優先度を計算
fn get_language_priority<'a>(
    lang: &'a str,
    current_language: Option<&str>,
    primary_languages: Option<&[String]>,
) -> LanguagePriority<'a> {
    if current_language.is_some_and(|c| c == lang) {
        return LanguagePriority::Current;
    }

    if let Some(primaries) = primary_languages
        && let Some(pos) = primaries.iter().position(|p| p == lang)
    {
        return LanguagePriority::Primary(pos);
    }

    LanguagePriority::Other(lang)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use googletest::prelude::*;
    use rstest::*;

    use super::*;
    use crate::db::I18nDatabaseImpl;
    use crate::input::catalog::catalog_file_from_text;
    use crate::test_utils::create_catalog;

    const SOURCE: &str = "Click on plot to choose the position of the new object!";

    fn key(db: &I18nDatabaseImpl) -> MessageKey<'_> {
        MessageKey::new(db, "AddWidgetTool".to_string(), SOURCE.to_string(), None)
    }

    #[rstest]
    fn generate_hover_content_with_single_translation() {
        let db = I18nDatabaseImpl::default();
        let catalogs = vec![create_catalog(
            &db,
            "it_IT",
            "/ws/translations/qtiplot_it.ts",
            &[(
                "AddWidgetTool",
                SOURCE,
                Some("Cliccare sul grafico per scegliere la posizione del nuovo oggetto!"),
            )],
        )];

        let content = generate_hover_content(&db, key(&db), &catalogs, None, None);

        assert_that!(content, some(contains_substring("**Context:** `AddWidgetTool`")));
        assert_that!(
            content.as_ref().unwrap(),
            contains_substring(
                "**it_IT**: Cliccare sul grafico per scegliere la posizione del nuovo oggetto!"
            )
        );
    }

    #[rstest]
    fn generate_hover_content_marks_untranslated_and_sorts() {
        let db = I18nDatabaseImpl::default();
        let catalogs = vec![
            create_catalog(&db, "it", "/ws/app_it.ts", &[("AddWidgetTool", SOURCE, Some("Ciao"))]),
            create_catalog(&db, "de", "/ws/app_de.ts", &[("AddWidgetTool", SOURCE, None)]),
        ];

        let content = generate_hover_content(&db, key(&db), &catalogs, None, None).unwrap();

        assert_that!(content, contains_substring("**de**: *(untranslated)*"));
        let de_pos = content.find("**de**").unwrap();
        let it_pos = content.find("**it**").unwrap();
        assert_that!(de_pos, lt(it_pos));
    }

    #[rstest]
    fn generate_hover_content_with_no_catalog_entry() {
        let db = I18nDatabaseImpl::default();
        let catalogs = vec![create_catalog(&db, "it", "/ws/app_it.ts", &[("Graph", "Title", None)])];

        let content = generate_hover_content(&db, key(&db), &catalogs, None, None);

        assert_that!(content, none());
    }

    #[rstest]
    fn later_catalog_of_the_same_language_wins() {
        let db = I18nDatabaseImpl::default();
        let catalogs = vec![
            create_catalog(&db, "it", "/ws/a_it.ts", &[("AddWidgetTool", SOURCE, Some("Primo"))]),
            create_catalog(&db, "it", "/ws/b_it.ts", &[("AddWidgetTool", SOURCE, Some("Secondo"))]),
        ];

        let content = generate_hover_content(&db, key(&db), &catalogs, None, None).unwrap();

        assert_that!(content, contains_substring("**it**: Secondo"));
        assert_that!(content, not(contains_substring("Primo")));
    }

    #[rstest]
    fn generate_hover_content_shows_status_comment_and_numerus() {
        let db = I18nDatabaseImpl::default();
        let text = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="ru">
<context>
    <name>Table</name>
    <message numerus="yes">
        <source>%n row(s)</source>
        <comment>status bar</comment>
        <extracomment>Shown after import</extracomment>
        <translation type="unfinished">
            <numerusform>%n строка</numerusform>
            <numerusform>%n строки</numerusform>
            <numerusform>%n строк</numerusform>
        </translation>
    </message>
</context>
</TS>
"#;
        let catalogs =
            vec![catalog_file_from_text(&db, Path::new("/ws/app_ru.ts"), text.to_string()).unwrap()];
        let key = MessageKey::new(
            &db,
            "Table".to_string(),
            "%n row(s)".to_string(),
            Some("status bar".to_string()),
        );

        let content = generate_hover_content(&db, key, &catalogs, None, None).unwrap();

        assert_that!(content, contains_substring("**Comment:** status bar"));
        assert_that!(content, contains_substring("_Shown after import_"));
        assert_that!(content, contains_substring("**ru**: (numerus)"));
        assert_that!(content, contains_substring("`[2]`: %n строк *(unfinished)*"));
    }

    #[rstest]
    #[case::finished(TranslationStatus::Finished, Some("Titolo"), "Titolo")]
    #[case::unfinished(TranslationStatus::Unfinished, Some("Titolo"), "Titolo *(unfinished)*")]
    #[case::obsolete(TranslationStatus::Obsolete, Some("Titolo"), "Titolo *(obsolete)*")]
    #[case::vanished(TranslationStatus::Vanished, Some("Titolo"), "Titolo *(vanished)*")]
    #[case::empty(TranslationStatus::Unfinished, Some(""), "*(untranslated)*")]
    #[case::missing(TranslationStatus::Finished, None, "*(untranslated)*")]
    fn test_format_translation(
        #[case] status: TranslationStatus,
        #[case] text: Option<&str>,
        #[case] expected: &str,
    ) {
        let message = Message {
            translation: text.map(|t| TranslationText::Single(t.to_string())),
            status,
            ..Message::new("Title")
        };

        assert_that!(format_translation(&message), eq(expected));
    }

    #[rstest]
    fn test_truncate_string() {
        assert_that!(truncate_string("hello", 10).as_str(), eq("hello"));
        assert_that!(truncate_string("hello world", 8).as_str(), eq("hello..."));
        assert_that!(truncate_string("hello", 5).as_str(), eq("hello"));
    }

    #[rstest]
    fn sort_current_then_primary_then_alphabetical() {
        let mut languages: Vec<(String, ())> =
            ["en", "ja", "zh", "de"].iter().map(|l| ((*l).to_string(), ())).collect();
        let primary = vec!["zh".to_string(), "ja".to_string()];

        sort_translations_by_priority(&mut languages, Some("en"), Some(&primary));

        let order: Vec<&str> = languages.iter().map(|(l, ())| l.as_str()).collect();
        assert_that!(order, elements_are![eq(&"en"), eq(&"zh"), eq(&"ja"), eq(&"de")]);
    }
}
