//! Runtime lookup over loaded catalogs.

use std::collections::HashMap;

use super::model::{
    Catalog,
    Message,
    MessageId,
    TranslationText,
};
use super::numerus::{
    PluralRule,
    substitute_count,
};

/// A message together with the plural rule of the catalog it came from.
#[derive(Debug, Clone)]
struct LoadedMessage {
    /// The catalog entry.
    message: Message,
    /// Rule of the owning catalog's language.
    rule: PluralRule,
}

/// Answers `tr()`-style lookups against a sequence of loaded catalogs.
///
/// Catalogs are loaded in order; for duplicate keys the usable entry loaded last wins.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    /// Finished, non-empty entries by key.
    usable: HashMap<MessageId, LoadedMessage>,
    /// Usable entries carrying an `id` attribute.
    by_text_id: HashMap<String, MessageId>,
    /// Latest entry per key regardless of status.
    latest: HashMap<MessageId, Message>,
    /// Language of the most recently loaded catalog.
    language: Option<String>,
}

impl Translator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a catalog on top of the ones already loaded.
    pub fn load(&mut self, catalog: Catalog) {
        let rule = catalog.language.as_deref().map(PluralRule::for_language).unwrap_or_default();
        if catalog.language.is_some() {
            self.language.clone_from(&catalog.language);
        }

        for context in catalog.contexts {
            for message in context.messages {
                let key = message.id_in(&context.name);
                if message.usable_translation().is_some() {
                    if let Some(text_id) = &message.id {
                        self.by_text_id.insert(text_id.clone(), key.clone());
                    }
                    self.usable
                        .insert(key.clone(), LoadedMessage { message: message.clone(), rule });
                }
                self.latest.insert(key, message);
            }
        }
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Number of keys with a usable translation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.usable.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usable.is_empty()
    }

    /// Finds the usable entry, retrying without the comment like `QTranslator` does.
    fn resolve(&self, context: &str, source: &str, comment: Option<&str>) -> Option<&LoadedMessage> {
        let exact = self.usable.get(&MessageId::new(context, source, comment));
        match (exact, comment) {
            (Some(found), _) => Some(found),
            (None, Some(c)) if !c.is_empty() => {
                self.usable.get(&MessageId::new(context, source, None::<String>))
            }
            (None, _) => None,
        }
    }

    /// Translation of `source`, or `source` itself when nothing usable is loaded.
    #[must_use]
    pub fn translate<'a>(
        &'a self,
        context: &str,
        source: &'a str,
        comment: Option<&str>,
    ) -> &'a str {
        self.resolve(context, source, comment)
            .and_then(|loaded| loaded.message.usable_translation())
            .and_then(TranslationText::primary)
            .filter(|text| !text.is_empty())
            .unwrap_or(source)
    }

    /// Numerus lookup: picks the form for `n` and replaces `%n` with it.
    #[must_use]
    pub fn translate_plural(
        &self,
        context: &str,
        source: &str,
        comment: Option<&str>,
        n: i64,
    ) -> String {
        let text = self.resolve(context, source, comment).and_then(|loaded| {
            match loaded.message.usable_translation()? {
                TranslationText::Numerus(forms) => {
                    let last = forms.len().checked_sub(1)?;
                    forms.get(loaded.rule.form_index(n).min(last)).map(String::as_str)
                }
                other => other.primary(),
            }
        });
        let text = text.filter(|t| !t.is_empty()).unwrap_or(source);
        substitute_count(text, n)
    }

    /// Id-based lookup (`qtTrId`); falls back to the id.
    #[must_use]
    pub fn translate_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.by_text_id
            .get(id)
            .and_then(|key| self.usable.get(key))
            .and_then(|loaded| loaded.message.usable_translation())
            .and_then(TranslationText::primary)
            .filter(|text| !text.is_empty())
            .unwrap_or(id)
    }

    /// The latest loaded entry for a key, whatever its status.
    #[must_use]
    pub fn entry(&self, id: &MessageId) -> Option<&Message> {
        self.latest.get(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::catalog::model::{
        Context,
        TranslationStatus,
    };

    fn catalog(language: &str, messages: Vec<Message>) -> Catalog {
        Catalog {
            language: Some(language.to_string()),
            contexts: vec![Context { name: "AddWidgetTool".to_string(), comment: None, messages }],
            ..Catalog::default()
        }
    }

    fn translated(source: &str, text: &str, status: TranslationStatus) -> Message {
        Message {
            translation: Some(TranslationText::Single(text.to_string())),
            status,
            ..Message::new(source)
        }
    }

    const CLICK: &str = "Click on plot to choose the position of the new object!";

    #[googletest::test]
    fn translates_finished_entry() {
        let mut translator = Translator::new();
        translator.load(catalog(
            "it_IT",
            vec![translated(
                CLICK,
                "Cliccare sul grafico per scegliere la posizione del nuovo oggetto!",
                TranslationStatus::Finished,
            )],
        ));

        expect_that!(
            translator.translate("AddWidgetTool", CLICK, None),
            eq("Cliccare sul grafico per scegliere la posizione del nuovo oggetto!")
        );
        expect_that!(translator.language(), some(eq("it_IT")));
    }

    #[rstest]
    #[case::unfinished(TranslationStatus::Unfinished, "Testo")]
    #[case::obsolete(TranslationStatus::Obsolete, "Testo")]
    #[case::vanished(TranslationStatus::Vanished, "Testo")]
    #[case::empty(TranslationStatus::Finished, "")]
    fn falls_back_to_source(#[case] status: TranslationStatus, #[case] text: &str) {
        let mut translator = Translator::new();
        translator.load(catalog("it", vec![translated("Text", text, status)]));

        assert_that!(translator.translate("AddWidgetTool", "Text", None), eq("Text"));
    }

    #[googletest::test]
    fn falls_back_when_missing_or_without_translation_element() {
        let mut translator = Translator::new();
        translator.load(catalog("it", vec![Message::new("Bare")]));

        expect_that!(translator.translate("AddWidgetTool", "Bare", None), eq("Bare"));
        expect_that!(translator.translate("Unknown", "Other", None), eq("Other"));
        expect_that!(translator.entry(&MessageId::new("AddWidgetTool", "Bare", None::<String>)), some(anything()));
    }

    #[googletest::test]
    fn later_catalog_wins() {
        let mut translator = Translator::new();
        translator.load(catalog("it", vec![translated("Plot", "Grafico", TranslationStatus::Finished)]));
        translator.load(catalog("it", vec![translated("Plot", "Diagramma", TranslationStatus::Finished)]));

        expect_that!(translator.translate("AddWidgetTool", "Plot", None), eq("Diagramma"));
    }

    #[googletest::test]
    fn later_entry_in_one_catalog_wins() {
        let mut translator = Translator::new();
        translator.load(catalog(
            "it",
            vec![
                translated("Plot", "Grafico", TranslationStatus::Finished),
                translated("Plot", "Diagramma", TranslationStatus::Finished),
            ],
        ));

        expect_that!(translator.translate("AddWidgetTool", "Plot", None), eq("Diagramma"));
    }

    #[googletest::test]
    fn unfinished_duplicate_does_not_hide_finished_one() {
        let mut translator = Translator::new();
        translator.load(catalog("it", vec![translated("Plot", "Grafico", TranslationStatus::Finished)]));
        translator.load(catalog("it", vec![translated("Plot", "Bozza", TranslationStatus::Unfinished)]));

        expect_that!(translator.translate("AddWidgetTool", "Plot", None), eq("Grafico"));
        let latest = translator.entry(&MessageId::new("AddWidgetTool", "Plot", None::<String>));
        expect_that!(latest.map(|m| m.status), some(eq(TranslationStatus::Unfinished)));
    }

    #[googletest::test]
    fn comment_disambiguates_and_falls_back_to_plain_entry() {
        let mut translator = Translator::new();
        let mut with_comment = translated("Open", "Apri file", TranslationStatus::Finished);
        with_comment.comment = Some("file".to_string());
        translator.load(catalog(
            "it",
            vec![with_comment, translated("Open", "Apri", TranslationStatus::Finished)],
        ));

        expect_that!(translator.translate("AddWidgetTool", "Open", Some("file")), eq("Apri file"));
        expect_that!(translator.translate("AddWidgetTool", "Open", Some("door")), eq("Apri"));
        expect_that!(translator.translate("AddWidgetTool", "Open", None), eq("Apri"));
    }

    #[rstest]
    #[case::one(1, "1 punto")]
    #[case::many(4, "4 punti")]
    #[case::zero(0, "0 punti")]
    fn translate_plural_picks_form(#[case] n: i64, #[case] expected: &str) {
        let mut translator = Translator::new();
        translator.load(catalog(
            "it_IT",
            vec![Message {
                numerus: true,
                translation: Some(TranslationText::Numerus(vec![
                    "%n punto".to_string(),
                    "%n punti".to_string(),
                ])),
                ..Message::new("%n point(s)")
            }],
        ));

        assert_that!(translator.translate_plural("AddWidgetTool", "%n point(s)", None, n), eq(expected));
    }

    #[googletest::test]
    fn translate_plural_falls_back_to_source() {
        let translator = Translator::new();

        expect_that!(
            translator.translate_plural("AddWidgetTool", "%n point(s)", None, 3),
            eq("3 point(s)")
        );
    }

    #[googletest::test]
    fn translate_id_uses_id_attribute() {
        let mut translator = Translator::new();
        let mut message = translated("Quit", "Esci", TranslationStatus::Finished);
        message.id = Some("menu.quit".to_string());
        translator.load(catalog("it", vec![message]));

        expect_that!(translator.translate_id("menu.quit"), eq("Esci"));
        expect_that!(translator.translate_id("menu.open"), eq("menu.open"));
        expect_that!(translator.len(), eq(1));
    }
}
