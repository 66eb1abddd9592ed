//! In-memory representation of a Qt Linguist `.ts` catalog.

use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

/// A whole `.ts` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// `TS version` attribute (`2.0`, `2.1`).
    pub version: Option<String>,
    /// `TS language` attribute, e.g. `it_IT`.
    pub language: Option<String>,
    /// `TS sourcelanguage` attribute.
    pub source_language: Option<String>,
    /// Catalog names listed in `<dependencies>`.
    pub dependencies: Vec<String>,
    pub contexts: Vec<Context>,
}

/// Messages grouped under one UI class name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    /// Context-level `<comment>`, rarely used.
    pub comment: Option<String>,
    pub messages: Vec<Message>,
}

/// One translatable string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// `id` attribute for id-based (`qtTrId`) translations.
    pub id: Option<String>,
    /// `numerus="yes"`.
    pub numerus: bool,
    pub locations: Vec<Location>,
    pub source: String,
    pub old_source: Option<String>,
    /// Disambiguation comment. Part of the lookup key.
    pub comment: Option<String>,
    pub old_comment: Option<String>,
    /// Comment for translators extracted from the code (`//:`).
    pub extra_comment: Option<String>,
    pub translator_comment: Option<String>,
    /// `None` when the message has no `<translation>` element at all.
    pub translation: Option<TranslationText>,
    pub status: TranslationStatus,
    pub user_data: Option<String>,
    /// `<extra-NAME>value</extra-NAME>` pairs, in document order.
    pub extras: Vec<(String, String)>,
}

/// Text held by a `<translation>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationText {
    Single(String),
    /// `variants="yes"`: length variants, longest first.
    LengthVariants(Vec<String>),
    /// One entry per `<numerusform>`.
    Numerus(Vec<String>),
}

/// The `type` attribute of `<translation>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TranslationStatus {
    #[default]
    Finished,
    Unfinished,
    Obsolete,
    Vanished,
}

/// A `<location>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Omitted in relative mode when the file is the same as the previous location.
    pub filename: Option<String>,
    pub line: Option<LineRef>,
}

/// Line reference of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineRef {
    Absolute(u32),
    /// `+N` / `-N` relative to the previous location in the same file.
    Relative(i64),
}

/// Lookup key of a message inside a set of catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId {
    pub context: String,
    pub source: String,
    pub comment: Option<String>,
}

impl MessageId {
    #[must_use]
    pub fn new(
        context: impl Into<String>,
        source: impl Into<String>,
        comment: Option<impl Into<String>>,
    ) -> Self {
        let comment = comment.map(Into::into).filter(|c: &String| !c.is_empty());
        Self { context: context.into(), source: source.into(), comment }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comment {
            Some(comment) => write!(f, "{}::\"{}\" ({comment})", self.context, self.source),
            None => write!(f, "{}::\"{}\"", self.context, self.source),
        }
    }
}

/// Counts of messages by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatistics {
    pub contexts: usize,
    pub finished: usize,
    pub unfinished: usize,
    /// Unfinished messages without any translated text.
    pub untranslated: usize,
    pub vanished: usize,
    pub obsolete: usize,
}

impl TranslationStatus {
    /// Parses the `type` attribute value. An absent attribute means finished.
    #[must_use]
    pub fn from_attr(value: Option<&str>) -> Option<Self> {
        match value {
            None | Some("") => Some(Self::Finished),
            Some("unfinished") => Some(Self::Unfinished),
            Some("obsolete") => Some(Self::Obsolete),
            Some("vanished") => Some(Self::Vanished),
            Some(_) => None,
        }
    }

    #[must_use]
    pub const fn as_attr(self) -> Option<&'static str> {
        match self {
            Self::Finished => None,
            Self::Unfinished => Some("unfinished"),
            Self::Obsolete => Some("obsolete"),
            Self::Vanished => Some("vanished"),
        }
    }

    /// Obsolete and vanished entries no longer correspond to any source string.
    #[must_use]
    pub const fn is_retired(self) -> bool {
        matches!(self, Self::Obsolete | Self::Vanished)
    }
}

impl TranslationText {
    /// The text shown for a non-numerus lookup.
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        match self {
            Self::Single(text) => Some(text.as_str()),
            Self::LengthVariants(variants) | Self::Numerus(variants) => {
                variants.first().map(String::as_str)
            }
        }
    }

    /// True when no form carries any text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(text) => text.is_empty(),
            Self::LengthVariants(forms) | Self::Numerus(forms) => {
                forms.iter().all(String::is_empty)
            }
        }
    }
}

impl Message {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), ..Self::default() }
    }

    #[must_use]
    pub fn id_in(&self, context: &str) -> MessageId {
        MessageId::new(context, self.source.clone(), self.comment.clone())
    }

    /// A translation a runtime lookup may return: finished and not empty.
    #[must_use]
    pub fn usable_translation(&self) -> Option<&TranslationText> {
        if self.status != TranslationStatus::Finished {
            return None;
        }
        self.translation.as_ref().filter(|text| !text.is_empty())
    }

    #[must_use]
    pub fn has_translated_text(&self) -> bool {
        self.translation.as_ref().is_some_and(|text| !text.is_empty())
    }
}

impl Catalog {
    /// Iterates every message together with its context name.
    pub fn messages(&self) -> impl Iterator<Item = (&str, &Message)> {
        self.contexts
            .iter()
            .flat_map(|ctx| ctx.messages.iter().map(move |msg| (ctx.name.as_str(), msg)))
    }

    #[must_use]
    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|ctx| ctx.name == name)
    }

    /// Returns the last message with this id; later entries shadow earlier duplicates.
    #[must_use]
    pub fn find(&self, id: &MessageId) -> Option<&Message> {
        self.contexts
            .iter()
            .filter(|ctx| ctx.name == id.context)
            .flat_map(|ctx| ctx.messages.iter())
            .filter(|msg| msg.source == id.source && msg.comment == id.comment)
            .last()
    }

    #[must_use]
    pub fn statistics(&self) -> CatalogStatistics {
        let mut stats = CatalogStatistics { contexts: self.contexts.len(), ..Default::default() };
        for (_, message) in self.messages() {
            match message.status {
                TranslationStatus::Finished => stats.finished += 1,
                TranslationStatus::Unfinished => {
                    stats.unfinished += 1;
                    if !message.has_translated_text() {
                        stats.untranslated += 1;
                    }
                }
                TranslationStatus::Vanished => stats.vanished += 1,
                TranslationStatus::Obsolete => stats.obsolete += 1,
            }
        }
        stats
    }

    /// Rewrites relative locations into absolute ones.
    ///
    /// Relative lines refer to the previous location of the same file anywhere earlier in the
    /// document, and an omitted file name repeats the previous location's file.
    pub fn resolve_locations(&mut self) {
        let mut current_file: Option<String> = None;
        let mut last_lines: std::collections::HashMap<String, i64> =
            std::collections::HashMap::new();

        for context in &mut self.contexts {
            for message in &mut context.messages {
                for location in &mut message.locations {
                    if let Some(filename) = &location.filename {
                        current_file = Some(filename.clone());
                    } else {
                        location.filename.clone_from(&current_file);
                    }
                    let Some(file) = &current_file else {
                        continue;
                    };
                    let last = last_lines.get(file).copied().unwrap_or(0);
                    let absolute = match location.line {
                        Some(LineRef::Absolute(line)) => line,
                        // Out-of-range results clamp to 0..=u32::MAX.
                        Some(LineRef::Relative(delta)) => {
                            u32::try_from(last.saturating_add(delta).max(0)).unwrap_or(u32::MAX)
                        }
                        None => continue,
                    };
                    last_lines.insert(file.clone(), i64::from(absolute));
                    location.line = Some(LineRef::Absolute(absolute));
                }
            }
        }
    }
}
