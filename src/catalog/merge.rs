//! Merges freshly extracted strings into an existing catalog (the `lupdate` step).

use std::collections::{
    HashMap,
    HashSet,
};

use serde::{
    Deserialize,
    Serialize,
};

use super::model::{
    Catalog,
    Context,
    LineRef,
    Location,
    Message,
    MessageId,
    TranslationStatus,
    TranslationText,
};

/// One translatable string found in a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMessage {
    pub context: String,
    pub source: String,
    pub comment: Option<String>,
    pub extra_comment: Option<String>,
    pub numerus: bool,
    /// Path relative to the catalog's directory.
    pub filename: Option<String>,
    /// 1-based line.
    pub line: Option<u32>,
}

impl ExtractedMessage {
    #[must_use]
    pub fn id(&self) -> MessageId {
        MessageId::new(self.context.clone(), self.source.clone(), self.comment.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateOptions {
    /// Drop messages that are no longer in the sources instead of marking them vanished.
    pub no_obsolete: bool,
    /// Order contexts by name.
    pub sort_contexts: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { no_obsolete: false, sort_contexts: true }
    }
}

/// What an update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    /// New messages added as unfinished.
    pub added: usize,
    /// Existing messages still present in the sources.
    pub kept: usize,
    /// Messages newly marked vanished.
    pub vanished: usize,
    /// Messages dropped from the catalog.
    pub removed: usize,
}

/// Extracted occurrences of one message, merged.
#[derive(Debug)]
struct Occurrences {
    /// First occurrence; carries the key and comments.
    first: ExtractedMessage,
    /// Numerus if any occurrence passes a count.
    numerus: bool,
    locations: Vec<Location>,
}

/// Groups extracted messages by key, keeping first-seen order.
fn group(extracted: &[ExtractedMessage]) -> (Vec<MessageId>, HashMap<MessageId, Occurrences>) {
    let mut order = Vec::new();
    let mut groups: HashMap<MessageId, Occurrences> = HashMap::new();
    for message in extracted {
        let id = message.id();
        let location = (message.filename.is_some() || message.line.is_some()).then(|| Location {
            filename: message.filename.clone(),
            line: message.line.map(LineRef::Absolute),
        });
        let entry = groups.entry(id.clone()).or_insert_with(|| {
            order.push(id);
            Occurrences { first: message.clone(), numerus: false, locations: Vec::new() }
        });
        entry.numerus |= message.numerus;
        if entry.first.extra_comment.is_none() {
            entry.first.extra_comment.clone_from(&message.extra_comment);
        }
        if let Some(location) = location {
            if !entry.locations.contains(&location) {
                entry.locations.push(location);
            }
        }
    }
    (order, groups)
}

/// Keeps an existing translation when a message becomes numerus.
fn as_numerus(translation: Option<TranslationText>) -> TranslationText {
    match translation {
        Some(TranslationText::Numerus(forms)) => TranslationText::Numerus(forms),
        Some(TranslationText::Single(text)) if !text.is_empty() => {
            TranslationText::Numerus(vec![text])
        }
        _ => TranslationText::Numerus(Vec::new()),
    }
}

/// Brings `existing` in line with the strings currently in the sources.
///
/// Existing messages keep their translation and get fresh locations; retired ones that
/// reappear become unfinished. Messages no longer extracted become vanished when they carry
/// a translation and are dropped otherwise (always dropped with `no_obsolete`). New messages
/// are appended as unfinished. Duplicate existing entries collapse into the first one.
#[must_use]
pub fn update_catalog(
    existing: &Catalog,
    extracted: &[ExtractedMessage],
    options: &UpdateOptions,
) -> (Catalog, UpdateSummary) {
    let (order, groups) = group(extracted);
    let mut summary = UpdateSummary::default();
    let mut seen: HashSet<MessageId> = HashSet::new();
    let mut existing_ids: HashSet<MessageId> = HashSet::new();

    let mut contexts: Vec<Context> = Vec::with_capacity(existing.contexts.len());
    for context in &existing.contexts {
        let mut messages = Vec::with_capacity(context.messages.len());
        for message in &context.messages {
            let id = message.id_in(&context.name);
            // The first of duplicate entries wins.
            if !existing_ids.insert(id.clone()) {
                tracing::warn!(
                    context = %context.name,
                    source = %message.source,
                    "Dropping duplicate message"
                );
                summary.removed += 1;
                continue;
            }
            if let Some(found) = groups.get(&id) {
                let mut message = message.clone();
                message.locations.clone_from(&found.locations);
                message.extra_comment.clone_from(&found.first.extra_comment);
                if message.status.is_retired() {
                    message.status = TranslationStatus::Unfinished;
                }
                if found.numerus && !message.numerus {
                    message.numerus = true;
                    message.translation = Some(as_numerus(message.translation.take()));
                }
                summary.kept += 1;
                seen.insert(id);
                messages.push(message);
            } else if options.no_obsolete || !message.has_translated_text() {
                summary.removed += 1;
            } else {
                let mut message = message.clone();
                message.locations.clear();
                if !message.status.is_retired() {
                    message.status = TranslationStatus::Vanished;
                    summary.vanished += 1;
                }
                messages.push(message);
            }
        }
        if !messages.is_empty() {
            contexts.push(Context {
                name: context.name.clone(),
                comment: context.comment.clone(),
                messages,
            });
        }
    }

    for id in order {
        if seen.contains(&id) {
            continue;
        }
        let Some(found) = groups.get(&id) else {
            continue;
        };
        let message = Message {
            numerus: found.numerus,
            locations: found.locations.clone(),
            source: id.source.clone(),
            comment: id.comment.clone(),
            extra_comment: found.first.extra_comment.clone(),
            translation: Some(if found.numerus {
                TranslationText::Numerus(Vec::new())
            } else {
                TranslationText::Single(String::new())
            }),
            status: TranslationStatus::Unfinished,
            ..Message::default()
        };
        summary.added += 1;
        seen.insert(id.clone());
        match contexts.iter_mut().find(|ctx| ctx.name == id.context) {
            Some(context) => context.messages.push(message),
            None => contexts.push(Context {
                name: id.context.clone(),
                comment: None,
                messages: vec![message],
            }),
        }
    }

    if options.sort_contexts {
        contexts.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let catalog = Catalog {
        version: existing.version.clone().or_else(|| Some("2.1".to_string())),
        language: existing.language.clone(),
        source_language: existing.source_language.clone(),
        dependencies: existing.dependencies.clone(),
        contexts,
    };
    (catalog, summary)
}
