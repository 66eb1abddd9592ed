//! `.ts` XML reader built on `quick-xml` events.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;

use quick_xml::Reader;
use quick_xml::events::{
    BytesStart,
    BytesText,
    Event,
};

use super::error::CatalogError;
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
use crate::types::{
    LineIndex,
    SourceRange,
};

/// Editor range of each message's `<source>` text, keyed by message id.
pub type SourceSpans = HashMap<MessageId, SourceRange>;

/// Parses a `.ts` document.
///
/// # Errors
/// Returns `CatalogError` for malformed XML or content the `.ts` schema does not allow.
pub fn parse_catalog(text: &str) -> Result<Catalog, CatalogError> {
    parse_catalog_with_spans(text).map(|(catalog, _)| catalog)
}

/// Parses a `.ts` document and records where each `<source>` text sits.
///
/// When a key occurs twice the span of the later message is kept.
///
/// # Errors
/// Same as [`parse_catalog`].
pub fn parse_catalog_with_spans(text: &str) -> Result<(Catalog, SourceSpans), CatalogError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = TsReader::new(text);
    let catalog = reader.parse_document()?;
    Ok((catalog, reader.spans))
}

/// Reads a catalog file from disk.
///
/// # Errors
/// I/O failures and parse failures.
pub fn load_catalog(path: &std::path::Path) -> Result<Catalog, CatalogError> {
    let text = std::fs::read_to_string(path)?;
    parse_catalog(&text)
}

/// Empty element text is stored as `None`.
fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// `line` attribute: `+3`/`-2` are relative, plain numbers absolute.
fn parse_line_ref(value: &str) -> Option<LineRef> {
    if let Some(delta) = value.strip_prefix('+') {
        delta.parse::<i64>().ok().map(LineRef::Relative)
    } else if value.starts_with('-') {
        value.parse::<i64>().ok().map(LineRef::Relative)
    } else {
        value.parse::<u32>().ok().map(LineRef::Absolute)
    }
}

/// Pull parser over one `.ts` document.
struct TsReader<'a> {
    /// Event source.
    reader: Reader<&'a [u8]>,
    /// Converts byte offsets to LSP positions.
    lines: LineIndex<'a>,
    /// Byte offset where the most recently read event starts.
    event_start: usize,
    /// `<source>` element ranges collected so far.
    spans: SourceSpans,
}

impl<'a> TsReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            reader: Reader::from_str(text),
            lines: LineIndex::new(text),
            event_start: 0,
            spans: HashMap::new(),
        }
    }

    /// Current byte offset of the reader.
    fn offset(&self) -> usize {
        usize::try_from(self.reader.buffer_position()).unwrap_or(usize::MAX)
    }

    /// 1-based line of the current event.
    fn line(&self) -> u32 {
        self.lines.position(self.event_start).line + 1
    }

    /// Wraps a reader error with the current line and column.
    fn xml_error(&self, error: &impl Display) -> CatalogError {
        let position = self.lines.position(self.offset());
        CatalogError::Xml {
            line: position.line + 1,
            column: position.character + 1,
            message: error.to_string(),
        }
    }

    fn unexpected(&self, element: &BytesStart<'_>, parent: &str) -> CatalogError {
        CatalogError::UnexpectedElement {
            element: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
            parent: parent.to_string(),
            line: self.line(),
        }
    }

    fn next_event(&mut self) -> Result<Event<'a>, CatalogError> {
        self.event_start = self.offset();
        self.reader.read_event().map_err(|e| self.xml_error(&e))
    }

    /// Decoded attributes in document order.
    fn attributes(&self, start: &BytesStart<'_>) -> Result<Vec<(String, String)>, CatalogError> {
        start
            .attributes()
            .map(|attr| {
                let attr = attr.map_err(|e| self.xml_error(&e))?;
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value =
                    attr.unescape_value().map_err(|e| self.xml_error(&e))?.into_owned();
                Ok((key, value))
            })
            .collect()
    }

    fn unescape(&self, text: &BytesText<'_>) -> Result<String, CatalogError> {
        text.unescape().map(Cow::into_owned).map_err(|e| self.xml_error(&e))
    }

    /// Decodes `<byte value="x1b"/>`, Qt's escape for characters XML cannot carry.
    fn byte_char(&self, element: &BytesStart<'_>) -> Result<char, CatalogError> {
        let value = self
            .attributes(element)?
            .into_iter()
            .find_map(|(key, value)| (key == "value").then_some(value))
            .unwrap_or_default();
        let code = match value.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => value.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32).ok_or_else(|| CatalogError::InvalidAttribute {
            attribute: "value".to_string(),
            value,
            line: self.line(),
        })
    }

    /// Reads character content up to the closing tag of `element`.
    fn read_text(&mut self, element: &str) -> Result<String, CatalogError> {
        let mut text = String::new();
        loop {
            match self.next_event()? {
                Event::Text(t) => text.push_str(&self.unescape(&t)?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
                Event::Empty(e) if e.name().as_ref() == b"byte" => text.push(self.byte_char(&e)?),
                Event::Start(e) | Event::Empty(e) => return Err(self.unexpected(&e, element)),
                Event::End(_) => return Ok(text),
                Event::Eof => {
                    return Err(CatalogError::UnexpectedEof { element: element.to_string() });
                }
                _ => {}
            }
        }
    }

    fn parse_document(&mut self) -> Result<Catalog, CatalogError> {
        loop {
            match self.next_event()? {
                Event::Start(e) if e.name().as_ref() == b"TS" => return self.parse_ts(&e),
                Event::Empty(e) if e.name().as_ref() == b"TS" => {
                    let mut catalog = Catalog::default();
                    self.apply_ts_attributes(&e, &mut catalog)?;
                    return Ok(catalog);
                }
                Event::Start(e) | Event::Empty(e) => return Err(self.unexpected(&e, "document")),
                Event::Eof => return Err(CatalogError::MissingRoot),
                _ => {}
            }
        }
    }

    fn apply_ts_attributes(
        &self,
        start: &BytesStart<'_>,
        catalog: &mut Catalog,
    ) -> Result<(), CatalogError> {
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "version" => catalog.version = Some(value),
                "language" => catalog.language = Some(value),
                "sourcelanguage" => catalog.source_language = Some(value),
                _ => {}
            }
        }
        Ok(())
    }

    /// `<TS>` ルート要素
    fn parse_ts(&mut self, start: &BytesStart<'_>) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::default();
        self.apply_ts_attributes(start, &mut catalog)?;

        loop {
            match self.next_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"context" => {
                        let context = self.parse_context()?;
                        catalog.contexts.push(context);
                    }
                    b"dependencies" => catalog.dependencies = self.parse_dependencies()?,
                    // TS 1.x leftover; the codec is always UTF-8 now.
                    b"defaultcodec" => {
                        self.read_text("defaultcodec")?;
                    }
                    _ => return Err(self.unexpected(&e, "TS")),
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"context" | b"dependencies" | b"defaultcodec" => {}
                    _ => return Err(self.unexpected(&e, "TS")),
                },
                Event::End(_) => return Ok(catalog),
                Event::Eof => return Err(CatalogError::UnexpectedEof { element: "TS".into() }),
                _ => {}
            }
        }
    }

    fn parse_dependencies(&mut self) -> Result<Vec<String>, CatalogError> {
        let mut dependencies = Vec::new();
        loop {
            match self.next_event()? {
                Event::Start(e) if e.name().as_ref() == b"dependency" => {
                    dependencies.extend(self.dependency_name(&e)?);
                    self.read_text("dependency")?;
                }
                Event::Empty(e) if e.name().as_ref() == b"dependency" => {
                    dependencies.extend(self.dependency_name(&e)?);
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(self.unexpected(&e, "dependencies"));
                }
                Event::End(_) => return Ok(dependencies),
                Event::Eof => {
                    return Err(CatalogError::UnexpectedEof { element: "dependencies".into() });
                }
                _ => {}
            }
        }
    }

    fn dependency_name(&self, element: &BytesStart<'_>) -> Result<Option<String>, CatalogError> {
        Ok(self
            .attributes(element)?
            .into_iter()
            .find_map(|(key, value)| (key == "catalog").then_some(value)))
    }

    /// `<context>` 要素（`<name>` と `<message>` の並び）
    fn parse_context(&mut self) -> Result<Context, CatalogError> {
        let mut context = Context::default();
        loop {
            match self.next_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"name" => context.name = self.read_text("name")?,
                    b"comment" => context.comment = non_empty(self.read_text("comment")?),
                    b"encoding" => {
                        self.read_text("encoding")?;
                    }
                    b"message" => {
                        let message = self.parse_message(&e, &context.name)?;
                        context.messages.push(message);
                    }
                    _ => return Err(self.unexpected(&e, "context")),
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"name" | b"comment" | b"encoding" => {}
                    b"message" => {
                        return Err(CatalogError::MissingSource {
                            context: context.name,
                            line: self.line(),
                        });
                    }
                    _ => return Err(self.unexpected(&e, "context")),
                },
                Event::End(_) => return Ok(context),
                Event::Eof => {
                    return Err(CatalogError::UnexpectedEof { element: "context".into() });
                }
                _ => {}
            }
        }
    }

    fn parse_location(&self, start: &BytesStart<'_>) -> Result<Location, CatalogError> {
        let mut location = Location::default();
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "filename" => location.filename = Some(value),
                "line" => {
                    let line = parse_line_ref(&value).ok_or_else(|| {
                        CatalogError::InvalidAttribute {
                            attribute: "line".to_string(),
                            value: value.clone(),
                            line: self.line(),
                        }
                    })?;
                    location.line = Some(line);
                }
                _ => {}
            }
        }
        Ok(location)
    }

    /// `type` and `variants` attributes of `<translation>`.
    fn translation_status(&self, start: &BytesStart<'_>) -> Result<(TranslationStatus, bool), CatalogError> {
        let mut status = TranslationStatus::Finished;
        let mut variants = false;
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "type" => {
                    status = TranslationStatus::from_attr(Some(&value)).ok_or_else(|| {
                        CatalogError::InvalidAttribute {
                            attribute: "type".to_string(),
                            value: value.clone(),
                            line: self.line(),
                        }
                    })?;
                }
                "variants" => variants = value == "yes",
                _ => {}
            }
        }
        Ok((status, variants))
    }

    fn parse_translation(
        &mut self,
        start: &BytesStart<'_>,
        numerus: bool,
    ) -> Result<(TranslationStatus, TranslationText), CatalogError> {
        let (status, variants) = self.translation_status(start)?;
        let mut text = String::new();
        let mut forms = Vec::new();
        let mut numerus_forms = false;

        loop {
            match self.next_event()? {
                Event::Text(t) => text.push_str(&self.unescape(&t)?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
                Event::Empty(e) => match e.name().as_ref() {
                    b"byte" => text.push(self.byte_char(&e)?),
                    b"numerusform" => {
                        numerus_forms = true;
                        forms.push(String::new());
                    }
                    b"lengthvariant" => forms.push(String::new()),
                    _ => return Err(self.unexpected(&e, "translation")),
                },
                Event::Start(e) => match e.name().as_ref() {
                    b"numerusform" => {
                        numerus_forms = true;
                        forms.push(self.read_text("numerusform")?);
                    }
                    b"lengthvariant" => forms.push(self.read_text("lengthvariant")?),
                    _ => return Err(self.unexpected(&e, "translation")),
                },
                Event::End(_) => break,
                Event::Eof => {
                    return Err(CatalogError::UnexpectedEof { element: "translation".into() });
                }
                _ => {}
            }
        }

        let blank = text.trim().is_empty();
        let translation = if !forms.is_empty() {
            if numerus_forms {
                TranslationText::Numerus(forms)
            } else {
                TranslationText::LengthVariants(forms)
            }
        } else if numerus && blank {
            TranslationText::Numerus(Vec::new())
        } else if variants && blank {
            TranslationText::LengthVariants(Vec::new())
        } else {
            TranslationText::Single(text)
        };
        Ok((status, translation))
    }

    /// `<message>` 要素。`<source>` は必須
    fn parse_message(
        &mut self,
        start: &BytesStart<'_>,
        context: &str,
    ) -> Result<Message, CatalogError> {
        let line = self.line();
        let mut message = Message::default();
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "id" => message.id = Some(value),
                "numerus" => message.numerus = value == "yes",
                _ => {}
            }
        }

        let mut source: Option<(String, SourceRange)> = None;
        loop {
            match self.next_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"location" => {
                        message.locations.push(self.parse_location(&e)?);
                        self.read_text("location")?;
                    }
                    b"source" => {
                        let begin = self.offset();
                        let text = self.read_text("source")?;
                        // `event_start` now points at `</source>`
                        source = Some((text, self.lines.range(begin, self.event_start)));
                    }
                    b"oldsource" => message.old_source = Some(self.read_text("oldsource")?),
                    b"comment" => message.comment = non_empty(self.read_text("comment")?),
                    b"oldcomment" => {
                        message.old_comment = non_empty(self.read_text("oldcomment")?);
                    }
                    b"extracomment" => {
                        message.extra_comment = Some(self.read_text("extracomment")?);
                    }
                    b"translatorcomment" => {
                        message.translator_comment = Some(self.read_text("translatorcomment")?);
                    }
                    b"userdata" => message.user_data = Some(self.read_text("userdata")?),
                    b"translation" => {
                        let (status, text) = self.parse_translation(&e, message.numerus)?;
                        message.status = status;
                        message.translation = Some(text);
                    }
                    name => {
                        let Some(extra) = name.strip_prefix(b"extra-") else {
                            return Err(self.unexpected(&e, "message"));
                        };
                        let key = String::from_utf8_lossy(extra).into_owned();
                        let value = self.read_text(&format!("extra-{key}"))?;
                        message.extras.push((key, value));
                    }
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"location" => message.locations.push(self.parse_location(&e)?),
                    b"source" => {
                        let here = self.lines.range(self.offset(), self.offset());
                        source = Some((String::new(), here));
                    }
                    b"translation" => {
                        let (status, variants) = self.translation_status(&e)?;
                        message.status = status;
                        message.translation = Some(if message.numerus {
                            TranslationText::Numerus(Vec::new())
                        } else if variants {
                            TranslationText::LengthVariants(Vec::new())
                        } else {
                            TranslationText::Single(String::new())
                        });
                    }
                    b"comment" | b"oldcomment" | b"oldsource" | b"extracomment"
                    | b"translatorcomment" | b"userdata" => {}
                    name => {
                        let Some(extra) = name.strip_prefix(b"extra-") else {
                            return Err(self.unexpected(&e, "message"));
                        };
                        message
                            .extras
                            .push((String::from_utf8_lossy(extra).into_owned(), String::new()));
                    }
                },
                Event::End(_) => break,
                Event::Eof => {
                    return Err(CatalogError::UnexpectedEof { element: "message".into() });
                }
                _ => {}
            }
        }

        let Some((source, span)) = source else {
            return Err(CatalogError::MissingSource { context: context.to_string(), line });
        };
        message.source = source;
        self.spans.insert(message.id_in(context), span);
        Ok(message)
    }
}
