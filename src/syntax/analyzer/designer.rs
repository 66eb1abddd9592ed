//! Extracts translatable strings from Qt Designer `.ui` forms.

use std::fmt::Display;

use quick_xml::Reader;
use quick_xml::events::{
    BytesStart,
    Event,
};

use crate::syntax::analyzer::types::{
    AnalyzerError,
    TrCall,
    TrCallKind,
};
use crate::types::LineIndex;

/// Attributes of a `<string>` element that affect extraction.
#[derive(Debug, Default)]
struct StringAttributes {
    /// `notr="true"`
    notr: bool,
    comment: Option<String>,
    extra_comment: Option<String>,
}

/// Pull parser over one `.ui` form.
struct FormReader<'a> {
    reader: Reader<&'a [u8]>,
    lines: LineIndex<'a>,
}

impl<'a> FormReader<'a> {
    fn new(text: &'a str) -> Self {
        Self { reader: Reader::from_str(text), lines: LineIndex::new(text) }
    }

    fn offset(&self) -> usize {
        usize::try_from(self.reader.buffer_position()).unwrap_or(usize::MAX)
    }

    /// Form error at the current line.
    fn error(&self, message: &impl Display) -> AnalyzerError {
        AnalyzerError::Form {
            line: self.lines.position(self.offset()).line + 1,
            message: message.to_string(),
        }
    }

    fn next_event(&mut self) -> Result<Event<'a>, AnalyzerError> {
        self.reader.read_event().map_err(|e| self.error(&e))
    }

    /// Reads character data up to the end tag of the current element.
    ///
    /// Returns the text and the byte offset where the end tag starts.
    fn read_text(&mut self) -> Result<(String, usize), AnalyzerError> {
        let mut text = String::new();
        loop {
            let before = self.offset();
            match self.next_event()? {
                Event::Text(t) => text.push_str(&t.unescape().map_err(|e| self.error(&e))?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
                Event::End(_) => return Ok((text, before)),
                Event::Eof => return Err(self.error(&"unexpected end of form")),
                _ => {}
            }
        }
    }
}

/// Unescaped attribute value, if present.
fn attribute(start: &BytesStart<'_>, name: &str) -> Option<String> {
    start
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(std::borrow::Cow::into_owned))
}

fn string_attributes(start: &BytesStart<'_>) -> StringAttributes {
    StringAttributes {
        notr: attribute(start, "notr").is_some_and(|v| v == "true"),
        comment: attribute(start, "comment").filter(|c| !c.is_empty()),
        extra_comment: attribute(start, "extracomment").filter(|c| !c.is_empty()),
    }
}

/// Extracts the `<string>` values of a form. The context is the form's `<class>`.
///
/// Strings marked `notr="true"` and widget object names are not translatable.
/// A form without a `<class>` yields nothing.
///
/// # Errors
/// Returns `AnalyzerError::Form` when the form is not well-formed XML.
pub fn analyze_form(text: &str) -> Result<Vec<TrCall>, AnalyzerError> {
    let mut form = FormReader::new(text);
    let mut class_name: Option<String> = None;
    // Open `<property>` names, innermost last.
    let mut properties: Vec<Option<String>> = Vec::new();
    let mut calls = Vec::new();

    loop {
        let tag_start = form.offset();
        match form.next_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"class" if class_name.is_none() => {
                    let (name, _) = form.read_text()?;
                    class_name = Some(name.trim().to_string());
                }
                b"property" | b"attribute" => properties.push(attribute(&start, "name")),
                b"string" => {
                    let attributes = string_attributes(&start);
                    let content_start = form.offset();
                    let (value, content_end) = form.read_text()?;
                    let is_object_name =
                        properties.last().is_some_and(|p| p.as_deref() == Some("objectName"));
                    if attributes.notr || is_object_name || value.is_empty() {
                        continue;
                    }
                    calls.push(TrCall {
                        kind: TrCallKind::Designer,
                        context: String::new(),
                        source: value,
                        comment: attributes.comment,
                        numerus: false,
                        extra_comment: attributes.extra_comment,
                        source_range: form.lines.range(content_start, content_end),
                        call_bytes: tag_start..form.offset(),
                    });
                }
                _ => {}
            },
            Event::End(end) => {
                if matches!(end.name().as_ref(), b"property" | b"attribute") {
                    properties.pop();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let Some(class_name) = class_name.filter(|c| !c.is_empty()) else {
        tracing::debug!("Form has no <class>; skipping {} strings", calls.len());
        return Ok(Vec::new());
    };
    for call in &mut calls {
        call.context.clone_from(&class_name);
    }
    Ok(calls)
}
