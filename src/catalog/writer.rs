//! Serializes a [`Catalog`] in the layout `lupdate` produces.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::escape::escape;

use super::error::CatalogError;
use super::model::{
    Catalog,
    Context,
    LineRef,
    Location,
    Message,
    TranslationText,
};

/// How `<location>` elements are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationMode {
    /// Exactly as stored in the catalog.
    #[default]
    Preserve,
    /// `line="47"` with every file name spelled out.
    Absolute,
    /// `line="+3"` relative to the previous line in the same file.
    Relative,
    /// No `<location>` elements at all.
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub locations: LocationMode,
}

/// Serializes a catalog to `.ts` XML.
#[must_use]
pub fn write_catalog(catalog: &Catalog, options: &WriteOptions) -> String {
    let mut resolved;
    let catalog = match options.locations {
        LocationMode::Absolute | LocationMode::Relative => {
            resolved = catalog.clone();
            resolved.resolve_locations();
            &resolved
        }
        LocationMode::Preserve | LocationMode::None => catalog,
    };

    let mut out = XmlOut::default();
    out.line(0, r#"<?xml version="1.0" encoding="utf-8"?>"#);
    out.line(0, "<!DOCTYPE TS>");

    let mut ts = String::from("<TS");
    push_attr(&mut ts, "version", catalog.version.as_deref());
    push_attr(&mut ts, "language", catalog.language.as_deref());
    push_attr(&mut ts, "sourcelanguage", catalog.source_language.as_deref());
    ts.push('>');
    out.line(0, &ts);

    if !catalog.dependencies.is_empty() {
        out.line(0, "<dependencies>");
        for dependency in &catalog.dependencies {
            out.line(0, &format!(r#"<dependency catalog="{}"/>"#, escape(dependency.as_str())));
        }
        out.line(0, "</dependencies>");
    }

    let mut relative = RelativeLines::default();
    for context in &catalog.contexts {
        write_context(&mut out, context, options.locations, &mut relative);
    }
    out.line(0, "</TS>");
    out.text
}

/// Writes a catalog to `path`.
///
/// # Errors
/// I/O failures.
pub fn save_catalog(
    path: &Path,
    catalog: &Catalog,
    options: &WriteOptions,
) -> Result<(), CatalogError> {
    std::fs::write(path, write_catalog(catalog, options))?;
    Ok(())
}

/// Output buffer with Qt's 4-space indentation.
#[derive(Default)]
struct XmlOut {
    /// Everything written so far.
    text: String,
}

impl XmlOut {
    fn line(&mut self, indent: usize, content: &str) {
        for _ in 0..indent {
            self.text.push_str("    ");
        }
        self.text.push_str(content);
        self.text.push('\n');
    }

    /// `<name>content</name>` on one line.
    fn element(&mut self, indent: usize, name: &str, content: &str) {
        self.line(indent, &format!("<{name}>{}</{name}>", escape_text(content)));
    }
}

/// Last absolute line written per file, for relative output.
#[derive(Default)]
struct RelativeLines {
    /// File of the previous `<location>`.
    current_file: Option<String>,
    /// Keyed by file name.
    last_lines: HashMap<String, i64>,
}

/// Appends ` name="value"` when the value is present.
fn push_attr(tag: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        tag.push_str(&format!(r#" {name}="{}""#, escape(value)));
    }
}

/// Escapes element content the way `lupdate` does.
///
/// Quotes become entities. Control characters and non-ASCII whitespace are
/// written as character references.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segment = String::new();
    for c in text.chars() {
        let control = c < ' ' && c != '\t' && c != '\n';
        if control || (c > '\u{7f}' && c.is_whitespace()) {
            out.push_str(&escape(segment.as_str()));
            segment.clear();
            out.push_str(&character_reference(c));
        } else {
            segment.push(c);
        }
    }
    out.push_str(&escape(segment.as_str()));
    out
}

/// `<byte value="xN"/>` up to U+0020 (not valid XML 1.0), `&#xN;` above.
fn character_reference(c: char) -> String {
    let code = u32::from(c);
    if code <= 0x20 { format!(r#"<byte value="x{code:x}"/>"#) } else { format!("&#x{code:x};") }
}

fn write_context(
    out: &mut XmlOut,
    context: &Context,
    mode: LocationMode,
    relative: &mut RelativeLines,
) {
    out.line(0, "<context>");
    out.element(1, "name", &context.name);
    if let Some(comment) = &context.comment {
        out.element(1, "comment", comment);
    }
    for message in &context.messages {
        write_message(out, message, mode, relative);
    }
    out.line(0, "</context>");
}

fn write_message(
    out: &mut XmlOut,
    message: &Message,
    mode: LocationMode,
    relative: &mut RelativeLines,
) {
    let mut tag = String::from("<message");
    push_attr(&mut tag, "id", message.id.as_deref());
    if message.numerus {
        tag.push_str(r#" numerus="yes""#);
    }
    tag.push('>');
    out.line(1, &tag);

    for location in &message.locations {
        if let Some(element) = location_element(location, mode, relative) {
            out.line(2, &element);
        }
    }

    out.element(2, "source", &message.source);
    if let Some(old_source) = &message.old_source {
        out.element(2, "oldsource", old_source);
    }
    if let Some(comment) = &message.comment {
        out.element(2, "comment", comment);
    }
    if let Some(old_comment) = &message.old_comment {
        out.element(2, "oldcomment", old_comment);
    }
    if let Some(extra_comment) = &message.extra_comment {
        out.element(2, "extracomment", extra_comment);
    }
    if let Some(translator_comment) = &message.translator_comment {
        out.element(2, "translatorcomment", translator_comment);
    }
    if let Some(translation) = &message.translation {
        write_translation(out, message, translation);
    }
    if let Some(user_data) = &message.user_data {
        out.element(2, "userdata", user_data);
    }
    for (key, value) in &message.extras {
        out.element(2, &format!("extra-{key}"), value);
    }
    out.line(1, "</message>");
}

/// `<translation>` with its status, numerus forms or length variants.
fn write_translation(out: &mut XmlOut, message: &Message, translation: &TranslationText) {
    let mut tag = String::from("<translation");
    push_attr(&mut tag, "type", message.status.as_attr());

    match translation {
        TranslationText::Single(text) => {
            tag.push('>');
            out.line(2, &format!("{tag}{}</translation>", escape_text(text)));
        }
        TranslationText::LengthVariants(variants) => {
            tag.push_str(r#" variants="yes">"#);
            for variant in variants {
                tag.push_str(&format!("<lengthvariant>{}</lengthvariant>", escape_text(variant)));
            }
            out.line(2, &format!("{tag}</translation>"));
        }
        TranslationText::Numerus(forms) if forms.is_empty() => {
            out.line(2, &format!("{tag}></translation>"));
        }
        TranslationText::Numerus(forms) => {
            tag.push('>');
            out.line(2, &tag);
            for form in forms {
                out.element(3, "numerusform", form);
            }
            out.line(2, "</translation>");
        }
    }
}

/// Builds `<location/>` for the requested mode, or `None` to omit it.
fn location_element(
    location: &Location,
    mode: LocationMode,
    relative: &mut RelativeLines,
) -> Option<String> {
    let mut tag = String::from("<location");
    match mode {
        LocationMode::None => return None,
        LocationMode::Preserve | LocationMode::Absolute => {
            push_attr(&mut tag, "filename", location.filename.as_deref());
            if let Some(line) = location.line {
                push_attr(&mut tag, "line", Some(&format_line(line)));
            }
        }
        LocationMode::Relative => {
            let file = location.filename.clone().or_else(|| relative.current_file.clone());
            if location.filename.is_some() && file != relative.current_file {
                push_attr(&mut tag, "filename", location.filename.as_deref());
            }
            relative.current_file.clone_from(&file);
            if let (Some(file), Some(LineRef::Absolute(line))) = (file, location.line) {
                let line = i64::from(line);
                let last = relative.last_lines.insert(file, line).unwrap_or(0);
                push_attr(&mut tag, "line", Some(&format_line(LineRef::Relative(line - last))));
            }
        }
    }
    tag.push_str("/>");
    Some(tag)
}

fn format_line(line: LineRef) -> String {
    match line {
        LineRef::Absolute(line) => line.to_string(),
        LineRef::Relative(delta) if delta >= 0 => format!("+{delta}"),
        LineRef::Relative(delta) => delta.to_string(),
    }
}
