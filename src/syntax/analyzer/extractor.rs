//! Extracts translatable strings from C++ sources using Tree-sitter.

use tree_sitter::{
    Language,
    Node,
    Parser,
    Query,
    QueryCursor,
    StreamingIteratorMut,
};

use crate::syntax::analyzer::context::enclosing_class;
use crate::syntax::analyzer::literal::decode_literal;
use crate::syntax::analyzer::types::{
    AnalyzerError,
    CaptureName,
    TrCall,
    TrCallKind,
};
use crate::types::LineIndex;

/// How a recognised callee consumes its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Callee {
    /// `tr(source, comment?, n?)`; `Some` context for `Class::tr`.
    Tr(Option<String>),
    /// `translate(context, source, comment?, n?)`
    Translate,
    /// `QT_TR_NOOP(source)`
    TrNoop { numerus: bool },
    /// `QT_TRANSLATE_NOOP(context, source)` / `QT_TRANSLATE_NOOP3(context, source, comment)`
    TranslateNoop { numerus: bool },
}

fn node_text<'a>(node: Node<'_>, source_bytes: &'a [u8]) -> Option<&'a str> {
    node.utf8_text(source_bytes).ok()
}

fn classify_name(name: &str) -> Option<Callee> {
    match name {
        "tr" | "trUtf8" => Some(Callee::Tr(None)),
        "translate" => Some(Callee::Translate),
        "QT_TR_NOOP" | "QT_TR_NOOP_UTF8" => Some(Callee::TrNoop { numerus: false }),
        "QT_TR_N_NOOP" => Some(Callee::TrNoop { numerus: true }),
        "QT_TRANSLATE_NOOP" | "QT_TRANSLATE_NOOP_UTF8" | "QT_TRANSLATE_NOOP3"
        | "QT_TRANSLATE_NOOP3_UTF8" => Some(Callee::TranslateNoop { numerus: false }),
        "QT_TRANSLATE_N_NOOP" | "QT_TRANSLATE_N_NOOP3" => {
            Some(Callee::TranslateNoop { numerus: true })
        }
        _ => None,
    }
}

/// Recognises the function part of a call expression.
fn classify_callee(function: Node<'_>, source_bytes: &[u8]) -> Option<Callee> {
    match function.kind() {
        "identifier" => classify_name(node_text(function, source_bytes)?),
        "qualified_identifier" => {
            let text: String = node_text(function, source_bytes)?.split_whitespace().collect();
            let (scope, name) = text.rsplit_once("::")?;
            match name {
                "tr" | "trUtf8" => Some(Callee::Tr(Some(scope.to_string()))),
                "translate" => Some(Callee::Translate),
                _ => None,
            }
        }
        "field_expression" => {
            let field = node_text(function.child_by_field_name("field")?, source_bytes)?;
            let object = node_text(function.child_by_field_name("argument")?, source_bytes)?;
            match field {
                "tr" | "trUtf8" if object == "this" => Some(Callee::Tr(None)),
                "translate" if object == "qApp" || object.ends_with("::instance()") => {
                    Some(Callee::Translate)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Second-level argument such as a comment: a literal, or nothing for `nullptr`/`0`.
fn optional_literal(node: Option<Node<'_>>, source_bytes: &[u8]) -> Option<String> {
    node.and_then(|n| decode_literal(n, source_bytes)).filter(|s| !s.is_empty())
}

/// Builds a `TrCall` from a recognised call, or `None` when the arguments are not literals.
fn interpret_call(
    call: Node<'_>,
    function: Node<'_>,
    arguments: Node<'_>,
    source_bytes: &[u8],
    lines: &LineIndex<'_>,
) -> Option<TrCall> {
    let callee = classify_callee(function, source_bytes)?;
    let mut cursor = arguments.walk();
    let args: Vec<Node<'_>> =
        arguments.named_children(&mut cursor).filter(|n| n.kind() != "comment").collect();

    let (kind, context, source_node, comment, numerus) = match callee {
        Callee::Tr(explicit) => {
            let context = match explicit {
                Some(context) => context,
                None => enclosing_class(call, source_bytes)?,
            };
            (TrCallKind::Tr, context, *args.first()?, args.get(1).copied(), args.len() >= 3)
        }
        Callee::Translate => {
            let context = decode_literal(*args.first()?, source_bytes)?;
            (TrCallKind::Translate, context, *args.get(1)?, args.get(2).copied(), args.len() >= 4)
        }
        Callee::TrNoop { numerus } => {
            let context = enclosing_class(call, source_bytes)?;
            (TrCallKind::TrNoop, context, *args.first()?, None, numerus)
        }
        Callee::TranslateNoop { numerus } => {
            let context = decode_literal(*args.first()?, source_bytes)?;
            (TrCallKind::TranslateNoop, context, *args.get(1)?, args.get(2).copied(), numerus)
        }
    };

    let source = decode_literal(source_node, source_bytes)?;
    Some(TrCall {
        kind,
        context,
        source,
        comment: optional_literal(comment, source_bytes),
        numerus,
        extra_comment: None,
        source_range: lines.range(source_node.start_byte(), source_node.end_byte()),
        call_bytes: call.start_byte()..call.end_byte(),
    })
}

/// Text of a `//:` or `/*: */` comment, without the markers.
fn extra_comment_text(comment: &str) -> Option<String> {
    let text = if let Some(line) = comment.strip_prefix("//:") {
        line
    } else {
        comment.strip_prefix("/*:")?.strip_suffix("*/").unwrap_or_default()
    };
    Some(text.trim().to_string())
}

/// Gives each call the translator comments written between the previous call and itself.
fn attach_extra_comments(calls: &mut [TrCall], comments: &[(usize, String)]) {
    let mut pending = comments.iter().peekable();
    let mut previous_end = 0;
    for call in calls.iter_mut() {
        let mut texts = Vec::new();
        while let Some((start, text)) = pending.next_if(|(start, _)| *start < call.call_bytes.start)
        {
            if *start >= previous_end {
                texts.push(text.as_str());
            }
        }
        if !texts.is_empty() {
            call.extra_comment = Some(texts.join(" "));
        }
        previous_end = call.call_bytes.end;
    }
}

/// Extracts translatable strings from C++ source code.
///
/// # Errors
/// Returns `AnalyzerError` if:
/// - Language setup fails
/// - Source code parsing fails
pub fn analyze_tr_calls(
    source: &str,
    language: &Language,
    queries: &[Query],
) -> Result<Vec<TrCall>, AnalyzerError> {
    let mut parser = Parser::new();
    parser.set_language(language).map_err(AnalyzerError::LanguageSetup)?;
    let tree = parser.parse(source, None).ok_or(AnalyzerError::ParseFailed)?;

    let source_bytes = source.as_bytes();
    let root_node = tree.root_node();
    let lines = LineIndex::new(source);

    let mut calls = Vec::new();
    let mut comments: Vec<(usize, String)> = Vec::new();

    for query in queries {
        let cap_names = query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, root_node, source_bytes);

        while let Some(match_) = matches.next_mut() {
            let mut call = None;
            let mut function = None;
            let mut arguments = None;

            for capture in match_.captures {
                let Some(cap_name) = cap_names.get(capture.index as usize) else {
                    continue;
                };
                let Ok(capture_name) = cap_name.parse::<CaptureName>() else {
                    continue;
                };

                match capture_name {
                    CaptureName::Call => call = Some(capture.node),
                    CaptureName::Function => function = Some(capture.node),
                    CaptureName::Arguments => arguments = Some(capture.node),
                    CaptureName::ExtraComment => {
                        if let Some(text) = node_text(capture.node, source_bytes)
                            .and_then(extra_comment_text)
                        {
                            comments.push((capture.node.start_byte(), text));
                        }
                    }
                }
            }

            if let (Some(call), Some(function), Some(arguments)) = (call, function, arguments)
                && let Some(tr_call) = interpret_call(call, function, arguments, source_bytes, &lines)
            {
                calls.push(tr_call);
            }
        }
    }

    calls.sort_by_key(|call| call.call_bytes.start);
    comments.sort_by_key(|(start, _)| *start);
    attach_extra_comments(&mut calls, &comments);

    tracing::trace!(count = calls.len(), "Extracted translatable strings");
    Ok(calls)
}
