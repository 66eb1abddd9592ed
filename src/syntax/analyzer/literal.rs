//! Decoding of C++ string literals.

use tree_sitter::Node;

/// Value of a string literal node, or `None` when the node is not a plain literal
/// (a variable, a macro between concatenated pieces, `nullptr`, ...).
pub fn decode_literal(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string_literal" => decode_quoted(node.utf8_text(source).ok()?),
        "raw_string_literal" => decode_raw(node.utf8_text(source).ok()?),
        "concatenated_string" => {
            let mut value = String::new();
            let mut cursor = node.walk();
            for piece in node.named_children(&mut cursor) {
                value.push_str(&decode_literal(piece, source)?);
            }
            Some(value)
        }
        _ => None,
    }
}

/// Range of the characters between the quotes of a literal node.
///
/// Concatenated and raw literals have no single content span; the node itself is returned.
pub fn content_bytes(node: Node<'_>) -> std::ops::Range<usize> {
    if node.kind() == "string_literal"
        && let Some(open) = node.child(0)
    {
        let end = node.end_byte().saturating_sub(1).max(open.end_byte());
        return open.end_byte()..end;
    }
    node.start_byte()..node.end_byte()
}

/// `"..."`, with any encoding prefix (`L`, `u8`, `u`, `U`).
fn decode_quoted(text: &str) -> Option<String> {
    let start = text.find('"')? + 1;
    let end = text.rfind('"')?;
    let body = text.get(start..end)?;
    Some(unescape(body))
}

/// `R"delim(...)delim"`, with any encoding prefix.
fn decode_raw(text: &str) -> Option<String> {
    let quote = text.find('"')?;
    let rest = text.get(quote + 1..)?;
    let open = rest.find('(')?;
    let delimiter = rest.get(..open)?;
    let body = rest.get(open + 1..)?;
    let body = body.strip_suffix('"')?.strip_suffix(delimiter)?.strip_suffix(')')?;
    Some(body.to_string())
}

/// Resolves C++ escape sequences. Octal and hex escapes produce raw bytes, so the
/// result is assembled as UTF-8 bytes.
fn unescape(body: &str) -> String {
    let mut bytes: Vec<u8> = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        if c != '\\' {
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let Some(escape) = chars.next() else {
            bytes.push(b'\\');
            break;
        };
        match escape {
            'n' => bytes.push(b'\n'),
            't' => bytes.push(b'\t'),
            'r' => bytes.push(b'\r'),
            'a' => bytes.push(0x07),
            'b' => bytes.push(0x08),
            'f' => bytes.push(0x0c),
            'v' => bytes.push(0x0b),
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                bytes.push(u8::try_from(value & 0xff).unwrap_or(u8::MAX));
            }
            'x' => {
                let mut value: u32 = 0;
                while let Some(digit) = chars.peek().and_then(|d| d.to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(digit);
                    chars.next();
                }
                bytes.push(u8::try_from(value & 0xff).unwrap_or(u8::MAX));
            }
            'u' | 'U' => {
                let width = if escape == 'u' { 4 } else { 8 };
                let mut value: u32 = 0;
                for _ in 0..width {
                    match chars.peek().and_then(|d| d.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                let decoded = char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER);
                bytes.extend_from_slice(decoded.encode_utf8(&mut buf).as_bytes());
            }
            // \\ \" \' \? and unknown escapes keep the character
            other => bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes()),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;
    use tree_sitter::Parser;

    use super::*;

    #[rstest]
    #[case::plain(r#""Hello""#, "Hello")]
    #[case::newline(r#""Line\nNext""#, "Line\nNext")]
    #[case::quotes(r#""Say \"hi\"""#, "Say \"hi\"")]
    #[case::octal(r#""\101\102""#, "AB")]
    #[case::hex_utf8(r#""caf\xc3\xa9""#, "café")]
    #[case::universal(r#""\u00e8""#, "è")]
    #[case::prefix(r#"u8"Grafico""#, "Grafico")]
    #[case::wide(r#"L"x""#, "x")]
    fn test_decode_quoted(#[case] literal: &str, #[case] expected: &str) {
        assert_eq!(decode_quoted(literal).unwrap(), expected);
    }

    #[rstest]
    #[case::simple(r#"R"(a\nb)""#, r"a\nb")]
    #[case::delimited(r#"R"xy(say "hi")xy""#, r#"say "hi""#)]
    fn test_decode_raw(#[case] literal: &str, #[case] expected: &str) {
        assert_eq!(decode_raw(literal).unwrap(), expected);
    }

    fn first_initializer(code: &str) -> Option<String> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_cpp::LANGUAGE.into()).unwrap();
        let tree = parser.parse(code, None).unwrap();
        let root = tree.root_node();
        let declaration = root.named_child(0)?;
        let declarator = declaration.child_by_field_name("declarator")?;
        let value = declarator.child_by_field_name("value")?;
        decode_literal(value, code.as_bytes())
    }

    #[rstest]
    #[case::single(r#"const char *s = "Plot";"#, Some("Plot"))]
    #[case::concatenated(r#"const char *s = "Click on " "plot";"#, Some("Click on plot"))]
    #[case::variable("const char *s = other;", None)]
    fn test_decode_literal_nodes(#[case] code: &str, #[case] expected: Option<&str>) {
        assert_eq!(first_initializer(code).as_deref(), expected);
    }
}
