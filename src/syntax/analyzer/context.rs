//! Translation context of a `tr()` call: the class it is written in.

use tree_sitter::Node;

/// Name of the class enclosing `node`, qualified with enclosing namespaces (`Ns::Graph`).
///
/// Out-of-line member definitions (`void Graph::setTitle()`) take the qualifier of the
/// function name; inline members take the `class`/`struct` name. Returns `None` outside
/// any class.
pub fn enclosing_class(node: Node<'_>, source: &[u8]) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut has_class = false;
    let mut current = node;

    while let Some(parent) = current.parent() {
        match parent.kind() {
            "function_definition" if !has_class => {
                if let Some(scope) = member_qualifier(parent, source) {
                    parts.push(scope);
                    has_class = true;
                }
            }
            "class_specifier" | "struct_specifier" => {
                if let Some(name) = field_text(parent, "name", source) {
                    parts.push(name);
                    has_class = true;
                }
            }
            "namespace_definition" => {
                if let Some(name) = field_text(parent, "name", source) {
                    parts.push(name);
                }
            }
            _ => {}
        }
        current = parent;
    }

    if !has_class {
        return None;
    }
    parts.reverse();
    Some(parts.join("::"))
}

fn field_text(node: Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    let text = node.child_by_field_name(field)?.utf8_text(source).ok()?;
    Some(text.split_whitespace().collect())
}

/// `Graph` for `void Graph::setTitle(...)`, `Ns::Graph` for `Ns::Graph::Graph(...)`.
fn member_qualifier(definition: Node<'_>, source: &[u8]) -> Option<String> {
    let mut declarator = definition.child_by_field_name("declarator")?;
    // Pointer and reference return types wrap the function declarator.
    while declarator.kind() != "function_declarator" {
        declarator = declarator.child_by_field_name("declarator").or_else(|| {
            let mut cursor = declarator.walk();
            let inner = declarator
                .named_children(&mut cursor)
                .find(|child| child.kind().ends_with("declarator"));
            inner
        })?;
    }

    let name = declarator.child_by_field_name("declarator")?;
    if name.kind() != "qualified_identifier" {
        return None;
    }
    let text: String = name.utf8_text(source).ok()?.split_whitespace().collect();
    let (scope, _) = text.rsplit_once("::")?;
    Some(scope.to_string())
}
