//! Helper functions for tree-sitter AST navigation.

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static BRACKET_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*([\[\]\(\)])\s*").unwrap());
static COMMA_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").unwrap());

/// Get the text content of a node.
pub fn get_node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    let start = node.start_byte();
    let end = node.end_byte();
    if start < source.len() && end <= source.len() && start < end {
        &source[start..end]
    } else {
        ""
    }
}

/// Find the first child of a specific type.
#[allow(clippy::manual_find)]
pub fn find_child_by_type<'a>(node: &Node<'a>, type_name: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == type_name {
            return Some(child);
        }
    }
    None
}

/// Named children, skipping comments.
pub fn named_children<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// Get line number (1-indexed) from a node.
pub fn get_start_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Line of the first syntax error below `node`, if any.
pub fn first_error_line(node: &Node) -> Option<u32> {
    if node.is_error() || node.is_missing() {
        return Some(get_start_line(node));
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.iter().find_map(first_error_line)
}

/// Canonical form of an annotation: whitespace collapsed, no padding inside
/// brackets, one space after commas.
pub fn normalize_annotation(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    let tight = BRACKET_SPACE.replace_all(&collapsed, "$1");
    COMMA_SPACE.replace_all(&tight, ", ").into_owned()
}

/// Value of a plain string literal. Interpolated, concatenated and byte
/// strings yield `None`.
pub fn string_literal(node: &Node, source: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    if find_child_by_type(node, "interpolation").is_some() {
        return None;
    }

    let text = get_node_text(node, source);
    let quote_at = text.find(['"', '\''])?;
    let prefix = text[..quote_at].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }

    let body = &text[quote_at..];
    let inner = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        body.get(3..body.len().saturating_sub(3))?
    } else {
        body.get(1..body.len().saturating_sub(1))?
    };
    Some(inner.to_string())
}

/// Dotted callee of a call expression, e.g. `click.option` or `op.add_column`.
pub fn call_name(call: &Node, source: &str) -> Option<String> {
    if call.kind() != "call" {
        return None;
    }
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" | "attribute" => Some(
            get_node_text(&function, source)
                .split_whitespace()
                .collect::<String>(),
        ),
        _ => None,
    }
}

/// Positional arguments of a call, in order.
pub fn positional_args<'a>(call: &Node<'a>) -> Vec<Node<'a>> {
    match call.child_by_field_name("arguments") {
        Some(args) if args.kind() == "argument_list" => named_children(&args)
            .into_iter()
            .filter(|a| {
                !matches!(
                    a.kind(),
                    "keyword_argument" | "list_splat" | "dictionary_splat"
                )
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Value of a keyword argument of a call.
pub fn keyword_arg<'a>(call: &Node<'a>, name: &str, source: &str) -> Option<Node<'a>> {
    let args = call.child_by_field_name("arguments")?;
    named_children(&args)
        .into_iter()
        .filter(|a| a.kind() == "keyword_argument")
        .find(|a| {
            a.child_by_field_name("name")
                .map(|n| get_node_text(&n, source) == name)
                .unwrap_or(false)
        })
        .and_then(|a| a.child_by_field_name("value"))
}

/// Whether a call passes any `*args` or `**kwargs` splat.
pub fn has_splat_args(call: &Node) -> bool {
    call.child_by_field_name("arguments")
        .map(|args| {
            named_children(&args)
                .iter()
                .any(|a| matches!(a.kind(), "list_splat" | "dictionary_splat"))
        })
        .unwrap_or(false)
}

/// Strings of a literal list or tuple. `None` when any element is not a
/// plain string.
pub fn string_list(node: &Node, source: &str) -> Option<Vec<String>> {
    match node.kind() {
        "list" | "tuple" | "parenthesized_expression" => named_children(node)
            .iter()
            .map(|el| string_literal(el, source))
            .collect(),
        "string" => string_literal(node, source).map(|s| vec![s]),
        _ => None,
    }
}

/// Literal `True`/`False`.
pub fn bool_literal(node: &Node) -> Option<bool> {
    match node.kind() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Unwrap a `decorated_definition` into its decorators and definition.
pub fn split_decorated<'a>(node: &Node<'a>) -> (Vec<Node<'a>>, Option<Node<'a>>) {
    if node.kind() != "decorated_definition" {
        return (Vec::new(), Some(*node));
    }
    let decorators = named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "decorator")
        .filter_map(|d| named_children(&d).into_iter().next())
        .collect();
    (decorators, node.child_by_field_name("definition"))
}

/// All descendants of `node` (including itself) of the given kind, in
/// source order.
pub fn descendants_of_kind<'a>(node: &Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut found = Vec::new();
    collect_kind(*node, kind, &mut found);
    found
}

fn collect_kind<'a>(node: Node<'a>, kind: &str, found: &mut Vec<Node<'a>>) {
    if node.kind() == kind {
        found.push(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
    for child in children {
        collect_kind(child, kind, found);
    }
}

/// Statements of a block or module, skipping comments.
pub fn statements<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    named_children(node)
}
