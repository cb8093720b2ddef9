//! C# syntax layer over tree-sitter.
//!
//! Wraps parsing and the handful of syntactic questions the resolver asks:
//! what namespace encloses a node, is an identifier inside a using
//! directive, is a position a use site, and which declarations a file
//! contains. Name resolution itself lives in `symbols` and `resolver`.

use anyhow::{anyhow, Result};
use tree_sitter::{Node, Parser, Tree};

/// Syntactic kinds of type-level declarations.
pub const TYPE_DECLARATION_KINDS: [&str; 7] = [
    "class_declaration",
    "struct_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "record_struct_declaration",
    "delegate_declaration",
];

/// Kinds whose presence on the ancestor chain marks a use site: method
/// bodies, accessors, constructor bodies, field initializers, blocks and
/// expression-bodied members. An identifier inside a `variable_declarator`
/// can only be initializer value; declared names are filtered out before
/// this check applies.
const USE_SITE_KINDS: [&str; 4] = [
    "block",
    "arrow_expression_clause",
    "variable_declarator",
    "accessor_declaration",
];

/// Declaration constructs whose `name` field introduces rather than
/// references a symbol.
const DECLARATION_NAME_KINDS: [&str; 20] = [
    "class_declaration",
    "struct_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "record_struct_declaration",
    "delegate_declaration",
    "method_declaration",
    "constructor_declaration",
    "destructor_declaration",
    "property_declaration",
    "event_declaration",
    "enum_member_declaration",
    "variable_declarator",
    "parameter",
    "type_parameter",
    "local_function_statement",
    "foreach_statement",
    "catch_declaration",
    "namespace_declaration",
];

/// Callable constructs that open a local-variable scope.
const CALLABLE_KINDS: [&str; 6] = [
    "method_declaration",
    "constructor_declaration",
    "destructor_declaration",
    "accessor_declaration",
    "local_function_statement",
    "lambda_expression",
];

/// Parse one C# document. Returns an error when the parser yields nothing
/// (cancellation or an unusable grammar); trees containing ERROR nodes are
/// still usable and are kept.
pub fn parse(text: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|e| anyhow!("failed to load C# grammar: {e}"))?;
    parser
        .parse(text, None)
        .ok_or_else(|| anyhow!("parser produced no tree"))
}

/// Source text of a node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Depth-first pre-order visit of every node in the tree.
pub fn for_each_node<'t, F: FnMut(Node<'t>)>(tree: &'t Tree, mut visit: F) {
    let mut cursor = tree.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// The primary namespace a file declares: a file-scoped namespace wins;
/// otherwise the first block namespace in source order; otherwise none.
pub fn primary_namespace(tree: &Tree, source: &str) -> Option<String> {
    let mut file_scoped: Option<(usize, String)> = None;
    let mut first_block: Option<(usize, String)> = None;
    for_each_node(tree, |node| {
        let name = match node.kind() {
            "file_scoped_namespace_declaration" | "namespace_declaration" => {
                match node.child_by_field_name("name") {
                    Some(n) => node_text(n, source).to_string(),
                    None => return,
                }
            }
            _ => return,
        };
        let entry = (node.start_byte(), name);
        match node.kind() {
            "file_scoped_namespace_declaration" => {
                if file_scoped.as_ref().map(|(b, _)| entry.0 < *b).unwrap_or(true) {
                    file_scoped = Some(entry);
                }
            }
            _ => {
                if first_block.as_ref().map(|(b, _)| entry.0 < *b).unwrap_or(true) {
                    first_block = Some(entry);
                }
            }
        }
    });
    file_scoped.or(first_block).map(|(_, name)| name)
}

/// Fully-qualified namespace enclosing a node, built from nested block
/// namespaces and any file-scoped namespace governing it.
///
/// Grammar versions differ on whether a file-scoped namespace nests the
/// declarations that follow it; when it does not, the declaration is a
/// preceding sibling at the top level and is folded in here.
pub fn enclosing_namespace(node: Node<'_>, source: &str) -> Option<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut saw_file_scoped = false;
    let mut root = node;
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(
            n.kind(),
            "namespace_declaration" | "file_scoped_namespace_declaration"
        ) {
            if n.kind() == "file_scoped_namespace_declaration" {
                saw_file_scoped = true;
            }
            if let Some(name) = n.child_by_field_name("name") {
                segments.push(node_text(name, source).to_string());
            }
        }
        root = n;
        current = n.parent();
    }
    if !saw_file_scoped {
        let mut cursor = root.walk();
        let decl = root
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "file_scoped_namespace_declaration")
            .find(|c| c.start_byte() < node.start_byte() && c.end_byte() < node.start_byte());
        if let Some(decl) = decl {
            if let Some(name) = decl.child_by_field_name("name") {
                segments.push(node_text(name, source).to_string());
            }
        }
    }
    if segments.is_empty() {
        return None;
    }
    segments.reverse();
    Some(segments.join("."))
}

/// True when any ancestor is a using/import directive.
pub fn in_using_directive(node: Node<'_>) -> bool {
    ancestor_of_kind(node, &["using_directive"]).is_some()
}

/// True when the identifier is the declared name of a construct (possibly
/// through a qualified namespace name) rather than a reference to one.
pub fn is_declaration_name(node: Node<'_>) -> bool {
    let mut child = node;
    let mut parent = node.parent();
    while let Some(p) = parent {
        if p.kind() == "qualified_name" {
            child = p;
            parent = p.parent();
            continue;
        }
        if p.kind() == "file_scoped_namespace_declaration"
            || DECLARATION_NAME_KINDS.contains(&p.kind())
        {
            return p
                .child_by_field_name("name")
                .map(|n| n.id() == child.id())
                .unwrap_or(false);
        }
        return false;
    }
    false
}

/// True when the identifier's nearest enclosing construct is a real use
/// site rather than the declaration itself.
pub fn is_use_site(node: Node<'_>) -> bool {
    ancestor_of_kind(node, &USE_SITE_KINDS).is_some()
}

/// Nearest enclosing type declaration, if any.
pub fn enclosing_type_declaration(node: Node<'_>) -> Option<Node<'_>> {
    ancestor_of_kind(node, &TYPE_DECLARATION_KINDS)
}

/// Nearest enclosing callable construct, if any.
pub fn enclosing_callable(node: Node<'_>) -> Option<Node<'_>> {
    ancestor_of_kind(node, &CALLABLE_KINDS)
}

/// Declared identifier of a declarator-like node: its `name` field, or the
/// first identifier child for grammar variants without one.
pub fn declared_identifier(node: Node<'_>, source: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        if name.kind() == "identifier" {
            return Some(node_text(name, source).to_string());
        }
        return None;
    }
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "identifier")
        .map(|ident| node_text(ident, source).to_string());
    result
}

fn ancestor_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Name of a declaration node via its `name` field.
pub fn declaration_name<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, source))
        .filter(|s| !s.is_empty())
}

/// Parameter and local-variable names declared inside a callable subtree.
///
/// Scope granularity is the whole callable; nested blocks are not tracked
/// separately. That is enough to keep locals from shadowing project types
/// during resolution.
pub fn callable_local_names(callable: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![callable];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "parameter" | "variable_declarator" | "catch_declaration" => {
                if let Some(name) = declared_identifier(node, source) {
                    names.push(name);
                }
            }
            "foreach_statement" => {
                // The iteration variable sits in the `left` field.
                if let Some(left) = node
                    .child_by_field_name("left")
                    .or_else(|| node.child_by_field_name("name"))
                {
                    if left.kind() == "identifier" {
                        names.push(node_text(left, source).to_string());
                    }
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            // Do not descend into nested callables; they have scopes of
            // their own.
            if node != callable && CALLABLE_KINDS.contains(&child.kind()) {
                continue;
            }
            stack.push(child);
        }
    }
    names
}
