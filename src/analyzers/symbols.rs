//! Project-wide symbol table.
//!
//! Indexes every declaration the syntax layer can see (types with partial
//! declarations merged into one symbol, their members, and the namespaces
//! containing them) and answers the resolver lookups
//! deterministically: declaration locations are ordered by (document
//! enumeration order, byte offset), which pins "first declaring file" for
//! symbols declared in several files.

use crate::analyzers::csharp::{
    declaration_name, enclosing_namespace, for_each_node, node_text, TYPE_DECLARATION_KINDS,
};
use crate::analyzers::ParsedDocument;
use crate::core::GLOBAL_NAMESPACE;
use std::collections::HashMap;
use tree_sitter::Node;

/// Kind of a named declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Namespace,
    Type,
    Member,
    Parameter,
    Local,
}

/// A (document, offset) pair at which a declaration appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolLocation {
    /// Global document enumeration index.
    pub document: usize,
    /// Byte offset of the declared name.
    pub offset: usize,
}

/// A named declaration with its ordered in-source locations.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Simple (unqualified) name.
    pub name: String,
    /// Fully-qualified name, containers included.
    pub fqn: String,
    /// Containing namespace, `<global>` when none.
    pub namespace: String,
    /// Containing type for members, fully qualified.
    pub container: Option<String>,
    /// Declaration locations ordered by (document, offset). Non-empty.
    pub locations: Vec<SymbolLocation>,
}

impl Symbol {
    /// Document index of the first declaration in enumeration order.
    pub fn declaring_document(&self) -> usize {
        self.locations[0].document
    }
}

pub type SymbolId = usize;

/// Symbol index for one project's compilation.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    /// simple type name → symbol ids in enumeration order
    types_by_name: HashMap<String, Vec<SymbolId>>,
    /// fully-qualified type name → symbol id
    types_by_fqn: HashMap<String, SymbolId>,
    /// (containing type fqn, member name) → symbol id
    members: HashMap<(String, String), SymbolId>,
}

impl SymbolTable {
    /// Build the table over a project's parsed documents. Documents must be
    /// supplied in enumeration order.
    pub fn build(documents: &[&ParsedDocument]) -> Self {
        let mut table = Self::default();
        for doc in documents {
            table.index_document(doc);
        }
        table
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Resolve a simple type name seen from inside `current_namespace`.
    ///
    /// The enclosing namespace chain is preferred, innermost first, the way
    /// unqualified lookup works in the analyzed language; otherwise the
    /// first declaration in enumeration order wins.
    pub fn resolve_type(&self, name: &str, current_namespace: &str) -> Option<SymbolId> {
        let candidates = self.types_by_name.get(name)?;
        if current_namespace != GLOBAL_NAMESPACE {
            let mut prefix = current_namespace.to_string();
            loop {
                let fqn = format!("{prefix}.{name}");
                if let Some(&id) = self.types_by_fqn.get(&fqn) {
                    return Some(id);
                }
                match prefix.rfind('.') {
                    Some(i) => prefix.truncate(i),
                    None => break,
                }
            }
        }
        if let Some(&id) = self.types_by_fqn.get(name) {
            return Some(id);
        }
        candidates.first().copied()
    }

    /// Resolve a member of a known type by simple name.
    pub fn resolve_member(&self, type_fqn: &str, name: &str) -> Option<SymbolId> {
        self.members
            .get(&(type_fqn.to_string(), name.to_string()))
            .copied()
    }

    /// Fully-qualified name of a type declaration node, including nested
    /// type containers.
    pub fn type_fqn_of(node: Node<'_>, source: &str) -> Option<String> {
        let name = declaration_name(node, source)?;
        let mut segments = vec![name.to_string()];
        let mut current = node.parent();
        while let Some(n) = current {
            if TYPE_DECLARATION_KINDS.contains(&n.kind()) {
                if let Some(outer) = declaration_name(n, source) {
                    segments.push(outer.to_string());
                }
            }
            current = n.parent();
        }
        segments.reverse();
        let namespace = enclosing_namespace(node, source);
        Some(match namespace {
            Some(ns) => format!("{ns}.{}", segments.join(".")),
            None => segments.join("."),
        })
    }

    fn index_document(&mut self, doc: &ParsedDocument) {
        let source = doc.text.as_str();
        for_each_node(&doc.tree, |node| {
            if TYPE_DECLARATION_KINDS.contains(&node.kind()) {
                self.index_type(node, doc.index, source);
            } else {
                self.index_member(node, doc.index, source);
            }
        });
    }

    fn index_type(&mut self, node: Node<'_>, document: usize, source: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, source).to_string();
        if name.is_empty() {
            return;
        }
        let Some(fqn) = Self::type_fqn_of(node, source) else {
            return;
        };
        let namespace = enclosing_namespace(node, source)
            .unwrap_or_else(|| GLOBAL_NAMESPACE.to_string());
        let location = SymbolLocation {
            document,
            offset: name_node.start_byte(),
        };
        // Partial declarations of one type merge into a single symbol.
        if let Some(&id) = self.types_by_fqn.get(&fqn) {
            self.symbols[id].locations.push(location);
            return;
        }
        let id = self.symbols.len();
        self.symbols.push(Symbol {
            kind: SymbolKind::Type,
            name: name.clone(),
            fqn: fqn.clone(),
            namespace,
            container: None,
            locations: vec![location],
        });
        self.types_by_fqn.insert(fqn, id);
        self.types_by_name.entry(name).or_default().push(id);
    }

    fn index_member(&mut self, node: Node<'_>, document: usize, source: &str) {
        let named: Vec<(String, usize)> = match node.kind() {
            "method_declaration"
            | "property_declaration"
            | "constructor_declaration"
            | "destructor_declaration"
            | "event_declaration"
            | "enum_member_declaration" => node
                .child_by_field_name("name")
                .map(|n| vec![(node_text(n, source).to_string(), n.start_byte())])
                .unwrap_or_default(),
            "field_declaration" | "event_field_declaration" => {
                let mut names = Vec::new();
                let mut stack = vec![node];
                while let Some(n) = stack.pop() {
                    if n.kind() == "variable_declarator" {
                        if let Some(name) = crate::analyzers::csharp::declared_identifier(n, source)
                        {
                            names.push((name, n.start_byte()));
                        }
                        continue;
                    }
                    let mut cursor = n.walk();
                    for child in n.named_children(&mut cursor) {
                        stack.push(child);
                    }
                }
                names
            }
            _ => return,
        };
        if named.is_empty() {
            return;
        }

        let Some(container_node) =
            crate::analyzers::csharp::enclosing_type_declaration(node)
        else {
            return;
        };
        let Some(container_fqn) = Self::type_fqn_of(container_node, source) else {
            return;
        };
        let namespace = enclosing_namespace(node, source)
            .unwrap_or_else(|| GLOBAL_NAMESPACE.to_string());

        for (name, offset) in named {
            if name.is_empty() {
                continue;
            }
            let key = (container_fqn.clone(), name.clone());
            let location = SymbolLocation { document, offset };
            if let Some(&id) = self.members.get(&key) {
                // Partial methods and overloads share one symbol entry.
                self.symbols[id].locations.push(location);
                continue;
            }
            let id = self.symbols.len();
            let fqn = format!("{container_fqn}.{name}");
            self.symbols.push(Symbol {
                kind: SymbolKind::Member,
                name,
                fqn,
                namespace: namespace.clone(),
                container: Some(container_fqn.clone()),
                locations: vec![location],
            });
            self.members.insert(key, id);
        }
    }
}
