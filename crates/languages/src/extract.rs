use crate::spec::LanguageSpec;
use repograph_graph::Span;
use tree_sitter::Node;

/// A named source site (definition or call).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSite {
    pub name: String,
    pub span: Span,
}

/// Raw per-file extraction output, before any graph materialization.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub defs: Vec<NamedSite>,
    pub imports: Vec<Span>,
    pub calls: Vec<NamedSite>,
    pub docs: Vec<Span>,
}

/// Extract definitions, imports, calls and doc spans from a parsed tree.
///
/// Pure and deterministic: no I/O, no mutation of the tree, output ordered
/// by a depth-first walk. A node contributes to a category when its kind
/// appears in the spec's corresponding node-type list. Anonymous
/// definitions and calls with no leading identifier are skipped.
#[must_use]
pub fn extract(root: Node<'_>, spec: &LanguageSpec, source: &str) -> Extraction {
    let mut out = Extraction::default();

    // Explicit stack; deeply nested files must not overflow the thread.
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let kind = node.kind();

        if spec.symbol_node_types.contains(&kind) {
            if let Some(name) = definition_name(node, source) {
                out.defs.push(NamedSite {
                    name,
                    span: span_of(node),
                });
            }
        } else if spec.import_node_types.contains(&kind) {
            out.imports.push(span_of(node));
        } else if spec.doc_node_types.contains(&kind) {
            out.docs.push(span_of(node));
        }

        if spec.call_node_types.contains(&kind) {
            if let Some(name) = leading_identifier(node_text(node, source)) {
                out.calls.push(NamedSite {
                    name,
                    span: span_of(node),
                });
            }
        }

        let mut cursor = node.walk();
        // Push in reverse so the pop order matches source order.
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    out
}

fn span_of(node: Node<'_>) -> Span {
    Span::new(
        node.start_position().row + 1,
        node.end_position().row + 1,
        node.start_byte(),
        node.end_byte(),
    )
}

fn node_text<'a>(node: Node<'a>, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Find a definition's name: the `name` field when the grammar exposes one,
/// otherwise the first identifier-like child.
fn definition_name(node: Node<'_>, source: &str) -> Option<String> {
    if let Some(name_node) = node.child_by_field_name("name") {
        let text = node_text(name_node, source);
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if matches!(
            child.kind(),
            "identifier" | "name" | "type_identifier" | "field_identifier" | "property_identifier"
        ) {
            let text = node_text(child, source);
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Leading identifier token of a call site's text (`foo` in `foo(x)` and in
/// `foo.bar(x)`). Callee-name resolution is heuristic by design; call sites
/// whose text starts with anything else are skipped.
fn leading_identifier(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let first = chars.next()?;
    if !(first.is_alphabetic() || first == '_') {
        return None;
    }

    let mut ident = String::new();
    ident.push(first);
    for c in chars {
        if c.is_alphanumeric() || c == '_' {
            ident.push(c);
        } else {
            break;
        }
    }
    Some(ident)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LanguageRegistry;
    use crate::spec::LanguageId;
    use pretty_assertions::assert_eq;

    fn extract_source(id: LanguageId, source: &str) -> Extraction {
        let registry = LanguageRegistry::new();
        let loaded = registry.load(id).expect("grammar");
        let mut parser = loaded.parser().expect("parser");
        let tree = parser.parse(source, None).expect("parse");
        extract(tree.root_node(), loaded.spec, source)
    }

    #[test]
    fn rust_defs_imports_and_calls() {
        let source = r#"use std::collections::HashMap;

/// Doubles a value.
fn double(x: i32) -> i32 {
    helper(x) * 2
}

fn helper(x: i32) -> i32 {
    x
}
"#;
        let out = extract_source(LanguageId::Rust, source);

        let def_names: Vec<&str> = out.defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(def_names, vec!["double", "helper"]);

        assert_eq!(out.imports.len(), 1);
        assert_eq!(out.imports[0].start_line, 1);

        let call_names: Vec<&str> = out.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(call_names, vec!["helper"]);

        assert_eq!(out.docs.len(), 1);
        assert_eq!(out.docs[0].start_line, 3);
    }

    #[test]
    fn python_class_and_methods() {
        let source = r#"from math import pi

# A greeter.
class Greeter:
    def greet(self):
        return format_greeting(self.name)

def format_greeting(name):
    return "Hello, " + name
"#;
        let out = extract_source(LanguageId::Python, source);

        let def_names: Vec<&str> = out.defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(def_names, vec!["Greeter", "greet", "format_greeting"]);

        assert_eq!(out.imports.len(), 1);

        let call_names: Vec<&str> = out.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(call_names, vec!["format_greeting"]);
    }

    #[test]
    fn typescript_interfaces_count_as_defs() {
        let source = r#"import { fetch } from "./net";

interface Config {
    url: string;
}

function load(cfg: Config) {
    return fetch(cfg.url);
}
"#;
        let out = extract_source(LanguageId::TypeScript, source);
        let def_names: Vec<&str> = out.defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(def_names, vec!["Config", "load"]);
        assert_eq!(out.imports.len(), 1);
    }

    #[test]
    fn method_calls_yield_receiver_identifier() {
        // The leading identifier of `parts.join(...)` is the receiver; the
        // resolver later drops it unless a symbol by that name exists.
        let out = extract_source(LanguageId::Python, "def run(parts):\n    parts.join(',')\n");
        let call_names: Vec<&str> = out.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(call_names, vec!["parts"]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let source = "fn a() { b(); }\nfn b() {}\n";
        assert_eq!(
            extract_source(LanguageId::Rust, source),
            extract_source(LanguageId::Rust, source)
        );
    }
}
