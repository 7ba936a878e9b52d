use std::path::Path;

/// Supported language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    Rust,
    Python,
    JavaScript,
    TypeScript,
}

impl LanguageId {
    /// Detect language from file extension
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "rs" => Some(Self::Rust),
            "py" | "pyw" => Some(Self::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::JavaScript),
            "ts" | "tsx" => Some(Self::TypeScript),
            _ => None,
        }
    }

    /// Detect language from file path
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Language name as string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
        }
    }

    /// All registered languages
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Rust, Self::Python, Self::JavaScript, Self::TypeScript]
    }
}

/// Declarative per-language extraction spec.
///
/// The node-type lists drive the extractor; the grammar entry point is only
/// invoked by the registry, which validates and caches the result.
pub struct LanguageSpec {
    pub id: LanguageId,
    pub grammar: fn() -> tree_sitter::Language,
    pub symbol_node_types: &'static [&'static str],
    pub import_node_types: &'static [&'static str],
    pub doc_node_types: &'static [&'static str],
    pub call_node_types: &'static [&'static str],
}

static RUST_SPEC: LanguageSpec = LanguageSpec {
    id: LanguageId::Rust,
    grammar: || tree_sitter_rust::LANGUAGE.into(),
    symbol_node_types: &[
        "function_item",
        "struct_item",
        "enum_item",
        "trait_item",
        "mod_item",
        "const_item",
        "static_item",
        "type_item",
    ],
    import_node_types: &["use_declaration", "extern_crate_declaration"],
    doc_node_types: &["line_comment", "block_comment"],
    call_node_types: &["call_expression"],
};

static PYTHON_SPEC: LanguageSpec = LanguageSpec {
    id: LanguageId::Python,
    grammar: || tree_sitter_python::LANGUAGE.into(),
    symbol_node_types: &["function_definition", "class_definition"],
    import_node_types: &["import_statement", "import_from_statement"],
    doc_node_types: &["comment"],
    call_node_types: &["call"],
};

static JAVASCRIPT_SPEC: LanguageSpec = LanguageSpec {
    id: LanguageId::JavaScript,
    grammar: || tree_sitter_javascript::LANGUAGE.into(),
    symbol_node_types: &[
        "function_declaration",
        "generator_function_declaration",
        "class_declaration",
        "method_definition",
    ],
    import_node_types: &["import_statement"],
    doc_node_types: &["comment"],
    call_node_types: &["call_expression"],
};

static TYPESCRIPT_SPEC: LanguageSpec = LanguageSpec {
    id: LanguageId::TypeScript,
    grammar: || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    symbol_node_types: &[
        "function_declaration",
        "generator_function_declaration",
        "class_declaration",
        "method_definition",
        "interface_declaration",
        "enum_declaration",
        "type_alias_declaration",
    ],
    import_node_types: &["import_statement"],
    doc_node_types: &["comment"],
    call_node_types: &["call_expression"],
};

/// Look up the static spec for a language
#[must_use]
pub fn spec_for(id: LanguageId) -> &'static LanguageSpec {
    match id {
        LanguageId::Rust => &RUST_SPEC,
        LanguageId::Python => &PYTHON_SPEC,
        LanguageId::JavaScript => &JAVASCRIPT_SPEC,
        LanguageId::TypeScript => &TYPESCRIPT_SPEC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(LanguageId::from_extension("rs"), Some(LanguageId::Rust));
        assert_eq!(LanguageId::from_extension("RS"), Some(LanguageId::Rust));
        assert_eq!(LanguageId::from_extension("py"), Some(LanguageId::Python));
        assert_eq!(
            LanguageId::from_extension("tsx"),
            Some(LanguageId::TypeScript)
        );
        assert_eq!(LanguageId::from_extension("zig"), None);
    }

    #[test]
    fn path_mapping() {
        assert_eq!(LanguageId::from_path("src/main.rs"), Some(LanguageId::Rust));
        assert_eq!(LanguageId::from_path("no_extension"), None);
        assert_eq!(
            LanguageId::from_path("web/app.jsx"),
            Some(LanguageId::JavaScript)
        );
    }

    #[test]
    fn every_language_has_a_spec() {
        for id in LanguageId::all() {
            let spec = spec_for(*id);
            assert_eq!(spec.id, *id);
            assert!(!spec.symbol_node_types.is_empty());
            assert!(!spec.call_node_types.is_empty());
        }
    }
}
