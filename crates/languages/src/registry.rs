use crate::error::{LanguageError, Result};
use crate::spec::{spec_for, LanguageId, LanguageSpec};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};
use tree_sitter::{Language, Parser, Query};

/// A language spec together with its validated grammar.
pub struct LoadedLanguage {
    pub spec: &'static LanguageSpec,
    pub language: Language,
}

impl LoadedLanguage {
    /// Build a parser configured for this grammar.
    pub fn parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| LanguageError::ParserSetup {
                language: self.spec.id.as_str().to_string(),
                reason: e.to_string(),
            })?;
        Ok(parser)
    }
}

struct LoadWaiter {
    state: Arc<(Mutex<LoadState>, Condvar)>,
}

struct LoadState {
    done: bool,
    loaded: Option<Arc<LoadedLanguage>>,
}

impl Clone for LoadWaiter {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl LoadWaiter {
    fn new() -> Self {
        Self {
            state: Arc::new((
                Mutex::new(LoadState {
                    done: false,
                    loaded: None,
                }),
                Condvar::new(),
            )),
        }
    }

    fn finish(&self, loaded: Option<Arc<LoadedLanguage>>) {
        let (lock, cv) = &*self.state;
        {
            let mut guard = lock
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            guard.done = true;
            guard.loaded = loaded;
        }
        cv.notify_all();
    }

    fn wait(&self) -> Option<Arc<LoadedLanguage>> {
        let (lock, cv) = &*self.state;
        let mut guard = lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while !guard.done {
            guard = cv
                .wait(guard)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        guard.loaded.clone()
    }
}

enum GrammarEntry {
    Ready(Arc<LoadedLanguage>),
    /// Validation failed before; the extension stays unsupported.
    Failed,
    Loading(LoadWaiter),
}

/// Extension → validated grammar resolution with lazy, load-once semantics.
///
/// Grammars are constructed on first use, validated for grammar-shaped
/// properties, and cached (positively or negatively) per language id.
/// Concurrent first-use calls for the same language share one load via an
/// in-flight waiter instead of loading redundantly. Failures are logged and
/// surface as `None`; a broken grammar never blocks other languages.
pub struct LanguageRegistry {
    entries: Mutex<HashMap<LanguageId, GrammarEntry>>,
    #[cfg(test)]
    loads_started: std::sync::atomic::AtomicUsize,
}

impl LanguageRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            #[cfg(test)]
            loads_started: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Resolve a file path to its validated language, if supported.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Option<Arc<LoadedLanguage>> {
        let id = LanguageId::from_path(path)?;
        self.load(id)
    }

    /// Load (or fetch from cache) the validated grammar for a language.
    pub fn load(&self, id: LanguageId) -> Option<Arc<LoadedLanguage>> {
        let waiter = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            match entries.get(&id) {
                Some(GrammarEntry::Ready(loaded)) => return Some(loaded.clone()),
                Some(GrammarEntry::Failed) => return None,
                Some(GrammarEntry::Loading(waiter)) => {
                    // Another caller is loading this grammar; join its result.
                    let waiter = waiter.clone();
                    drop(entries);
                    return waiter.wait();
                }
                None => {
                    let waiter = LoadWaiter::new();
                    entries.insert(id, GrammarEntry::Loading(waiter.clone()));
                    waiter
                }
            }
        };

        #[cfg(test)]
        self.loads_started
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let result = match load_and_validate(id) {
            Ok(loaded) => Some(Arc::new(loaded)),
            Err(e) => {
                log::warn!("Grammar for {} unavailable: {e}", id.as_str());
                None
            }
        };

        {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let entry = match &result {
                Some(loaded) => GrammarEntry::Ready(loaded.clone()),
                None => GrammarEntry::Failed,
            };
            entries.insert(id, entry);
        }

        waiter.finish(result.clone());
        result
    }

    #[cfg(test)]
    fn loads_started(&self) -> usize {
        self.loads_started
            .load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn load_and_validate(id: LanguageId) -> Result<LoadedLanguage> {
    let spec = spec_for(id);
    let language = (spec.grammar)();
    validate_grammar(id, &language)?;

    // A parser must accept the grammar; this is the same ABI check the
    // per-file parse path relies on.
    let loaded = LoadedLanguage { spec, language };
    loaded.parser()?;

    log::debug!(
        "Loaded grammar for {} ({} node kinds)",
        id.as_str(),
        loaded.language.node_kind_count()
    );
    Ok(loaded)
}

/// Check that the loaded object is actually grammar-shaped: a plausible ABI
/// version, a non-trivial node inventory, and query support.
fn validate_grammar(id: LanguageId, language: &Language) -> Result<()> {
    let version = language.version();
    if !(tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION..=tree_sitter::LANGUAGE_VERSION)
        .contains(&version)
    {
        return Err(LanguageError::GrammarValidation {
            language: id.as_str().to_string(),
            reason: format!(
                "ABI version {version} outside supported range {}..={}",
                tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION,
                tree_sitter::LANGUAGE_VERSION
            ),
        });
    }

    if language.node_kind_count() < 2 {
        return Err(LanguageError::GrammarValidation {
            language: id.as_str().to_string(),
            reason: format!(
                "implausible node kind count {}",
                language.node_kind_count()
            ),
        });
    }

    Query::new(language, "(_) @node").map_err(|e| LanguageError::GrammarValidation {
        language: id.as_str().to_string(),
        reason: format!("query support check failed: {e}"),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_supported_extensions() {
        let registry = LanguageRegistry::new();
        let loaded = registry.resolve("src/lib.rs").expect("rust grammar");
        assert_eq!(loaded.spec.id, LanguageId::Rust);
        assert!(registry.resolve("scripts/build.py").is_some());
        assert!(registry.resolve("web/app.ts").is_some());
    }

    #[test]
    fn unsupported_extension_is_none() {
        let registry = LanguageRegistry::new();
        assert!(registry.resolve("README.md").is_none());
        assert!(registry.resolve("no_extension").is_none());
    }

    #[test]
    fn second_load_hits_the_cache() {
        let registry = LanguageRegistry::new();
        registry.load(LanguageId::Python).expect("python grammar");
        registry.load(LanguageId::Python).expect("python grammar");
        assert_eq!(registry.loads_started(), 1);
    }

    #[test]
    fn concurrent_first_use_shares_one_load() {
        let registry = std::sync::Arc::new(LanguageRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                registry.load(LanguageId::Rust).is_some()
            }));
        }
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(registry.loads_started(), 1);
    }

    #[test]
    fn loaded_grammar_parses() {
        let registry = LanguageRegistry::new();
        let loaded = registry.load(LanguageId::Rust).unwrap();
        let mut parser = loaded.parser().unwrap();
        let tree = parser.parse("fn main() {}", None).unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
    }
}
