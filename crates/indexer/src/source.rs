use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// One enumerated file with its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative path, forward slashes
    pub path: String,

    /// Full file content
    pub content: String,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// File enumeration collaborator: a local walk, a remote repository API, or
/// a test fixture. Enumeration failure is the one fatal indexing error.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn list_files(&self) -> Result<Vec<SourceFile>>;
}

/// In-memory file source, used by tests and remote-content adapters that
/// fetch up front.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSource {
    files: Vec<SourceFile>,
}

impl MemoryFileSource {
    #[must_use]
    pub fn new(files: Vec<SourceFile>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl FileSource for MemoryFileSource {
    async fn list_files(&self) -> Result<Vec<SourceFile>> {
        Ok(self.files.clone())
    }
}

/// Gitignore-aware local filesystem walk.
///
/// VCS/build directories and oversized or non-UTF-8 (binary) files are
/// excluded by policy; callers can extend the ignored-scope list.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    root: PathBuf,
    extra_ignored_scopes: Vec<String>,
}

impl LocalFileSource {
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extra_ignored_scopes: Vec::new(),
        }
    }

    /// Builder: add caller-specific directory names to skip
    #[must_use]
    pub fn with_ignored_scopes(mut self, scopes: impl IntoIterator<Item = String>) -> Self {
        self.extra_ignored_scopes.extend(scopes);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan(&self) -> Result<Vec<SourceFile>> {
        if !self.root.exists() {
            return Err(IndexerError::FileEnumeration(format!(
                "Path does not exist: {}",
                self.root.display()
            )));
        }

        let mut files = Vec::new();

        let root = self.root.clone();
        let extra = self.extra_ignored_scopes.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true) // do not index hidden files by default
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(move |entry| !is_ignored_scope(entry.path(), &root, &extra));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > MAX_FILE_SIZE_BYTES {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                MAX_FILE_SIZE_BYTES
                            );
                            continue;
                        }
                    }

                    // Binary assets fail the UTF-8 read; skip them quietly.
                    let content = match std::fs::read_to_string(path) {
                        Ok(content) => content,
                        Err(e) => {
                            log::debug!("Skipping unreadable file {}: {e}", path.display());
                            continue;
                        }
                    };

                    files.push(SourceFile {
                        path: normalize_path(path, &self.root),
                        content,
                    });
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        log::info!("Found {} files under {}", files.len(), self.root.display());
        Ok(files)
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    async fn list_files(&self) -> Result<Vec<SourceFile>> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.scan())
            .await
            .map_err(|e| IndexerError::FileEnumeration(format!("walk task failed: {e}")))?
    }
}

const MAX_FILE_SIZE_BYTES: u64 = 1_048_576; // 1 MB

const IGNORED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // caches / builds
    ".cache",
    "node_modules",
    "build",
    "dist",
    "coverage",
    "target",
    ".venv",
    "__pycache__",
    // data / vendor
    "vendor",
    "third_party",
    "third-party",
];

fn is_ignored_scope(path: &Path, root: &Path, extra: &[String]) -> bool {
    if let Ok(relative) = path.strip_prefix(root) {
        for component in relative.components() {
            if let std::path::Component::Normal(name) = component {
                let lowered = name.to_string_lossy().to_lowercase();
                if IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered)
                    || extra.iter().any(|ignored| ignored == &lowered)
                {
                    return true;
                }
            }
        }
    }
    false
}

fn normalize_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut normalized = relative.to_string_lossy().to_string();
    if normalized.contains('\\') {
        normalized = normalized.replace('\\', "/");
    }
    normalized
}
