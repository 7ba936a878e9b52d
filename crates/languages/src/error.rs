use thiserror::Error;

pub type Result<T> = std::result::Result<T, LanguageError>;

#[derive(Error, Debug)]
pub enum LanguageError {
    /// Loaded grammar does not expose grammar-shaped properties
    #[error("Grammar validation failed for {language}: {reason}")]
    GrammarValidation { language: String, reason: String },

    /// Parser refused the grammar (ABI mismatch)
    #[error("Parser rejected grammar for {language}: {reason}")]
    ParserSetup { language: String, reason: String },
}
