use thiserror::Error;

/// Errors surfaced by the bookmark core.
///
/// Load-level variants (`UnsupportedFormat`, `Parse`, `SourceUnavailable`, `Io`)
/// abort the load they belong to and leave the canonical collection untouched.
/// `Persistence` is reported but never blocks the in-memory operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookmarkError {
    /// The uploaded file extension is neither `html` nor `json`
    #[error("Unsupported file format '{0}'. Please use HTML or JSON files.")]
    UnsupportedFormat(String),

    /// Malformed input, or a valid document without a single usable bookmark
    #[error("Parse error: {0}")]
    Parse(String),

    /// The native bookmark tree could not be retrieved
    #[error("Bookmark source unavailable: {0}")]
    SourceUnavailable(String),

    /// The uploaded file could not be read
    #[error("Failed to read file: {0}")]
    Io(String),

    /// Reading, writing or erasing the durable store failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The configuration file could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BookmarkError>;
