//! Error-related types for a [`Book`](crate::Book) and its codecs.

pub use crate::ebook::archive::errors::{ArchiveError, ArchiveResult};
pub use crate::ebook::pmab::errors::PmabError;
use std::error::Error;
use std::io;

/// Alias for `Result<T, EbookError>`.
pub type EbookResult<T> = Result<T, EbookError>;

/// Alias for `Result<T, ContentError>`.
pub type ContentResult<T> = Result<T, ContentError>;

/// Unified error type.
///
/// Codec entry points ([`pmab::parse`](crate::pmab::parse),
/// [`pmab::make`](crate::pmab::make)) return this type; the narrower errors
/// returned by the tree, the attribute maps, and lazy content all convert into it.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum EbookError {
    /// An archive entry could not be located, read, or written.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// An archive or one of its documents is structurally invalid.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A value was rejected by the type constraint of its key.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A stored string could not be converted to its declared type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Lazy content failed while being read.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// A tree mutation would break the single-parent invariant.
    #[error(transparent)]
    InvalidOperation(#[from] TreeError),

    /// The operation observed its [`CancellationToken`](crate::pmab::CancellationToken).
    #[error("[Cancelled]: The operation was cancelled")]
    Cancelled,

    /// An IO exception occurred outside of any archive entry.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EbookError {
    /// Returns `true` if a document declares a format version that is not supported.
    pub fn is_unsupported_version(&self) -> bool {
        matches!(
            self,
            Self::Format(FormatError::Pmab(PmabError::UnsupportedVersion { .. }))
        )
    }

    /// Returns `true` if a referenced archive entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Archive(ArchiveError::EntryNotFound { .. }))
    }
}

/// Possible format errors for an archive-backed book.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// Document content unexpectedly causes an internal parser error.
    ///
    /// This may originate from malformed content within a file, such as improper XML.
    #[error(transparent)]
    Unparsable(#[from] Box<dyn Error + Send + Sync + 'static>),

    /// Format errors specific to PMAB archives.
    #[error(transparent)]
    Pmab(#[from] PmabError),
}

impl From<quick_xml::Error> for FormatError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Unparsable(Box::new(error))
    }
}

impl From<PmabError> for EbookError {
    fn from(error: PmabError) -> Self {
        Self::Format(FormatError::Pmab(error))
    }
}

/// A value rejected by [`VariantMap::set`](crate::variant::VariantMap::set).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("[InvalidValue - `{key}`]: {reason}")]
pub struct ValidationError {
    key: String,
    reason: String,
}

impl ValidationError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// The key the rejected value was set under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A string that could not be parsed as the value of a type tag.
///
/// This error is always local: a caller may choose to keep the raw
/// [`text`](Self::text) as a string value instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("[Unconvertible - `{}`]: `{text}` is not a valid `{tag}`", .key.as_deref().unwrap_or("?"))]
pub struct ConversionError {
    tag: String,
    text: String,
    key: Option<String>,
}

impl ConversionError {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            key: None,
        }
    }

    /// Attaches the attribute key whose value failed conversion.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The type tag the text was converted against (e.g., `int`).
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The offending text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The attribute key, when known.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// Reading lazy [`Flob`](crate::content::Flob) or [`Text`](crate::content::Text)
/// content has failed.
#[derive(thiserror::Error, Debug)]
#[error("[CannotReadContent - `{name}`]: {source}")]
pub struct ContentError {
    name: String,
    source: io::Error,
}

impl ContentError {
    pub(crate) fn new(name: impl Into<String>, source: io::Error) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// The name of the content that failed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root cause of the error.
    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}

/// Chapter tree invariant violations.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The chapter already has a parent and must be detached first.
    #[error("[AlreadyAttached]: Chapter `{0}` already has a parent")]
    AlreadyAttached(String),

    /// The chapter is an ancestor of the node it would be attached to.
    #[error("[Cycle]: Chapter `{0}` is an ancestor of the target")]
    Cycle(String),

    /// A chapter cannot be attached to itself.
    #[error("[SelfReference]: Chapter `{0}` cannot contain itself")]
    SelfReference(String),

    /// The index is outside of the children's bounds.
    #[error("[IndexOutOfBounds]: Index {index} is out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The number of children at the time of the request.
        len: usize,
    },
}
