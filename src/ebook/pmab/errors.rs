//! Error-related types for PMAB archives.

/// Possible format errors from a PMAB archive.
///
/// # Variants
/// When parsing, every variant aborts the whole read; no partial
/// [`Book`](crate::Book) is returned.
///
/// ## Archive Errors
/// - [`InvalidMimetype`](PmabError::InvalidMimetype)
/// - [`MissingDocument`](PmabError::MissingDocument)
/// ## Document Errors (`book.xml`, `content.xml`)
/// - [`UnexpectedRoot`](PmabError::UnexpectedRoot)
/// - [`UnsupportedVersion`](PmabError::UnsupportedVersion)
/// - [`MissingAttribute`](PmabError::MissingAttribute)
/// - [`InvalidEncoding`](PmabError::InvalidEncoding)
/// - [`UnbalancedChapter`](PmabError::UnbalancedChapter)
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PmabError {
    /// The `mimetype` entry does not identify a PMAB archive.
    #[error("[InvalidMimetype]: Expected `{expected}`, found `{found}`")]
    InvalidMimetype { expected: String, found: String },

    /// A document declares a version other than `3.0`.
    #[error("[UnsupportedVersion - `{document}`]: Version `{version}` is not supported")]
    UnsupportedVersion { document: String, version: String },

    /// A required attribute is missing from an element.
    #[error("[MissingAttribute]: <{element}> requires attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    /// A document does not start with its expected root element.
    #[error("[UnexpectedRoot - `{document}`]: Expected <{expected}>, found <{found}>")]
    UnexpectedRoot {
        document: String,
        expected: String,
        found: String,
    },

    /// A required document is absent or empty.
    #[error("[MissingDocument]: `{0}` has no root element")]
    MissingDocument(String),

    /// A `type` attribute names an unknown text encoding.
    #[error("[InvalidEncoding]: Unknown text encoding `{0}`")]
    InvalidEncoding(String),

    /// A `<chapter>` end tag has no matching start tag.
    #[error("[UnbalancedChapter]: Closing <chapter> without an open chapter")]
    UnbalancedChapter,
}
