use std::io;
use std::path::PathBuf;

/// Alias for `Result<T, ArchiveError>`.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Possible errors from a zip or directory archive.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    /// A referenced entry does not exist within the archive.
    #[error("[EntryNotFound - `{entry}`]: No such entry in `{archive}`")]
    EntryNotFound {
        /// The entry name that was looked up.
        entry: String,
        /// The [name](crate::archive::ArchiveReader::name) of the archive.
        archive: String,
    },

    /// The entry exists, although is unable to be read, typically I/O.
    #[error("[CannotRead - `{entry}`]: {source}")]
    CannotRead {
        /// The root cause of the error.
        source: io::Error,
        /// The entry responsible for triggering the error.
        entry: String,
    },

    /// Writing an entry failed, leaving the archive session unusable.
    #[error("[CannotWrite - `{entry}`]: {source}")]
    CannotWrite {
        /// The root cause of the error.
        source: io::Error,
        /// The entry responsible for triggering the error.
        entry: String,
    },

    /// The entry name is empty or escapes the archive root.
    #[error("[InvalidEntryName - `{0}`]: Entry names must be relative and contained")]
    InvalidEntryName(String),

    /// Entries are write-once within a writing session.
    #[error("[EntryExists - `{0}`]: Entry was already written")]
    EntryExists(String),

    /// [`begin`](crate::archive::ArchiveWriter::begin) was called while another
    /// entry was still open.
    #[error("[EntryInProgress - `{current}`]: Cannot begin `{requested}` before ending the current entry")]
    EntryInProgress {
        /// The entry that is still open.
        current: String,
        /// The entry that was requested.
        requested: String,
    },

    /// [`end`](crate::archive::ArchiveWriter::end) was called for an entry that is not open.
    #[error("[EntryNotInProgress - `{0}`]: Entry is not open")]
    EntryNotInProgress(String),

    /// The archive session was already [closed](crate::archive::ArchiveReader::close).
    #[error("[Closed - `{0}`]: Archive session is closed")]
    Closed(String),

    /// The archive itself is unreadable or unwritable due to not existing,
    /// unsupported format, or malformed state.
    ///
    /// Path is [`None`] when the archive is backed by a reader or writer
    /// instead of the filesystem.
    #[error("[UnusableArchive - `{path:?}`]: {source}")]
    UnusableArchive {
        /// The root cause of this error.
        source: io::Error,
        /// The path responsible for triggering the error, if applicable.
        path: Option<PathBuf>,
    },
}
