//! Named-entry stores backing persisted books.
//!
//! An archive is either a zip container or a plain directory tree.
//! Both expose identical entry semantics through [`ArchiveReader`] and
//! [`ArchiveWriter`]:
//! - Entry names are relative, slash-separated paths (`text/chapter-1.txt`).
//! - Within one writing session, each entry is written once,
//!   and only one entry may be open at a time.
//! - Within one reading session, each entry may be streamed any number of times.

pub(super) mod directory;
pub(super) mod errors;
pub(super) mod zip;

use crate::ebook::archive::errors::{ArchiveError, ArchiveResult};
use crate::ebook::errors::EbookResult;
use crate::util;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::rc::Rc;

pub use self::directory::{DirectoryArchiveReader, DirectoryArchiveWriter};
pub use self::zip::{ZipArchiveReader, ZipArchiveWriter};

/// A named entry within an archive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entry {
    name: String,
    stored: bool,
}

impl Entry {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stored: false,
        }
    }

    /// The slash-separated entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the entry is written without compression.
    pub fn is_stored(&self) -> bool {
        self.stored
    }
}

/// Read access to an archive for the duration of one reading session.
pub trait ArchiveReader {
    /// The archive identity used in diagnostics, such as its path.
    fn name(&self) -> &str;

    /// Looks up an entry by name.
    fn entry_for(&self, name: &str) -> Option<Entry>;

    /// Opens a fresh stream over the full content of `entry`.
    ///
    /// Every call starts from the beginning of the entry.
    fn stream_for(&self, entry: &Entry) -> ArchiveResult<Box<dyn Read>>;

    /// Ends the reading session. Later calls to [`stream_for`](Self::stream_for)
    /// fail with [`ArchiveError::Closed`]. Closing twice is a no-op.
    fn close(&self);

    fn is_closed(&self) -> bool;

    /// Reads the entry named `name` into memory.
    fn read_entry(&self, name: &str) -> ArchiveResult<Vec<u8>> {
        let entry = self.entry_for(name).ok_or_else(|| self.not_found(name))?;
        let mut buf = Vec::new();

        self.stream_for(&entry)?
            .read_to_end(&mut buf)
            .map_err(|source| ArchiveError::CannotRead {
                source,
                entry: name.to_owned(),
            })?;
        Ok(buf)
    }

    #[doc(hidden)]
    fn not_found(&self, name: &str) -> ArchiveError {
        ArchiveError::EntryNotFound {
            entry: name.to_owned(),
            archive: self.name().to_owned(),
        }
    }
}

/// Write access to an archive for the duration of one writing session.
///
/// Each entry follows `new_entry → begin → (write) → end`.
/// [`end`](Self::end) must be called before the next [`begin`](Self::begin),
/// even if writing the content failed; see [`write_entry`].
pub trait ArchiveWriter {
    /// The archive identity used in diagnostics, such as its path.
    fn name(&self) -> &str;

    /// Claims a new entry name.
    ///
    /// # Errors
    /// - [`ArchiveError::InvalidEntryName`]: The name is empty or escapes the root.
    /// - [`ArchiveError::EntryExists`]: The name was already claimed in this session.
    fn new_entry(&mut self, name: &str) -> ArchiveResult<Entry>;

    /// Claims a new entry that is written without compression, such as a `mimetype` marker.
    fn new_stored_entry(&mut self, name: &str) -> ArchiveResult<Entry> {
        self.new_entry(name).map(|entry| Entry {
            stored: true,
            ..entry
        })
    }

    /// Opens `entry` for writing.
    fn begin(&mut self, entry: &Entry) -> ArchiveResult<&mut dyn Write>;

    /// Closes `entry`, flushing its content.
    fn end(&mut self, entry: &Entry) -> ArchiveResult<()>;
}

/// Claims `name`, writes it with `write`, and always ends the entry,
/// even when `write` fails.
///
/// The error of `write` takes precedence over an error from ending the entry.
pub fn write_entry<T>(
    writer: &mut dyn ArchiveWriter,
    entry: Entry,
    write: impl FnOnce(&mut dyn Write) -> EbookResult<T>,
) -> EbookResult<T> {
    let result = write(writer.begin(&entry)?);
    let ended = writer.end(&entry);
    let value = result?;

    ended?;
    tracing::trace!(entry = entry.name(), archive = writer.name(), "entry written");
    Ok(value)
}

/// Opens a directory as a [`DirectoryArchiveReader`],
/// otherwise opens the file as a [`ZipArchiveReader`].
pub fn open_reader(path: &Path) -> ArchiveResult<Rc<dyn ArchiveReader>> {
    Ok(if path.is_dir() {
        Rc::new(DirectoryArchiveReader::new(path)?)
    } else {
        let file = File::open(path).map_err(|source| ArchiveError::UnusableArchive {
            source,
            path: Some(path.to_path_buf()),
        })?;
        Rc::new(ZipArchiveReader::new(BufReader::new(file), Some(path))?)
    })
}

/// Write-once bookkeeping shared by the writer implementations.
#[derive(Debug, Default)]
struct EntryLedger {
    claimed: HashSet<String>,
    begun: HashSet<String>,
    current: Option<String>,
}

impl EntryLedger {
    fn claim(&mut self, name: &str) -> ArchiveResult<Entry> {
        if !util::uri::is_contained(name) {
            return Err(ArchiveError::InvalidEntryName(name.to_owned()));
        }
        if !self.claimed.insert(name.to_owned()) {
            return Err(ArchiveError::EntryExists(name.to_owned()));
        }
        Ok(Entry::new(name))
    }

    fn open(&mut self, entry: &Entry) -> ArchiveResult<()> {
        if let Some(current) = &self.current {
            return Err(ArchiveError::EntryInProgress {
                current: current.clone(),
                requested: entry.name.clone(),
            });
        }
        if !self.claimed.contains(&entry.name) {
            return Err(ArchiveError::InvalidEntryName(entry.name.clone()));
        }
        if !self.begun.insert(entry.name.clone()) {
            return Err(ArchiveError::EntryExists(entry.name.clone()));
        }
        self.current = Some(entry.name.clone());
        Ok(())
    }

    fn close(&mut self, entry: &Entry) -> ArchiveResult<()> {
        match &self.current {
            Some(current) if *current == entry.name => {
                self.current = None;
                Ok(())
            }
            _ => Err(ArchiveError::EntryNotInProgress(entry.name.clone())),
        }
    }

    fn in_progress(&self) -> Option<&str> {
        self.current.as_deref()
    }
}
