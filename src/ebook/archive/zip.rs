use crate::ebook::archive::errors::{ArchiveError, ArchiveResult};
use crate::ebook::archive::{ArchiveReader, ArchiveWriter, Entry, EntryLedger};
use crate::writer::zip::ZipWriter;
use std::cell::RefCell;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::ZipArchive as Zip;
use zip::result::ZipError;

/// Reads entries from a zip container.
///
/// Each [`stream_for`](ArchiveReader::stream_for) call inflates the
/// entry into memory, so the returned stream does not borrow the archive.
pub struct ZipArchiveReader<R> {
    name: String,
    zip: RefCell<Option<Zip<R>>>,
}

impl<R: Read + Seek> ZipArchiveReader<R> {
    /// `reader` (and optional `path` for a more descriptive error message).
    pub fn new(reader: R, path: Option<&Path>) -> ArchiveResult<Self> {
        let zip = Zip::new(reader).map_err(|error| ArchiveError::UnusableArchive {
            source: io::Error::from(error),
            path: path.map(Path::to_path_buf),
        })?;

        Ok(Self {
            name: path.map_or_else(|| "<stream>".to_owned(), |path| path.display().to_string()),
            zip: RefCell::new(Some(zip)),
        })
    }
}

impl<R: Read + Seek> ArchiveReader for ZipArchiveReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn entry_for(&self, name: &str) -> Option<Entry> {
        let zip = self.zip.borrow();
        zip.as_ref()?
            .file_names()
            .any(|file_name| file_name == name)
            .then(|| Entry::new(name))
    }

    fn stream_for(&self, entry: &Entry) -> ArchiveResult<Box<dyn Read>> {
        let mut guard = self.zip.borrow_mut();
        let zip = guard
            .as_mut()
            .ok_or_else(|| ArchiveError::Closed(self.name.clone()))?;

        let mut file = zip.by_name(entry.name()).map_err(|error| match error {
            ZipError::FileNotFound => self.not_found(entry.name()),
            error => ArchiveError::CannotRead {
                source: io::Error::from(error),
                entry: entry.name().to_owned(),
            },
        })?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|source| ArchiveError::CannotRead {
                source,
                entry: entry.name().to_owned(),
            })?;
        Ok(Box::new(Cursor::new(buf)))
    }

    fn close(&self) {
        if self.zip.borrow_mut().take().is_some() {
            tracing::debug!(archive = %self.name, "zip archive closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.zip.borrow().is_none()
    }
}

/// Writes entries into a zip container.
pub struct ZipArchiveWriter<W: Write> {
    name: String,
    zip: ZipWriter<W>,
    ledger: EntryLedger,
}

impl<W: Write> ZipArchiveWriter<W> {
    /// Creates a writer; a `compression_level` of `0` stores every entry.
    pub fn new(writer: W, name: impl Into<String>, compression_level: Option<u8>) -> Self {
        Self {
            name: name.into(),
            zip: ZipWriter::new(writer, compression_level),
            ledger: EntryLedger::default(),
        }
    }

    /// Writes the central directory and returns the underlying writer.
    pub fn finish(self) -> ArchiveResult<W> {
        if let Some(current) = self.ledger.in_progress() {
            return Err(ArchiveError::EntryInProgress {
                current: current.to_owned(),
                requested: String::new(),
            });
        }
        self.zip
            .finish()
            .map_err(|source| ArchiveError::UnusableArchive { source, path: None })
    }
}

impl<W: Write> ArchiveWriter for ZipArchiveWriter<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_entry(&mut self, name: &str) -> ArchiveResult<Entry> {
        self.ledger.claim(name)
    }

    fn begin(&mut self, entry: &Entry) -> ArchiveResult<&mut dyn Write> {
        self.ledger.open(entry)?;
        self.zip
            .start_file(entry.name(), entry.is_stored())
            .map_err(|source| ArchiveError::CannotWrite {
                source,
                entry: entry.name().to_owned(),
            })?;
        Ok(&mut self.zip)
    }

    // The zip entry itself is finalized when the next one starts
    fn end(&mut self, entry: &Entry) -> ArchiveResult<()> {
        self.ledger.close(entry)
    }
}
