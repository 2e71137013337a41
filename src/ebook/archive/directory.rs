use crate::ebook::archive::errors::{ArchiveError, ArchiveResult};
use crate::ebook::archive::{ArchiveReader, ArchiveWriter, Entry, EntryLedger};
use crate::util;
use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Reads entries from a directory tree, where entry `a/b.txt` maps to
/// the file `<root>/a/b.txt`.
#[derive(Debug)]
pub struct DirectoryArchiveReader {
    root: PathBuf,
    name: String,
    closed: Cell<bool>,
}

impl DirectoryArchiveReader {
    pub fn new(dir: &Path) -> ArchiveResult<Self> {
        match dir.canonicalize() {
            Ok(root) if root.is_dir() => Ok(Self {
                name: dir.display().to_string(),
                root,
                closed: Cell::new(false),
            }),
            Ok(_) => Err(ArchiveError::UnusableArchive {
                path: Some(dir.to_path_buf()),
                source: io::Error::from(io::ErrorKind::NotADirectory),
            }),
            Err(source) => Err(ArchiveError::UnusableArchive {
                path: Some(dir.to_path_buf()),
                source,
            }),
        }
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !util::uri::is_contained(name) {
            return None;
        }
        let resolved = self.root.join(name).canonicalize().ok()?;

        // Path traversal mitigation (symlinks pointing outside the root)
        (resolved.starts_with(&self.root) && resolved.is_file()).then_some(resolved)
    }
}

impl ArchiveReader for DirectoryArchiveReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn entry_for(&self, name: &str) -> Option<Entry> {
        self.resolve(name).map(|_| Entry::new(name))
    }

    fn stream_for(&self, entry: &Entry) -> ArchiveResult<Box<dyn Read>> {
        if self.closed.get() {
            return Err(ArchiveError::Closed(self.name.clone()));
        }
        let path = self
            .resolve(entry.name())
            .ok_or_else(|| self.not_found(entry.name()))?;

        File::open(path)
            .map(|file| Box::new(BufReader::new(file)) as Box<dyn Read>)
            .map_err(|source| ArchiveError::CannotRead {
                source,
                entry: entry.name().to_owned(),
            })
    }

    fn close(&self) {
        self.closed.set(true);
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// Writes entries as files under a root directory, creating
/// intermediate directories as needed.
#[derive(Debug)]
pub struct DirectoryArchiveWriter {
    root: PathBuf,
    name: String,
    ledger: EntryLedger,
    current: Option<BufWriter<File>>,
}

impl DirectoryArchiveWriter {
    /// Creates `root` if it does not exist.
    pub fn new(root: &Path) -> ArchiveResult<Self> {
        fs::create_dir_all(root).map_err(|source| ArchiveError::UnusableArchive {
            source,
            path: Some(root.to_path_buf()),
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            name: root.display().to_string(),
            ledger: EntryLedger::default(),
            current: None,
        })
    }

    /// Ends the session and returns the root directory.
    pub fn finish(self) -> ArchiveResult<PathBuf> {
        match self.ledger.in_progress() {
            Some(current) => Err(ArchiveError::EntryInProgress {
                current: current.to_owned(),
                requested: String::new(),
            }),
            None => Ok(self.root),
        }
    }
}

impl ArchiveWriter for DirectoryArchiveWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_entry(&mut self, name: &str) -> ArchiveResult<Entry> {
        self.ledger.claim(name)
    }

    fn begin(&mut self, entry: &Entry) -> ArchiveResult<&mut dyn Write> {
        self.ledger.open(entry)?;

        let cannot_write = |source| ArchiveError::CannotWrite {
            source,
            entry: entry.name().to_owned(),
        };
        let path = self.root.join(entry.name());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(cannot_write)?;
        }
        let file = File::create(&path).map_err(cannot_write)?;

        Ok(self.current.insert(BufWriter::new(file)))
    }

    fn end(&mut self, entry: &Entry) -> ArchiveResult<()> {
        self.ledger.close(entry)?;

        match self.current.take() {
            Some(mut file) => file.flush().map_err(|source| ArchiveError::CannotWrite {
                source,
                entry: entry.name().to_owned(),
            }),
            None => Ok(()),
        }
    }
}
