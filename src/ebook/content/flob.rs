use crate::ebook::archive::errors::ArchiveResult;
use crate::ebook::archive::{ArchiveReader, Entry};
use crate::ebook::content::consts;
use crate::ebook::errors::{ContentError, ContentResult};
use std::fmt::{self, Debug, Formatter};
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A lazily-read, repeatable handle to binary content.
///
/// Construction only records where the content lives; the backing
/// resource is touched when a stream is opened. Each call to
/// [`open_stream`](Self::open_stream) yields the full content from the start.
///
/// Cloning shares the handle. Equality is identity.
///
/// # Examples
/// ```
/// use tome::content::Flob;
///
/// let flob = Flob::from_bytes("cover.png", None, vec![0x89, b'P', b'N', b'G']);
///
/// assert_eq!("image/png", flob.mime());
/// assert_eq!(4, flob.read_bytes()?.len());
/// assert_eq!(4, flob.read_bytes()?.len());
/// # Ok::<(), tome::ebook::errors::ContentError>(())
/// ```
#[derive(Clone)]
pub struct Flob(Rc<FlobData>);

struct FlobData {
    name: String,
    mime: String,
    source: FlobSource,
}

enum FlobSource {
    Archive {
        reader: Rc<dyn ArchiveReader>,
        entry: Entry,
    },
    File(PathBuf),
    Block {
        path: PathBuf,
        offset: u64,
        size: u64,
    },
    Memory(Rc<[u8]>),
}

impl Flob {
    fn new(name: String, mime: Option<&str>, source: FlobSource) -> Self {
        let mime = match mime {
            Some(mime) if !mime.is_empty() => mime.to_owned(),
            _ => consts::mime_for_name(&name).to_owned(),
        };
        Self(Rc::new(FlobData { name, mime, source }))
    }

    /// Binds to the archive entry `name`.
    ///
    /// # Errors
    /// [`ArchiveError::EntryNotFound`](crate::ebook::errors::ArchiveError::EntryNotFound)
    /// if the entry does not exist. This is the only check performed eagerly.
    pub fn from_archive(
        reader: Rc<dyn ArchiveReader>,
        name: &str,
        mime: Option<&str>,
    ) -> ArchiveResult<Self> {
        let entry = reader.entry_for(name).ok_or_else(|| reader.not_found(name))?;

        Ok(Self::new(
            name.to_owned(),
            mime,
            FlobSource::Archive { reader, entry },
        ))
    }

    /// Binds to a file. The file is not checked until read.
    pub fn from_file(path: impl Into<PathBuf>, mime: Option<&str>) -> Self {
        let path = path.into();
        Self::new(path.display().to_string(), mime, FlobSource::File(path))
    }

    /// Binds to `size` bytes of a file starting at `offset`.
    pub fn from_block(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        offset: u64,
        size: u64,
        mime: Option<&str>,
    ) -> Self {
        let source = FlobSource::Block {
            path: path.into(),
            offset,
            size,
        };
        Self::new(name.into(), mime, source)
    }

    /// Wraps in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, mime: Option<&str>, bytes: impl Into<Rc<[u8]>>) -> Self {
        Self::new(name.into(), mime, FlobSource::Memory(bytes.into()))
    }

    /// An empty, nameless flob.
    pub fn empty() -> Self {
        Self::from_bytes("", Some(consts::OCTET_STREAM), Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The explicit MIME, or the one derived from the [name](Self::name)'s extension.
    pub fn mime(&self) -> &str {
        &self.0.mime
    }

    /// Opens a new stream over the full content.
    ///
    /// # Errors
    /// [`ContentError`] if the backing resource cannot be opened.
    pub fn open_stream(&self) -> ContentResult<Box<dyn Read>> {
        let wrap = |source| ContentError::new(self.name(), source);

        match &self.0.source {
            FlobSource::Archive { reader, entry } => reader
                .stream_for(entry)
                .map_err(|error| wrap(io::Error::other(error))),
            FlobSource::File(path) => File::open(path)
                .map(|file| Box::new(BufReader::new(file)) as Box<dyn Read>)
                .map_err(wrap),
            FlobSource::Block { path, offset, size } => {
                open_block(path, *offset, *size).map_err(wrap)
            }
            FlobSource::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
        }
    }

    /// Copies the full content into `sink`, returning the number of bytes written.
    pub fn write_to(&self, sink: &mut dyn Write) -> ContentResult<u64> {
        let mut stream = self.open_stream()?;
        io::copy(&mut stream, sink).map_err(|error| ContentError::new(self.name(), error))
    }

    /// Reads the full content into memory.
    pub fn read_bytes(&self) -> ContentResult<Vec<u8>> {
        if let FlobSource::Memory(bytes) = &self.0.source {
            return Ok(bytes.to_vec());
        }
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Returns `true` if both handles share the same content source.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether reads go through an archive session.
    pub(crate) fn is_archived(&self) -> bool {
        matches!(self.0.source, FlobSource::Archive { .. })
    }
}

fn open_block(path: &Path, offset: u64, size: u64) -> io::Result<Box<dyn Read>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    Ok(Box::new(BufReader::new(file).take(size)))
}

impl PartialEq for Flob {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Flob {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let source = match &self.0.source {
            FlobSource::Archive { reader, .. } => reader.name().to_owned(),
            FlobSource::File(path) | FlobSource::Block { path, .. } => path.display().to_string(),
            FlobSource::Memory(bytes) => format!("<{} bytes>", bytes.len()),
        };

        f.debug_struct("Flob")
            .field("name", &self.0.name)
            .field("mime", &self.0.mime)
            .field("source", &source)
            .finish()
    }
}
