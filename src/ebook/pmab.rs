//! PMAB: the archive-backed persistence format of a [`Book`].
//!
//! # Layout
//! ```text
//! mimetype                  application/pmab+zip (stored)
//! book.xml                  <pbm version="3.0">: header metas, attributes, extensions
//! content.xml               <pbc version="3.0">: the chapter tree
//! text/<name>.<ext>         text bodies
//! resources/<name>.<ext>    binary bodies
//! ```
//!
//! Every value is written as `<item name="..." type="...">` where `type` is a
//! type tag understood by the book's [`Registry`]. Lazy [`Text`](crate::content::Text)
//! and [`Flob`](crate::content::Flob) values are written to their own entries and
//! the item holds the entry name.
//!
//! # Examples
//! - Writing and reading back a book:
//! ```
//! # use tome::ebook::errors::EbookResult;
//! use tome::content::Text;
//! use tome::{Book, pmab};
//!
//! # fn main() -> EbookResult<()> {
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("dawn.pmab");
//! let book = Book::with_title("Dawn");
//! let chapter = book.new_chapter("Chapter 1");
//! chapter.set_text(Some(Text::from_string("It was early.")));
//!
//! pmab::make(&book, &path, pmab::PmabOptions::default())?;
//!
//! let parsed = pmab::parse(&path, pmab::PmabOptions::default())?;
//! let text = parsed.get(0).and_then(|chapter| chapter.text()).unwrap();
//!
//! assert_eq!(Some("Dawn".to_owned()), parsed.title());
//! assert_eq!("It was early.", text.to_string()?);
//!
//! // Releases the archive backing the lazy text
//! parsed.cleanup();
//! # book.cleanup();
//! # Ok(())
//! # }
//! ```

pub mod errors;
mod consts;
mod parser;
mod writer;

use crate::ebook::archive::{
    self, ArchiveReader, DirectoryArchiveWriter, ZipArchiveReader, ZipArchiveWriter,
};
use crate::ebook::book::Book;
use crate::ebook::errors::EbookResult;
use crate::ebook::pmab::parser::PmabParser;
use crate::ebook::pmab::writer::PmabWriter;
use crate::ebook::variant::Registry;
use encoding_rs::Encoding;
use indexmap::IndexMap;
use std::fs;
use std::io::{self, BufWriter, Cursor, IntoInnerError, Read, Seek, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reads the PMAB archive at `path`, which may be a zip file or a directory.
///
/// The returned book reads its text and resources lazily from the archive,
/// which stays open until [`Book::cleanup`] is called.
///
/// # Errors
/// - [`EbookError::Format`](crate::ebook::errors::EbookError::Format):
///   The mimetype, a document root, or its version is invalid.
/// - [`EbookError::Conversion`](crate::ebook::errors::EbookError::Conversion):
///   An item cannot be converted to its type while [`PmabOptions::strict`] is set.
/// - [`EbookError::Archive`](crate::ebook::errors::EbookError::Archive):
///   The archive or a referenced entry cannot be read.
///
/// No partially parsed book is returned on error.
pub fn parse(path: impl AsRef<Path>, options: impl Into<PmabOptions>) -> EbookResult<Book> {
    let path = path.as_ref();
    let archive = archive::open_reader(path)?;

    tracing::debug!(path = %path.display(), "parsing pmab archive");
    parse_archive(archive, &options.into())
}

/// Reads a zipped PMAB archive from any implementation of [`Read`] + [`Seek`].
///
/// See [`parse`] for errors and the archive lifetime.
pub fn parse_from<R: Read + Seek + 'static>(
    reader: R,
    options: impl Into<PmabOptions>,
) -> EbookResult<Book> {
    let archive: Rc<dyn ArchiveReader> = Rc::new(ZipArchiveReader::new(reader, None)?);
    parse_archive(archive, &options.into())
}

fn parse_archive(archive: Rc<dyn ArchiveReader>, options: &PmabOptions) -> EbookResult<Book> {
    let book = Book::with_registry(options.registry.clone());

    match PmabParser::new(options, archive.clone()).parse(&book) {
        Ok(()) => {
            book.add_cleanup(move |_| archive.close());
            Ok(book)
        }
        Err(error) => {
            tracing::debug!(archive = archive.name(), %error, "discarding partially parsed book");
            book.cleanup();
            archive.close();
            Err(error)
        }
    }
}

/// Writes `book` to `path` as [`PmabOptions::archive_kind`] dictates.
///
/// Output is staged beside `path` and only moved into place once the
/// whole archive is written, so a failed or [cancelled](CancellationToken)
/// write leaves no partial archive behind.
///
/// A directory target must be empty or absent.
pub fn make(book: &Book, path: impl AsRef<Path>, options: impl Into<PmabOptions>) -> EbookResult<()> {
    let options = options.into();
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    tracing::debug!(path = %path.display(), kind = ?options.archive_kind, "writing pmab archive");

    match options.archive_kind {
        ArchiveKind::Zip => {
            let staged = BufWriter::new(tempfile::NamedTempFile::new_in(parent)?);
            let mut archive =
                ZipArchiveWriter::new(staged, path.display().to_string(), options.compression_level);

            PmabWriter::new(&options, &mut archive).write(book)?;

            let staged = archive.finish()?.into_inner().map_err(IntoInnerError::into_error)?;
            staged.persist(path).map_err(io::Error::from)?;
        }
        ArchiveKind::Directory => {
            if path.is_dir() && fs::read_dir(path)?.next().is_some() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("`{}` is not an empty directory", path.display()),
                )
                .into());
            }
            let staged = tempfile::Builder::new().prefix(".pmab-").tempdir_in(parent)?;
            let mut archive = DirectoryArchiveWriter::new(staged.path())?;

            PmabWriter::new(&options, &mut archive).write(book)?;
            archive.finish()?;

            if path.is_dir() {
                fs::remove_dir(path)?;
            }
            fs::rename(staged.path(), path)?;
            // Moved into place; nothing is left to delete
            let _ = staged.keep();
        }
    }
    Ok(())
}

/// Writes `book` as a zipped PMAB archive into `writer`, returning it.
///
/// The archive is staged in memory and copied into `writer` only once
/// complete. [`PmabOptions::archive_kind`] is ignored.
pub fn make_to<W: Write>(book: &Book, mut writer: W, options: impl Into<PmabOptions>) -> EbookResult<W> {
    let options = options.into();
    let mut archive = ZipArchiveWriter::new(Cursor::new(Vec::new()), "<stream>", options.compression_level);

    PmabWriter::new(&options, &mut archive).write(book)?;

    let staged = archive.finish()?.into_inner();
    writer.write_all(&staged)?;
    writer.flush()?;
    Ok(writer)
}

/// The container an archive is written to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ArchiveKind {
    /// A single zip file.
    #[default]
    Zip,
    /// A plain directory tree with the same entry layout.
    Directory,
}

/// A cooperative cancellation flag shared between threads.
///
/// Writes poll the token before each chapter and abort with
/// [`EbookError::Cancelled`](crate::ebook::errors::EbookError::Cancelled).
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Settings used when [parsing](parse) and [making](make) PMAB archives.
///
/// To create a settings instance, see
/// [`PmabOptions::builder`] or [`PmabOptions::default`].
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct PmabOptions {
    /// The encoding of text entries.
    ///
    /// When writing, [`None`] writes UTF-8.
    /// When parsing, an explicit encoding overrides the encoding
    /// recorded for each text entry.
    ///
    /// Default: [`None`]
    pub text_encoding: Option<&'static Encoding>,
    /// The pattern used for datetime items, such as `yyyy-MM-dd`.
    ///
    /// When writing, [`None`] writes ISO-8601 (`yyyy-MM-dd'T'HH:mm:ssXXX`).
    /// When parsing, an explicit pattern overrides the pattern recorded
    /// for each item.
    ///
    /// Default: [`None`]
    pub date_format: Option<String>,
    /// The container written by [`make`].
    /// When parsing a path, a directory always opens as a directory archive.
    ///
    /// Default: [`ArchiveKind::Zip`]
    pub archive_kind: ArchiveKind,
    /// Indentation for written XML documents, such as `"  "`.
    ///
    /// Default: [`None`] (compact)
    pub xml_indent: Option<String>,
    /// Deflate level of zip entries; `0` stores entries uncompressed.
    ///
    /// Default: [`None`] (the deflate default)
    pub compression_level: Option<u8>,
    /// Header metas written into `book.xml`.
    ///
    /// Extensions keyed `pmab:<name>` are written as header metas as well,
    /// and parsed header metas are kept as such extensions.
    /// Entries here take precedence.
    ///
    /// Default: empty
    pub meta: IndexMap<String, String>,
    /// When set to `true`, parsing fails on:
    /// - Items that cannot be converted to their declared type.
    /// - Values rejected by the attribute type table of [`Self::registry`].
    /// - Unknown text encodings.
    ///
    /// Otherwise, such items fall back to strings, are dropped,
    /// or use UTF-8 respectively, with a logged warning.
    ///
    /// Default: `true`
    pub strict: bool,
    /// Type tags, converters, and attribute types used for both directions.
    ///
    /// Default: [`Registry::standard`]
    pub registry: Rc<Registry>,
    /// Cancels an in-progress [`make`].
    ///
    /// Default: [`None`]
    pub cancellation: Option<CancellationToken>,
}

impl PmabOptions {
    /// Returns a builder to create a [`PmabOptions`] instance.
    pub fn builder() -> PmabOptionsBuilder {
        PmabOptionsBuilder(Self::default())
    }
}

impl Default for PmabOptions {
    fn default() -> Self {
        Self {
            text_encoding: None,
            date_format: None,
            archive_kind: ArchiveKind::Zip,
            xml_indent: None,
            compression_level: None,
            meta: IndexMap::new(),
            strict: true,
            registry: Rc::new(Registry::standard()),
            cancellation: None,
        }
    }
}

impl From<PmabOptionsBuilder> for PmabOptions {
    fn from(value: PmabOptionsBuilder) -> Self {
        value.build()
    }
}

/// Builder to construct a [`PmabOptions`] instance.
///
/// # Examples
/// - Writing a directory archive with GBK text and a header meta:
/// ```
/// # use tome::ebook::errors::EbookResult;
/// use tome::{Book, pmab};
/// use tome::pmab::{ArchiveKind, PmabOptions};
///
/// # fn main() -> EbookResult<()> {
/// # let dir = tempfile::tempdir()?;
/// # let path = dir.path().join("dawn");
/// let book = Book::with_title("Dawn");
///
/// pmab::make(
///     &book,
///     &path,
///     PmabOptions::builder()
///         .archive_kind(ArchiveKind::Directory)
///         .text_encoding(encoding_rs::GBK)
///         .meta("generator", "tome")
///         .xml_indent("  "),
/// )?;
///
/// assert!(path.join("book.xml").is_file());
/// # book.cleanup();
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PmabOptionsBuilder(PmabOptions);

impl PmabOptionsBuilder {
    /// Turn this builder into a [`PmabOptions`] instance.
    pub fn build(self) -> PmabOptions {
        self.0
    }

    /// See [`PmabOptions::text_encoding`].
    pub fn text_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.0.text_encoding = Some(encoding);
        self
    }

    /// See [`PmabOptions::date_format`].
    pub fn date_format(mut self, pattern: impl Into<String>) -> Self {
        self.0.date_format = Some(pattern.into());
        self
    }

    /// See [`PmabOptions::archive_kind`].
    pub fn archive_kind(mut self, kind: ArchiveKind) -> Self {
        self.0.archive_kind = kind;
        self
    }

    /// See [`PmabOptions::xml_indent`].
    pub fn xml_indent(mut self, indent: impl Into<String>) -> Self {
        self.0.xml_indent = Some(indent.into());
        self
    }

    /// See [`PmabOptions::compression_level`].
    pub fn compression_level(mut self, level: u8) -> Self {
        self.0.compression_level = Some(level);
        self
    }

    /// Adds a header meta. See [`PmabOptions::meta`].
    pub fn meta(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.meta.insert(name.into(), value.into());
        self
    }

    /// See [`PmabOptions::strict`].
    pub fn strict(mut self, strict: bool) -> Self {
        self.0.strict = strict;
        self
    }

    /// See [`PmabOptions::registry`].
    pub fn registry(mut self, registry: Rc<Registry>) -> Self {
        self.0.registry = registry;
        self
    }

    /// See [`PmabOptions::cancellation`].
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.0.cancellation = Some(token);
        self
    }
}
