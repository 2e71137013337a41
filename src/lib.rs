//! # tome
//! An ebook model built around a tree of chapters with typed attributes
//! and lazily-read content, persisted in the PMAB archive format.
//!
//! ## Examples
//! Building a book:
//! ```
//! use tome::Book;
//! use tome::content::Text;
//!
//! let book = Book::with_title("Dawn");
//! book.set_authors(["A. Writer"])?;
//!
//! let part = book.new_chapter("Part 1");
//! let chapter = part.new_chapter("Chapter 1");
//! chapter.set_text(Some(Text::from_string("It was early.")));
//!
//! assert_eq!(1, book.len());
//! assert_eq!(2, chapter.depth());
//! assert!(part.is_section());
//!
//! book.cleanup();
//! # Ok::<(), tome::ebook::errors::ValidationError>(())
//! ```
//! Writing and reading a PMAB archive:
//! ```
//! # use tome::ebook::errors::EbookResult;
//! # fn main() -> EbookResult<()> {
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("dawn.pmab");
//! use tome::pmab::{self, PmabOptions};
//!
//! let book = tome::Book::with_title("Dawn");
//! pmab::make(&book, &path, PmabOptions::default())?;
//!
//! let parsed = pmab::parse(&path, PmabOptions::builder().strict(false))?;
//! assert_eq!(book.title(), parsed.title());
//!
//! parsed.cleanup();
//! # book.cleanup();
//! # Ok(())
//! # }
//! ```

pub mod ebook;
mod parser;
mod util;
mod writer;

pub use self::ebook::book::Book;
pub use self::ebook::chapter::Chapter;
pub use self::ebook::{archive, attributes, content, pmab, variant};

/// Commonly used types, imported with `use tome::prelude::*`.
#[cfg(feature = "prelude")]
pub mod prelude {
    pub use crate::ebook::book::Book;
    pub use crate::ebook::chapter::Chapter;
    pub use crate::ebook::content::{Flob, Text};
    pub use crate::ebook::errors::{EbookError, EbookResult};
    pub use crate::ebook::pmab::{ArchiveKind, PmabOptions};
    pub use crate::ebook::variant::{Registry, Variant, VariantMap};
}
