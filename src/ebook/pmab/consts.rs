// Entries
pub(crate) const MIMETYPE: &str = "mimetype";
pub(crate) const BOOK: &str = "book.xml";
pub(crate) const CONTENT: &str = "content.xml";
pub(crate) const TEXT_DIR: &str = "text/";
pub(crate) const RESOURCES_DIR: &str = "resources/";

// Identity
pub(crate) const MIME_PMAB: &str = "application/pmab+zip";
pub(crate) const VERSION_3: &str = "3.0";
pub(crate) const PBM_NAMESPACE: &str = "http://phylame.pw/format/pmab/pbm";
pub(crate) const PBC_NAMESPACE: &str = "http://phylame.pw/format/pmab/pbc";

// Elements
pub(crate) const PBM: &str = "pbm";
pub(crate) const PBC: &str = "pbc";
pub(crate) const HEAD: &str = "head";
pub(crate) const META: &str = "meta";
pub(crate) const ATTRIBUTES: &str = "attributes";
pub(crate) const EXTENSIONS: &str = "extensions";
pub(crate) const NAV: &str = "nav";
pub(crate) const CHAPTER: &str = "chapter";
pub(crate) const ITEM: &str = "item";
pub(crate) const CONTENT_ELEMENT: &str = "content";

// Attributes
pub(crate) const NAME: &str = "name";
pub(crate) const VALUE: &str = "value";
pub(crate) const TYPE: &str = "type";
pub(crate) const VERSION: &str = "version";
pub(crate) const XMLNS: &str = "xmlns";

// Type tag parameters
pub(crate) const FORMAT: &str = "format";
pub(crate) const ENCODING: &str = "encoding";

// Type tag aliases of `datetime`
pub(crate) const DATE_ALIASES: &[&str] = &["date", "time"];

// Entry name prefixes
pub(crate) const CHAPTER_PREFIX: &str = "chapter";
pub(crate) const EXTENSION_PREFIX: &str = "extension-";
/// Entry name (without extension) of the book's own text.
pub(crate) const BOOK_TEXT: &str = "book";
pub(crate) const TEXT_EXTENSION: &str = "txt";

/// Extension keys under this prefix round-trip as `<head>` metas.
pub(crate) const META_KEY_PREFIX: &str = "pmab:";
