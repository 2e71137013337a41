//! Standard attribute names and typed accessors on [`Chapter`].
//!
//! Multi-valued string attributes (such as [`AUTHOR`]) are stored as a
//! single string joined with [`VALUES_SEPARATOR`].
//!
//! # Examples
//! ```
//! use tome::Book;
//!
//! let book = Book::with_title("Dawn");
//! book.set_authors(["A. Writer", "B. Editor"])?;
//! book.set_attribute("words", 5200)?;
//!
//! assert_eq!(Some("Dawn".to_owned()), book.title());
//! assert_eq!(vec!["A. Writer", "B. Editor"], book.authors());
//! assert_eq!(Some(5200), book.words());
//!
//! // `words` is bound to `int` by the standard registry
//! assert!(book.set_attribute("words", "many").is_err());
//! # Ok::<(), tome::ebook::errors::ValidationError>(())
//! ```

use crate::ebook::chapter::Chapter;
use crate::ebook::content::{Flob, Text};
use crate::ebook::errors::ValidationError;
use crate::ebook::variant::{DateTime, Locale, Registry, Variant};
use crate::util;

pub const AUTHOR: &str = "author";
pub const COVER: &str = "cover";
pub const DATE: &str = "date";
pub const GENRE: &str = "genre";
pub const INTRO: &str = "intro";
pub const ISBN: &str = "isbn";
pub const KEYWORDS: &str = "keywords";
pub const LANGUAGE: &str = "language";
pub const PRICE: &str = "price";
pub const PUBDATE: &str = "pubdate";
pub const PUBLISHER: &str = "publisher";
pub const RIGHTS: &str = "rights";
pub const SERIES: &str = "series";
pub const STATE: &str = "state";
pub const TITLE: &str = "title";
pub const VENDOR: &str = "vendor";
pub const WORDS: &str = "words";

/// Joins the values of multi-valued attributes.
pub const VALUES_SEPARATOR: &str = ";";

/// Attribute name → type tag bindings of [`Registry::standard`].
#[rustfmt::skip]
pub(crate) const STANDARD_TYPES: &[(&str, &str)] = &[
    (AUTHOR, Registry::STRING),
    (COVER, Registry::FLOB),
    (DATE, Registry::DATETIME),
    (GENRE, Registry::STRING),
    (INTRO, Registry::TEXT),
    (ISBN, Registry::STRING),
    (KEYWORDS, Registry::STRING),
    (LANGUAGE, Registry::LOCALE),
    (PRICE, Registry::REAL),
    (PUBDATE, Registry::DATETIME),
    (PUBLISHER, Registry::STRING),
    (RIGHTS, Registry::STRING),
    (SERIES, Registry::STRING),
    (STATE, Registry::STRING),
    (TITLE, Registry::STRING),
    (VENDOR, Registry::STRING),
    (WORDS, Registry::INTEGER),
];

impl Chapter {
    pub fn title(&self) -> Option<String> {
        self.string_attribute(TITLE)
    }

    /// Sets the title. Titles are always strings, so no validation is needed.
    pub fn set_title(&self, title: impl Into<String>) {
        self.attributes_mut().put(TITLE, title.into());
    }

    /// The [`AUTHOR`] values.
    pub fn authors(&self) -> Vec<String> {
        self.values(AUTHOR)
    }

    pub fn set_authors<I, S>(&self, authors: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_values(AUTHOR, authors)
    }

    pub fn intro(&self) -> Option<Text> {
        self.attribute(INTRO).and_then(|value| value.as_text().cloned())
    }

    pub fn cover(&self) -> Option<Flob> {
        self.attribute(COVER).and_then(|value| value.as_flob().cloned())
    }

    pub fn language(&self) -> Option<Locale> {
        self.attribute(LANGUAGE).and_then(|value| value.as_locale().cloned())
    }

    pub fn date(&self) -> Option<DateTime> {
        self.attribute(DATE).and_then(|value| value.as_datetime().copied())
    }

    pub fn words(&self) -> Option<i64> {
        self.attribute(WORDS).and_then(|value| value.as_integer())
    }

    /// Splits a multi-valued string attribute on [`VALUES_SEPARATOR`].
    ///
    /// Values are trimmed and empty values are skipped.
    pub fn values(&self, name: &str) -> Vec<String> {
        self.string_attribute(name)
            .map(|joined| util::str::split_values(&joined, VALUES_SEPARATOR))
            .unwrap_or_default()
    }

    /// Joins `values` with [`VALUES_SEPARATOR`] and stores them under `name`.
    pub fn set_values<I, S>(&self, name: &str, values: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|value| value.as_ref().trim().to_owned())
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(VALUES_SEPARATOR);

        self.set_attribute(name, joined).map(|_| ())
    }

    fn string_attribute(&self, name: &str) -> Option<String> {
        self.attributes()
            .get(name)
            .and_then(Variant::as_str)
            .map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_round_trip() {
        let chapter = Chapter::new();
        chapter.set_values(KEYWORDS, [" fantasy ", "", "epic"]).unwrap();

        assert_eq!(
            Some(Variant::from("fantasy;epic")),
            chapter.attribute(KEYWORDS)
        );
        assert_eq!(vec!["fantasy", "epic"], chapter.values(KEYWORDS));
        assert!(chapter.values(GENRE).is_empty());
    }

    #[test]
    fn test_typed_accessors_ignore_other_kinds() {
        let chapter = Chapter::with_title("T");
        chapter.set_attribute(WORDS, "not validated here").unwrap();

        assert_eq!(Some("T".to_owned()), chapter.title());
        assert_eq!(None, chapter.words());
        assert_eq!(None, chapter.cover());
    }

    #[test]
    fn test_standard_types_are_registered() {
        let registry = Registry::standard();

        for (name, tag) in STANDARD_TYPES {
            assert_eq!(Some(*tag), registry.attribute_tag(name), "{name}");
            assert!(registry.lookup_kind(*tag).is_some(), "{tag}");
        }
    }
}
