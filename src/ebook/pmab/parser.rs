mod contents;
mod metadata;

use crate::ebook::archive::ArchiveReader;
use crate::ebook::book::Book;
use crate::ebook::content::{Flob, Text};
use crate::ebook::errors::{ConversionError, EbookResult, FormatError, PmabError};
use crate::ebook::pmab::{PmabOptions, consts};
use crate::ebook::variant::{Registry, TypeTag, Variant, VariantKind, VariantMap};
use crate::parser::ParserResult;
use crate::parser::xml::{self, ByteReader, XmlElement, XmlReader};
use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::{BytesStart, Event};
use std::io;
use std::rc::Rc;

/// Reads one archive session into a [`Book`].
pub(super) struct PmabParser<'a> {
    options: &'a PmabOptions,
    archive: Rc<dyn ArchiveReader>,
}

impl<'a> PmabParser<'a> {
    pub(super) fn new(options: &'a PmabOptions, archive: Rc<dyn ArchiveReader>) -> Self {
        Self { options, archive }
    }

    pub(super) fn parse(&self, book: &Book) -> EbookResult<()> {
        self.check_mimetype()?;
        self.parse_metadata(book)?;
        self.parse_contents(book)?;

        tracing::debug!(archive = self.archive.name(), "pmab archive parsed");
        Ok(())
    }

    fn check_mimetype(&self) -> EbookResult<()> {
        let bytes = self.read_document(consts::MIMETYPE)?;
        let found = String::from_utf8_lossy(&bytes);
        let found = found.trim();

        if found == consts::MIME_PMAB {
            Ok(())
        } else {
            Err(PmabError::InvalidMimetype {
                expected: consts::MIME_PMAB.to_owned(),
                found: found.to_owned(),
            }
            .into())
        }
    }

    fn read_document(&self, name: &str) -> EbookResult<Vec<u8>> {
        if self.archive.entry_for(name).is_none() {
            return Err(PmabError::MissingDocument(name.to_owned()).into());
        }
        Ok(self.archive.read_entry(name)?)
    }

    /// Consumes events up to the root element of `document`,
    /// checking its name and version.
    /// Reads up to the root element, checking its name and version.
    ///
    /// Returns `true` if the root is self-closing.
    fn expect_root(reader: &mut ByteReader, document: &str, expected: &str) -> ParserResult<bool> {
        while let Some(event) = reader.next() {
            let (root, is_empty) = match event? {
                Event::Start(root) => (root, false),
                Event::Empty(root) => (root, true),
                _ => continue,
            };

            if !root.is_local_name(expected) {
                return Err(PmabError::UnexpectedRoot {
                    document: document.to_owned(),
                    expected: expected.to_owned(),
                    found: root.local_name_str(),
                }
                .into());
            }
            return match root.attribute(consts::VERSION)? {
                Some(version) if version.trim() == consts::VERSION_3 => Ok(is_empty),
                Some(version) => Err(PmabError::UnsupportedVersion {
                    document: document.to_owned(),
                    version,
                }
                .into()),
                None => Err(missing_attribute(expected, consts::VERSION).into()),
            };
        }
        Err(PmabError::MissingDocument(document.to_owned()).into())
    }

    /// The error for a document that ends inside its root element.
    fn truncated(document: &str) -> FormatError {
        xml::unparsable(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{document} ends before its root element is closed"),
        ))
    }

    /// Reads the text of `element`, which is empty for a self-closing element.
    fn element_text(reader: &mut ByteReader, is_empty: bool) -> ParserResult<String> {
        if is_empty {
            Ok(String::new())
        } else {
            reader.get_text()
        }
    }

    /// Parses `<item name="..." type="...">text</item>` into a key and value.
    fn parse_item(&self, item: &BytesStart, text: String) -> EbookResult<(String, Variant)> {
        let name = required_attribute(item, consts::ITEM, consts::NAME)?;
        let tag = item.attribute(consts::TYPE)?;
        let value = self.parse_variant(&name, tag.as_deref(), text)?;

        Ok((name, value))
    }

    /// Stores a parsed value, dropping values rejected by the map's
    /// validator unless parsing is strict.
    fn store(&self, map: &mut VariantMap, key: String, value: Variant) -> EbookResult<()> {
        match map.set(key, value) {
            Ok(_) => Ok(()),
            Err(error) if self.options.strict => Err(error.into()),
            Err(error) => {
                tracing::warn!(%error, "dropping rejected value");
                Ok(())
            }
        }
    }

    fn parse_variant(&self, key: &str, tag: Option<&str>, text: String) -> EbookResult<Variant> {
        let tag = match tag.map(str::trim) {
            Some(tag) if !tag.is_empty() => TypeTag::parse(tag),
            _ => return self.detect_value(key, text),
        };
        let main = tag.main();
        let registry = &self.options.registry;

        if main.eq_ignore_ascii_case(Registry::DATETIME)
            || consts::DATE_ALIASES.iter().any(|alias| main.eq_ignore_ascii_case(alias))
        {
            let format = self.options.date_format.as_deref().or(tag.param(consts::FORMAT));
            let tag = match format {
                Some(format) => TypeTag::new(Registry::DATETIME).with_param(consts::FORMAT, format),
                None => TypeTag::new(Registry::DATETIME),
            };
            self.convert(key, &text, registry.parse(&text, tag))
        } else if tag.is_text() {
            let flob = Flob::from_archive(self.archive.clone(), text.trim(), Some(main))?;
            let encoding = self.text_encoding(&tag)?;

            Ok(Text::from_flob(flob, Some(encoding)).into())
        } else if main == Registry::STRING {
            self.detect_value(key, text)
        } else if registry.lookup_kind(main).is_some() {
            self.convert(key, &text, registry.parse(&text, &tag))
        } else if tag.is_mime() {
            Ok(Flob::from_archive(self.archive.clone(), text.trim(), Some(main))?.into())
        } else {
            tracing::debug!(key, tag = %tag, "unknown type tag");
            self.detect_value(key, text)
        }
    }

    /// Values without an explicit type follow the type bound to their
    /// attribute name. Binary attributes cannot be inlined, so they stay strings.
    fn detect_value(&self, key: &str, text: String) -> EbookResult<Variant> {
        let registry = &self.options.registry;

        match registry.attribute_tag(key) {
            Some(tag) if registry.lookup_kind(tag).is_some_and(|kind| kind != VariantKind::Flob) => {
                self.convert(key, &text, registry.parse(&text, tag))
            }
            _ => Ok(Variant::String(text)),
        }
    }

    /// Applies the strictness policy to a conversion result.
    fn convert(
        &self,
        key: &str,
        text: &str,
        result: Result<Variant, ConversionError>,
    ) -> EbookResult<Variant> {
        match result {
            Ok(value) => Ok(value),
            Err(error) if self.options.strict => Err(error.with_key(key).into()),
            Err(error) => {
                tracing::warn!(key, tag = error.tag(), "keeping unconvertible value as a string");
                Ok(Variant::from(text))
            }
        }
    }

    /// The configured encoding, otherwise the `encoding` parameter of `tag`.
    fn text_encoding(&self, tag: &TypeTag) -> EbookResult<&'static Encoding> {
        if let Some(encoding) = self.options.text_encoding {
            return Ok(encoding);
        }
        let Some(label) = tag.param(consts::ENCODING) else {
            return Ok(UTF_8);
        };

        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => Ok(encoding),
            None if self.options.strict => Err(PmabError::InvalidEncoding(label.to_owned()).into()),
            None => {
                tracing::warn!(label, "unknown text encoding, using UTF-8");
                Ok(UTF_8)
            }
        }
    }
}

fn required_attribute(element: &BytesStart, tag: &str, attribute: &str) -> EbookResult<String> {
    element
        .attribute(attribute)?
        .ok_or_else(|| missing_attribute(tag, attribute).into())
}

fn missing_attribute(element: &str, attribute: &str) -> PmabError {
    PmabError::MissingAttribute {
        element: element.to_owned(),
        attribute: attribute.to_owned(),
    }
}
