use crate::ebook::book::Book;
use crate::ebook::errors::EbookResult;
use crate::ebook::pmab::consts;
use crate::ebook::pmab::parser::{PmabParser, required_attribute};
use crate::parser::xml::{self, XmlElement, XmlReader};
use quick_xml::events::Event;

/// The `book.xml` section the reader is in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Section {
    Root,
    Head,
    Attributes,
    Extensions,
}

impl Section {
    fn of(name: &[u8]) -> Option<Self> {
        match name {
            name if name == consts::HEAD.as_bytes() => Some(Self::Head),
            name if name == consts::ATTRIBUTES.as_bytes() => Some(Self::Attributes),
            name if name == consts::EXTENSIONS.as_bytes() => Some(Self::Extensions),
            _ => None,
        }
    }
}

impl PmabParser<'_> {
    /// Parses `book.xml` into the attributes and extensions of `book`.
    pub(super) fn parse_metadata(&self, book: &Book) -> EbookResult<()> {
        let bytes = self.read_document(consts::BOOK)?;
        let mut reader = xml::new_reader(&bytes);
        let mut section = Section::Root;

        let mut closed = Self::expect_root(&mut reader, consts::BOOK, consts::PBM)?;

        while !closed && let Some(event) = reader.next() {
            let (element, is_empty) = match event? {
                Event::Start(element) => (element, false),
                Event::Empty(element) => (element, true),
                Event::End(element) => {
                    if element.local_name().as_ref() == consts::PBM.as_bytes() {
                        closed = true;
                    } else if Section::of(element.local_name().as_ref()) == Some(section) {
                        section = Section::Root;
                    }
                    continue;
                }
                _ => continue,
            };

            match (section, Section::of(element.local_name().as_ref())) {
                (Section::Root, Some(entered)) if !is_empty => section = entered,
                (Section::Root, Some(_)) => {}
                (Section::Head, _) if element.is_local_name(consts::META) => {
                    let name = required_attribute(&element, consts::META, consts::NAME)?;
                    let value = required_attribute(&element, consts::META, consts::VALUE)?;

                    book.extensions_mut()
                        .put(format!("{}{name}", consts::META_KEY_PREFIX), value);
                    if !is_empty {
                        reader.skip_element()?;
                    }
                }
                (Section::Attributes | Section::Extensions, _) if element.is_local_name(consts::ITEM) => {
                    let text = Self::element_text(&mut reader, is_empty)?;
                    let (key, value) = self.parse_item(&element, text)?;

                    if section == Section::Attributes {
                        self.store(&mut book.attributes_mut(), key, value)?;
                    } else {
                        self.store(&mut book.extensions_mut(), key, value)?;
                    }
                }
                _ => {
                    tracing::trace!(element = %element.local_name_str(), "skipping element in book.xml");
                    if !is_empty {
                        reader.skip_element()?;
                    }
                }
            }
        }

        if !closed {
            return Err(Self::truncated(consts::BOOK).into());
        }
        tracing::debug!(
            attributes = book.attributes().len(),
            extensions = book.extensions().len(),
            "book.xml parsed"
        );
        Ok(())
    }
}
