use crate::ebook::book::Book;
use crate::ebook::chapter::Chapter;
use crate::ebook::content::{Flob, Text};
use crate::ebook::errors::{EbookResult, PmabError};
use crate::ebook::pmab::consts;
use crate::ebook::pmab::parser::PmabParser;
use crate::ebook::variant::{TypeTag, VariantMap};
use crate::parser::xml::{self, XmlElement, XmlReader};
use quick_xml::events::{BytesStart, Event};

/// Open chapters while reading `content.xml`; the book's root is
/// current when none are open.
struct ChapterStack<'b> {
    root: &'b Chapter,
    open: Vec<Chapter>,
}

impl<'b> ChapterStack<'b> {
    fn current(&self) -> &Chapter {
        self.open.last().unwrap_or(self.root)
    }

    /// Appends a chapter to the current one, opening it unless `is_empty`.
    fn push(&mut self, is_empty: bool) -> EbookResult<()> {
        let attributes = match self.root.attributes().validator() {
            Some(validator) => VariantMap::with_validator(validator.clone()),
            None => VariantMap::new(),
        };
        let chapter = Chapter::from_attributes(attributes);

        self.current().append(chapter.clone())?;
        if !is_empty {
            self.open.push(chapter);
        }
        Ok(())
    }

    fn pop(&mut self) -> EbookResult<()> {
        self.open
            .pop()
            .map(|_| ())
            .ok_or_else(|| PmabError::UnbalancedChapter.into())
    }
}

impl PmabParser<'_> {
    /// Parses `content.xml` into the chapter tree of `book`.
    pub(super) fn parse_contents(&self, book: &Book) -> EbookResult<()> {
        let bytes = self.read_document(consts::CONTENT)?;
        let mut reader = xml::new_reader(&bytes);
        let mut chapters = ChapterStack {
            root: book.root(),
            open: Vec::new(),
        };

        let mut closed = Self::expect_root(&mut reader, consts::CONTENT, consts::PBC)?;

        while !closed && let Some(event) = reader.next() {
            let (element, is_empty) = match event? {
                Event::Start(element) => (element, false),
                Event::Empty(element) => (element, true),
                Event::End(element) => {
                    match element.local_name().as_ref() {
                        name if name == consts::CHAPTER.as_bytes() => chapters.pop()?,
                        name if name == consts::PBC.as_bytes() => closed = true,
                        _ => {}
                    }
                    continue;
                }
                _ => continue,
            };

            if element.is_local_name(consts::CHAPTER) {
                chapters.push(is_empty)?;
            } else if element.is_local_name(consts::ITEM) {
                let text = Self::element_text(&mut reader, is_empty)?;
                let (key, value) = self.parse_item(&element, text)?;

                self.store(&mut chapters.current().attributes_mut(), key, value)?;
            } else if element.is_local_name(consts::CONTENT_ELEMENT) {
                let text = Self::element_text(&mut reader, is_empty)?;
                let content = self.parse_content(&element, text)?;

                chapters.current().set_text(Some(content));
            } else if !element.is_local_name(consts::NAV) {
                tracing::trace!(element = %element.local_name_str(), "skipping element in content.xml");
                if !is_empty {
                    reader.skip_element()?;
                }
            }
        }

        if !chapters.open.is_empty() {
            return Err(PmabError::UnbalancedChapter.into());
        }
        if !closed {
            return Err(Self::truncated(consts::CONTENT).into());
        }
        tracing::debug!(chapters = book.len(), "content.xml parsed");
        Ok(())
    }

    /// `<content type="text/plain;encoding=UTF-8">text/chapter-1.txt</content>`
    ///
    /// Non-text types hold the content inline.
    fn parse_content(&self, element: &BytesStart, text: String) -> EbookResult<Text> {
        let tag = element.attribute(consts::TYPE)?.map(|tag| TypeTag::parse(&tag));

        match tag {
            Some(tag) if tag.is_text() => {
                let flob = Flob::from_archive(self.archive.clone(), text.trim(), Some(tag.main()))?;
                let encoding = self.text_encoding(&tag)?;

                Ok(Text::from_flob(flob, Some(encoding)))
            }
            _ => Ok(Text::from_string(text)),
        }
    }
}
