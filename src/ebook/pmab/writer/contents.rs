use crate::ebook::book::Book;
use crate::ebook::chapter::Chapter;
use crate::ebook::content::Text;
use crate::ebook::pmab::consts;
use crate::ebook::pmab::writer::{DocumentWriter, PmabWriter};
use crate::writer::WriterResult;
use crate::writer::xml::write_element;

impl PmabWriter<'_> {
    /// Writes `content.xml`: the book's own text, then the chapter tree.
    pub(super) fn write_contents(&mut self, book: &Book) -> WriterResult<()> {
        let mut writer = self.new_document()?;
        writer.write_doctype(consts::PBC)?;

        write_element! {
            writer: writer,
            tag: consts::PBC,
            attributes: {
                consts::VERSION => consts::VERSION_3,
                consts::XMLNS => consts::PBC_NAMESPACE,
            }
            inner_content: {
                write_element! {
                    writer: writer,
                    tag: consts::NAV,
                    inner_content: {
                        if let Some(text) = book.text() {
                            self.write_content(&mut writer, &text, consts::BOOK_TEXT)?;
                        }
                        for (index, chapter) in book.iter().enumerate() {
                            let prefix = format!("{}-{}", consts::CHAPTER_PREFIX, index + 1);
                            self.write_chapter(&mut writer, &chapter, &prefix)?;
                        }
                    }
                }?;
            }
        }?;

        self.finish_document(consts::CONTENT, writer)
    }

    /// Writes `chapter` and its descendants depth-first.
    ///
    /// `prefix` numbers the chapter by position within each ancestor,
    /// such as `chapter-1-2` for the second child of the first chapter.
    fn write_chapter(
        &mut self,
        writer: &mut DocumentWriter,
        chapter: &Chapter,
        prefix: &str,
    ) -> WriterResult<()> {
        self.check_cancelled()?;

        write_element! {
            writer: writer,
            tag: consts::CHAPTER,
            inner_content: {
                let item_prefix = format!("{prefix}-");
                self.write_items(writer, &chapter.attributes(), &item_prefix, |_| false)?;

                if let Some(text) = chapter.text() {
                    self.write_content(writer, &text, prefix)?;
                }
                for (index, child) in chapter.iter().enumerate() {
                    self.write_chapter(writer, &child, &format!("{prefix}-{}", index + 1))?;
                }
            }
        }?;

        tracing::trace!(chapter = prefix, "chapter written");
        Ok(())
    }

    fn write_content(&mut self, writer: &mut DocumentWriter, text: &Text, stem: &str) -> WriterResult<()> {
        let (tag, name) = self.write_text(text, stem)?;

        write_element! {
            writer: writer,
            tag: consts::CONTENT_ELEMENT,
            text: &name,
            attributes: {
                consts::TYPE => tag.as_str(),
            }
        }
    }
}
