use crate::ebook::book::Book;
use crate::ebook::pmab::consts;
use crate::ebook::pmab::writer::{DocumentWriter, PmabWriter};
use crate::writer::WriterResult;
use crate::writer::xml::write_element;
use indexmap::IndexMap;

impl PmabWriter<'_> {
    /// Writes `book.xml`: header metas, book attributes, then extensions.
    pub(super) fn write_metadata(&mut self, book: &Book) -> WriterResult<()> {
        let mut writer = self.new_document()?;
        writer.write_doctype(consts::PBM)?;

        write_element! {
            writer: writer,
            tag: consts::PBM,
            attributes: {
                consts::VERSION => consts::VERSION_3,
                consts::XMLNS => consts::PBM_NAMESPACE,
            }
            inner_content: {
                self.write_head(&mut writer, book)?;

                write_element! {
                    writer: writer,
                    tag: consts::ATTRIBUTES,
                    inner_content: {
                        self.write_items(&mut writer, &book.attributes(), "", |_| false)?;
                    }
                }?;

                write_element! {
                    writer: writer,
                    tag: consts::EXTENSIONS,
                    inner_content: {
                        let extensions = book.extensions();
                        let skip = |key: &str| key.starts_with(consts::META_KEY_PREFIX);
                        self.write_items(&mut writer, &extensions, consts::EXTENSION_PREFIX, skip)?;
                    }
                }?;
            }
        }?;

        self.finish_document(consts::BOOK, writer)
    }

    fn write_head(&self, writer: &mut DocumentWriter, book: &Book) -> WriterResult<()> {
        let metas = self.collect_metas(book);

        if metas.is_empty() {
            return Ok(());
        }

        write_element! {
            writer: writer,
            tag: consts::HEAD,
            inner_content: {
                for (name, value) in &metas {
                    write_element! {
                        writer: writer,
                        tag: consts::META,
                        attributes: {
                            consts::NAME => name.as_str(),
                            consts::VALUE => value.as_str(),
                        }
                    }?;
                }
            }
        }
    }

    /// Header metas carried by `pmab:` extensions, overridden by the configured metas.
    fn collect_metas(&self, book: &Book) -> IndexMap<String, String> {
        let registry = &self.options.registry;
        let mut metas = IndexMap::new();

        for (key, value) in book.extensions().iter() {
            let Some(name) = key.strip_prefix(consts::META_KEY_PREFIX) else {
                continue;
            };
            match registry.render(value, None) {
                Some(rendered) => {
                    metas.insert(name.to_owned(), rendered);
                }
                None => tracing::warn!(key, "skipping non-scalar header meta"),
            }
        }
        for (name, value) in &self.options.meta {
            metas.insert(name.clone(), value.clone());
        }
        metas
    }
}
