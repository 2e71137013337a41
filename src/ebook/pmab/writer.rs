mod contents;
mod metadata;

use crate::ebook::archive::{self, ArchiveWriter};
use crate::ebook::book::Book;
use crate::ebook::content::consts as content_consts;
use crate::ebook::content::{Flob, Text};
use crate::ebook::errors::EbookError;
use crate::ebook::pmab::{PmabOptions, consts};
use crate::ebook::variant::datetime::ISO_FORMAT;
use crate::ebook::variant::{Registry, TypeTag, Variant, VariantMap};
use crate::util;
use crate::writer::WriterResult;
use crate::writer::xml::{XmlWriter, write_element};
use encoding_rs::{Encoding, UTF_8};
use std::io::Write;

type DocumentWriter = XmlWriter<'static, Vec<u8>>;

/// Writes one [`Book`] into one archive session.
///
/// XML documents are staged in memory while the text and resource
/// entries they reference are written, since only one archive entry
/// may be open at a time.
pub(super) struct PmabWriter<'a> {
    options: &'a PmabOptions,
    archive: &'a mut dyn ArchiveWriter,
}

impl<'a> PmabWriter<'a> {
    pub(super) fn new(options: &'a PmabOptions, archive: &'a mut dyn ArchiveWriter) -> Self {
        Self { options, archive }
    }

    pub(super) fn write(mut self, book: &Book) -> WriterResult<()> {
        self.write_mimetype()?;
        self.write_metadata(book)?;
        self.write_contents(book)?;

        tracing::debug!(archive = self.archive.name(), "pmab archive written");
        Ok(())
    }

    fn write_mimetype(&mut self) -> WriterResult<()> {
        // Stored so the marker is readable at a fixed offset
        let entry = self.archive.new_stored_entry(consts::MIMETYPE)?;

        archive::write_entry(self.archive, entry, |sink| {
            sink.write_all(consts::MIME_PMAB.as_bytes())?;
            Ok(())
        })
    }

    fn new_document(&self) -> WriterResult<DocumentWriter> {
        let mut writer = XmlWriter::new(Vec::new(), self.options.xml_indent.as_deref());
        writer.write_utf8_declaration()?;
        Ok(writer)
    }

    fn finish_document(&mut self, name: &str, writer: DocumentWriter) -> WriterResult<()> {
        let bytes = writer.into_inner();
        let entry = self.archive.new_entry(name)?;

        archive::write_entry(self.archive, entry, |sink| {
            sink.write_all(&bytes)?;
            Ok(())
        })
    }

    fn text_encoding(&self) -> &'static Encoding {
        self.options.text_encoding.unwrap_or(UTF_8)
    }

    fn date_format(&self) -> &str {
        self.options.date_format.as_deref().unwrap_or(ISO_FORMAT)
    }

    /// Writes every entry of `map` as an `<item>`, naming referenced
    /// entries after `prefix` followed by the key.
    fn write_items(
        &mut self,
        writer: &mut DocumentWriter,
        map: &VariantMap,
        prefix: &str,
        skip: impl Fn(&str) -> bool,
    ) -> WriterResult<()> {
        for (key, value) in map.iter().filter(|(key, _)| !skip(key)) {
            let (tag, text) = self.resolve_item(key, value, prefix)?;

            write_element! {
                writer: writer,
                tag: consts::ITEM,
                text: &text,
                attributes: {
                    consts::NAME => key,
                    consts::TYPE => tag.as_str(),
                }
            }?;
        }
        Ok(())
    }

    /// Resolves the `type` attribute and the element text of an item,
    /// writing lazy values into their own entries.
    fn resolve_item(&mut self, key: &str, value: &Variant, prefix: &str) -> WriterResult<(String, String)> {
        let stem = format!("{prefix}{}", util::uri::encode_segment(key));

        match value {
            Variant::Text(text) => self.write_text(text, &stem),
            Variant::Flob(flob) => self.write_flob(flob, &stem),
            Variant::DateTime(datetime) => Ok((
                TypeTag::new(Registry::DATETIME)
                    .with_param(consts::FORMAT, self.date_format())
                    .to_string(),
                datetime.format(self.date_format()),
            )),
            _ => {
                let registry = &self.options.registry;
                let tag = registry.lookup_tag(value).unwrap_or(Registry::STRING).to_owned();
                let text = registry
                    .render(value, Some(self.date_format()))
                    .unwrap_or_default();
                Ok((tag, text))
            }
        }
    }

    /// Writes `text` to `text/<stem>.<ext>`, returning its type tag and entry name.
    fn write_text(&mut self, text: &Text, stem: &str) -> WriterResult<(String, String)> {
        // Encodings such as UTF-16 are written as UTF-8
        let encoding = self.text_encoding().output_encoding();
        let extension = match text.content_type() {
            content_consts::text::PLAIN => consts::TEXT_EXTENSION,
            other => other,
        };
        let name = format!("{}{stem}.{extension}", consts::TEXT_DIR);
        let entry = self.archive.new_entry(&name)?;

        archive::write_entry(self.archive, entry, |sink| {
            text.write_encoded(sink, encoding)?;
            Ok(())
        })?;

        let tag = TypeTag::new(format!("text/{}", text.content_type()))
            .with_param(consts::ENCODING, encoding.name());
        Ok((tag.to_string(), name))
    }

    /// Writes `flob` to `resources/<stem>.<ext>`, returning its MIME and entry name.
    fn write_flob(&mut self, flob: &Flob, stem: &str) -> WriterResult<(String, String)> {
        let extension = util::uri::extension(flob.name())
            .unwrap_or_else(|| content_consts::extension_for_mime(flob.mime()));
        let name = format!("{}{stem}.{extension}", consts::RESOURCES_DIR);
        let entry = self.archive.new_entry(&name)?;

        archive::write_entry(self.archive, entry, |sink| {
            flob.write_to(sink)?;
            Ok(())
        })?;

        Ok((flob.mime().to_owned(), name))
    }

    fn check_cancelled(&self) -> WriterResult<()> {
        match &self.options.cancellation {
            Some(token) if token.is_cancelled() => {
                tracing::debug!(archive = self.archive.name(), "pmab write cancelled");
                Err(EbookError::Cancelled)
            }
            _ => Ok(()),
        }
    }
}
