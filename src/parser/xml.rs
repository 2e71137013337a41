use crate::ebook::errors::FormatError;
use crate::parser::ParserResult;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::error::Error;
use std::{io, str};

pub(crate) type ByteReader<'a> = Reader<&'a [u8]>;

pub(crate) fn new_reader(bytes: &[u8]) -> ByteReader<'_> {
    let mut reader = Reader::from_reader(bytes);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = true;
    reader
}

pub(crate) fn unparsable(error: impl Error + Send + Sync + 'static) -> FormatError {
    FormatError::Unparsable(Box::new(error))
}

pub(crate) trait XmlReader<'a> {
    /// Iterator-like method to read the next [`Event`].
    fn next(&mut self) -> Option<ParserResult<Event<'a>>>;

    /// Collects the text content of the element just started,
    /// consuming events up to and including its end tag.
    ///
    /// Nested elements are not expected within text content; their
    /// text is kept while the markup itself is skipped.
    fn get_text(&mut self) -> ParserResult<String> {
        let mut buffer = TextBuffer::default();
        let mut depth = 0usize;

        while let Some(result) = self.next() {
            match result? {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(buffer.finish()),
                Event::End(_) => depth -= 1,
                Event::Text(text) => buffer.push_literal(&text.decode().map_err(unparsable)?),
                Event::CData(cdata) => buffer.push_protected(&cdata.decode().map_err(unparsable)?),
                Event::GeneralRef(reference) => {
                    let name = str::from_utf8(reference.as_ref()).map_err(unparsable)?;

                    match resolve_reference(name) {
                        Some(resolved) => buffer.push_protected(resolved.encode_utf8(&mut [0; 4])),
                        // Unknown entities are kept verbatim
                        None => buffer.push_literal(&format!("&{name};")),
                    }
                }
                _ => {}
            }
        }
        Err(unparsable(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "element text is not closed",
        )))
    }

    /// Skips the element just started, including all descendants.
    fn skip_element(&mut self) -> ParserResult<()> {
        let mut depth = 0usize;

        while let Some(result) = self.next() {
            match result? {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(()),
                Event::End(_) => depth -= 1,
                _ => {}
            }
        }
        Err(unparsable(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "skipped element is not closed",
        )))
    }
}

impl<'a> XmlReader<'a> for ByteReader<'a> {
    fn next(&mut self) -> Option<ParserResult<Event<'a>>> {
        match self.read_event() {
            Ok(Event::Eof) => None,
            result => Some(result.map_err(FormatError::from)),
        }
    }
}

pub(crate) trait XmlElement {
    fn is_local_name(&self, local_name: impl AsRef<[u8]>) -> bool;

    /// The local name as a lossy string, for diagnostics.
    fn local_name_str(&self) -> String;

    /// Returns the unescaped value of the attribute named `key`.
    fn attribute(&self, key: &str) -> ParserResult<Option<String>>;
}

impl XmlElement for BytesStart<'_> {
    fn is_local_name(&self, target_local_name: impl AsRef<[u8]>) -> bool {
        self.local_name().as_ref() == target_local_name.as_ref()
    }

    fn local_name_str(&self) -> String {
        String::from_utf8_lossy(self.local_name().as_ref()).into_owned()
    }

    fn attribute(&self, key: &str) -> ParserResult<Option<String>> {
        let Some(attribute) = self.try_get_attribute(key).map_err(unparsable)? else {
            return Ok(None);
        };

        attribute
            .unescape_value()
            .map(|value| Some(value.into_owned()))
            .map_err(unparsable)
    }
}

/// Resolves predefined entities and character references (`amp`, `#10`, `#x20`).
fn resolve_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => name.strip_prefix('#')?.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Accumulates element text, trimming only literal whitespace at the edges.
///
/// Whitespace produced by character references or CDATA sections is
/// protected, so `&#32;value&#10;` keeps its leading space and trailing newline.
#[derive(Debug, Default)]
pub(crate) struct TextBuffer {
    value: String,
    first_protected: Option<usize>,
    protected_end: usize,
}

impl TextBuffer {
    pub(crate) fn push_literal(&mut self, text: &str) {
        self.value.push_str(text);
    }

    pub(crate) fn push_protected(&mut self, text: &str) {
        self.first_protected.get_or_insert(self.value.len());
        self.value.push_str(text);
        self.protected_end = self.value.len();
    }

    pub(crate) fn finish(self) -> String {
        let value = self.value;
        let start_limit = self.first_protected.unwrap_or(value.len());
        let start = start_limit - value[..start_limit].trim_start().len();
        let end = self.protected_end + value[self.protected_end..].trim_end().len();

        value[start..end.max(start)].to_owned()
    }
}
