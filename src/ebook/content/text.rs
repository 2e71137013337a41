use crate::ebook::content::consts;
use crate::ebook::content::flob::Flob;
use crate::ebook::errors::{ContentError, ContentResult};
use encoding_rs::{Encoding, UTF_8};
use std::fmt::{self, Debug, Formatter};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::rc::Rc;

/// A lazily-read, repeatable handle to textual content.
///
/// Text is either held in memory or decoded on demand from a [`Flob`]
/// using a declared [encoding](Self::encoding). Reading never caches:
/// every [`to_string`](Self::to_string) or [`lines`](Self::lines) call
/// re-reads the source.
///
/// # Examples
/// ```
/// use tome::content::Text;
///
/// let text = Text::from_string("first\nsecond");
/// let lines = text.lines()?.collect::<Result<Vec<_>, _>>()?;
///
/// assert_eq!("plain", text.content_type());
/// assert_eq!(vec!["first", "second"], lines);
/// # Ok::<(), tome::ebook::errors::ContentError>(())
/// ```
#[derive(Clone)]
pub struct Text(Rc<TextData>);

#[derive(Clone)]
struct TextData {
    content_type: String,
    source: TextSource,
}

#[derive(Clone)]
enum TextSource {
    Raw(Rc<str>),
    Flob {
        flob: Flob,
        encoding: &'static Encoding,
    },
}

impl Text {
    /// In-memory plain text.
    pub fn from_string(text: impl Into<String>) -> Self {
        Self(Rc::new(TextData {
            content_type: consts::text::PLAIN.to_owned(),
            source: TextSource::Raw(Rc::from(text.into())),
        }))
    }

    /// Text decoded from `flob` with `encoding` (UTF-8 when [`None`]).
    ///
    /// The content type is `html` for HTML flobs, otherwise `plain`.
    pub fn from_flob(flob: Flob, encoding: Option<&'static Encoding>) -> Self {
        let content_type = match flob.mime().split_once('/') {
            Some((_, sub)) if sub.starts_with(consts::text::HTML) || sub == "xhtml+xml" => {
                consts::text::HTML
            }
            _ => consts::text::PLAIN,
        };

        Self(Rc::new(TextData {
            content_type: content_type.to_owned(),
            source: TextSource::Flob {
                flob,
                encoding: encoding.unwrap_or(UTF_8),
            },
        }))
    }

    pub fn empty() -> Self {
        Self::from_string("")
    }

    /// Returns a copy with the given content type (`plain`, `html`).
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        Rc::make_mut(&mut self.0).content_type = content_type.into();
        self
    }

    /// The content type, such as `plain` or `html`.
    pub fn content_type(&self) -> &str {
        &self.0.content_type
    }

    /// The declared encoding of flob-backed text; [`None`] for in-memory text.
    pub fn encoding(&self) -> Option<&'static Encoding> {
        match &self.0.source {
            TextSource::Flob { encoding, .. } => Some(*encoding),
            TextSource::Raw(_) => None,
        }
    }

    /// The backing flob, if any.
    pub fn flob(&self) -> Option<&Flob> {
        match &self.0.source {
            TextSource::Flob { flob, .. } => Some(flob),
            TextSource::Raw(_) => None,
        }
    }

    pub(crate) fn is_archived(&self) -> bool {
        self.flob().is_some_and(Flob::is_archived)
    }

    /// The name of the backing flob, or an empty string for in-memory text.
    pub fn name(&self) -> &str {
        self.flob().map_or("", Flob::name)
    }

    /// Reads the full text.
    ///
    /// A byte order mark, if present, overrides the declared encoding.
    ///
    /// # Errors
    /// [`ContentError`] if the backing flob cannot be read.
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> ContentResult<String> {
        match &self.0.source {
            TextSource::Raw(text) => Ok(text.to_string()),
            TextSource::Flob { flob, encoding } => {
                let bytes = flob.read_bytes()?;
                let (text, actual, malformed) = encoding.decode(&bytes);

                if malformed {
                    tracing::warn!(
                        name = flob.name(),
                        encoding = actual.name(),
                        "malformed sequences replaced while decoding text"
                    );
                }
                Ok(text.into_owned())
            }
        }
    }

    /// Returns a finite iterator over the lines of the text, without line terminators.
    ///
    /// Each call re-reads the source from the start.
    /// UTF-8 flobs are streamed; other encodings are decoded up front.
    pub fn lines(&self) -> ContentResult<Lines> {
        let inner = match &self.0.source {
            TextSource::Flob { flob, encoding } if *encoding == UTF_8 => LinesInner::Stream {
                name: flob.name().to_owned(),
                lines: BufReader::new(flob.open_stream()?).lines(),
                first: true,
            },
            _ => LinesInner::Buffered(
                self.to_string()?
                    .lines()
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
        };
        Ok(Lines(inner))
    }

    /// Writes the full text into `sink`, returning the number of chars written.
    pub fn write_to(&self, sink: &mut dyn fmt::Write) -> ContentResult<usize> {
        let text = match &self.0.source {
            TextSource::Raw(text) => text.clone(),
            TextSource::Flob { .. } => Rc::from(self.to_string()?),
        };

        sink.write_str(&text)
            .map_err(|_| ContentError::new(self.name(), io::Error::other("formatter error")))?;
        Ok(text.chars().count())
    }

    /// Writes the full text into `sink` encoded as `encoding`,
    /// returning the number of bytes written.
    ///
    /// Encodings that cannot be produced (such as UTF-16) are written
    /// as UTF-8; see [`Encoding::output_encoding`].
    /// Flob-backed text already in the target encoding is copied without decoding.
    pub fn write_encoded(&self, sink: &mut dyn Write, encoding: &'static Encoding) -> ContentResult<u64> {
        let encoding = encoding.output_encoding();

        if let TextSource::Flob { flob, encoding: declared } = &self.0.source
            && *declared == encoding
        {
            return flob.write_to(sink);
        }

        let text = self.to_string()?;
        let (bytes, _, _) = encoding.encode(&text);

        sink.write_all(&bytes)
            .map_err(|error| ContentError::new(self.name(), error))?;
        Ok(bytes.len() as u64)
    }

    /// Returns `true` if both handles share the same content source.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// In-memory texts compare by content; flob-backed texts by identity.
impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0.source, &other.0.source) {
            (TextSource::Raw(a), TextSource::Raw(b)) => {
                a == b && self.0.content_type == other.0.content_type
            }
            _ => self.ptr_eq(other),
        }
    }
}

impl Debug for Text {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Text");
        debug.field("content_type", &self.0.content_type);

        match &self.0.source {
            TextSource::Raw(text) => debug.field("len", &text.len()),
            TextSource::Flob { flob, encoding } => debug
                .field("flob", flob)
                .field("encoding", &encoding.name()),
        }
        .finish()
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Self::from_string(text)
    }
}

impl From<String> for Text {
    fn from(text: String) -> Self {
        Self::from_string(text)
    }
}

/// An iterator over the lines of a [`Text`], created by [`Text::lines`].
pub struct Lines(LinesInner);

enum LinesInner {
    Buffered(std::vec::IntoIter<String>),
    Stream {
        name: String,
        lines: io::Lines<BufReader<Box<dyn Read>>>,
        first: bool,
    },
}

impl Iterator for Lines {
    type Item = ContentResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.0 {
            LinesInner::Buffered(lines) => lines.next().map(Ok),
            LinesInner::Stream { name, lines, first } => {
                let line = lines.next()?;
                let is_first = std::mem::replace(first, false);

                Some(
                    line.map(|line| match line.strip_prefix('\u{feff}') {
                        Some(stripped) if is_first => stripped.to_owned(),
                        _ => line,
                    })
                    .map_err(|error| ContentError::new(name.as_str(), error)),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::GBK;

    #[test]
    fn test_flob_text_rereadable() {
        let flob = Flob::from_bytes("text/c1.txt", None, "line one\r\nline two\n".as_bytes().to_vec());
        let text = Text::from_flob(flob, None);

        for _ in 0..2 {
            assert_eq!("line one\r\nline two\n", text.to_string().unwrap());

            let lines = text.lines().unwrap().collect::<Result<Vec<_>, _>>().unwrap();
            assert_eq!(vec!["line one", "line two"], lines);
        }
    }

    #[test]
    fn test_encoded_flob_text() {
        let (bytes, _, _) = GBK.encode("第一章\n开始");
        let text = Text::from_flob(Flob::from_bytes("c.txt", None, bytes.into_owned()), Some(GBK));

        assert_eq!(Some(GBK), text.encoding());
        assert_eq!("第一章\n开始", text.to_string().unwrap());
        assert_eq!(2, text.lines().unwrap().count());

        let mut utf8 = Vec::new();
        let written = text.write_encoded(&mut utf8, UTF_8).unwrap();
        assert_eq!("第一章\n开始".len() as u64, written);
        assert_eq!("第一章\n开始".as_bytes(), utf8.as_slice());
    }

    #[test]
    fn test_bom_is_stripped() {
        let flob = Flob::from_bytes("bom.txt", None, "\u{feff}title\nbody".as_bytes().to_vec());
        let text = Text::from_flob(flob, None);

        assert_eq!("title", text.lines().unwrap().next().unwrap().unwrap());
        assert_eq!("title\nbody", text.to_string().unwrap());
    }

    #[test]
    fn test_write_to_counts_chars() {
        let text = Text::from_string("héllo");
        let mut out = String::new();

        assert_eq!(5, text.write_to(&mut out).unwrap());
        assert_eq!("héllo", out);
    }

    #[test]
    fn test_content_type() {
        let html = Text::from_flob(Flob::from_bytes("c.html", None, Vec::new()), None);
        let plain = Text::from_string("x");

        assert_eq!("html", html.content_type());
        assert_eq!("plain", plain.content_type());
        assert_eq!("html", plain.with_content_type("html").content_type());
    }

    #[test]
    fn test_equality() {
        assert_eq!(Text::from_string("a"), Text::from_string("a"));
        assert_ne!(Text::from_string("a"), Text::from_string("a").with_content_type("html"));

        let flob = Flob::from_bytes("a.txt", None, b"a".to_vec());
        let text = Text::from_flob(flob.clone(), None);
        assert_eq!(text, text.clone());
        assert_ne!(text, Text::from_flob(flob, None));
    }
}
