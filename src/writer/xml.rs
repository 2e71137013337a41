use crate::writer::WriterResult;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use std::borrow::Cow;
use std::io::Write;

/// Event-level XML output with a single pending start tag, so attributes can
/// be added before deciding whether the element is empty, textual, or a parent.
pub(crate) struct XmlWriter<'a, W> {
    writer: quick_xml::Writer<W>,
    pending: Option<BytesStart<'a>>,
}

impl<'a, W: Write> XmlWriter<'a, W> {
    /// Creates a writer that indents nested elements with `indent`
    /// (such as `"  "` or `"\t"`), or writes compact output when [`None`].
    pub(crate) fn new(inner: W, indent: Option<&str>) -> Self {
        let writer = match indent.and_then(|indent| indent.bytes().next().zip(Some(indent.len()))) {
            Some((byte, width)) => quick_xml::Writer::new_with_indent(inner, byte, width),
            None => quick_xml::Writer::new(inner),
        };

        Self {
            writer,
            pending: None,
        }
    }

    /// Writes `<?xml version="1.0" encoding="UTF-8"?>`.
    pub(crate) fn write_utf8_declaration(&mut self) -> WriterResult<&mut Self> {
        let declaration = BytesDecl::new("1.0", Some("UTF-8"), None);
        self.writer.write_event(Event::Decl(declaration))?;
        Ok(self)
    }

    /// Writes `<!DOCTYPE name>`.
    pub(crate) fn write_doctype(&mut self, name: &str) -> WriterResult<&mut Self> {
        self.writer
            .write_event(Event::DocType(BytesText::from_escaped(name)))?;
        Ok(self)
    }

    /// Begins `<tag`, first flushing any element still pending
    /// since it must be a parent of this one.
    pub(crate) fn open(&mut self, tag: &'a str) -> WriterResult<&mut Self> {
        self.flush_pending()?;
        self.pending = Some(BytesStart::new(tag));
        Ok(self)
    }

    /// Adds `name="value"` to the pending element. A [`None`] value is skipped.
    pub(crate) fn attribute<'b>(&mut self, name: &str, value: impl Into<Option<&'b str>>) -> &mut Self {
        if let Some((element, value)) = self.pending.as_mut().zip(value.into()) {
            element.push_attribute(Attribute {
                key: QName(name.as_bytes()),
                value: match escape(value) {
                    Cow::Borrowed(value) => Cow::Borrowed(value.as_bytes()),
                    Cow::Owned(value) => Cow::Owned(value.into_bytes()),
                },
            });
        }
        self
    }

    /// Writes the pending element as a start tag: `<parent>`.
    pub(crate) fn flush_pending(&mut self) -> WriterResult<()> {
        match self.pending.take() {
            Some(element) => Ok(self.writer.write_event(Event::Start(element))?),
            None => Ok(()),
        }
    }

    /// Closes a parent element: `</parent>`.
    pub(crate) fn close(&mut self, tag: &str) -> WriterResult<()> {
        self.flush_pending()?;
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    /// Completes the pending element with unescaped `text`: `<elem>text</elem>`.
    pub(crate) fn close_with_text(&mut self, text: &str) -> WriterResult<()> {
        let Some(element) = self.pending.take() else {
            return Ok(());
        };
        let end = element.to_end().into_owned();

        self.writer.write_event(Event::Start(element))?;
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?;
        self.writer.write_event(Event::End(end))?;
        Ok(())
    }

    /// Completes the pending element as `<elem/>`.
    pub(crate) fn close_empty(&mut self) -> WriterResult<()> {
        match self.pending.take() {
            Some(element) => Ok(self.writer.write_event(Event::Empty(element))?),
            None => Ok(()),
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// The reference written in place of `c`, if it must not appear literally.
///
/// Tabs, line breaks and no-break spaces are written as character references
/// so that readers normalizing whitespace return them unchanged.
fn entity(c: char) -> Option<&'static str> {
    Some(match c {
        '&' => "&amp;",
        '<' => "&lt;",
        '>' => "&gt;",
        '"' => "&quot;",
        '\'' => "&apos;",
        '\t' => "&#9;",
        '\n' => "&#10;",
        '\r' => "&#13;",
        '\u{A0}' => "&#160;",
        _ => return None,
    })
}

fn escape(input: &str) -> Cow<'_, str> {
    let Some(first) = input.find(|c| entity(c).is_some()) else {
        return Cow::Borrowed(input);
    };
    let mut escaped = String::with_capacity(input.len() + 16);
    escaped.push_str(&input[..first]);

    for c in input[first..].chars() {
        match entity(c) {
            Some(reference) => escaped.push_str(reference),
            None => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Escapes element text, also turning leading and trailing spaces into
/// references since readers trim literal whitespace around text.
fn escape_text(input: &str) -> Cow<'_, str> {
    const SPACE: &str = "&#32;";

    let escaped = escape(input);
    let leading = escaped.len() - escaped.trim_start_matches(' ').len();
    if leading == escaped.len() {
        return match leading {
            0 => escaped,
            _ => Cow::Owned(SPACE.repeat(leading)),
        };
    }

    let trailing = escaped.len() - escaped.trim_end_matches(' ').len();
    if leading == 0 && trailing == 0 {
        return escaped;
    }
    let body = &escaped[leading..escaped.len() - trailing];
    Cow::Owned(format!("{}{body}{}", SPACE.repeat(leading), SPACE.repeat(trailing)))
}

/// Writes a complete element, as one of:
/// - `writer: w, tag: t, attributes: {..}`: `<t/>`
/// - `writer: w, tag: t, text: x, attributes: {..}`: `<t>x</t>`
/// - `writer: w, tag: t, attributes: {..} inner_content: {..}`: `<t>..</t>`
///
/// Attributes are written as `NAME => value,` or `NAME where cond => value,`.
macro_rules! write_element {
    (writer: $w:expr, tag: $t:expr, $(attributes: $attrs:tt)?) => {
        $crate::writer::xml::write_element!(@open $w, $t, $($attrs)?).close_empty()
    };
    (writer: $w:expr, tag: $t:expr, text: $text:expr, $(attributes: $attrs:tt)?) => {
        $crate::writer::xml::write_element!(@open $w, $t, $($attrs)?).close_with_text($text)
    };
    (writer: $w:expr, tag: $t:expr, $(attributes: $attrs:tt)? inner_content: $inner:block) => {{
        let tag = $t;
        $crate::writer::xml::write_element!(@open $w, tag, $($attrs)?);
        $w.flush_pending()?;
        $inner
        $w.close(tag)
    }};

    (@open $w:expr, $t:expr, { $($name:path $(where $cond:expr)? => $val:expr,)* }) => {{
        let element = $w.open($t)?;
        $(
            $(if $cond)? {
                element.attribute($name, $val);
            }
        )*
        element
    }};
    (@open $w:expr, $t:expr,) => {
        $w.open($t)?
    };
}

pub(crate) use write_element;
