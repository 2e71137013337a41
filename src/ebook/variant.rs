//! Typed attribute values.
//!
//! A [`Variant`] is one value of a closed set of kinds, stored in a
//! [`VariantMap`] under a string key. The [`Registry`] maps each
//! [`VariantKind`] to the type tag used when values are persisted
//! (`str`, `int`, `datetime;format=...`), and converts tagged strings back
//! into values.
//!
//! # Examples
//! ```
//! use tome::variant::{Variant, VariantKind};
//!
//! let words = Variant::from(5200);
//! let title = Variant::from("Dawn");
//!
//! assert_eq!(VariantKind::Integer, words.kind());
//! assert_eq!(Some(5200), words.as_integer());
//! assert_eq!(Some("Dawn"), title.as_str());
//! ```

pub mod datetime;
pub mod locale;
pub mod map;
pub mod registry;

use crate::ebook::content::{Flob, Text};
use crate::util::str::StrExt;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

pub use self::datetime::{Date, DateTime, Time};
pub use self::locale::Locale;
pub use self::map::{Validator, VariantMap};
pub use self::registry::{Converter, DefaultValue, Registry};

/// A dynamically-typed attribute value.
///
/// Lazy kinds ([`Text`], [`Flob`]) are cheap handles;
/// cloning a variant never copies their content.
#[derive(Clone, Debug, PartialEq)]
pub enum Variant {
    /// A plain string (`str`).
    String(String),
    /// A signed integer (`int`, `uint`).
    Integer(i64),
    /// A floating point number (`real`).
    Real(f64),
    /// `true` or `false` (`bool`).
    Boolean(bool),
    /// A calendar date and time (`datetime`).
    DateTime(DateTime),
    /// A language tag (`locale`).
    Locale(Locale),
    /// Lazily-read textual content (`text`).
    Text(Text),
    /// Lazily-read binary content (`file`).
    Flob(Flob),
    /// An unclassified value, persisted through its [`Display`] form.
    Other(Opaque),
}

impl Variant {
    /// The kind of this value.
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::String(_) => VariantKind::String,
            Self::Integer(_) => VariantKind::Integer,
            Self::Real(_) => VariantKind::Real,
            Self::Boolean(_) => VariantKind::Boolean,
            Self::DateTime(_) => VariantKind::DateTime,
            Self::Locale(_) => VariantKind::Locale,
            Self::Text(_) => VariantKind::Text,
            Self::Flob(_) => VariantKind::Flob,
            Self::Other(_) => VariantKind::Other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime> {
        match self {
            Self::DateTime(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_locale(&self) -> Option<&Locale> {
        match self {
            Self::Locale(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_flob(&self) -> Option<&Flob> {
        match self {
            Self::Flob(value) => Some(value),
            _ => None,
        }
    }
}

macro_rules! impl_from_variant {
    {$($source:ty => |$value:ident| $variant:expr,)+} => {
        $(
        impl From<$source> for Variant {
            fn from($value: $source) -> Self {
                $variant
            }
        }
        )+
    };
}

impl_from_variant! {
    String => |value| Variant::String(value),
    &str => |value| Variant::String(value.to_owned()),
    i64 => |value| Variant::Integer(value),
    i32 => |value| Variant::Integer(value.into()),
    u32 => |value| Variant::Integer(value.into()),
    f64 => |value| Variant::Real(value),
    bool => |value| Variant::Boolean(value),
    DateTime => |value| Variant::DateTime(value),
    Locale => |value| Variant::Locale(value),
    Text => |value| Variant::Text(value),
    Flob => |value| Variant::Flob(value),
    Opaque => |value| Variant::Other(value),
}

/// The closed set of [`Variant`] kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VariantKind {
    String,
    Integer,
    Real,
    Boolean,
    DateTime,
    Locale,
    Text,
    Flob,
    Other,
}

impl VariantKind {
    /// All kinds, in declaration order.
    pub const ALL: [VariantKind; 9] = [
        Self::String,
        Self::Integer,
        Self::Real,
        Self::Boolean,
        Self::DateTime,
        Self::Locale,
        Self::Text,
        Self::Flob,
        Self::Other,
    ];

    /// Lazy kinds are persisted as separate archive entries.
    pub fn is_lazy(self) -> bool {
        matches!(self, Self::Text | Self::Flob)
    }
}

/// A value outside the known kinds, such as an application-specific type.
///
/// Equality is identity: two opaque values are equal only if they
/// share the same allocation.
#[derive(Clone)]
pub struct Opaque(Rc<dyn Display>);

impl Opaque {
    pub fn new(value: impl Display + 'static) -> Self {
        Self(Rc::new(value))
    }
}

impl Display for Opaque {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for Opaque {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.0.to_string()).finish()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A parsed type tag: `main[;key=value]*`.
///
/// Type tags are stored in the `type` attribute of persisted items,
/// such as `int`, `datetime;format=yyyy-MM-dd`, or `text/plain;encoding=UTF-8`.
///
/// # Examples
/// ```
/// use tome::variant::TypeTag;
///
/// let tag = TypeTag::parse(" text/html ; encoding = GBK ");
///
/// assert_eq!("text/html", tag.main());
/// assert_eq!(Some("GBK"), tag.param("encoding"));
/// assert!(tag.is_text());
/// assert_eq!("text/html;encoding=GBK", tag.to_string());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    main: String,
    params: Vec<(String, String)>,
}

impl TypeTag {
    pub fn new(main: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            params: Vec::new(),
        }
    }

    /// Parses a raw tag. Empty parameters and surrounding whitespace are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(';');
        let main = parts.next().unwrap_or_default().trim().to_owned();
        let params = parts
            .filter_map(|param| param.split_once('='))
            .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        Self { main, params }
    }

    /// Appends a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// The tag without its parameters.
    pub fn main(&self) -> &str {
        &self.main
    }

    /// The value of the first parameter named `key` (case-insensitive).
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns `true` for `text/<subtype>` tags, which reference archive text entries.
    pub fn is_text(&self) -> bool {
        self.main.starts_with_ignore_case("text/") && self.main.len() > "text/".len()
    }

    /// Returns `true` for bare MIME tags (`type/subtype`),
    /// matching `[\w]+/[\w-.+]+`.
    pub fn is_mime(&self) -> bool {
        fn is_word(c: char) -> bool {
            c.is_alphanumeric() || c == '_'
        }

        match self.main.split_once('/') {
            Some((main, sub)) => {
                !main.is_empty()
                    && !sub.is_empty()
                    && main.chars().all(is_word)
                    && sub.chars().all(|c| is_word(c) || matches!(c, '-' | '.' | '+'))
            }
            None => false,
        }
    }

    /// The subtype of a [MIME](Self::is_mime) tag (`text/html` → `html`).
    pub fn subtype(&self) -> Option<&str> {
        self.main.split_once('/').map(|(_, sub)| sub)
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.main)?;

        for (key, value) in &self.params {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

impl From<&str> for TypeTag {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for TypeTag {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&TypeTag> for TypeTag {
    fn from(tag: &TypeTag) -> Self {
        tag.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_parse() {
        #[rustfmt::skip]
        let expected = [
            ("int", vec![], "int"),
            ("datetime", vec![("format", "yyyy-MM-dd")], "datetime;format=yyyy-MM-dd"),
            ("text/plain", vec![("encoding", "UTF-8")], " text/plain ;; encoding=UTF-8; "),
            ("", vec![], ""),
            ("image/png", vec![], "image/png;broken"),
        ];

        for (main, params, raw) in expected {
            let tag = TypeTag::parse(raw);
            assert_eq!(main, tag.main(), "{raw}");
            assert_eq!(params, tag.params().collect::<Vec<_>>(), "{raw}");
        }
    }

    #[test]
    fn test_type_tag_classification() {
        #[rustfmt::skip]
        let expected = [
            // (raw, is_text, is_mime)
            ("text/plain", true, true),
            ("text/", false, false),
            ("image/svg+xml", false, true),
            ("application/x-font.ttf", false, true),
            ("str", false, false),
            ("/png", false, false),
            ("image/ png", false, false),
        ];

        for (raw, is_text, is_mime) in expected {
            let tag = TypeTag::parse(raw);
            assert_eq!(is_text, tag.is_text(), "{raw}");
            assert_eq!(is_mime, tag.is_mime(), "{raw}");
        }
    }

    #[test]
    fn test_opaque_identity() {
        let a = Opaque::new(42);
        let b = Opaque::new(42);

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!("42", a.to_string());
    }
}
