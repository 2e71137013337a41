use crate::ebook::attributes;
use crate::ebook::content::{Flob, Text};
use crate::ebook::errors::{ConversionError, ValidationError};
use crate::ebook::variant::datetime::ISO_FORMAT;
use crate::ebook::variant::{DateTime, Locale, TypeTag, Validator, Variant, VariantKind};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// Converts the string form of a value into a [`Variant`].
///
/// The [`TypeTag`] carries parameters such as `format` for datetimes.
/// On failure, a short reason is returned; the registry wraps it into a
/// [`ConversionError`].
pub type Converter = Rc<dyn Fn(&str, &TypeTag) -> Result<Variant, String>>;

/// The default value of a kind.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value, cloned on each request.
    Value(Variant),
    /// Computed on each request, such as the current timestamp.
    Lazy(Rc<dyn Fn() -> Variant>),
}

impl DefaultValue {
    fn resolve(&self) -> Variant {
        match self {
            Self::Value(value) => value.clone(),
            Self::Lazy(supplier) => supplier(),
        }
    }
}

/// Type tags, default values, converters, and attribute-name typing.
///
/// A registry is constructed once (usually [`Registry::standard`]) and then
/// shared through `Rc` by the [`Book`](crate::Book) it validates and by the
/// codec options that persist it.
///
/// # Tags
/// The first tag registered for a kind becomes its canonical tag, returned by
/// [`lookup_tag`](Self::lookup_tag). Later tags for the same kind are aliases
/// (`uint` → [`VariantKind::Integer`]).
///
/// # Examples
/// ```
/// use tome::variant::{Registry, Variant, VariantKind};
///
/// let registry = Registry::standard();
///
/// assert_eq!(Some(VariantKind::Integer), registry.lookup_kind("uint"));
/// assert_eq!(Some("int"), registry.lookup_tag(&Variant::from(7)));
/// assert_eq!(Variant::Boolean(true), registry.parse("TRUE", "bool").unwrap());
/// // Unknown tags keep the raw string
/// assert_eq!(Variant::from("x"), registry.parse("x", "color").unwrap());
/// assert!(registry.parse("seven", "int").is_err());
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    kinds: IndexMap<String, VariantKind>,
    tags: HashMap<VariantKind, String>,
    defaults: HashMap<VariantKind, DefaultValue>,
    converters: HashMap<VariantKind, Converter>,
    attributes: IndexMap<String, String>,
}

impl Registry {
    /// Canonical tag of [`VariantKind::String`].
    pub const STRING: &'static str = "str";
    /// Canonical tag of [`VariantKind::Integer`].
    pub const INTEGER: &'static str = "int";
    /// Alias of [`Self::INTEGER`].
    pub const UNSIGNED: &'static str = "uint";
    /// Canonical tag of [`VariantKind::Real`].
    pub const REAL: &'static str = "real";
    /// Canonical tag of [`VariantKind::Boolean`].
    pub const BOOLEAN: &'static str = "bool";
    /// Canonical tag of [`VariantKind::DateTime`].
    pub const DATETIME: &'static str = "datetime";
    /// Canonical tag of [`VariantKind::Locale`].
    pub const LOCALE: &'static str = "locale";
    /// Canonical tag of [`VariantKind::Text`].
    pub const TEXT: &'static str = "text";
    /// Canonical tag of [`VariantKind::Flob`].
    pub const FLOB: &'static str = "file";

    /// An empty registry without tags, defaults, or converters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in tags, defaults, converters,
    /// and the standard attribute table of [`attributes`](crate::attributes).
    pub fn standard() -> Self {
        let mut registry = Self::new();

        registry
            .register(Self::STRING, VariantKind::String)
            .register(Self::INTEGER, VariantKind::Integer)
            .register(Self::UNSIGNED, VariantKind::Integer)
            .register(Self::REAL, VariantKind::Real)
            .register(Self::BOOLEAN, VariantKind::Boolean)
            .register(Self::DATETIME, VariantKind::DateTime)
            .register(Self::LOCALE, VariantKind::Locale)
            .register(Self::TEXT, VariantKind::Text)
            .register(Self::FLOB, VariantKind::Flob);

        registry
            .set_default(VariantKind::String, DefaultValue::Value(Variant::from("")))
            .set_default(VariantKind::Integer, DefaultValue::Value(Variant::Integer(0)))
            .set_default(VariantKind::Real, DefaultValue::Value(Variant::Real(0.0)))
            .set_default(VariantKind::Boolean, DefaultValue::Value(Variant::Boolean(false)))
            .set_default(
                VariantKind::DateTime,
                DefaultValue::Lazy(Rc::new(|| Variant::DateTime(DateTime::now()))),
            )
            .set_default(
                VariantKind::Locale,
                DefaultValue::Lazy(Rc::new(|| Variant::Locale(Locale::system_default()))),
            )
            .set_default(VariantKind::Text, DefaultValue::Lazy(Rc::new(|| Text::empty().into())))
            .set_default(VariantKind::Flob, DefaultValue::Lazy(Rc::new(|| Flob::empty().into())));

        registry
            .set_converter(VariantKind::String, converter(|text, _| Ok(text.into())))
            .set_converter(
                VariantKind::Integer,
                converter(|text, _| {
                    text.trim()
                        .parse::<i64>()
                        .map(Variant::Integer)
                        .map_err(|error| error.to_string())
                }),
            )
            .set_converter(
                VariantKind::Real,
                converter(|text, _| {
                    text.trim()
                        .parse::<f64>()
                        .map(Variant::Real)
                        .map_err(|error| error.to_string())
                }),
            )
            .set_converter(
                VariantKind::Boolean,
                converter(|text, _| match text.trim() {
                    value if value.eq_ignore_ascii_case("true") => Ok(Variant::Boolean(true)),
                    value if value.eq_ignore_ascii_case("false") => Ok(Variant::Boolean(false)),
                    _ => Err("expected `true` or `false`".to_owned()),
                }),
            )
            .set_converter(
                VariantKind::DateTime,
                converter(|text, tag| {
                    match tag.param("format") {
                        Some(pattern) => DateTime::parse_with(text, pattern),
                        None => DateTime::parse(text),
                    }
                    .map(Variant::DateTime)
                    .ok_or_else(|| "malformed datetime".to_owned())
                }),
            )
            .set_converter(
                VariantKind::Locale,
                converter(|text, _| {
                    Locale::parse(text)
                        .map(Variant::Locale)
                        .ok_or_else(|| "malformed language tag".to_owned())
                }),
            )
            .set_converter(VariantKind::Text, converter(|text, _| Ok(Text::from_string(text).into())));

        for (name, tag) in attributes::STANDARD_TYPES {
            registry.bind_attribute(*name, *tag);
        }
        registry
    }

    /// Maps `tag` to `kind`. The first tag registered for a kind becomes canonical.
    pub fn register(&mut self, tag: impl Into<String>, kind: VariantKind) -> &mut Self {
        let tag = tag.into();

        self.tags.entry(kind).or_insert_with(|| tag.clone());
        self.kinds.insert(tag, kind);
        self
    }

    pub fn set_default(&mut self, kind: VariantKind, default: DefaultValue) -> &mut Self {
        self.defaults.insert(kind, default);
        self
    }

    pub fn set_converter(&mut self, kind: VariantKind, converter: Converter) -> &mut Self {
        self.converters.insert(kind, converter);
        self
    }

    /// Declares that attributes named `name` hold values of `tag`.
    pub fn bind_attribute(&mut self, name: impl Into<String>, tag: impl Into<String>) -> &mut Self {
        self.attributes.insert(name.into(), tag.into());
        self
    }

    /// The kind registered for the main part of `tag`.
    pub fn lookup_kind(&self, tag: impl Into<TypeTag>) -> Option<VariantKind> {
        self.kinds.get(tag.into().main()).copied()
    }

    /// The canonical tag of `value`'s kind.
    ///
    /// [`Variant::Other`] has no exact tag and resolves to the tag of its
    /// nearest supertype, [`VariantKind::String`], since it persists
    /// through its display form.
    pub fn lookup_tag(&self, value: &Variant) -> Option<&str> {
        self.tag_of(value.kind())
            .or_else(|| match value.kind() {
                VariantKind::Other => self.tag_of(VariantKind::String),
                _ => None,
            })
    }

    /// The canonical tag registered for `kind`.
    pub fn tag_of(&self, kind: VariantKind) -> Option<&str> {
        self.tags.get(&kind).map(String::as_str)
    }

    /// The default value for `tag`, computing lazy defaults on each call.
    pub fn default_for(&self, tag: impl Into<TypeTag>) -> Option<Variant> {
        let kind = self.lookup_kind(tag)?;
        self.defaults.get(&kind).map(DefaultValue::resolve)
    }

    /// Converts `text` into a value of `tag`.
    ///
    /// A tag that is not registered, or whose kind has no converter,
    /// yields `text` unchanged as a [`Variant::String`].
    ///
    /// # Errors
    /// [`ConversionError`] naming the tag and the text if the converter rejects it.
    pub fn parse(&self, text: &str, tag: impl Into<TypeTag>) -> Result<Variant, ConversionError> {
        let tag = tag.into();

        let Some(converter) = self
            .kinds
            .get(tag.main())
            .and_then(|kind| self.converters.get(kind))
        else {
            return Ok(Variant::from(text));
        };

        converter(text, &tag).map_err(|reason| {
            tracing::debug!(tag = %tag, %text, %reason, "conversion failed");
            ConversionError::new(tag.to_string(), text)
        })
    }

    /// Renders a non-lazy value to the string that [`parse`](Self::parse) accepts.
    ///
    /// Datetimes use `date_format`, or [`ISO_FORMAT`] when absent.
    /// Returns [`None`] for [`Text`] and [`Flob`], which are persisted as entries.
    pub fn render(&self, value: &Variant, date_format: Option<&str>) -> Option<String> {
        Some(match value {
            Variant::String(value) => value.clone(),
            Variant::Integer(value) => value.to_string(),
            Variant::Real(value) => value.to_string(),
            Variant::Boolean(value) => value.to_string(),
            Variant::DateTime(value) => value.format(date_format.unwrap_or(ISO_FORMAT)),
            Variant::Locale(value) => value.to_string(),
            Variant::Other(value) => value.to_string(),
            Variant::Text(_) | Variant::Flob(_) => return None,
        })
    }

    /// The tag bound to the attribute `name`, if any.
    pub fn attribute_tag(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The kind bound to the attribute `name`, if its tag is registered.
    pub fn attribute_kind(&self, name: &str) -> Option<VariantKind> {
        self.attribute_tag(name).and_then(|tag| self.lookup_kind(tag))
    }

    /// Attribute names with a bound tag, in binding order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

/// Wraps a closure as a [`Converter`].
pub fn converter(
    convert: impl Fn(&str, &TypeTag) -> Result<Variant, String> + 'static,
) -> Converter {
    Rc::new(convert)
}

impl Validator for Registry {
    fn validate(&self, key: &str, value: &Variant) -> Result<(), ValidationError> {
        match self.attribute_kind(key) {
            Some(kind) if kind != value.kind() => Err(ValidationError::new(
                key,
                format!(
                    "attribute must be `{}`, found `{}`",
                    self.tag_of(kind).unwrap_or("?"),
                    self.lookup_tag(value).unwrap_or("?"),
                ),
            )),
            _ => Ok(()),
        }
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebook::variant::{Date, Opaque, Time};

    #[test]
    fn test_canonical_tags() {
        let registry = Registry::standard();

        #[rustfmt::skip]
        let expected = [
            ("str", Variant::from("a")),
            ("int", Variant::from(1)),
            ("real", Variant::from(1.5)),
            ("bool", Variant::from(true)),
            ("datetime", Variant::from(DateTime::from_unix(0))),
            ("text", Variant::from(Text::from_string("x"))),
            ("file", Variant::from(Flob::empty())),
            // `Other` falls back to its supertype
            ("str", Variant::from(Opaque::new('c'))),
        ];

        for (tag, value) in expected {
            assert_eq!(Some(tag), registry.lookup_tag(&value), "{value:?}");
        }
    }

    #[test]
    fn test_parse() {
        let registry = Registry::standard();

        #[rustfmt::skip]
        let expected = [
            (Variant::Integer(-42), " -42 ", "int"),
            (Variant::Integer(42), "42", "uint"),
            (Variant::Real(2.5), "2.5", "real"),
            (Variant::Boolean(false), "False", "bool"),
            (Variant::from("plain"), "plain", "str"),
            (Variant::from("unknown"), "unknown", "vector"),
            (
                Variant::DateTime(Date::new(2016, 3, 7).at(Time::new(0, 0, 0, None))),
                "07/03/2016",
                "datetime;format=dd/MM/yyyy",
            ),
            (
                Variant::DateTime(Date::new(2016, 3, 7).at(Time::utc(1, 2, 3))),
                "2016-03-07T01:02:03Z",
                "datetime",
            ),
            (
                Variant::DateTime(Date::new(2016, 3, 7).at(Time::new(1, 2, 3, None))),
                "2016-03-07T01:02:03",
                "datetime;format=yyyy-MM-dd'T'HH:mm:ssXXX",
            ),
            (
                Variant::DateTime(Date::new(1970, 1, 1).at(Time::new(0, 0, 0, None))),
                "99999999999999",
                "datetime;format=SSSSSSSSSSSSSS",
            ),
            (Variant::Locale(Locale::parse("en-GB").unwrap()), "en_GB", "locale"),
        ];

        for (expected, text, tag) in expected {
            assert_eq!(expected, registry.parse(text, tag).unwrap(), "{tag}: {text}");
        }
    }

    #[test]
    fn test_parse_failure_names_tag_and_text() {
        let registry = Registry::standard();

        #[rustfmt::skip]
        let expected = [
            ("int", "notanumber"),
            ("real", "1.2.3"),
            ("bool", "yes"),
            ("datetime;format=yyyy-MM-dd", "2016/03/07"),
            ("datetime;format=yyyyyyyyyyyyyy", "99999999999999"),
            ("locale", "?"),
        ];

        for (tag, text) in expected {
            let error = registry.parse(text, tag).unwrap_err();
            assert_eq!(tag, error.tag());
            assert_eq!(text, error.text());
            assert_eq!(None, error.key());
        }
    }

    #[test]
    fn test_defaults() {
        let registry = Registry::standard();

        assert_eq!(Some(Variant::Integer(0)), registry.default_for("int"));
        assert_eq!(Some(Variant::from("")), registry.default_for("str"));
        assert!(matches!(registry.default_for("datetime"), Some(Variant::DateTime(_))));
        assert!(matches!(registry.default_for("locale"), Some(Variant::Locale(_))));
        assert_eq!(None, registry.default_for("vector"));
    }

    #[test]
    fn test_lazy_default_is_recomputed() {
        let mut registry = Registry::new();
        let counter = Rc::new(std::cell::Cell::new(0));
        let supplier = counter.clone();

        registry
            .register("counter", VariantKind::Integer)
            .set_default(
                VariantKind::Integer,
                DefaultValue::Lazy(Rc::new(move || {
                    supplier.set(supplier.get() + 1);
                    Variant::Integer(supplier.get())
                })),
            );

        assert_eq!(Some(Variant::Integer(1)), registry.default_for("counter"));
        assert_eq!(Some(Variant::Integer(2)), registry.default_for("counter"));
        assert_eq!(2, counter.get());
    }

    #[test]
    fn test_validate_attribute_types() {
        let registry = Registry::standard();

        assert!(registry.validate("words", &Variant::from(10)).is_ok());
        assert!(registry.validate("custom", &Variant::from(10)).is_ok());

        let error = registry.validate("words", &Variant::from("ten")).unwrap_err();
        assert_eq!("words", error.key());
        assert!(registry.validate("cover", &Variant::from("cover.png")).is_err());
    }

    #[test]
    fn test_render() {
        let registry = Registry::standard();
        let datetime = Date::new(2020, 2, 20).at(Time::utc(1, 2, 3));

        assert_eq!(Some("3".into()), registry.render(&Variant::Integer(3), None));
        assert_eq!(Some("0.5".into()), registry.render(&Variant::Real(0.5), None));
        assert_eq!(
            Some("2020-02-20T01:02:03Z".into()),
            registry.render(&datetime.into(), None)
        );
        assert_eq!(
            Some("20.02.2020".into()),
            registry.render(&datetime.into(), Some("dd.MM.yyyy"))
        );
        assert_eq!(None, registry.render(&Text::from_string("x").into(), None));
    }
}
