use crate::ebook::errors::ValidationError;
use crate::ebook::variant::Variant;
use indexmap::IndexMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// A per-key type constraint consulted by [`VariantMap::set`].
///
/// [`Registry`](super::Registry) implements this trait using its
/// attribute-name table.
pub trait Validator {
    /// Returns an error if `value` may not be stored under `key`.
    fn validate(&self, key: &str, value: &Variant) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&str, &Variant) -> Result<(), ValidationError>,
{
    fn validate(&self, key: &str, value: &Variant) -> Result<(), ValidationError> {
        self(key, value)
    }
}

/// Non-empty string keys mapped to [`Variant`] values.
///
/// Iteration follows insertion order.
///
/// # Cloning
/// A clone is shallow: it owns an independent key set, while lazy values
/// ([`Text`](crate::content::Text), [`Flob`](crate::content::Flob)) keep
/// sharing their source. The validator is shared.
///
/// # Examples
/// ```
/// use tome::variant::{Variant, VariantMap};
///
/// let mut map = VariantMap::new();
/// map.set("title", "Dawn")?;
/// let previous = map.set("title", "Dusk")?;
///
/// assert_eq!(Some(Variant::from("Dawn")), previous);
/// assert_eq!(Some("Dusk"), map.get("title").and_then(Variant::as_str));
/// assert!(map.set("", 1).is_err());
/// # Ok::<(), tome::ebook::errors::ValidationError>(())
/// ```
#[derive(Clone, Default)]
pub struct VariantMap {
    entries: IndexMap<String, Variant>,
    validator: Option<Rc<dyn Validator>>,
}

impl VariantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map that checks every [`set`](Self::set) against `validator`.
    pub fn with_validator(validator: Rc<dyn Validator>) -> Self {
        Self {
            entries: IndexMap::new(),
            validator: Some(validator),
        }
    }

    pub fn validator(&self) -> Option<&Rc<dyn Validator>> {
        self.validator.as_ref()
    }

    /// Replaces the validator. Existing entries are not re-validated.
    pub fn set_validator(&mut self, validator: Option<Rc<dyn Validator>>) {
        self.validator = validator;
    }

    /// Associates `value` with `key`, returning the previous value if any.
    ///
    /// # Errors
    /// [`ValidationError`] if `key` is empty or the validator rejects the value.
    /// The map is unchanged on error.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Variant>,
    ) -> Result<Option<Variant>, ValidationError> {
        let key = key.into();
        let value = value.into();

        if key.is_empty() {
            return Err(ValidationError::new(key, "key must not be empty"));
        }
        if let Some(validator) = &self.validator {
            validator.validate(&key, &value)?;
        }
        Ok(self.entries.insert(key, value))
    }

    /// Inserts without consulting the validator.
    pub(crate) fn put(&mut self, key: impl Into<String>, value: impl Into<Variant>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Variant> {
        self.entries.get(key)
    }

    /// Returns the value for `key`, or `fallback` if absent.
    pub fn get_or<'a>(&'a self, key: &str, fallback: &'a Variant) -> &'a Variant {
        self.entries.get(key).unwrap_or(fallback)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Variant> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variant)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Copies every entry of `other` into this map, validating each against
    /// this map's validator.
    ///
    /// Entries preceding a rejected entry remain inserted.
    pub fn update(&mut self, other: &VariantMap) -> Result<(), ValidationError> {
        for (key, value) in other.iter() {
            self.set(key, value.clone())?;
        }
        Ok(())
    }
}

impl Debug for VariantMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl PartialEq for VariantMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<'a> IntoIterator for &'a VariantMap {
    type Item = (&'a String, &'a Variant);
    type IntoIter = indexmap::map::Iter<'a, String, Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
