use std::fmt::{self, Display, Formatter};

/// A language tag, such as `en`, `zh-CN`, or `sr-Latn-RS`.
///
/// Both `-` and `_` are accepted as separators on input;
/// [`Display`] always renders `-`.
///
/// # Examples
/// ```
/// use tome::variant::Locale;
///
/// let locale = Locale::parse("zh_cn").unwrap();
///
/// assert_eq!("zh", locale.language());
/// assert_eq!(Some("CN"), locale.region());
/// assert_eq!("zh-CN", locale.to_string());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    script: Option<String>,
    region: Option<String>,
}

impl Locale {
    /// The locale assumed when the environment does not specify one.
    pub const FALLBACK: &'static str = "en";

    /// Parses a language tag.
    ///
    /// The language subtag must be 2-8 ASCII letters.
    /// A 4-letter subtag is a script, and a 2-letter or 3-digit subtag is a region.
    /// Remaining subtags are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut subtags = raw.trim().split(['-', '_']);
        let language = subtags.next()?;

        if !(2..=8).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let mut locale = Self {
            language: language.to_ascii_lowercase(),
            script: None,
            region: None,
        };

        for subtag in subtags {
            let is_alpha = subtag.chars().all(|c| c.is_ascii_alphabetic());

            match subtag.len() {
                4 if is_alpha && locale.script.is_none() && locale.region.is_none() => {
                    let mut script = subtag.to_ascii_lowercase();
                    script[..1].make_ascii_uppercase();
                    locale.script = Some(script);
                }
                2 if is_alpha && locale.region.is_none() => {
                    locale.region = Some(subtag.to_ascii_uppercase());
                }
                3 if subtag.chars().all(|c| c.is_ascii_digit()) && locale.region.is_none() => {
                    locale.region = Some(subtag.to_owned());
                }
                _ => break,
            }
        }
        Some(locale)
    }

    /// The locale of the running process, read from `LC_ALL`, `LC_MESSAGES`, or `LANG`
    /// (`en_US.UTF-8` → `en-US`), falling back to [`Self::FALLBACK`].
    pub fn system_default() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok())
            .find_map(|value| {
                // Strip the codeset and modifier (`en_US.UTF-8@euro`)
                let tag = value.split(['.', '@']).next().unwrap_or_default();
                Self::parse(tag)
            })
            .unwrap_or_else(|| Self {
                language: Self::FALLBACK.to_owned(),
                script: None,
                region: None,
            })
    }

    /// The lowercase language subtag (`en`).
    pub fn language(&self) -> &str {
        &self.language
    }

    /// The titlecase script subtag (`Latn`).
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    /// The uppercase region subtag (`US`).
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;

        for subtag in [&self.script, &self.region].into_iter().flatten() {
            write!(f, "-{subtag}")?;
        }
        Ok(())
    }
}
