//! Date and time values for attributes.
//!
//! # Parsing
//! [`DateTime::parse`] reads loosely formatted ISO-8601 values: digit groups may be
//! separated by anything (`2024-03-09`, `2024/03/09`, `20240309`), the date and
//! time are split by `T` or a space, and trailing components may be left out.
//! Missing parts fall back to the start of their range:
//! - `1999` is `1999-01-01T00:00:00`
//! - `1999.07` is `1999-07-01T00:00:00`
//! - `1999-07-04 18:00+02` carries a `+02:00` offset
//!
//! # Patterns
//! [`DateTime::format`] and [`DateTime::parse_with`] accept a pattern made of:
//!
//! | Token  | Meaning                         |
//! |--------|---------------------------------|
//! | `yyyy` | Year                            |
//! | `MM`   | Month (`01-12`)                 |
//! | `dd`   | Day (`01-31`)                   |
//! | `HH`   | Hour (`00-23`)                  |
//! | `mm`   | Minute                          |
//! | `ss`   | Second                          |
//! | `SSS`  | Fraction of a second, always 0  |
//! | `XXX`  | UTC offset (`Z`, `+08:00`)      |
//! | `'..'` | Quoted literal (`''` is a `'`)  |
//!
//! Any other character is copied verbatim.

use std::fmt::Display;
use std::iter::Peekable;
use std::str::Chars;

/// The ISO-8601 pattern used when no other pattern is configured.
pub const ISO_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ssXXX";

/// A calendar date with a time of day, as stored in `datetime` attributes.
///
/// # Examples
/// ```
/// use tome::variant::DateTime;
///
/// let datetime = DateTime::parse("2023-01-25T10:11:35Z").unwrap();
///
/// assert_eq!("2023-01-25T10:11:35Z", datetime.to_string());
/// assert_eq!("2023/01/25", datetime.format("yyyy/MM/dd"));
/// assert_eq!(Some(0), datetime.time().offset());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    date: Date,
    time: Time,
}

impl DateTime {
    /// Pairs a [`Date`] with a [`Time`].
    pub fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }

    /// Parses a loosely formatted ISO-8601 value.
    ///
    /// Returns [`None`] when no year can be found.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (date, time) = match raw.split_once(['T', ' ']) {
            Some((date, time)) => (date, Time::parse(time)),
            None => (raw, None),
        };

        Some(Date::parse(date)?.at(time.unwrap_or(Time::MIDNIGHT)))
    }

    /// Parses `raw` strictly against `pattern`.
    ///
    /// Returns [`None`] if a numeric field is missing, a literal does not match,
    /// or trailing input remains.
    ///
    /// # Examples
    /// ```
    /// use tome::variant::DateTime;
    ///
    /// let datetime = DateTime::parse_with("25.01.2023 10:11", "dd.MM.yyyy HH:mm").unwrap();
    /// assert_eq!("2023-01-25T10:11:00", datetime.to_string());
    ///
    /// assert_eq!(None, DateTime::parse_with("2023-01", "yyyy-MM-dd"));
    /// ```
    pub fn parse_with(raw: &str, pattern: &str) -> Option<Self> {
        let mut scanner = Scanner::new(raw.trim());
        let (mut year, mut month, mut day) = (1970, 1, 1);
        let mut clock = [0u8; 3];
        let mut offset = None;

        for token in Token::tokenize(pattern) {
            match token {
                Token::Field(Field::Year, width) => {
                    year = i16::try_from(scanner.digits(width.max(4))?).ok()?;
                }
                Token::Field(Field::Fraction, width) => scanner.skip_digits(width)?,
                Token::Field(field, width) => {
                    let value = u8::try_from(scanner.digits(width.max(2))?).ok()?;
                    match field {
                        Field::Month => month = value,
                        Field::Day => day = value,
                        Field::Hour => clock[0] = value,
                        Field::Minute => clock[1] = value,
                        _ => clock[2] = value,
                    }
                }
                // Local times render no offset
                Token::Offset if scanner.at_offset() => offset = Some(scanner.offset()?),
                Token::Offset => {}
                Token::Literal(literal) => {
                    if !literal.chars().all(|expected| scanner.accept(expected)) {
                        return None;
                    }
                }
            }
        }

        let [hour, minute, second] = clock;
        scanner
            .is_done()
            .then(|| Date::new(year, month, day).at(Time::new(hour, minute, second, offset)))
    }

    /// Renders this datetime using `pattern`.
    ///
    /// A local time (no [offset](Time::offset)) renders `XXX` as nothing.
    pub fn format(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() + 8);

        for token in Token::tokenize(pattern) {
            match token {
                Token::Field(field, width) => {
                    let (value, min_width) = match field {
                        Field::Year => (i32::from(self.date.year), width.max(4)),
                        Field::Month => (self.date.month.into(), width),
                        Field::Day => (self.date.day.into(), width),
                        Field::Hour => (self.time.hour.into(), width),
                        Field::Minute => (self.time.minute.into(), width),
                        Field::Second => (self.time.second.into(), width),
                        Field::Fraction => (0, width),
                    };
                    out.push_str(&format!("{value:0>min_width$}"));
                }
                Token::Offset => self.time.write_offset(&mut out),
                Token::Literal(literal) => out.push_str(&literal),
            }
        }
        out
    }

    /// Returns the current date and UTC time.
    pub fn now() -> Self {
        let secs = match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(since) => since.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        };
        Self::from_unix(secs)
    }

    /// The UTC datetime `secs` seconds after 1970-01-01T00:00:00Z.
    ///
    /// # Examples
    /// ```
    /// use tome::variant::DateTime;
    ///
    /// let datetime = DateTime::from_unix(951_825_600);
    ///
    /// assert_eq!("2000-02-29T12:00:00Z", datetime.to_string());
    /// assert!(datetime.time().is_utc());
    /// ```
    pub fn from_unix(secs: i64) -> Self {
        civil_from_unix(secs)
    }

    /// The date part.
    pub fn date(&self) -> Date {
        self.date
    }

    /// The time part, including its offset.
    pub fn time(&self) -> Time {
        self.time
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}T{}", self.date, self.time)
    }
}

/// A proleptic Gregorian calendar date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: i16,
    month: u8,
    day: u8,
}

impl Date {
    /// Parts outside `-9999..=9999`, `1..=12` and `1..=31` are clamped.
    pub fn new(year: i16, month: u8, day: u8) -> Self {
        Self {
            year: year.clamp(-9999, 9999),
            month: month.clamp(1, 12),
            day: day.clamp(1, 31),
        }
    }

    /// Reads up to three digit groups as the year, month, and day.
    /// A missing month or day is the 1st.
    fn parse(raw: &str) -> Option<Self> {
        let mut scanner = Scanner::new(raw);
        let year = scanner.group(4, &[])?;
        let month = scanner.group(2, &[]).unwrap_or(1);
        let day = scanner.group(2, &[]).unwrap_or(1);

        Some(Date::new(year as i16, month as u8, day as u8))
    }

    /// This date at the given [`Time`].
    pub fn at(self, time: Time) -> DateTime {
        DateTime { date: self, time }
    }

    /// `-9999..=9999`
    pub fn year(&self) -> i16 {
        self.year
    }

    /// The month (`1-12`).
    pub fn month(&self) -> u8 {
        self.month
    }

    /// The day (`1-31`).
    ///
    /// # Note
    /// Not checked against the length of the month.
    pub fn day(&self) -> u8 {
        self.day
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0>4}-{:0>2}-{:0>2}", self.year, self.month, self.day)
    }
}

/// A time of day with an optional UTC offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    hour: u8,
    minute: u8,
    second: u8,
    offset: Option<i16>,
}

impl Time {
    const MIDNIGHT: Time = Time::new(0, 0, 0, None);

    /// Parts are clamped to `23:59:59`, and the offset (in minutes)
    /// to `-12:00..=+14:00`. A [`None`] offset is local time.
    pub const fn new(hour: u8, minute: u8, second: u8, utc_offset: Option<i16>) -> Self {
        let offset = match utc_offset {
            Some(minutes) if minutes < -12 * 60 => Some(-12 * 60),
            Some(minutes) if minutes > 14 * 60 => Some(14 * 60),
            offset => offset,
        };
        Self {
            hour: if hour > 23 { 23 } else { hour },
            minute: if minute > 59 { 59 } else { minute },
            second: if second > 59 { 59 } else { second },
            offset,
        }
    }

    /// A time at UTC (offset `0`).
    pub fn utc(hour: u8, minute: u8, second: u8) -> Self {
        Self::new(hour, minute, second, Some(0))
    }

    /// Reads the hour, minute, and second groups, then an optional
    /// `Z`, `±hh`, `±hhmm` or `±hh:mm` offset. Missing groups are `0`.
    fn parse(raw: &str) -> Option<Self> {
        const OFFSET: &[char] = &['Z', '+', '-'];

        let mut scanner = Scanner::new(raw);
        let hour = scanner.group(2, OFFSET)?;
        let minute = scanner.group(2, OFFSET).unwrap_or(0);
        let second = scanner.group(2, OFFSET).unwrap_or(0);

        let offset = match scanner.find(OFFSET) {
            Some('Z') => Some(0),
            Some(sign) => {
                let hours = scanner.group(2, &[]).unwrap_or(0) as i16;
                let minutes = scanner.group(2, &[]).unwrap_or(0) as i16;
                let total = hours * 60 + minutes;
                Some(if sign == '-' { -total } else { total })
            }
            None => None,
        };

        Some(Time::new(hour as u8, minute as u8, second as u8, offset))
    }

    /// `0-23`
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// `0-59`
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// `0-59`
    pub fn second(&self) -> u8 {
        self.second
    }

    /// Minutes east of UTC (`+08:30` is `510`), or [`None`] for local time.
    pub fn offset(&self) -> Option<i16> {
        self.offset
    }

    /// Whether the time is at UTC.
    pub fn is_utc(&self) -> bool {
        self.offset.is_some_and(|offset| offset == 0)
    }

    fn write_offset(&self, out: &mut String) {
        match self.offset {
            Some(0) => out.push('Z'),
            Some(offset) => {
                let sign = if offset < 0 { '-' } else { '+' };
                let offset = offset.abs();

                out.push_str(&format!("{sign}{:0>2}:{:0>2}", offset / 60, offset % 60));
            }
            None => {}
        }
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0>2}:{:0>2}:{:0>2}",
            self.hour, self.minute, self.second,
        )?;

        let mut offset = String::new();
        self.write_offset(&mut offset);
        f.write_str(&offset)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    /// Sub-second digits, which are not stored.
    Fraction,
}

#[derive(Debug, PartialEq)]
enum Token {
    /// A numeric field and the width of its letter run.
    Field(Field, usize),
    Offset,
    Literal(String),
}

impl Token {
    fn tokenize(pattern: &str) -> Vec<Token> {
        fn push_literal(tokens: &mut Vec<Token>, c: char) {
            match tokens.last_mut() {
                Some(Token::Literal(literal)) => literal.push(c),
                _ => tokens.push(Token::Literal(c.to_string())),
            }
        }

        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            let field = match c {
                'X' => {
                    while chars.next_if_eq(&'X').is_some() {}
                    tokens.push(Token::Offset);
                    continue;
                }
                'y' => Field::Year,
                'M' => Field::Month,
                'd' => Field::Day,
                'H' => Field::Hour,
                'm' => Field::Minute,
                's' => Field::Second,
                'S' => Field::Fraction,
                '\'' => {
                    // `''` is an apostrophe both inside and outside a quote
                    if chars.next_if_eq(&'\'').is_some() {
                        push_literal(&mut tokens, '\'');
                        continue;
                    }
                    while let Some(quoted) = chars.next() {
                        if quoted != '\'' {
                            push_literal(&mut tokens, quoted);
                        } else if chars.next_if_eq(&'\'').is_some() {
                            push_literal(&mut tokens, '\'');
                        } else {
                            break;
                        }
                    }
                    continue;
                }
                _ => {
                    push_literal(&mut tokens, c);
                    continue;
                }
            };

            let mut width = 1;
            while chars.next_if_eq(&c).is_some() {
                width += 1;
            }
            tokens.push(Token::Field(field, width));
        }
        tokens
    }
}

/// Cursor over the characters of a date or time value.
struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            chars: raw.chars().peekable(),
        }
    }

    /// Reads at most `width` consecutive ASCII digits.
    ///
    /// Returns [`None`] if there are none or the value overflows.
    fn digits(&mut self, width: usize) -> Option<u32> {
        let mut value = None;

        for _ in 0..width {
            let Some(digit) = self.chars.next_if(char::is_ascii_digit) else {
                break;
            };
            let current: u32 = value.unwrap_or(0);
            value = Some(current.checked_mul(10)?.checked_add(digit.to_digit(10)?)?);
        }
        value
    }

    /// Consumes at least one and at most `width` digits without reading a value.
    fn skip_digits(&mut self, width: usize) -> Option<()> {
        let mut skipped = 0;
        while skipped < width && self.chars.next_if(char::is_ascii_digit).is_some() {
            skipped += 1;
        }
        (skipped > 0).then_some(())
    }

    fn at_offset(&mut self) -> bool {
        matches!(self.chars.peek(), Some('Z' | '+' | '-'))
    }

    /// Skips separators up to the next digit group and reads it.
    ///
    /// Gives up without consuming a character listed in `stop`.
    fn group(&mut self, width: usize, stop: &[char]) -> Option<u32> {
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                break;
            } else if stop.contains(&c) {
                return None;
            }
            self.chars.next();
        }
        self.digits(width)
    }

    /// Consumes characters until one listed in `targets` is found.
    fn find(&mut self, targets: &[char]) -> Option<char> {
        self.chars.find(|c| targets.contains(c))
    }

    fn accept(&mut self, expected: char) -> bool {
        self.chars.next_if_eq(&expected).is_some()
    }

    /// Reads a strict `Z`, `±hh`, `±hhmm` or `±hh:mm` offset in minutes.
    fn offset(&mut self) -> Option<i16> {
        let sign = match self.chars.next()? {
            'Z' => return Some(0),
            '+' => 1,
            '-' => -1,
            _ => return None,
        };
        let hours = self.digits(2)? as i16;
        self.accept(':');
        let minutes = self.digits(2).unwrap_or(0) as i16;

        Some(sign * (hours * 60 + minutes))
    }

    fn is_done(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u8) -> i64 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Converts seconds since the UNIX epoch to a UTC proleptic Gregorian datetime.
fn civil_from_unix(secs: i64) -> DateTime {
    const SECS_PER_DAY: i64 = 86_400;
    // 400 Gregorian years
    const DAYS_PER_CYCLE: i64 = 146_097;
    // 1970-01-01 to 2000-01-01
    const EPOCH_TO_2000: i64 = 10_957;

    let since_2000 = secs.div_euclid(SECS_PER_DAY) - EPOCH_TO_2000;
    let clock = secs.rem_euclid(SECS_PER_DAY);

    // 2000-01-01 opens a 400 year cycle, so the remaining days are non-negative
    let mut year = 2000 + 400 * since_2000.div_euclid(DAYS_PER_CYCLE);
    let mut days = since_2000.rem_euclid(DAYS_PER_CYCLE);

    loop {
        let length = if is_leap_year(year) { 366 } else { 365 };
        if days < length {
            break;
        }
        days -= length;
        year += 1;
    }

    let mut month = 1;
    while days >= days_in_month(year, month) {
        days -= days_in_month(year, month);
        month += 1;
    }

    Date::new(year.clamp(-9999, 9999) as i16, month, days as u8 + 1).at(Time::utc(
        (clock / 3600) as u8,
        (clock / 60 % 60) as u8,
        (clock % 60) as u8,
    ))
}
