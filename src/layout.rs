//! Reference-date timestamp layouts.
//!
//! A layout is written as an example of one fixed moment:
//!
//! ```text
//! Mon Jan 2 15:04:05 MST 2006
//! ```
//!
//! Every recognised piece of that moment is replaced by the matching piece of
//! the time being formatted; everything else is copied through. So
//! `2006-01-02T15:04:05.000Z` renders as `2024-03-05T07:08:09.123Z`.
//!
//! A layout is compiled once into [`Layout`] and reused for every exchange.
//! Compilation never fails. Text that is not a component, including a
//! pattern that is nothing but text, is kept as a literal.

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

const LONG_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

const LONG_WEEKDAYS: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

// ── Components ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Component {
    LongMonth,    // January
    Month,        // Jan
    NumMonth,     // 1
    ZeroMonth,    // 01
    LongWeekday,  // Monday
    Weekday,      // Mon
    Day,          // 2
    UnderDay,     // _2
    ZeroDay,      // 02
    UnderYearDay, // __2
    ZeroYearDay,  // 002
    Hour,         // 15
    Hour12,       // 3
    ZeroHour12,   // 03
    Minute,       // 4
    ZeroMinute,   // 04
    Second,       // 5
    ZeroSecond,   // 05
    LongYear,     // 2006
    Year,         // 06
    UpperPm,      // PM
    LowerPm,      // pm
    TzAbbrev,     // MST
    Offset { iso: bool, style: OffsetStyle },
    Fraction { separator: u8, digits: u8, trim: bool },
}

/// Shape of a numeric zone offset, `-07` through `-07:00:00`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum OffsetStyle {
    Hours,
    HoursMinutes,
    HoursColonMinutes,
    Seconds,
    ColonSeconds,
}

impl OffsetStyle {
    fn zero(self) -> &'static str {
        match self {
            Self::Hours             => "+00",
            Self::HoursMinutes      => "+0000",
            Self::HoursColonMinutes => "+00:00",
            Self::Seconds           => "+000000",
            Self::ColonSeconds      => "+00:00:00",
        }
    }
}

const OFFSETS: [(&str, OffsetStyle); 5] = [
    ("070000",   OffsetStyle::Seconds),
    ("07:00:00", OffsetStyle::ColonSeconds),
    ("0700",     OffsetStyle::HoursMinutes),
    ("07:00",    OffsetStyle::HoursColonMinutes),
    ("07",       OffsetStyle::Hours),
];

#[derive(Clone, Debug, Eq, PartialEq)]
enum Item {
    Literal(String),
    Component(Component),
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// A compiled reference-date layout.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    items: Vec<Item>,
}

impl Layout {
    pub fn parse(layout: &str) -> Self {
        let bytes = layout.as_bytes();
        let mut items = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        // Components always start on an ASCII byte, so every split below
        // lands on a char boundary.
        while i < bytes.len() {
            match component_at(&bytes[i..]) {
                Some((component, len)) => {
                    if literal_start < i {
                        items.push(Item::Literal(layout[literal_start..i].to_owned()));
                    }
                    items.push(Item::Component(component));
                    i += len;
                    literal_start = i;
                }
                None => i += 1,
            }
        }
        if literal_start < bytes.len() {
            items.push(Item::Literal(layout[literal_start..].to_owned()));
        }

        Self { items }
    }

    /// Renders `at` as a `String`.
    pub fn format(&self, at: &DateTime<Utc>) -> String {
        self.display(at).to_string()
    }

    /// Lazily renders `at`; useful when writing straight into a formatter.
    pub fn display<'a>(&'a self, at: &'a DateTime<Utc>) -> Formatted<'a> {
        Formatted { layout: self, at }
    }
}

/// Matches the component at the start of `s`, returning it and its length.
fn component_at(s: &[u8]) -> Option<(Component, usize)> {
    use Component::*;

    let starts = |prefix: &str| s.starts_with(prefix.as_bytes());
    // `Jan` and `Mon` are words of their own only when no lowercase follows.
    let abbrev = |prefix: &str| starts(prefix) && !s.get(3).is_some_and(u8::is_ascii_lowercase);

    match s[0] {
        b'J' if starts("January") => Some((LongMonth, 7)),
        b'J' if abbrev("Jan")     => Some((Month, 3)),
        b'M' if starts("Monday")  => Some((LongWeekday, 6)),
        b'M' if abbrev("Mon")     => Some((Weekday, 3)),
        b'M' if starts("MST")     => Some((TzAbbrev, 3)),
        b'0' if s.len() >= 2 && (b'1'..=b'6').contains(&s[1]) => {
            let zero = [ZeroMonth, ZeroDay, ZeroHour12, ZeroMinute, ZeroSecond, Year];
            Some((zero[usize::from(s[1] - b'1')], 2))
        }
        b'0' if starts("002")     => Some((ZeroYearDay, 3)),
        b'1' if starts("15")      => Some((Hour, 2)),
        b'1'                      => Some((NumMonth, 1)),
        b'2' if starts("2006")    => Some((LongYear, 4)),
        b'2'                      => Some((Day, 1)),
        // `_2006` is a literal underscore followed by the year.
        b'_' if starts("_2") && !starts("_2006") => Some((UnderDay, 2)),
        b'_' if starts("__2")     => Some((UnderYearDay, 3)),
        b'3'                      => Some((Hour12, 1)),
        b'4'                      => Some((Minute, 1)),
        b'5'                      => Some((Second, 1)),
        b'P' if starts("PM")      => Some((UpperPm, 2)),
        b'p' if starts("pm")      => Some((LowerPm, 2)),
        b'-' | b'Z' => {
            let iso = s[0] == b'Z';
            OFFSETS
                .iter()
                .find(|(pattern, _)| s[1..].starts_with(pattern.as_bytes()))
                .map(|&(pattern, style)| (Offset { iso, style }, pattern.len() + 1))
        }
        b'.' | b',' if s.len() >= 2 && (s[1] == b'0' || s[1] == b'9') => {
            let digit = s[1];
            let run = s[1..].iter().take_while(|&&b| b == digit).count();
            // A run followed by another digit is not a fraction.
            if s.get(run + 1).is_some_and(u8::is_ascii_digit) {
                return None;
            }
            let digits = u8::try_from(run.min(9)).unwrap_or(9);
            Some((Fraction { separator: s[0], digits, trim: digit == b'9' }, run + 1))
        }
        _ => None,
    }
}

// ── Formatting ────────────────────────────────────────────────────────────────

/// A [`Layout`] paired with a time, rendered on demand via [`fmt::Display`].
pub struct Formatted<'a> {
    layout: &'a Layout,
    at: &'a DateTime<Utc>,
}

impl fmt::Display for Formatted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.layout.items {
            match item {
                Item::Literal(text)         => f.write_str(text)?,
                Item::Component(component) => write_component(f, *component, self.at)?,
            }
        }
        Ok(())
    }
}

fn write_component(f: &mut fmt::Formatter<'_>, component: Component, at: &DateTime<Utc>) -> fmt::Result {
    use Component::*;

    let month = at.month0() as usize;
    let weekday = at.weekday().num_days_from_sunday() as usize;
    let hour12 = match at.hour() % 12 {
        0 => 12,
        h => h,
    };

    match component {
        LongMonth    => f.write_str(LONG_MONTHS[month]),
        Month        => f.write_str(&LONG_MONTHS[month][..3]),
        NumMonth     => write!(f, "{}", at.month()),
        ZeroMonth    => write!(f, "{:02}", at.month()),
        LongWeekday  => f.write_str(LONG_WEEKDAYS[weekday]),
        Weekday      => f.write_str(&LONG_WEEKDAYS[weekday][..3]),
        Day          => write!(f, "{}", at.day()),
        UnderDay     => write!(f, "{:>2}", at.day()),
        ZeroDay      => write!(f, "{:02}", at.day()),
        UnderYearDay => write!(f, "{:>3}", at.ordinal()),
        ZeroYearDay  => write!(f, "{:03}", at.ordinal()),
        Hour         => write!(f, "{:02}", at.hour()),
        Hour12       => write!(f, "{hour12}"),
        ZeroHour12   => write!(f, "{hour12:02}"),
        Minute       => write!(f, "{}", at.minute()),
        ZeroMinute   => write!(f, "{:02}", at.minute()),
        Second       => write!(f, "{}", at.second()),
        ZeroSecond   => write!(f, "{:02}", at.second()),
        LongYear     => write_long_year(f, at.year()),
        Year         => write!(f, "{:02}", at.year().rem_euclid(100)),
        UpperPm      => f.write_str(if at.hour() >= 12 { "PM" } else { "AM" }),
        LowerPm      => f.write_str(if at.hour() >= 12 { "pm" } else { "am" }),
        TzAbbrev     => f.write_str("UTC"),
        Offset { iso: true, .. } => f.write_str("Z"),
        Offset { iso: false, style } => f.write_str(style.zero()),
        Fraction { separator, digits, trim } => {
            write_fraction(f, separator, digits, trim, at.nanosecond())
        }
    }
}

fn write_long_year(f: &mut fmt::Formatter<'_>, year: i32) -> fmt::Result {
    if year < 0 {
        write!(f, "-{:04}", year.unsigned_abs())
    } else {
        write!(f, "{year:04}")
    }
}

fn write_fraction(
    f: &mut fmt::Formatter<'_>,
    separator: u8,
    digits: u8,
    trim: bool,
    nanos: u32,
) -> fmt::Result {
    // Leap seconds are carried as nanos >= 1e9.
    let nine = format!("{:09}", nanos % 1_000_000_000);
    let mut shown = &nine[..usize::from(digits)];
    if trim {
        shown = shown.trim_end_matches('0');
        if shown.is_empty() {
            return Ok(());
        }
    }
    write!(f, "{}{shown}", char::from(separator))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    // Tuesday, 5 March 2024 (a leap year), 07:08:09.123456789 UTC.
    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap()
    }

    fn render(layout: &str, at: &DateTime<Utc>) -> String {
        Layout::parse(layout).format(at)
    }

    #[test]
    fn default_layout_renders_milliseconds() {
        assert_eq!(render("2006-01-02T15:04:05.000Z", &sample()), "2024-03-05T07:08:09.123Z");
    }

    #[test]
    fn literal_suffix_is_copied() {
        assert_eq!(render("2006-01-02 15:04:05 UTC", &sample()), "2024-03-05 07:08:09 UTC");
    }

    #[test]
    fn names_and_twelve_hour_clock() {
        assert_eq!(
            render("Mon, 02 Jan 2006 15:04:05 MST", &sample()),
            "Tue, 05 Mar 2024 07:08:09 UTC",
        );
        assert_eq!(render("Monday January 2", &sample()), "Tuesday March 5");
        assert_eq!(render("3:04PM", &sample()), "7:08AM");
        assert_eq!(render("03:04 pm", &sample()), "07:08 am");

        let evening = Utc.with_ymd_and_hms(2024, 3, 5, 19, 0, 0).unwrap();
        assert_eq!(render("3PM", &evening), "7PM");
        let midnight = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(render("3 PM", &midnight), "12 AM");
    }

    #[test]
    fn abbreviations_inside_words_stay_literal() {
        assert_eq!(render("Month Janet Mon, Jan", &sample()), "Month Janet Tue, Mar");
        assert_eq!(render("Jan2006 MonX", &sample()), "Mar2024 TueX");
        assert_eq!(render("Monday January", &sample()), "Tuesday March");
    }

    #[test]
    fn padded_days() {
        assert_eq!(render("_2|2|02", &sample()), " 5|5|05");
        assert_eq!(render("002|__2", &sample()), "065| 65");
        assert_eq!(render("06 1 4 5", &sample()), "24 3 8 9");
    }

    #[test]
    fn underscore_before_long_year_is_literal() {
        assert_eq!(render("_2006", &sample()), "_2024");
    }

    #[test]
    fn offsets_in_utc() {
        assert_eq!(render("15:04Z07:00", &sample()), "07:08Z");
        assert_eq!(render("Z0700", &sample()), "Z");
        assert_eq!(render("-07:00", &sample()), "+00:00");
        assert_eq!(render("-0700", &sample()), "+0000");
        assert_eq!(render("-07", &sample()), "+00");
        assert_eq!(render("-07:00:00", &sample()), "+00:00:00");
    }

    #[test]
    fn fractions() {
        assert_eq!(render("05.000000", &sample()), "09.123456");
        assert_eq!(render("05,000000000", &sample()), "09,123456789");
        assert_eq!(render("05.999", &sample()), "09.123");

        let round = sample().with_nanosecond(120_000_000).unwrap();
        assert_eq!(render("05.999999", &round), "09.12");
        let whole = sample().with_nanosecond(0).unwrap();
        assert_eq!(render("05.999", &whole), "09");
        assert_eq!(render("05.000", &whole), "09.000");
    }

    #[test]
    fn text_without_components_passes_through() {
        assert_eq!(render("not a date", &sample()), "not a date");
        assert_eq!(render("", &sample()), "");
    }

    #[test]
    fn non_ascii_literals_survive() {
        assert_eq!(render("2006年01月02日", &sample()), "2024年03月05日");
    }
}
