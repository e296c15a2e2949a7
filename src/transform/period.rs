use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})$").unwrap());

/// A billing period written as `YYYYMM`, e.g. `202301`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Parse exactly six ASCII digits with a month of 01–12.
    /// Anything shorter, longer or padded is rejected rather than truncated.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = PERIOD_RE.captures(s)?;
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The first four characters of the period text.
    pub fn leading(&self) -> String {
        format!("{:04}", self.year)
    }

    /// The last two characters of the period text.
    pub fn trailing(&self) -> String {
        format!("{:02}", self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_leading_and_trailing_text() {
        let p = Period::parse("202301").unwrap();
        assert_eq!((p.year(), p.month()), (2023, 1));
        assert_eq!(p.leading(), "2023");
        assert_eq!(p.trailing(), "01");
        assert_eq!(format!("{}{}", p.leading(), p.trailing()), "202301");
        assert_eq!(p.to_string(), "202301");
    }

    #[test]
    fn rejects_anything_but_yyyymm() {
        for bad in ["", "2023", "20231", "2023011", "2023-01", "20230a", " 202301", "202313", "202300"] {
            assert!(Period::parse(bad).is_none(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn orders_chronologically() {
        let a = Period::parse("202212").unwrap();
        let b = Period::parse("202301").unwrap();
        assert!(a < b);
    }
}
