//! Children list handling: birth dates, ages and prose
//!
//! Birth dates arrive as `YYYY-MM-DD`. A date that is missing or does not
//! parse is treated as absent: the child is listed by name only and counts as
//! age 0.

use chrono::{Datelike, NaiveDate};

use crate::input::ChildRecord;

/// Accepted birth date format
pub const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used when a birth date is written into a document
pub const PROSE_DATE_FORMAT: &str = "%B %-d, %Y";

/// Age below which a child is provided for by a trust
pub const TRUST_AGE_LIMIT: u32 = 25;

/// A child with a parsed birth date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// Child's full name
    pub name: String,

    /// Birth date, when supplied and valid
    pub birth_date: Option<NaiveDate>,
}

impl Child {
    /// Parse a child record; a malformed date becomes `None`
    pub fn from_record(record: &ChildRecord) -> Self {
        Self {
            name: record.name.trim().to_string(),
            birth_date: parse_birth_date(&record.dob),
        }
    }

    /// Completed years on `today`; 0 when the birth date is absent
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        self.birth_date.map_or(0, |dob| age_on(dob, today))
    }

    /// `Name, born Month D, YYYY`, or just the name without a birth date
    pub fn description(&self) -> String {
        match self.birth_date {
            Some(dob) => format!("{}, born {}", self.name, dob.format(PROSE_DATE_FORMAT)),
            None => self.name.clone(),
        }
    }
}

/// Parse a `YYYY-MM-DD` birth date
///
/// # Returns
/// * `Some(NaiveDate)` - The date
/// * `None` - The text is blank or malformed
pub fn parse_birth_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(text, BIRTH_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            log::warn!("Ignoring malformed birth date '{}': {}", text, e);
            None
        }
    }
}

/// Completed years between `birth` and `today`; 0 for future dates
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// True when any child is younger than [`TRUST_AGE_LIMIT`] on `today`
pub fn has_minor_children(children: &[Child], today: NaiveDate) -> bool {
    children
        .iter()
        .any(|child| child.age_on(today) < TRUST_AGE_LIMIT)
}

/// Join entries the way the family-status paragraph lists children
///
/// One entry stands alone, two are joined with `" and "`, three or more are
/// separated by `"; "` with `"; and "` before the last.
pub fn join_detailed(entries: &[String]) -> String {
    match entries {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}; and {}", init.join("; "), last),
    }
}

/// Join names as a plain series: `A`, `A and B`, `A, B, and C`
pub fn join_simple(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

/// Detailed children prose with birth dates
pub fn detailed_list(children: &[Child]) -> String {
    let entries: Vec<String> = children.iter().map(Child::description).collect();
    join_detailed(&entries)
}

/// Children names as a plain series
pub fn simple_list(children: &[Child]) -> String {
    let names: Vec<String> = children.iter().map(|c| c.name.clone()).collect();
    join_simple(&names)
}

/// Count as a word: `no`, `one` .. `ten`, digits beyond
pub fn count_word(count: usize) -> String {
    const WORDS: [&str; 11] = [
        "no", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];
    WORDS
        .get(count)
        .map_or_else(|| count.to_string(), |w| (*w).to_string())
}

/// Count as `four (4)`, or `no` for zero
pub fn count_with_digits(count: usize) -> String {
    if count == 0 {
        "no".to_string()
    } else {
        format!("{} ({})", count_word(count), count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn child(name: &str, dob: &str) -> Child {
        Child::from_record(&ChildRecord::new(name, dob))
    }

    #[test]
    fn test_separator_rule() {
        let alice = child("Alice", "1990-01-01");
        let bob = child("Bob", "1992-02-02");
        let carol = child("Carol", "1994-03-03");

        assert_eq!(
            detailed_list(std::slice::from_ref(&alice)),
            "Alice, born January 1, 1990"
        );
        assert_eq!(
            detailed_list(&[alice.clone(), bob.clone()]),
            "Alice, born January 1, 1990 and Bob, born February 2, 1992"
        );
        assert_eq!(
            detailed_list(&[alice, bob, carol]),
            "Alice, born January 1, 1990; Bob, born February 2, 1992; and Carol, born March 3, 1994"
        );
    }

    #[test]
    fn test_simple_list() {
        let names: Vec<String> = ["Ann", "Ben", "Cy"].iter().map(|s| s.to_string()).collect();
        assert_eq!(join_simple(&names[..1]), "Ann");
        assert_eq!(join_simple(&names[..2]), "Ann and Ben");
        assert_eq!(join_simple(&names), "Ann, Ben, and Cy");
    }

    #[test]
    fn test_malformed_dates_are_absent() {
        assert_eq!(parse_birth_date("2000-13-45"), None);
        assert_eq!(parse_birth_date("01/15/2000"), None);
        assert_eq!(parse_birth_date(""), None);

        let c = child("Dana", "2000-13-45");
        assert_eq!(c.description(), "Dana");
        assert_eq!(c.age_on(date(2025, 6, 15)), 0);
    }

    #[test]
    fn test_age_boundary() {
        let today = date(2025, 6, 15);
        let exactly_24 = child("A", "2001-06-15");
        let day_over_25 = child("B", "2000-06-14");

        assert_eq!(exactly_24.age_on(today), 24);
        assert!(has_minor_children(std::slice::from_ref(&exactly_24), today));
        assert_eq!(day_over_25.age_on(today), 25);
        assert!(!has_minor_children(&[day_over_25], today));
    }

    #[test]
    fn test_age_before_birthday() {
        assert_eq!(age_on(date(2000, 12, 31), date(2025, 12, 30)), 24);
        assert_eq!(age_on(date(2030, 1, 1), date(2025, 1, 1)), 0);
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_word(0), "no");
        assert_eq!(count_word(4), "four");
        assert_eq!(count_word(12), "12");
        assert_eq!(count_with_digits(4), "four (4)");
        assert_eq!(count_with_digits(0), "no");
    }
}
