//! Suggested output filenames
//!
//! Files are named `<ISO-date> <Abbrev> <LastName> <FirstName(s)>.<ext>` so a
//! client folder sorts by date and document type.

use chrono::NaiveDate;

/// Generational suffixes kept attached to the last name
const SUFFIXES: [&str; 6] = ["jr", "sr", "ii", "iii", "iv", "v"];

/// Characters that are not allowed in file names on common platforms
const FORBIDDEN: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// True for `Q` or `Q.`
fn is_initial(token: &str) -> bool {
    let letters = token.strip_suffix('.').unwrap_or(token);
    let mut chars = letters.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
}

fn is_suffix(token: &str) -> bool {
    let bare = token.trim_end_matches(['.', ',']).to_lowercase();
    SUFFIXES.contains(&bare.as_str())
}

/// Reorder a full name as `Last First(s)`, dropping middle initials
///
/// `"Jane Q. Doe"` becomes `"Doe Jane"`; `"John A. Smith Jr."` becomes
/// `"Smith Jr. John"`. A name made only of initials keeps them.
pub fn last_first(full_name: &str) -> String {
    let mut tokens: Vec<&str> = full_name
        .split_whitespace()
        .map(|t| t.trim_end_matches(','))
        .filter(|t| !t.is_empty())
        .collect();

    let has_suffix = tokens.len() > 2 && tokens.last().is_some_and(|t| is_suffix(t));
    let suffix = if has_suffix { tokens.pop() } else { None };
    let Some(last) = tokens.pop() else {
        return String::new();
    };

    let given: Vec<&str> = tokens.iter().copied().filter(|t| !is_initial(t)).collect();
    let given = if given.is_empty() { tokens } else { given };

    let mut parts = vec![last];
    parts.extend(suffix);
    parts.extend(given);
    parts.join(" ")
}

/// Build the suggested filename for a generated document
///
/// # Parameters
/// * `date` - Generation date, written as `YYYY-MM-DD`
/// * `abbreviation` - Document type abbreviation (e.g., "LWT")
/// * `full_name` - Client's full name as entered
/// * `extension` - File extension without the dot
pub fn suggested_filename(
    date: NaiveDate,
    abbreviation: &str,
    full_name: &str,
    extension: &str,
) -> String {
    let name: String = last_first(full_name)
        .chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .collect();

    if name.is_empty() {
        format!("{} {}.{}", date.format("%Y-%m-%d"), abbreviation, extension)
    } else {
        format!(
            "{} {} {}.{}",
            date.format("%Y-%m-%d"),
            abbreviation,
            name,
            extension
        )
    }
}
