//! Roman numeral conversion for section labels

const NUMERALS: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Largest value expressible without overlined numerals
pub const MAX_ROMAN: u32 = 3999;

/// Convert a number to an uppercase Roman numeral
///
/// # Returns
/// * `Some(String)` - The numeral for `1..=3999`
/// * `None` - Zero or a value above [`MAX_ROMAN`]
pub fn to_roman(mut value: u32) -> Option<String> {
    if value == 0 || value > MAX_ROMAN {
        return None;
    }

    let mut out = String::new();
    for (amount, symbol) in NUMERALS {
        while value >= amount {
            out.push_str(symbol);
            value -= amount;
        }
    }
    Some(out)
}

/// Parse a canonical Roman numeral, ignoring case
///
/// Non-canonical spellings such as `IIII` or `VX` are rejected so that a
/// label that merely looks numeric is not silently reinterpreted.
pub fn parse_roman(numeral: &str) -> Option<u32> {
    let upper = numeral.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }

    let mut rest = upper.as_str();
    let mut value = 0u32;
    for (amount, symbol) in NUMERALS {
        while let Some(tail) = rest.strip_prefix(symbol) {
            value = value.checked_add(amount)?;
            rest = tail;
        }
    }
    if !rest.is_empty() {
        return None;
    }

    (to_roman(value)? == upper).then_some(value)
}
