//! Section label renumbering
//!
//! Section headings follow the shape `<Keyword> <Numeral> <sep> <Title>`, for
//! example `Article IV - No Contest`. After clauses have been inserted or
//! removed, the numerals are rewritten as a gapless Roman sequence. Only the
//! numeral token changes; keyword, spacing, separator and title are kept.

use crate::template_model::Block;
use regex::Regex;

use super::normalize::normalize;
use super::roman::{parse_roman, to_roman};

/// A compiled label pattern for one keyword
#[derive(Debug, Clone)]
pub struct LabelPattern {
    keyword: String,
    regex: Regex,
}

/// A section label found in a block sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLabel {
    /// Index of the label paragraph in the block sequence
    pub block: usize,
    /// Numeral token as written
    pub numeral: String,
    /// Numeric value, if the token is a canonical Roman numeral
    pub value: Option<u32>,
    /// Title text after the separator
    pub title: String,
}

impl LabelPattern {
    /// Build a pattern for `keyword`, matched case-insensitively
    ///
    /// Accepted separators are `-`, `–`, `—` and `:`.
    pub fn new(keyword: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(
            r"(?i)^\s*{}\s+(\S+?)\s*[-–—:]\s*(.+?)\s*$",
            regex::escape(keyword.trim())
        ))?;
        Ok(Self {
            keyword: keyword.trim().to_string(),
            regex,
        })
    }

    /// The keyword this pattern matches
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Match a paragraph text
    ///
    /// # Returns
    /// * `Some((Range<usize>, String))` - Byte range of the numeral token and the title
    /// * `None` - The text is not a label
    fn match_label(&self, text: &str) -> Option<(std::ops::Range<usize>, String)> {
        let caps = self.regex.captures(text)?;
        let numeral = caps.get(1)?;
        let title = caps.get(2)?;
        Some((numeral.range(), title.as_str().to_string()))
    }

    /// All labels in the top-level paragraphs of `blocks`, in document order
    pub fn labels(&self, blocks: &[Block]) -> Vec<SectionLabel> {
        blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| {
                let text = block.as_paragraph()?.text();
                let (range, title) = self.match_label(&text)?;
                let numeral = text[range].to_string();
                Some(SectionLabel {
                    block: index,
                    value: parse_roman(&numeral),
                    numeral,
                    title,
                })
            })
            .collect()
    }
}

/// Where renumbering starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Renumber every label in the sequence
    DocumentStart,
    /// Renumber only labels at or after this block index
    Block(usize),
}

/// A label whose numeral could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAnomaly {
    /// Index of the label paragraph
    pub block: usize,
    /// The label text as found
    pub text: String,
}

/// Result of one renumbering pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenumberOutcome {
    /// Labels assigned a numeral, whether or not the text changed
    pub numbered: usize,
    /// Labels whose numeral actually changed
    pub changed: usize,
    /// Labels skipped because their numeral did not parse or overflowed
    pub anomalies: Vec<LabelAnomaly>,
}

/// Renumber the labels in `blocks` sequentially from `start`
///
/// # Parameters
/// * `blocks` - Top-level block sequence
/// * `pattern` - Label pattern for the keyword being renumbered
/// * `start` - Value assigned to the first affected label
/// * `anchor` - First block subject to renumbering
///
/// # Returns
/// * `RenumberOutcome` - Counts and any conversion anomalies
pub fn renumber(
    blocks: &mut [Block],
    pattern: &LabelPattern,
    start: u32,
    anchor: Anchor,
) -> RenumberOutcome {
    let from = match anchor {
        Anchor::DocumentStart => 0,
        Anchor::Block(index) => index.min(blocks.len()),
    };

    let mut outcome = RenumberOutcome::default();
    let mut next = start;

    for (index, block) in blocks.iter_mut().enumerate().skip(from) {
        let Some(paragraph) = block.as_paragraph_mut() else {
            continue;
        };
        let text = paragraph.text();
        let Some((range, _)) = pattern.match_label(&text) else {
            continue;
        };

        let numeral = &text[range.clone()];
        let replacement = match (parse_roman(numeral), to_roman(next)) {
            (Some(_), Some(replacement)) => replacement,
            (None, _) => {
                log::warn!(
                    "Section label '{}' has unparseable numeral '{}', left unchanged",
                    text.trim(),
                    numeral
                );
                outcome.anomalies.push(LabelAnomaly {
                    block: index,
                    text: text.trim().to_string(),
                });
                continue;
            }
            (Some(_), None) => {
                log::warn!(
                    "Section label '{}' cannot be numbered {}, left unchanged",
                    text.trim(),
                    next
                );
                outcome.anomalies.push(LabelAnomaly {
                    block: index,
                    text: text.trim().to_string(),
                });
                continue;
            }
        };

        if replacement != numeral {
            let mut relabeled = String::with_capacity(text.len() + 4);
            relabeled.push_str(&text[..range.start]);
            relabeled.push_str(&replacement);
            relabeled.push_str(&text[range.end..]);
            log::debug!("Relabeled '{}' as '{}'", text.trim(), relabeled.trim());
            normalize(paragraph);
            paragraph.set_text(relabeled);
            outcome.changed += 1;
        }
        outcome.numbered += 1;
        next += 1;
    }

    outcome
}
