//! Placeholder substitution
//!
//! A [`PlaceholderMap`] maps literal tokens such as `{CLIENT_NAME}` to their
//! replacement text. Compiling the map yields a [`Substituter`] that matches
//! every key in a single left-to-right scan, preferring the longest key at any
//! position, so `{EXEC_MONTH_SHORT}` is never mangled by `{EXEC_MONTH}` and
//! replacement values are never rescanned.

use crate::docx::rewrite_text_nodes;
use crate::template_model::{visit_opaque_mut, visit_paragraphs_mut, Block, Document, Paragraph};
use itertools::Itertools;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};

use super::normalize::normalize;

/// Mapping from placeholder token to replacement text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    entries: BTreeMap<String, String>,
}

impl PlaceholderMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token, returning the previous value if the token was present
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(token.into(), value.into())
    }

    /// Insert a token only if it is not already mapped
    pub fn insert_default(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(token.into()).or_insert_with(|| value.into());
    }

    /// Look up a token
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    /// True when the token is mapped
    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no tokens are mapped
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate tokens and values in lexical token order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Tokens ordered longest first, ties broken lexically
    pub fn tokens_longest_first(&self) -> Vec<&str> {
        self.entries
            .keys()
            .map(String::as_str)
            .sorted_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
            .collect()
    }

    /// Add a space-separated variant for every underscore token
    ///
    /// Templates edited by hand sometimes contain `{CLIENT PRONOUN}` where
    /// `{CLIENT_PRONOUN}` was meant. Existing entries are never overwritten.
    pub fn add_spaced_variants(&mut self) {
        let variants: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|(k, _)| k.contains('_'))
            .map(|(k, v)| (k.replace('_', " "), v.clone()))
            .collect();
        for (token, value) in variants {
            self.insert_default(token, value);
        }
    }

    /// Compile the map into a [`Substituter`]
    ///
    /// # Returns
    /// * `Ok(Substituter)` - Ready-to-apply substituter
    /// * `Err(regex::Error)` - The combined pattern exceeded the regex size limit
    pub fn compile(&self) -> Result<Substituter, regex::Error> {
        let pattern = if self.entries.is_empty() {
            None
        } else {
            let alternation = self
                .tokens_longest_first()
                .into_iter()
                .map(regex::escape)
                .join("|");
            Some(Regex::new(&alternation)?)
        };

        Ok(Substituter {
            pattern,
            values: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlaceholderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A compiled placeholder map
#[derive(Debug, Clone)]
pub struct Substituter {
    pattern: Option<Regex>,
    values: HashMap<String, String>,
}

impl Substituter {
    /// Substitute every token in `text`
    ///
    /// # Returns
    /// * `Some((String, usize))` - New text and number of replacements
    /// * `None` - No token occurs in `text`
    pub fn apply(&self, text: &str) -> Option<(String, usize)> {
        let pattern = self.pattern.as_ref()?;
        let count = pattern.find_iter(text).count();
        if count == 0 {
            return None;
        }

        let replaced = pattern.replace_all(text, |caps: &Captures| {
            self.values
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        Some((replaced.into_owned(), count))
    }

    /// Substitute within one paragraph
    ///
    /// The paragraph is normalized first, but only when its logical text
    /// contains a token; untouched paragraphs keep their run formatting.
    ///
    /// # Returns
    /// * `usize` - Number of replacements made
    pub fn substitute_paragraph(&self, paragraph: &mut Paragraph) -> usize {
        let Some((text, count)) = self.apply(&paragraph.text()) else {
            return 0;
        };
        normalize(paragraph);
        paragraph.set_text(text);
        count
    }

    /// Substitute within the text nodes of an opaque block
    ///
    /// Each `w:t` node is matched on its own; a token split across nodes is
    /// left in place.
    pub fn substitute_opaque(&self, raw: &mut String) -> usize {
        let mut count = 0;
        let rewritten = rewrite_text_nodes(raw, &mut |text: &str| {
            self.apply(text).map(|(replaced, n)| {
                count += n;
                replaced
            })
        });
        if let Some(rewritten) = rewritten {
            *raw = rewritten;
        }
        count
    }

    /// Substitute within a block sequence, including table cells
    pub fn substitute_blocks(&self, blocks: &mut [Block]) -> usize {
        let mut total = 0;
        visit_paragraphs_mut(blocks, &mut |p: &mut Paragraph| {
            total += self.substitute_paragraph(p)
        });
        visit_opaque_mut(blocks, &mut |raw: &mut String| total += self.substitute_opaque(raw));
        total
    }

    /// Substitute within the body, every table, and every header and footer
    pub fn substitute(&self, document: &mut Document) -> usize {
        let mut total = 0;
        document.for_each_paragraph_mut(&mut |p: &mut Paragraph| {
            total += self.substitute_paragraph(p)
        });
        document.for_each_opaque_mut(&mut |raw: &mut String| total += self.substitute_opaque(raw));
        total
    }
}

/// Compile `map` and substitute it throughout `document`
///
/// # Returns
/// * `Ok(usize)` - Number of replacements made
/// * `Err(regex::Error)` - The map could not be compiled
pub fn substitute(document: &mut Document, map: &PlaceholderMap) -> Result<usize, regex::Error> {
    Ok(map.compile()?.substitute(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_model::{Part, Table, TableCell, TableRow, TextRun};

    fn sample_map() -> PlaceholderMap {
        [
            ("{EXEC_MONTH}", "October"),
            ("{EXEC_MONTH_SHORT}", "Oct"),
            ("{CLIENT_NAME}", "JANE Q DOE"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_longest_key_first() {
        let sub = sample_map().compile().unwrap();
        let (text, count) = sub.apply("{EXEC_MONTH_SHORT} / {EXEC_MONTH}").unwrap();
        assert_eq!(text, "Oct / October");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_tokens_longest_first_order() {
        let map = sample_map();
        assert_eq!(
            map.tokens_longest_first(),
            vec!["{EXEC_MONTH_SHORT}", "{CLIENT_NAME}", "{EXEC_MONTH}"]
        );
    }

    #[test]
    fn test_split_token_is_matched() {
        let mut doc = Document::new(vec![Block::Paragraph(Paragraph::from_runs(vec![
            TextRun::new("I, {CLIENT_"),
            TextRun::new("NAME}, declare"),
        ]))]);

        let count = substitute(&mut doc, &sample_map()).unwrap();

        assert_eq!(count, 1);
        assert_eq!(doc.body_texts(), vec!["I, JANE Q DOE, declare"]);
    }

    #[test]
    fn test_substitution_is_idempotent() {
        let mut doc = Document::new(vec![
            Block::Paragraph(Paragraph::new("{CLIENT_NAME} in {EXEC_MONTH}")),
            Block::Paragraph(Paragraph::new("no tokens here")),
        ]);
        let map = sample_map();

        substitute(&mut doc, &map).unwrap();
        let once = doc.clone();
        let second = substitute(&mut doc, &map).unwrap();

        assert_eq!(second, 0);
        assert_eq!(doc, once);
    }

    #[test]
    fn test_tables_headers_and_footers_are_substituted() {
        let cell = TableCell::new(vec![Block::Paragraph(Paragraph::new("{CLIENT_NAME}"))]);
        let mut doc = Document::new(vec![Block::Table(Table::new(vec![TableRow::new(vec![
            cell,
        ])]))]);
        doc.headers.push(Part {
            name: "word/header1.xml".to_string(),
            blocks: vec![Block::Paragraph(Paragraph::new("Will of {CLIENT_NAME}"))],
        });
        doc.footers.push(Part {
            name: "word/footer1.xml".to_string(),
            blocks: vec![Block::Paragraph(Paragraph::new("{EXEC_MONTH}"))],
        });

        let count = substitute(&mut doc, &sample_map()).unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            doc.paragraph_texts(),
            vec!["JANE Q DOE", "Will of JANE Q DOE", "October"]
        );
    }

    #[test]
    fn test_untouched_paragraph_keeps_runs() {
        let mut doc = Document::new(vec![Block::Paragraph(Paragraph::from_runs(vec![
            TextRun::new("plain "),
            TextRun::new("text"),
        ]))]);

        substitute(&mut doc, &sample_map()).unwrap();

        let Block::Paragraph(p) = &doc.body[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.runs.len(), 2);
    }

    #[test]
    fn test_spaced_variants() {
        let mut map = PlaceholderMap::new();
        map.insert("{CLIENT_PRONOUN}", "she");
        map.add_spaced_variants();
        assert_eq!(map.get("{CLIENT PRONOUN}"), Some("she"));
    }

    #[test]
    fn test_empty_map_changes_nothing() {
        let sub = PlaceholderMap::new().compile().unwrap();
        assert!(sub.apply("{CLIENT_NAME}").is_none());
    }

    #[test]
    fn test_fields_and_hyperlinks_are_substituted_per_text_node() {
        let footer = r#"<w:p><w:r><w:t xml:space="preserve">Initials of {CLIENT_NAME} </w:t></w:r><w:fldSimple w:instr=" PAGE "><w:r><w:t>1</w:t></w:r></w:fldSimple></w:p>"#;
        let mut doc = Document::new(vec![Block::Opaque(footer.to_string())]);

        let count = substitute(&mut doc, &sample_map()).unwrap();

        assert_eq!(count, 1);
        let Block::Opaque(raw) = &doc.body[0] else {
            panic!("expected opaque block");
        };
        assert!(raw.contains("Initials of JANE Q DOE "));
        assert!(raw.contains(r#"<w:fldSimple w:instr=" PAGE ">"#));
    }
}
