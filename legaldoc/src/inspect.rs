//! Template inventory
//!
//! Lists what a template author put into a document: placeholder tokens,
//! `##...##` markers and section labels. Used by `legaldoc inspect` to check
//! a template against its profile before a client record ever touches it.

use itertools::Itertools;
use regex::Regex;
use serde::Serialize;

use crate::docx::opaque_text;
use crate::merge::{tokenize, LabelPattern, Marker, Segment};
use crate::template_model::{Block, Document};

/// Any `{...}` token without nested braces
const PLACEHOLDER_PATTERN: &str = r"\{[^{}\s][^{}]*\}";

/// A placeholder token and how often it occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenCount {
    pub token: String,
    pub count: usize,
}

/// What a marker does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    /// Guard, end, delete-leading or fallback marker
    Conditional,
    /// `##INSERT_...##` clause insertion point
    Insertion,
    /// Anything else; removed from generated output
    Unknown,
}

/// A marker as written in the template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerEntry {
    pub token: String,
    pub kind: MarkerKind,
}

/// A section label in the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEntry {
    pub numeral: String,
    pub value: Option<u32>,
    pub title: String,
}

/// Everything `inspect` reports about a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    /// Placeholder tokens, sorted, with occurrence counts
    pub placeholders: Vec<TokenCount>,
    /// Markers in document order
    pub markers: Vec<MarkerEntry>,
    /// Section labels in body order
    pub labels: Vec<LabelEntry>,
    /// Body elements kept verbatim (fields, drawings, section properties)
    pub opaque_blocks: usize,
    pub headers: usize,
    pub footers: usize,
}

fn marker_kind(body: &str) -> MarkerKind {
    if Marker::parse(body).is_some() {
        MarkerKind::Conditional
    } else if body.trim().starts_with("INSERT_") {
        MarkerKind::Insertion
    } else {
        MarkerKind::Unknown
    }
}

/// Take the inventory of `document`
///
/// # Parameters
/// * `document` - Parsed template
/// * `keyword` - Section label keyword, e.g. `Article`
pub fn inventory(document: &Document, keyword: &str) -> Result<Inventory, regex::Error> {
    let placeholder = Regex::new(PLACEHOLDER_PATTERN)?;
    let labels = LabelPattern::new(keyword)?;
    let mut texts = document.paragraph_texts();
    document.for_each_opaque(&mut |raw: &str| texts.push(opaque_text(raw)));

    let placeholders = texts
        .iter()
        .flat_map(|text| placeholder.find_iter(text).map(|m| m.as_str().to_string()))
        .counts()
        .into_iter()
        .sorted()
        .map(|(token, count)| TokenCount { token, count })
        .collect();

    let markers = texts
        .iter()
        .flat_map(|text| tokenize(text))
        .filter_map(|segment| match segment {
            Segment::Token { raw, body } => Some(MarkerEntry {
                token: raw.to_string(),
                kind: marker_kind(body),
            }),
            Segment::Text(_) => None,
        })
        .collect();

    let labels = labels
        .labels(&document.body)
        .into_iter()
        .map(|label| LabelEntry {
            numeral: label.numeral,
            value: label.value,
            title: label.title,
        })
        .collect();

    let opaque_blocks = document
        .block_sequences()
        .flatten()
        .filter(|block| matches!(block, Block::Opaque(_)))
        .count();

    Ok(Inventory {
        placeholders,
        markers,
        labels,
        opaque_blocks,
        headers: document.headers.len(),
        footers: document.footers.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_model::{Paragraph, Part};

    fn template() -> Document {
        let mut document = Document::new(vec![
            Block::Paragraph(Paragraph::new("I, {CLIENT_NAME}, of {CLIENT_COUNTY} County")),
            Block::Paragraph(Paragraph::new("Article I - Family")),
            Block::Paragraph(Paragraph::new(
                "##IF_MARRIED##I am married to {CLIENT_SPOUSE_NAME}.##END_IF##",
            )),
            Block::Paragraph(Paragraph::new("##INSERT_NEW_ARTICLES##")),
            Block::Paragraph(Paragraph::new("Article IIII - Oddly Numbered")),
            Block::Opaque(
                r#"<w:p><w:fldSimple w:instr=" DATE "><w:r><w:t>{EXEC_DATE}</w:t></w:r></w:fldSimple></w:p>"#
                    .to_string(),
            ),
            Block::Opaque("<w:sectPr/>".to_string()),
        ]);
        document.footers.push(Part {
            name: "word/footer1.xml".to_string(),
            blocks: vec![Block::Paragraph(Paragraph::new("Initials of {CLIENT_NAME}"))],
        });
        document
    }

    #[test]
    fn test_placeholders_counted_across_parts() {
        let inventory = inventory(&template(), "Article").unwrap();
        assert_eq!(
            inventory.placeholders,
            [
                TokenCount {
                    token: "{CLIENT_COUNTY}".to_string(),
                    count: 1
                },
                TokenCount {
                    token: "{CLIENT_NAME}".to_string(),
                    count: 2
                },
                TokenCount {
                    token: "{CLIENT_SPOUSE_NAME}".to_string(),
                    count: 1
                },
                TokenCount {
                    token: "{EXEC_DATE}".to_string(),
                    count: 1
                },
            ]
        );
        assert_eq!(inventory.footers, 1);
        assert_eq!(inventory.opaque_blocks, 2);
    }

    #[test]
    fn test_markers_classified() {
        let inventory = inventory(&template(), "Article").unwrap();
        let kinds: Vec<(&str, MarkerKind)> = inventory
            .markers
            .iter()
            .map(|m| (m.token.as_str(), m.kind))
            .collect();
        assert_eq!(
            kinds,
            [
                ("##IF_MARRIED##", MarkerKind::Conditional),
                ("##END_IF##", MarkerKind::Conditional),
                ("##INSERT_NEW_ARTICLES##", MarkerKind::Insertion),
            ]
        );
    }

    #[test]
    fn test_labels_flag_bad_numerals() {
        let inventory = inventory(&template(), "article").unwrap();
        assert_eq!(inventory.labels.len(), 2);
        assert_eq!(inventory.labels[0].value, Some(1));
        assert_eq!(inventory.labels[1].numeral, "IIII");
        assert_eq!(inventory.labels[1].value, None);
    }
}
