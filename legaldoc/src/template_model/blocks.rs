//! Block-level document elements
//!
//! A document body, a header or footer part, and every table cell hold an
//! ordered sequence of [`Block`]s. Paragraphs carry the editable text; tables
//! nest further block sequences; anything the engine does not model is kept as
//! opaque markup and written back untouched.

use super::table::Table;
use super::text_run::{RunFormat, TextRun};

/// Block-level document element
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A paragraph of formatted text
    Paragraph(Paragraph),

    /// A table whose cells contain their own blocks
    Table(Table),

    /// Raw markup for an element the engine does not edit
    ///
    /// Paragraphs containing fields, drawings or bookmarks with content land
    /// here so their structure survives generation unchanged.
    Opaque(String),
}

impl Block {
    /// Borrow the paragraph if this block is one
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    /// Mutably borrow the paragraph if this block is one
    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }
}

/// An ordered sequence of runs plus paragraph-level styling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    /// Paragraph style identifier (`w:pStyle`), e.g. `Heading1`
    pub style: Option<String>,

    /// Verbatim `w:pPr` markup, preserved so alignment and spacing survive
    pub properties_xml: Option<String>,

    /// The formatted runs; their texts concatenate to the paragraph text
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    /// Create an unstyled paragraph holding a single plain run
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            style: None,
            properties_xml: None,
            runs: vec![TextRun::new(text)],
        }
    }

    /// Create a paragraph with a style identifier and a single plain run
    pub fn styled(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: Some(style.into()),
            properties_xml: None,
            runs: vec![TextRun::new(text)],
        }
    }

    /// Create a paragraph from pre-built runs
    pub fn from_runs(runs: Vec<TextRun>) -> Self {
        Self {
            style: None,
            properties_xml: None,
            runs,
        }
    }

    /// The paragraph's logical text: all run texts in order
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// True when the paragraph has no visible text
    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }

    /// Replace the paragraph text with a single run
    ///
    /// The new run keeps the formatting of the first existing run, so a
    /// paragraph edited through this method reads as normalized afterwards.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let format = self
            .runs
            .first()
            .map(|r| r.format.clone())
            .unwrap_or_else(RunFormat::default);
        self.runs = vec![TextRun::with_format(text, format)];
    }
}

/// Call `f` on every paragraph in `blocks`, descending into table cells
pub fn visit_paragraphs_mut(blocks: &mut [Block], f: &mut dyn FnMut(&mut Paragraph)) {
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph(p) => f(p),
            Block::Table(table) => {
                for cell in table.cells_mut() {
                    visit_paragraphs_mut(&mut cell.blocks, f);
                }
            }
            Block::Opaque(_) => {}
        }
    }
}

/// Call `f` on every paragraph in `blocks`, descending into table cells
pub fn visit_paragraphs(blocks: &[Block], f: &mut dyn FnMut(&Paragraph)) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => f(p),
            Block::Table(table) => {
                for cell in table.cells() {
                    visit_paragraphs(&cell.blocks, f);
                }
            }
            Block::Opaque(_) => {}
        }
    }
}

/// Remove every paragraph for which `keep` returns false, including those in
/// table cells. Tables themselves are never removed.
///
/// # Returns
/// * `usize` - Number of paragraphs removed
pub fn retain_paragraphs(
    blocks: &mut Vec<Block>,
    keep: &mut dyn FnMut(&mut Paragraph) -> bool,
) -> usize {
    let mut removed = 0;
    blocks.retain_mut(|block| match block {
        Block::Paragraph(p) => {
            let kept = keep(p);
            if !kept {
                removed += 1;
            }
            kept
        }
        Block::Table(table) => {
            for cell in table.cells_mut() {
                removed += retain_paragraphs(&mut cell.blocks, keep);
            }
            true
        }
        Block::Opaque(_) => true,
    });
    removed
}

/// Call `f` on the raw markup of every opaque block, descending into table cells
pub fn visit_opaque_mut(blocks: &mut [Block], f: &mut dyn FnMut(&mut String)) {
    for block in blocks.iter_mut() {
        match block {
            Block::Opaque(raw) => f(raw),
            Block::Table(table) => {
                for cell in table.cells_mut() {
                    visit_opaque_mut(&mut cell.blocks, f);
                }
            }
            Block::Paragraph(_) => {}
        }
    }
}

/// Call `f` on the raw markup of every opaque block, descending into table cells
pub fn visit_opaque(blocks: &[Block], f: &mut dyn FnMut(&str)) {
    for block in blocks {
        match block {
            Block::Opaque(raw) => f(raw),
            Block::Table(table) => {
                for cell in table.cells() {
                    visit_opaque(&cell.blocks, f);
                }
            }
            Block::Paragraph(_) => {}
        }
    }
}

/// Remove every opaque block for which `keep` returns false, including those
/// in table cells
///
/// # Returns
/// * `usize` - Number of blocks removed
pub fn retain_opaque(blocks: &mut Vec<Block>, keep: &mut dyn FnMut(&mut String) -> bool) -> usize {
    let mut removed = 0;
    blocks.retain_mut(|block| match block {
        Block::Opaque(raw) => {
            let kept = keep(raw);
            if !kept {
                removed += 1;
            }
            kept
        }
        Block::Table(table) => {
            for cell in table.cells_mut() {
                removed += retain_opaque(&mut cell.blocks, keep);
            }
            true
        }
        Block::Paragraph(_) => true,
    });
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_model::{TableCell, TableRow};

    #[test]
    fn test_paragraph_text_concatenates_runs() {
        let p = Paragraph::from_runs(vec![TextRun::new("{CLIENT_"), TextRun::new("NAME}")]);
        assert_eq!(p.text(), "{CLIENT_NAME}");
    }

    #[test]
    fn test_set_text_keeps_first_run_format() {
        let bold = RunFormat {
            bold: true,
            ..RunFormat::default()
        };
        let mut p = Paragraph::from_runs(vec![
            TextRun::with_format("A", bold.clone()),
            TextRun::new("B"),
        ]);
        p.set_text("C");
        assert_eq!(p.runs.len(), 1);
        assert_eq!(p.runs[0].format, bold);
    }

    #[test]
    fn test_retain_descends_into_tables_but_keeps_table() {
        let cell = TableCell::new(vec![
            Block::Paragraph(Paragraph::new("keep")),
            Block::Paragraph(Paragraph::new("drop")),
        ]);
        let mut blocks = vec![
            Block::Paragraph(Paragraph::new("drop")),
            Block::Table(Table::new(vec![TableRow::new(vec![cell])])),
        ];

        let removed = retain_paragraphs(&mut blocks, &mut |p: &mut Paragraph| p.text() != "drop");

        assert_eq!(removed, 2);
        assert_eq!(blocks.len(), 1);
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows[0].cells[0].blocks.len(), 1);
    }

    #[test]
    fn test_retain_opaque_leaves_paragraphs() {
        let cell = TableCell::new(vec![Block::Opaque("<w:p>drop</w:p>".to_string())]);
        let mut blocks = vec![
            Block::Paragraph(Paragraph::new("drop")),
            Block::Opaque("<w:p>keep</w:p>".to_string()),
            Block::Table(Table::new(vec![TableRow::new(vec![cell])])),
        ];

        let removed = retain_opaque(&mut blocks, &mut |raw: &mut String| !raw.contains("drop"));

        assert_eq!(removed, 1);
        assert_eq!(blocks.len(), 3);
        let mut seen = Vec::new();
        visit_opaque(&blocks, &mut |raw: &str| seen.push(raw.to_string()));
        assert_eq!(seen, ["<w:p>keep</w:p>"]);
    }
}
