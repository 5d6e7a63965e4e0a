//! Document model shared by the template reader, the merge engine and the writer
//!
//! A [`Document`] owns its body block sequence and one block sequence per
//! header and footer part. Every stage of generation works on an owned clone,
//! so a loaded template can be reused for any number of generations.

// Submodules
mod blocks;
mod table;
mod text_run;

// Re-export public types
pub use blocks::{
    retain_opaque, retain_paragraphs, visit_opaque, visit_opaque_mut, visit_paragraphs,
    visit_paragraphs_mut, Block, Paragraph,
};
pub use table::{Table, TableCell, TableRow};
pub use text_run::{RunFormat, TextRun};

/// A header or footer part
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// Package entry name, e.g. `word/header1.xml`
    pub name: String,

    /// Part content
    pub blocks: Vec<Block>,
}

/// A complete document: body plus header and footer parts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Main body blocks in document order
    pub body: Vec<Block>,

    /// Header parts
    pub headers: Vec<Part>,

    /// Footer parts
    pub footers: Vec<Part>,
}

impl Document {
    /// Create a document with a body and no headers or footers
    pub fn new(body: Vec<Block>) -> Self {
        Self {
            body,
            headers: Vec::new(),
            footers: Vec::new(),
        }
    }

    /// Mutable access to every block sequence: body first, then headers, then footers
    pub fn block_sequences_mut(&mut self) -> impl Iterator<Item = &mut Vec<Block>> {
        std::iter::once(&mut self.body)
            .chain(self.headers.iter_mut().map(|p| &mut p.blocks))
            .chain(self.footers.iter_mut().map(|p| &mut p.blocks))
    }

    /// Every block sequence: body first, then headers, then footers
    pub fn block_sequences(&self) -> impl Iterator<Item = &Vec<Block>> {
        std::iter::once(&self.body)
            .chain(self.headers.iter().map(|p| &p.blocks))
            .chain(self.footers.iter().map(|p| &p.blocks))
    }

    /// Call `f` on every paragraph of the document, including table cells,
    /// headers and footers
    pub fn for_each_paragraph_mut(&mut self, f: &mut dyn FnMut(&mut Paragraph)) {
        for blocks in self.block_sequences_mut() {
            visit_paragraphs_mut(blocks, f);
        }
    }

    /// Call `f` on every paragraph of the document
    pub fn for_each_paragraph(&self, f: &mut dyn FnMut(&Paragraph)) {
        for blocks in self.block_sequences() {
            visit_paragraphs(blocks, f);
        }
    }

    /// Call `f` on the raw markup of every opaque block of the document
    pub fn for_each_opaque_mut(&mut self, f: &mut dyn FnMut(&mut String)) {
        for blocks in self.block_sequences_mut() {
            visit_opaque_mut(blocks, f);
        }
    }

    /// Call `f` on the raw markup of every opaque block of the document
    pub fn for_each_opaque(&self, f: &mut dyn FnMut(&str)) {
        for blocks in self.block_sequences() {
            visit_opaque(blocks, f);
        }
    }

    /// Logical text of every paragraph, in visiting order
    pub fn paragraph_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        self.for_each_paragraph(&mut |p: &Paragraph| texts.push(p.text()));
        texts
    }

    /// Logical text of the top-level body paragraphs only
    pub fn body_texts(&self) -> Vec<String> {
        self.body
            .iter()
            .filter_map(Block::as_paragraph)
            .map(Paragraph::text)
            .collect()
    }

    /// All paragraph texts joined with newlines
    pub fn full_text(&self) -> String {
        self.paragraph_texts().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_texts_cover_headers_and_footers() {
        let mut doc = Document::new(vec![Block::Paragraph(Paragraph::new("body"))]);
        doc.headers.push(Part {
            name: "word/header1.xml".to_string(),
            blocks: vec![Block::Paragraph(Paragraph::new("head"))],
        });
        doc.footers.push(Part {
            name: "word/footer1.xml".to_string(),
            blocks: vec![Block::Paragraph(Paragraph::new("foot"))],
        });

        assert_eq!(doc.paragraph_texts(), vec!["body", "head", "foot"]);
        assert_eq!(doc.body_texts(), vec!["body"]);
    }
}
