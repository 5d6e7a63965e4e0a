//! Final cleanup passes
//!
//! After conditionals, insertions and renumbering, the document may still
//! hold text the end user must never see: markers the template author
//! misspelled, insertion points the profile did not request, and punctuation
//! left behind by empty optional values. These passes remove them and report
//! what they removed.

use crate::docx::rewrite_text_nodes;
use crate::template_model::{retain_paragraphs, visit_opaque_mut, Document, Paragraph};

use super::conditionals::{tokenize, Segment};
use super::normalize::normalize;

/// A literal find/replace applied to every paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRewrite {
    /// Text to find
    pub find: String,
    /// Replacement text
    pub replace: String,
}

/// Remove `##...##` tokens and unpaired `##` from `text`, recording each
fn strip_markers(text: &str, removed: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_token = false;
    for segment in tokenize(text) {
        match segment {
            Segment::Token { raw, .. } => {
                log::warn!("Unresolved marker {} removed from output", raw);
                removed.push(raw.to_string());
                after_token = true;
            }
            Segment::Text(s) => {
                let mut s = s.to_string();
                if s.contains("##") {
                    log::warn!("Stray '##' removed from '{}'", text.trim());
                    removed.push("##".to_string());
                    s = s.replace("##", "");
                }
                if after_token && out.ends_with(' ') && s.starts_with(' ') {
                    s.remove(0);
                }
                out.push_str(&s);
                after_token = false;
            }
        }
    }
    out
}

/// Strip every remaining `##...##` token and unpaired `##`
///
/// Paragraphs that held nothing but markers are removed. Opaque blocks are
/// swept node by node and always kept.
///
/// # Returns
/// * `Vec<String>` - Every token removed, as written, in document order
pub fn sweep_markers(document: &mut Document) -> Vec<String> {
    let mut removed = Vec::new();

    for blocks in document.block_sequences_mut() {
        retain_paragraphs(blocks, &mut |p: &mut Paragraph| {
            let text = p.text();
            if !text.contains("##") {
                return true;
            }
            let out = strip_markers(&text, &mut removed);
            if out.trim().is_empty() {
                return false;
            }
            normalize(p);
            p.set_text(out);
            true
        });

        visit_opaque_mut(blocks, &mut |raw: &mut String| {
            let rewritten = rewrite_text_nodes(raw, &mut |text: &str| {
                text.contains("##")
                    .then(|| strip_markers(text, &mut removed))
            });
            if let Some(rewritten) = rewritten {
                *raw = rewritten;
            }
        });
    }

    removed
}

/// Apply literal rewrites to every paragraph containing their `find` text
///
/// # Returns
/// * `usize` - Number of paragraphs changed
pub fn apply_rewrites(document: &mut Document, rewrites: &[TextRewrite]) -> usize {
    let mut changed = 0;
    document.for_each_paragraph_mut(&mut |p: &mut Paragraph| {
        let text = p.text();
        let mut updated = text.clone();
        for rewrite in rewrites {
            if !rewrite.find.is_empty() && updated.contains(&rewrite.find) {
                updated = updated.replace(&rewrite.find, &rewrite.replace);
            }
        }
        if updated != text {
            normalize(p);
            p.set_text(updated);
            changed += 1;
        }
    });
    changed
}

/// Collapse `", ,"` left by an empty value between two commas
///
/// # Returns
/// * `usize` - Number of paragraphs repaired
pub fn collapse_empty_values(document: &mut Document) -> usize {
    let mut repaired = 0;
    document.for_each_paragraph_mut(&mut |p: &mut Paragraph| {
        let text = p.text();
        if !text.contains(", ,") {
            return;
        }
        log::warn!("Empty value left ', ,' in '{}'", text.trim());
        let mut updated = text;
        while updated.contains(", ,") {
            updated = updated.replace(", ,", ",");
        }
        normalize(p);
        p.set_text(updated);
        repaired += 1;
    });
    repaired
}
