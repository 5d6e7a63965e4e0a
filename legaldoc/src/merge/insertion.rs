//! Clause insertion at marker paragraphs
//!
//! An insertion point is a top-level paragraph whose trimmed text is exactly a
//! marker token such as `##INSERT_NEW_ARTICLES##`. Inserting replaces that
//! paragraph with the blocks of each fragment, cloned and substituted, in the
//! order the caller gives.

use crate::template_model::{Block, Paragraph};
use std::ops::Range;

use super::placeholders::Substituter;

/// A named block sequence loaded from a clause library
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseFragment {
    /// Clause identifier, e.g. `no_contest`
    pub id: String,

    /// Fragment content in order
    pub blocks: Vec<Block>,
}

impl ClauseFragment {
    /// Create a fragment from blocks
    pub fn new(id: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            id: id.into(),
            blocks,
        }
    }

    /// Create a fragment of plain paragraphs, one per entry
    pub fn from_paragraphs<I, S>(id: impl Into<String>, paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            blocks: paragraphs
                .into_iter()
                .map(|text| Block::Paragraph(Paragraph::new(text)))
                .collect(),
        }
    }
}

/// Index of the first top-level paragraph whose trimmed text equals `marker`
pub fn find_marker(blocks: &[Block], marker: &str) -> Option<usize> {
    blocks.iter().position(|block| {
        block
            .as_paragraph()
            .is_some_and(|p| p.text().trim() == marker)
    })
}

/// Replace the marker paragraph with the given fragments
///
/// Each fragment is cloned, run through `substituter`, and spliced in at the
/// marker's former position. An empty fragment list only removes the marker.
///
/// # Parameters
/// * `blocks` - Top-level block sequence holding the marker
/// * `marker` - Exact marker token, e.g. `##INSERT_NEW_ARTICLES##`
/// * `fragments` - Fragments in priority order
/// * `substituter` - Placeholder map applied to every cloned fragment
///
/// # Returns
/// * `Some(Range<usize>)` - Indices now occupied by the inserted blocks
/// * `None` - The marker does not occur; nothing changed
pub fn insert_at(
    blocks: &mut Vec<Block>,
    marker: &str,
    fragments: &[ClauseFragment],
    substituter: &Substituter,
) -> Option<Range<usize>> {
    let index = find_marker(blocks, marker)?;
    blocks.remove(index);

    let mut inserted: Vec<Block> = Vec::new();
    for fragment in fragments {
        let mut cloned = fragment.blocks.clone();
        substituter.substitute_blocks(&mut cloned);
        log::debug!(
            "Inserting clause '{}' ({} blocks) at {}",
            fragment.id,
            cloned.len(),
            marker
        );
        inserted.extend(cloned);
    }

    let count = inserted.len();
    let tail = blocks.split_off(index);
    blocks.extend(inserted);
    blocks.extend(tail);

    if find_marker(blocks, marker).is_some() {
        log::warn!(
            "Marker {} occurs more than once; only the first was used",
            marker
        );
    }

    Some(index..index + count)
}
