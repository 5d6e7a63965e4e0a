//! Conditional block evaluation
//!
//! Templates mark conditional text with `##...##` tokens. Each token is parsed
//! once into a [`Marker`] and the paragraph is then interpreted against a set
//! of boolean [`Facts`]:
//!
//! | Token | Fact true | Fact false |
//! |---|---|---|
//! | `##IF_X##` ... `##END_IF##` | markers stripped | paragraph removed |
//! | `##IF_NOT_X##` ... `##END_IF##` | paragraph removed | markers stripped |
//! | `##DELETE_BEFORE_IF_NOT_X##` | marker stripped | text before the marker dropped |
//! | `##IF_NO_X_REPLACE_WITH: text##` ... `##END_IF##` | marker stripped, span kept | span replaced by `text` |
//!
//! The fallback span ends at the matching `##END_IF##` or at the end of the
//! paragraph. Any other `##...##` token, such as an insertion point, is left
//! in place for later stages.
//!
//! Opaque blocks honor guards only: a false guard removes the block and a true
//! one strips the guard tokens from its text nodes. Delete-leading and
//! fallback markers need the paragraph text rebuilt, so in opaque blocks they
//! are left for the final marker sweep to strip and report.

use crate::docx::{opaque_text, rewrite_text_nodes};
use crate::template_model::{retain_opaque, retain_paragraphs, Block, Document, Paragraph};
use std::collections::{BTreeMap, HashMap};

use super::normalize::normalize;

/// Source of boolean facts for marker evaluation
pub trait Facts {
    /// Look up a fact by its upper-snake-case name
    ///
    /// # Returns
    /// * `Some(bool)` - The fact is known
    /// * `None` - No such fact; evaluation treats it as false
    fn fact(&self, name: &str) -> Option<bool>;
}

impl Facts for HashMap<String, bool> {
    fn fact(&self, name: &str) -> Option<bool> {
        self.get(name).copied()
    }
}

impl Facts for BTreeMap<String, bool> {
    fn fact(&self, name: &str) -> Option<bool> {
        self.get(name).copied()
    }
}

/// A parsed conditional marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Keep the paragraph only when the guard holds
    If {
        /// Guarding fact
        fact: String,
        /// `IF_NOT_` form: keep only when the fact is false
        negated: bool,
    },

    /// Closes the innermost open guard or fallback span
    EndIf,

    /// Drop everything before the marker when the fact is false
    DeleteBefore {
        /// Guarding fact
        fact: String,
    },

    /// Replace the span with `text` when the fact is false
    Fallback {
        /// Guarding fact
        fact: String,
        /// Replacement text
        text: String,
    },
}

/// Legacy wording of the delete-leading marker used by older will templates
const LEGACY_DELETE_LEADING: &str = "Delete first sentence if unmarried";

impl Marker {
    /// Parse the body of a `##...##` token
    ///
    /// # Returns
    /// * `Some(Marker)` - The token is a conditional marker
    /// * `None` - The token is something else (an insertion point or unknown)
    pub fn parse(body: &str) -> Option<Marker> {
        let body = body.trim();

        if body.eq_ignore_ascii_case("END_IF") || body.eq_ignore_ascii_case("ENDIF") {
            return Some(Marker::EndIf);
        }
        if body.eq_ignore_ascii_case(LEGACY_DELETE_LEADING) {
            return Some(Marker::DeleteBefore {
                fact: "MARRIED".to_string(),
            });
        }
        if let Some(rest) = body.strip_prefix("IF_NO_") {
            if let Some((fact, text)) = rest.split_once("_REPLACE_WITH:") {
                return Some(Marker::Fallback {
                    fact: fact.trim().to_uppercase(),
                    text: text.trim().to_string(),
                });
            }
        }
        if let Some(fact) = body.strip_prefix("DELETE_BEFORE_IF_NOT_") {
            return valid_fact(fact).map(|fact| Marker::DeleteBefore { fact });
        }
        if let Some(fact) = body.strip_prefix("IF_NOT_") {
            return valid_fact(fact).map(|fact| Marker::If {
                fact,
                negated: true,
            });
        }
        if let Some(fact) = body.strip_prefix("IF_") {
            return valid_fact(fact).map(|fact| Marker::If {
                fact,
                negated: false,
            });
        }
        None
    }
}

fn valid_fact(name: &str) -> Option<String> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| name.to_uppercase())
}

/// A piece of paragraph text: plain text or a `##...##` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Plain text
    Text(&'a str),
    /// A complete token including its `##` delimiters, and its body
    Token {
        /// The token as written, e.g. `##END_IF##`
        raw: &'a str,
        /// The text between the delimiters
        body: &'a str,
    },
}

/// Split text into plain text and `##...##` tokens
///
/// An unpaired `##` stays part of the plain text.
pub fn tokenize(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("##") {
        let after_open = &rest[start + 2..];
        let Some(len) = after_open.find("##") else {
            break;
        };
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }
        let end = start + 2 + len + 2;
        segments.push(Segment::Token {
            raw: &rest[start..end],
            body: &after_open[..len],
        });
        rest = &rest[end..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

/// The conditional markers found in `text`, in order
pub fn markers_in(text: &str) -> Vec<Marker> {
    tokenize(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Token { body, .. } => Marker::parse(body),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Per-paragraph evaluation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphState {
    /// The paragraph holds no conditional marker
    NoMarker,
    /// Markers resolved; the paragraph stays with its remaining text
    MarkedKeep,
    /// The paragraph must be removed
    MarkedDrop,
}

/// Counts from one evaluation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionalSummary {
    /// Paragraphs whose markers were resolved and kept
    pub kept: usize,
    /// Paragraphs removed
    pub dropped: usize,
}

enum Frame {
    Guard,
    Fallback { suppress: bool },
}

fn evaluate(facts: &dyn Facts, name: &str) -> bool {
    facts.fact(name).unwrap_or_else(|| {
        log::warn!("Unknown fact '{}' in conditional marker, treating as false", name);
        false
    })
}

/// Append text after a stripped marker without doubling the space around it
fn push_joined(out: &mut String, text: &str, after_marker: bool) {
    if after_marker && out.ends_with(' ') && text.starts_with(' ') {
        out.push_str(&text[1..]);
    } else {
        out.push_str(text);
    }
}

/// Resolve the conditional markers of a single paragraph
///
/// When the paragraph is kept, it is normalized and its text replaced by the
/// resolved text. A dropped paragraph is left untouched for the caller to
/// remove.
pub fn resolve_paragraph(paragraph: &mut Paragraph, facts: &dyn Facts) -> ParagraphState {
    let text = paragraph.text();
    let segments = tokenize(&text);

    let parsed: Vec<(Segment<'_>, Option<Marker>)> = segments
        .into_iter()
        .map(|segment| {
            let marker = match segment {
                Segment::Token { body, .. } => Marker::parse(body),
                Segment::Text(_) => None,
            };
            (segment, marker)
        })
        .collect();

    if parsed.iter().all(|(_, marker)| marker.is_none()) {
        return ParagraphState::NoMarker;
    }

    for (_, marker) in &parsed {
        if let Some(Marker::If { fact, negated }) = marker {
            if evaluate(facts, fact) == *negated {
                log::debug!("Dropping paragraph guarded by {}", fact);
                return ParagraphState::MarkedDrop;
            }
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<Frame> = Vec::new();
    let mut suppressed = 0usize;
    let mut after_marker = false;
    let mut after_delete = false;

    for (segment, marker) in parsed {
        match (segment, marker) {
            (Segment::Text(s), _) | (Segment::Token { raw: s, .. }, None) => {
                if suppressed > 0 {
                    continue;
                }
                let s = if after_delete { s.trim_start() } else { s };
                push_joined(&mut out, s, after_marker);
                after_marker = false;
                after_delete = false;
            }
            (_, Some(Marker::If { .. })) => {
                stack.push(Frame::Guard);
                after_marker = true;
            }
            (_, Some(Marker::EndIf)) => {
                match stack.pop() {
                    Some(Frame::Fallback { suppress: true }) => suppressed -= 1,
                    Some(_) => {}
                    None => log::debug!("Unmatched END_IF marker stripped"),
                }
                after_marker = true;
            }
            (_, Some(Marker::DeleteBefore { fact })) => {
                if suppressed == 0 && !evaluate(facts, &fact) {
                    out.clear();
                    after_delete = true;
                }
                after_marker = true;
            }
            (_, Some(Marker::Fallback { fact, text })) => {
                let suppress = suppressed == 0 && !evaluate(facts, &fact);
                if suppress {
                    push_joined(&mut out, &text, after_marker);
                    suppressed += 1;
                }
                stack.push(Frame::Fallback { suppress });
                after_marker = !suppress;
            }
        }
    }

    if out.trim().is_empty() {
        return ParagraphState::MarkedDrop;
    }

    normalize(paragraph);
    paragraph.set_text(out);
    ParagraphState::MarkedKeep
}

/// Strip guard and end tokens from one text node
fn strip_guards(text: &str) -> Option<String> {
    let segments = tokenize(text);
    let is_guard = |segment: &Segment<'_>| {
        matches!(segment, Segment::Token { body, .. }
            if matches!(Marker::parse(body), Some(Marker::If { .. } | Marker::EndIf)))
    };
    if !segments.iter().any(is_guard) {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut after_marker = false;
    for segment in &segments {
        match segment {
            _ if is_guard(segment) => after_marker = true,
            Segment::Text(s) | Segment::Token { raw: s, .. } => {
                push_joined(&mut out, s, after_marker);
                after_marker = false;
            }
        }
    }
    Some(out)
}

/// Resolve the guards of an opaque block
///
/// A kept block has its guard tokens stripped; a dropped block is left
/// untouched for the caller to remove.
pub fn resolve_opaque(raw: &mut String, facts: &dyn Facts) -> ParagraphState {
    let markers = markers_in(&opaque_text(raw));
    if markers.is_empty() {
        return ParagraphState::NoMarker;
    }

    for marker in &markers {
        if let Marker::If { fact, negated } = marker {
            if evaluate(facts, fact) == *negated {
                log::debug!("Dropping unmodeled block guarded by {}", fact);
                return ParagraphState::MarkedDrop;
            }
        }
    }

    if let Some(rewritten) = rewrite_text_nodes(raw, &mut strip_guards) {
        *raw = rewritten;
    }
    ParagraphState::MarkedKeep
}

fn tally(summary: &mut ConditionalSummary, state: ParagraphState) -> bool {
    match state {
        ParagraphState::NoMarker => true,
        ParagraphState::MarkedKeep => {
            summary.kept += 1;
            true
        }
        ParagraphState::MarkedDrop => {
            summary.dropped += 1;
            false
        }
    }
}

/// Resolve conditionals in a block sequence, removing dropped paragraphs
///
/// Paragraphs inside table cells are evaluated and may be removed; tables are
/// never removed. Opaque blocks are resolved with [`resolve_opaque`].
pub fn resolve_blocks(blocks: &mut Vec<Block>, facts: &dyn Facts) -> ConditionalSummary {
    let mut summary = ConditionalSummary::default();
    retain_paragraphs(blocks, &mut |p: &mut Paragraph| {
        tally(&mut summary, resolve_paragraph(p, facts))
    });
    retain_opaque(blocks, &mut |raw: &mut String| {
        tally(&mut summary, resolve_opaque(raw, facts))
    });
    summary
}

/// Resolve conditionals in the body, headers and footers
pub fn resolve_conditionals(document: &mut Document, facts: &dyn Facts) -> ConditionalSummary {
    let mut summary = ConditionalSummary::default();
    for blocks in document.block_sequences_mut() {
        let part = resolve_blocks(blocks, facts);
        summary.kept += part.kept;
        summary.dropped += part.dropped;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_model::TextRun;

    fn facts(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn resolve(text: &str, facts: &HashMap<String, bool>) -> (ParagraphState, String) {
        let mut p = Paragraph::new(text);
        let state = resolve_paragraph(&mut p, facts);
        (state, p.text())
    }

    #[test]
    fn test_parse_markers() {
        assert_eq!(
            Marker::parse("IF_MARRIED"),
            Some(Marker::If {
                fact: "MARRIED".to_string(),
                negated: false
            })
        );
        assert_eq!(
            Marker::parse("IF_NOT_MARRIED"),
            Some(Marker::If {
                fact: "MARRIED".to_string(),
                negated: true
            })
        );
        assert_eq!(Marker::parse("END_IF"), Some(Marker::EndIf));
        assert_eq!(
            Marker::parse("IF_NO_CONTINGENT_BENEFICIARY_REPLACE_WITH: my heirs at law"),
            Some(Marker::Fallback {
                fact: "CONTINGENT_BENEFICIARY".to_string(),
                text: "my heirs at law".to_string()
            })
        );
        assert_eq!(
            Marker::parse("Delete first sentence if unmarried"),
            Some(Marker::DeleteBefore {
                fact: "MARRIED".to_string()
            })
        );
        assert_eq!(Marker::parse("INSERT_NEW_ARTICLES"), None);
    }

    #[test]
    fn test_tokenize_leaves_unpaired_delimiter_as_text() {
        let segments = tokenize("a ##IF_X## b ## c");
        assert_eq!(
            segments,
            vec![
                Segment::Text("a "),
                Segment::Token {
                    raw: "##IF_X##",
                    body: "IF_X"
                },
                Segment::Text(" b ## c"),
            ]
        );
    }

    #[test]
    fn test_guard_true_strips_markers() {
        let f = facts(&[("MARRIED", true)]);
        let (state, text) = resolve("##IF_MARRIED##I am married to JOHN DOE.##END_IF##", &f);
        assert_eq!(state, ParagraphState::MarkedKeep);
        assert_eq!(text, "I am married to JOHN DOE.");
    }

    #[test]
    fn test_guard_false_drops_paragraph() {
        let f = facts(&[("MARRIED", false)]);
        let (state, _) = resolve("##IF_MARRIED##I am married.##END_IF##", &f);
        assert_eq!(state, ParagraphState::MarkedDrop);
    }

    #[test]
    fn test_negated_guard() {
        let f = facts(&[("MARRIED", false)]);
        let (state, text) = resolve("##IF_NOT_MARRIED##I am not married.##END_IF##", &f);
        assert_eq!(state, ParagraphState::MarkedKeep);
        assert_eq!(text, "I am not married.");
    }

    #[test]
    fn test_delete_before_when_false() {
        let f = facts(&[("MARRIED", false)]);
        let (state, text) = resolve(
            "I am married to . ##Delete first sentence if unmarried## I have two children.",
            &f,
        );
        assert_eq!(state, ParagraphState::MarkedKeep);
        assert_eq!(text, "I have two children.");
    }

    #[test]
    fn test_delete_before_when_true_only_strips_marker() {
        let f = facts(&[("MARRIED", true)]);
        let (_, text) = resolve(
            "I am married to JOHN. ##DELETE_BEFORE_IF_NOT_MARRIED## I have two children.",
            &f,
        );
        assert_eq!(text, "I am married to JOHN. I have two children.");
    }

    #[test]
    fn test_fallback_replaces_span_when_false() {
        let f = facts(&[("CONTINGENT_BENEFICIARY", false)]);
        let (state, text) = resolve(
            "then to ##IF_NO_CONTINGENT_BENEFICIARY_REPLACE_WITH: my heirs at law##my brother##END_IF## in equal shares.",
            &f,
        );
        assert_eq!(state, ParagraphState::MarkedKeep);
        assert_eq!(text, "then to my heirs at law in equal shares.");
        assert!(!text.contains("my brother"));
    }

    #[test]
    fn test_fallback_keeps_span_when_true() {
        let f = facts(&[("CONTINGENT_BENEFICIARY", true)]);
        let (_, text) = resolve(
            "then to ##IF_NO_CONTINGENT_BENEFICIARY_REPLACE_WITH: my heirs at law##my brother##END_IF##.",
            &f,
        );
        assert_eq!(text, "then to my brother.");
    }

    #[test]
    fn test_fallback_without_end_runs_to_paragraph_end() {
        let f = facts(&[("TRUSTEE", false)]);
        let (_, text) = resolve(
            "Trustee: ##IF_NO_TRUSTEE_REPLACE_WITH: my Executor##someone named here",
            &f,
        );
        assert_eq!(text, "Trustee: my Executor");
    }

    #[test]
    fn test_unknown_fact_is_false() {
        let f = facts(&[]);
        let (state, _) = resolve("##IF_SOMETHING##text##END_IF##", &f);
        assert_eq!(state, ParagraphState::MarkedDrop);
    }

    #[test]
    fn test_insertion_token_is_not_conditional() {
        let f = facts(&[]);
        let (state, text) = resolve("##INSERT_NEW_ARTICLES##", &f);
        assert_eq!(state, ParagraphState::NoMarker);
        assert_eq!(text, "##INSERT_NEW_ARTICLES##");
    }

    #[test]
    fn test_no_residual_markers_after_resolution() {
        let f = facts(&[("MARRIED", true), ("CHILDREN", false)]);
        let mut doc = Document::new(vec![
            Block::Paragraph(Paragraph::from_runs(vec![
                TextRun::new("##IF_MAR"),
                TextRun::new("RIED##Spouse clause##END_IF##"),
            ])),
            Block::Paragraph(Paragraph::new("##IF_CHILDREN##Children clause##END_IF##")),
            Block::Paragraph(Paragraph::new("Plain")),
        ]);

        let summary = resolve_conditionals(&mut doc, &f);

        assert_eq!(summary.kept, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(doc.body_texts(), vec!["Spouse clause", "Plain"]);
        assert!(doc.paragraph_texts().iter().all(|t| !t.contains("##")));
    }

    #[test]
    fn test_marker_only_paragraph_is_dropped() {
        let f = facts(&[("MARRIED", true)]);
        let (state, _) = resolve("##IF_MARRIED##", &f);
        assert_eq!(state, ParagraphState::MarkedDrop);
    }

    #[test]
    fn test_opaque_blocks_honor_guards() {
        let f = facts(&[("MARRIED", false)]);
        let mut blocks = vec![
            Block::Opaque(
                r#"<w:p><w:hyperlink r:id="rId4"><w:r><w:t>##IF_MARRIED##See my spouse</w:t></w:r></w:hyperlink><w:r><w:t>##END_IF##</w:t></w:r></w:p>"#
                    .to_string(),
            ),
            Block::Opaque(
                r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:t>##IF_NOT_MARRIED##Single ##END_IF##page</w:t></w:r></w:p>"#
                    .to_string(),
            ),
        ];

        let summary = resolve_blocks(&mut blocks, &f);

        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.kept, 1);
        let Block::Opaque(raw) = &blocks[0] else {
            panic!("expected opaque block");
        };
        assert_eq!(opaque_text(raw), "Single page");
        assert!(raw.contains("fldChar"));
    }

    #[test]
    fn test_markers_in_skips_insertion_points() {
        assert_eq!(
            markers_in("##INSERT_NEW_ARTICLES## ##IF_TRUST##x##END_IF##"),
            [
                Marker::If {
                    fact: "TRUST".to_string(),
                    negated: false
                },
                Marker::EndIf
            ]
        );
    }
}
