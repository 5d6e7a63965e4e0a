//! The template-merge engine
//!
//! Each stage is a function over an owned block sequence:
//! normalization, placeholder substitution, conditional evaluation, clause
//! insertion, label renumbering and the final cleanup sweep. The pipeline
//! decides the order; these modules only know how to do their own step.

// Submodules
mod cleanup;
mod conditionals;
mod insertion;
mod normalize;
mod placeholders;
mod renumber;
mod roman;

// Re-export public types
pub use cleanup::{apply_rewrites, collapse_empty_values, sweep_markers, TextRewrite};
pub use conditionals::{
    markers_in, resolve_blocks, resolve_conditionals, resolve_opaque, resolve_paragraph, tokenize,
    ConditionalSummary, Facts, Marker, ParagraphState, Segment,
};
pub use insertion::{find_marker, insert_at, ClauseFragment};
pub use normalize::normalize;
pub use placeholders::{substitute, PlaceholderMap, Substituter};
pub use renumber::{renumber, Anchor, LabelAnomaly, LabelPattern, RenumberOutcome, SectionLabel};
pub use roman::{parse_roman, to_roman, MAX_ROMAN};
