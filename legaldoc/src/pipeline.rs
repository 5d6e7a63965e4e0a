//! Document generation pipeline
//!
//! A single pipeline, parameterized by a document profile, turns a template,
//! a clause library and one client record into a finished document:
//!
//! 1. Validate required fields
//! 2. Derive the generation context (pronouns, marital status, children, facts)
//! 3. Select and load the clauses each insertion point asks for
//! 4. Build and compile the placeholder map
//! 5. Substitute placeholders in a clone of the template
//! 6. Resolve conditional markers
//! 7. Splice clause fragments in at their markers
//! 8. Renumber section labels
//! 9. Apply the profile's cleanup rewrites and sweep leftover markers
//!
//! The template is never modified; every generation works on its own clone.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::clause_library::ClauseLibrary;
use crate::context::GenerationContext;
use crate::docx::{opaque_text, opaque_text_nodes};
use crate::error::GenerateError;
use crate::filename::suggested_filename;
use crate::input::InputRecord;
use crate::merge::{
    apply_rewrites, collapse_empty_values, insert_at, renumber, resolve_blocks,
    resolve_conditionals, sweep_markers, tokenize, Anchor, ClauseFragment, ConditionalSummary, LabelAnomaly,
    LabelPattern, PlaceholderMap, Segment, Substituter, TextRewrite,
};
use crate::profile_config::{ClauseRule, Condition, DocumentProfile, InsertionPoint};
use crate::template_model::{visit_paragraphs, Block, Document, Paragraph};

/// Upper-snake-case placeholder tokens, spaced variants included
const TOKEN_PATTERN: &str = r"\{[A-Z][A-Z0-9_ ]*\}";

/// Per-run settings that are not part of the client record
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Date used for ages and the output filename
    pub today: NaiveDate,

    /// Practice-wide field defaults, beneath client input
    pub defaults: BTreeMap<String, String>,
}

impl GenerateOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            defaults: BTreeMap::new(),
        }
    }

    /// Add practice defaults
    pub fn with_defaults(mut self, defaults: BTreeMap<String, String>) -> Self {
        self.defaults = defaults;
        self
    }
}

/// A selected clause that did not make it into the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedClause {
    /// Clause identifier from the profile
    pub id: String,
    /// Why it was skipped
    pub reason: String,
}

/// What one generation did
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Placeholder replacements made in the template
    pub replacements: usize,

    /// Conditional paragraphs kept and dropped, fragments included
    pub conditionals: ConditionalSummary,

    /// Clause identifiers inserted, in document order per insertion point
    pub inserted_clauses: Vec<String>,

    /// Clauses selected but not inserted
    pub skipped_clauses: Vec<SkippedClause>,

    /// Template tokens with no value, substituted with empty text
    pub unmapped_tokens: Vec<String>,

    /// Section labels whose numeral changed
    pub renumbered: usize,

    /// Section labels left alone because their numeral could not be read
    pub renumber_anomalies: Vec<LabelAnomaly>,

    /// Paragraphs changed by cleanup rewrites
    pub rewrites: usize,

    /// Paragraphs where an empty value left `", ,"` behind
    pub repaired_empty_values: usize,

    /// Markers still present at the end, removed from the output
    pub unresolved_markers: Vec<String>,

    /// Tokens in unmodeled blocks split across text nodes, left unprocessed
    pub split_tokens: Vec<String>,
}

/// A generated document and its suggested filename
#[derive(Debug, Clone)]
pub struct Generated {
    pub document: Document,
    pub report: GenerationReport,
    pub filename: String,
}

/// Clauses chosen for one insertion point, ready to splice
struct PreparedInsertion<'a> {
    point: &'a InsertionPoint,
    fragments: Vec<ClauseFragment>,
}

/// Check that every required field is present and non-blank
///
/// Fields are checked in profile order; the first missing one is reported.
pub fn validate_required(
    record: &InputRecord,
    profile: &DocumentProfile,
) -> Result<(), GenerateError> {
    match profile
        .required_fields
        .iter()
        .find(|field| record.text(field).is_none())
    {
        Some(field) => Err(GenerateError::MissingRequiredField {
            field: field.clone(),
            document_type: profile.title.clone(),
        }),
        None => Ok(()),
    }
}

/// Generate one document
///
/// # Parameters
/// * `template` - Parsed template; cloned, never modified
/// * `library` - Source of clause fragments
/// * `profile` - Document profile driving every stage
/// * `record` - Client input
/// * `options` - Generation date and practice defaults
///
/// # Returns
/// * `Ok(Generated)` - The finished document, its report and filename
/// * `Err(GenerateError)` - A required field is missing or a profile pattern is invalid
pub fn generate(
    template: &Document,
    library: &dyn ClauseLibrary,
    profile: &DocumentProfile,
    record: &InputRecord,
    options: &GenerateOptions,
) -> Result<Generated, GenerateError> {
    validate_required(record, profile)?;

    let label_patterns = profile
        .renumber
        .iter()
        .map(|rule| {
            LabelPattern::new(&rule.keyword)
                .map_err(|e| GenerateError::LabelPattern(rule.keyword.clone(), e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let context = GenerationContext::derive(record, profile, &options.defaults, options.today);
    let mut report = GenerationReport::default();

    // Clauses
    let insertions = prepare_insertions(profile, library, &context, &mut report);

    // Placeholder map
    let token_pattern = Regex::new(TOKEN_PATTERN)?;
    let mut map = context.placeholder_map(profile);
    report.unmapped_tokens = blank_unmapped_tokens(&mut map, &token_pattern, template, &insertions);
    let substituter = map.compile()?;
    log::info!("Generating {} with {} placeholders", profile.id, map.len());

    // Substitution and conditionals
    let mut document = template.clone();
    report.replacements = substituter.substitute(&mut document);
    let conditionals = resolve_conditionals(&mut document, &context);
    report.conditionals.kept += conditionals.kept;
    report.conditionals.dropped += conditionals.dropped;

    // Insertion
    let ranges = insert_clauses(&mut document, &insertions, &substituter, &mut report);

    // Renumbering
    for (rule, pattern) in profile.renumber.iter().zip(&label_patterns) {
        let anchor = match &rule.after {
            None => Anchor::DocumentStart,
            Some(marker) => match ranges.get(marker) {
                Some(range) => Anchor::Block(range.start),
                None => {
                    log::debug!(
                        "Skipping {} renumbering: {} not in template",
                        rule.keyword,
                        marker
                    );
                    continue;
                }
            },
        };
        let outcome = renumber(&mut document.body, pattern, rule.start, anchor);
        log::info!(
            "Renumbered {} {} labels ({} changed)",
            outcome.numbered,
            rule.keyword,
            outcome.changed
        );
        report.renumbered += outcome.changed;
        report.renumber_anomalies.extend(outcome.anomalies);
    }

    // Cleanup
    let rewrites = expand_rewrites(profile, &context, &substituter);
    report.rewrites = apply_rewrites(&mut document, &rewrites);
    report.repaired_empty_values = collapse_empty_values(&mut document);
    report.split_tokens = split_tokens(&document, &token_pattern);
    report.unresolved_markers = sweep_markers(&mut document);

    let filename = suggested_filename(
        options.today,
        &profile.abbreviation,
        record.text(&profile.name_field).unwrap_or_default(),
        "docx",
    );

    log::info!(
        "Generated {}: {} replacements, {} clauses, {} unresolved markers",
        filename,
        report.replacements,
        report.inserted_clauses.len(),
        report.unresolved_markers.len()
    );

    Ok(Generated {
        document,
        report,
        filename,
    })
}

/// Generate one document per record from the same template
///
/// Records are processed in parallel when the `parallel` feature is enabled.
/// Results are returned in record order; a failing record does not stop the
/// others.
pub fn generate_batch(
    template: &Document,
    library: &dyn ClauseLibrary,
    profile: &DocumentProfile,
    records: &[InputRecord],
    options: &GenerateOptions,
) -> Vec<Result<Generated, GenerateError>> {
    #[cfg(feature = "parallel")]
    let results: Vec<_> = records
        .par_iter()
        .map(|record| generate(template, library, profile, record, options))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = records
        .iter()
        .map(|record| generate(template, library, profile, record, options))
        .collect();

    results
}

/// Load the clauses every insertion point selects, in profile order
///
/// Clauses that fail to load are skipped with a warning. Fragment conditionals
/// are resolved here so that the inserted ranges stay stable afterwards.
fn prepare_insertions<'a>(
    profile: &'a DocumentProfile,
    library: &dyn ClauseLibrary,
    context: &GenerationContext,
    report: &mut GenerationReport,
) -> Vec<PreparedInsertion<'a>> {
    profile
        .insertions
        .iter()
        .map(|point| {
            let mut fragments = Vec::new();
            for rule in &point.clauses {
                if !rule.condition().holds(context) {
                    log::debug!("Clause '{}' not selected", rule.clause);
                    continue;
                }
                match library.load(rule.source_name()) {
                    Ok(fragment) => {
                        let mut fragment = shape_fragment(point, rule, fragment);
                        let summary = resolve_blocks(&mut fragment.blocks, context);
                        report.conditionals.kept += summary.kept;
                        report.conditionals.dropped += summary.dropped;
                        fragments.push(fragment);
                    }
                    Err(e) => {
                        log::warn!("Skipping clause '{}': {}", rule.clause, e);
                        report.skipped_clauses.push(SkippedClause {
                            id: rule.clause.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            PreparedInsertion { point, fragments }
        })
        .collect()
}

/// Add the clause heading and the insertion point's paragraph style
fn shape_fragment(
    point: &InsertionPoint,
    rule: &ClauseRule,
    fragment: ClauseFragment,
) -> ClauseFragment {
    let mut blocks = Vec::with_capacity(fragment.blocks.len() + 1);

    if let Some(heading) = &rule.heading {
        let paragraph = match &point.heading_style {
            Some(style) => Paragraph::styled(style.clone(), heading.clone()),
            None => Paragraph::new(heading.clone()),
        };
        blocks.push(Block::Paragraph(paragraph));
    }

    for mut block in fragment.blocks {
        if let (Some(style), Block::Paragraph(p)) = (&point.paragraph_style, &mut block) {
            if p.style.is_none() && p.properties_xml.is_none() {
                p.style = Some(style.clone());
            }
        }
        blocks.push(block);
    }

    ClauseFragment::new(rule.clause.clone(), blocks)
}

/// Map every placeholder-shaped token with no value to empty text
///
/// # Returns
/// * `Vec<String>` - The tokens blanked, sorted
fn blank_unmapped_tokens(
    map: &mut PlaceholderMap,
    pattern: &Regex,
    template: &Document,
    insertions: &[PreparedInsertion<'_>],
) -> Vec<String> {
    let mut unmapped: BTreeSet<String> = BTreeSet::new();

    let mut collect = |text: &str| {
        for found in pattern.find_iter(text) {
            if !map.contains(found.as_str()) {
                unmapped.insert(found.as_str().to_string());
            }
        }
    };

    for text in template.paragraph_texts() {
        collect(&text);
    }
    template.for_each_opaque(&mut |raw: &str| collect(&opaque_text(raw)));
    for fragment in insertions.iter().flat_map(|i| &i.fragments) {
        visit_paragraphs(&fragment.blocks, &mut |p: &Paragraph| collect(&p.text()));
    }

    for token in &unmapped {
        log::debug!("No value for {}, substituting empty text", token);
        map.insert(token.clone(), "");
    }
    unmapped.into_iter().collect()
}

/// Placeholders and markers in opaque blocks that no single text node holds
///
/// Word may split a token over several `w:t` nodes inside a hyperlink or
/// field result; such a token survives substitution and the marker sweep.
fn split_tokens(document: &Document, pattern: &Regex) -> Vec<String> {
    let mut split = Vec::new();
    document.for_each_opaque(&mut |raw: &str| {
        let nodes = opaque_text_nodes(raw);
        let text = nodes.concat();
        let markers = tokenize(&text).into_iter().filter_map(|segment| match segment {
            Segment::Token { raw, .. } => Some(raw),
            Segment::Text(_) => None,
        });
        for token in pattern.find_iter(&text).map(|m| m.as_str()).chain(markers) {
            if !nodes.iter().any(|node| node.contains(token)) {
                log::warn!("{} is split across text nodes of an unmodeled block", token);
                split.push(token.to_string());
            }
        }
    });
    split
}

/// Splice each insertion point's fragments in at its marker
///
/// # Returns
/// * `BTreeMap<String, Range<usize>>` - Body indices of each inserted range, by marker
fn insert_clauses(
    document: &mut Document,
    insertions: &[PreparedInsertion<'_>],
    substituter: &Substituter,
    report: &mut GenerationReport,
) -> BTreeMap<String, Range<usize>> {
    let mut ranges: BTreeMap<String, Range<usize>> = BTreeMap::new();

    for insertion in insertions {
        let marker = &insertion.point.marker;
        match insert_at(&mut document.body, marker, &insertion.fragments, substituter) {
            Some(range) => {
                // The marker paragraph was replaced by `range.len()` blocks
                let grown = range.len();
                for earlier in ranges.values_mut() {
                    if earlier.start > range.start {
                        *earlier = earlier.start + grown - 1..earlier.end + grown - 1;
                    }
                }
                report
                    .inserted_clauses
                    .extend(insertion.fragments.iter().map(|f| f.id.clone()));
                ranges.insert(marker.clone(), range);
            }
            None => {
                for fragment in &insertion.fragments {
                    log::warn!(
                        "Clause '{}' dropped: marker {} not found in template",
                        fragment.id,
                        marker
                    );
                    report.skipped_clauses.push(SkippedClause {
                        id: fragment.id.clone(),
                        reason: format!("marker {} not found", marker),
                    });
                }
            }
        }
    }

    ranges
}

/// Cleanup rewrites whose condition holds, with placeholders expanded
fn expand_rewrites(
    profile: &DocumentProfile,
    context: &GenerationContext,
    substituter: &Substituter,
) -> Vec<TextRewrite> {
    let expand = |text: &str| {
        substituter
            .apply(text)
            .map(|(expanded, _)| expanded)
            .unwrap_or_else(|| text.to_string())
    };

    profile
        .rewrites
        .iter()
        .filter(|rule| {
            rule.when
                .as_deref()
                .map_or(Condition::Always, Condition::parse)
                .holds(context)
        })
        .map(|rule| TextRewrite {
            find: expand(&rule.find),
            replace: expand(&rule.replace),
        })
        .collect()
}
