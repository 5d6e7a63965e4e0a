//! Document profile schema
//!
//! A profile parameterizes the single generation pipeline for one document
//! type: which fields are required, which placeholders get uppercase values,
//! where clauses are inserted and under which conditions, which labels are
//! renumbered, and which literal rewrites tidy the unmarried path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::merge::Facts;

/// Per-document-type configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentProfile {
    /// Profile identifier (e.g., "will")
    pub id: String,

    /// Human-readable document title
    pub title: String,

    /// Abbreviation used in output filenames (e.g., "LWT")
    pub abbreviation: String,

    /// Other names accepted on the command line
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Default template file name, resolved against the templates directory
    pub template: String,

    /// Input field holding the client's full name
    #[serde(default = "default_name_field")]
    pub name_field: String,

    /// Input field whose presence means the client is married
    #[serde(default = "default_spouse_field")]
    pub spouse_field: String,

    /// Fields that must be present and non-blank
    #[serde(default)]
    pub required_fields: Vec<String>,

    /// Fields whose values are uppercased before substitution
    #[serde(default)]
    pub uppercase_fields: Vec<String>,

    /// Fields blanked when the client is not married
    #[serde(default)]
    pub married_only_fields: Vec<String>,

    /// Literal defaults for absent fields
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,

    /// Defaults copied from another field (`target = "SOURCE"`)
    #[serde(default)]
    pub field_defaults: BTreeMap<String, String>,

    /// Fields that stay blank unless a condition holds (`field = "CONDITION"`)
    #[serde(default)]
    pub guarded_fields: BTreeMap<String, String>,

    /// Extra tokens that resolve to another token's value (`"{he/she}" = "{CLIENT_PRONOUN}"`)
    #[serde(default)]
    pub placeholder_aliases: BTreeMap<String, String>,

    /// Accept `{CLIENT PRONOUN}` for `{CLIENT_PRONOUN}`
    #[serde(default)]
    pub spaced_tokens: bool,

    /// Clause insertion points in processing order
    #[serde(default)]
    pub insertions: Vec<InsertionPoint>,

    /// Section renumbering rules
    #[serde(default)]
    pub renumber: Vec<RenumberRule>,

    /// Literal rewrites applied after renumbering
    #[serde(default)]
    pub rewrites: Vec<RewriteRule>,
}

fn default_name_field() -> String {
    "CLIENT_NAME".to_string()
}

fn default_spouse_field() -> String {
    "CLIENT_SPOUSE_NAME".to_string()
}

fn default_start() -> u32 {
    1
}

/// A marker paragraph and the clauses that may replace it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertionPoint {
    /// Exact marker token, e.g. `##INSERT_NEW_ARTICLES##`
    pub marker: String,

    /// Style ID (`w:styleId`, e.g. `PleadingBody`) given to unstyled fragment
    /// paragraphs; display names such as `Pleading Body` are not style IDs
    #[serde(default)]
    pub paragraph_style: Option<String>,

    /// Style ID given to clause headings
    #[serde(default)]
    pub heading_style: Option<String>,

    /// Candidate clauses in priority order
    #[serde(default)]
    pub clauses: Vec<ClauseRule>,
}

/// One optional clause at an insertion point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseRule {
    /// Clause identifier
    pub clause: String,

    /// Name to request from the clause library, when different from the identifier
    #[serde(default)]
    pub source: Option<String>,

    /// Condition selecting the clause; defaults to the flag `INCLUDE_<CLAUSE>`
    #[serde(default)]
    pub when: Option<String>,

    /// Heading paragraph inserted before the clause, e.g. `Article VI - No Contest`
    #[serde(default)]
    pub heading: Option<String>,
}

impl ClauseRule {
    /// The library name to load
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.clause)
    }

    /// The selecting condition, explicit or derived from the clause identifier
    pub fn condition(&self) -> Condition {
        match &self.when {
            Some(expr) => Condition::parse(expr),
            None => Condition::fact(format!("INCLUDE_{}", self.clause.to_uppercase())),
        }
    }
}

/// Renumber labels with a keyword, optionally only after an insertion point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenumberRule {
    /// Label keyword, e.g. `Article`
    pub keyword: String,

    /// Numeral assigned to the first affected label
    #[serde(default = "default_start")]
    pub start: u32,

    /// Insertion marker whose position anchors a partial renumber
    #[serde(default)]
    pub after: Option<String>,
}

/// A conditional literal rewrite; placeholders in `find` and `replace` are expanded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Condition under which the rewrite applies; always when absent
    #[serde(default)]
    pub when: Option<String>,

    /// Text to find
    pub find: String,

    /// Replacement text
    pub replace: String,
}

/// A fact test: `FACT`, `!FACT` or `always`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Always holds
    Always,
    /// Holds when the fact has the expected value
    Fact {
        /// Fact name
        name: String,
        /// Expected value
        expected: bool,
    },
}

impl Condition {
    /// Condition that holds when `name` is true
    pub fn fact(name: impl Into<String>) -> Self {
        Condition::Fact {
            name: name.into(),
            expected: true,
        }
    }

    /// Parse `FACT`, `!FACT`, `NOT FACT` or `always`
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if expr.is_empty() || expr.eq_ignore_ascii_case("always") {
            return Condition::Always;
        }
        let (name, expected) = if let Some(rest) = expr.strip_prefix('!') {
            (rest, false)
        } else if let Some(rest) = expr
            .strip_prefix("NOT ")
            .or_else(|| expr.strip_prefix("not "))
        {
            (rest, false)
        } else {
            (expr, true)
        };
        Condition::Fact {
            name: name.trim().to_uppercase(),
            expected,
        }
    }

    /// Evaluate against `facts`; unknown facts count as false
    pub fn holds(&self, facts: &dyn Facts) -> bool {
        match self {
            Condition::Always => true,
            Condition::Fact { name, expected } => facts.fact(name).unwrap_or(false) == *expected,
        }
    }
}

impl DocumentProfile {
    /// Load a profile from a .toml file
    ///
    /// # Parameters
    /// * `path` - Path to the profile .toml file
    ///
    /// # Returns
    /// * `Ok(DocumentProfile)` - Successfully loaded profile
    /// * `Err(ProfileConfigError)` - Error reading or parsing the profile file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProfileConfigError> {
        let content = fs::read_to_string(&path).map_err(ProfileConfigError::IoError)?;

        let profile: DocumentProfile =
            toml::from_str(&content).map_err(ProfileConfigError::ParseError)?;

        Ok(profile)
    }
}

/// Errors that can occur when loading a profile
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ProfileConfigError {
    /// IO error when reading file
    IoError(std::io::Error),

    /// Error parsing TOML
    ParseError(toml::de::Error),
}

impl std::fmt::Display for ProfileConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ProfileConfigError::ParseError(e) => write!(f, "TOML parse error: {}", e),
        }
    }
}

impl std::error::Error for ProfileConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_minimal_profile() {
        let toml_content = r###"
id = "demo"
title = "Demo Document"
abbreviation = "DEMO"
template = "Demo.docx"
required_fields = ["CLIENT_NAME"]

[[insertions]]
marker = "##INSERT_CLAUSES##"

[[insertions.clauses]]
clause = "no_contest"
heading = "Article I - No Contest"

[[renumber]]
keyword = "Article"
start = 6
after = "##INSERT_CLAUSES##"
"###;

        let profile: DocumentProfile = toml::from_str(toml_content).unwrap();

        assert_eq!(profile.name_field, "CLIENT_NAME");
        assert_eq!(profile.spouse_field, "CLIENT_SPOUSE_NAME");
        assert_eq!(profile.insertions[0].clauses[0].source_name(), "no_contest");
        assert_eq!(
            profile.insertions[0].clauses[0].condition(),
            Condition::fact("INCLUDE_NO_CONTEST")
        );
        assert_eq!(profile.renumber[0].start, 6);
        assert!(!profile.spaced_tokens);
    }

    #[test]
    fn test_condition_parse_and_eval() {
        let facts: HashMap<String, bool> = [("MARRIED".to_string(), false)].into_iter().collect();

        assert!(Condition::parse("!MARRIED").holds(&facts));
        assert!(Condition::parse("not married").holds(&facts));
        assert!(!Condition::parse("MARRIED").holds(&facts));
        assert!(!Condition::parse("UNKNOWN").holds(&facts));
        assert!(Condition::parse("always").holds(&facts));
    }
}
