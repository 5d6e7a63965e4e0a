//! Generation context: values and facts derived from one input record
//!
//! The context is computed once per request. It resolves defaults, derives
//! pronouns, titles and children prose from the record, and answers the fact
//! questions asked by conditional markers and clause conditions.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::children::{self, Child};
use crate::input::{FieldValue, InputRecord};
use crate::merge::{Facts, PlaceholderMap};
use crate::profile_config::{Condition, DocumentProfile};

/// Defaults applied beneath every other source
const BUILTIN_DEFAULTS: [(&str, &str); 3] = [
    ("CLIENT_GENDER", "Male"),
    ("EXEC_MONTH", "October"),
    ("EXEC_YEAR", "2025"),
];

/// Input flag that states marital status explicitly
const MARRIED_FLAG: &str = "IS_MARRIED";

/// Client or spouse gender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

/// Pronoun forms for one gender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pronouns {
    /// he / she
    pub subjective: &'static str,
    /// his / her
    pub possessive: &'static str,
    /// him / her
    pub objective: &'static str,
}

impl Gender {
    /// Lenient parse: `male`, `m`, `man`, `female`, `f`, `woman` in any case
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "male" | "m" | "man" => Some(Gender::Male),
            "female" | "f" | "woman" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub fn pronouns(self) -> Pronouns {
        match self {
            Gender::Male => Pronouns {
                subjective: "he",
                possessive: "his",
                objective: "him",
            },
            Gender::Female => Pronouns {
                subjective: "she",
                possessive: "her",
                objective: "her",
            },
        }
    }

    /// Testator / Testatrix
    pub fn testator_title(self) -> &'static str {
        match self {
            Gender::Male => "Testator",
            Gender::Female => "Testatrix",
        }
    }

    /// Executor / Executrix
    pub fn executor_title(self) -> &'static str {
        match self {
            Gender::Male => "Executor",
            Gender::Female => "Executrix",
        }
    }

    /// How the client refers to a spouse of this gender
    pub fn spouse_noun(self) -> &'static str {
        match self {
            Gender::Male => "husband",
            Gender::Female => "wife",
        }
    }
}

/// Everything derived from one input record for one profile
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Date used for ages and the output filename
    pub today: NaiveDate,

    pub client_gender: Gender,

    pub spouse_gender: Gender,

    /// True when the client is married
    pub married: bool,

    /// Children in input order
    pub children: Vec<Child>,

    /// True when any child is younger than the trust age
    pub minor_children: bool,

    values: BTreeMap<String, String>,
    facts: BTreeMap<String, bool>,
}

impl GenerationContext {
    /// Derive the context for `record` under `profile`
    ///
    /// # Parameters
    /// * `record` - Client input
    /// * `profile` - Document profile being generated
    /// * `practice_defaults` - Practice-wide defaults from the configuration file
    /// * `today` - Date used for age calculations
    pub fn derive(
        record: &InputRecord,
        profile: &DocumentProfile,
        practice_defaults: &BTreeMap<String, String>,
        today: NaiveDate,
    ) -> Self {
        // Lowest precedence first: built-ins, profile, practice, input
        let mut values: BTreeMap<String, String> = BUILTIN_DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        values.extend(profile.defaults.clone());
        values.extend(practice_defaults.clone());
        for (key, value) in record.fields() {
            if let FieldValue::Text(text) = value {
                if !text.trim().is_empty() {
                    values.insert(key.to_string(), text.trim().to_string());
                }
            }
        }
        for (target, source) in &profile.field_defaults {
            if !values.contains_key(target) {
                if let Some(value) = values.get(source).cloned() {
                    values.insert(target.clone(), value);
                }
            }
        }

        let client_gender = values
            .get("CLIENT_GENDER")
            .and_then(|g| {
                let parsed = Gender::parse(g);
                if parsed.is_none() {
                    log::warn!("Unrecognized CLIENT_GENDER '{}', using Male", g);
                }
                parsed
            })
            .unwrap_or_default();
        let spouse_gender = record
            .text("SPOUSE_GENDER")
            .and_then(Gender::parse)
            .unwrap_or_else(|| client_gender.opposite());

        let married = record
            .flag(MARRIED_FLAG)
            .unwrap_or_else(|| record.text(&profile.spouse_field).is_some());

        let children: Vec<Child> = record.children.iter().map(Child::from_record).collect();
        let minor_children = children::has_minor_children(&children, today);

        let mut context = Self {
            today,
            client_gender,
            spouse_gender,
            married,
            children,
            minor_children,
            values,
            facts: BTreeMap::new(),
        };
        context.facts = context.derive_facts(record);
        context.apply_profile_rules(profile);
        context.insert_derived_values();

        log::debug!(
            "Context for {}: married={}, children={}, minor_children={}",
            profile.id,
            context.married,
            context.children.len(),
            context.minor_children
        );

        context
    }

    fn derive_facts(&self, record: &InputRecord) -> BTreeMap<String, bool> {
        let mut facts = BTreeMap::new();

        for (key, _) in record.fields() {
            let value = record.flag(key).unwrap_or_else(|| record.text(key).is_some());
            facts.insert(key.to_string(), value);
        }

        // `{X}_NAME` present answers the fact `X`
        for key in self.values.keys() {
            if let Some(stem) = key.strip_suffix("_NAME") {
                if !stem.is_empty() && !facts.contains_key(stem) {
                    facts.insert(stem.to_string(), true);
                }
            }
        }

        facts.insert("MARRIED".to_string(), self.married);
        facts.insert("SPOUSE".to_string(), self.married);
        facts.insert("CHILDREN".to_string(), !self.children.is_empty());
        facts.insert("MINOR_CHILDREN".to_string(), self.minor_children);
        facts.insert("FEMALE".to_string(), self.client_gender == Gender::Female);
        facts.insert("MALE".to_string(), self.client_gender == Gender::Male);
        facts
    }

    fn apply_profile_rules(&mut self, profile: &DocumentProfile) {
        if !self.married {
            for field in &profile.married_only_fields {
                self.values.insert(field.clone(), String::new());
            }
        }

        for (field, condition) in &profile.guarded_fields {
            if !Condition::parse(condition).holds(&*self) {
                self.values.insert(field.clone(), String::new());
            }
        }

        for field in &profile.uppercase_fields {
            if let Some(value) = self.values.get_mut(field) {
                *value = value.to_uppercase();
            }
        }

        // Fields the profile names but the input omits resolve to empty text
        let named = profile
            .required_fields
            .iter()
            .chain(&profile.uppercase_fields)
            .chain(&profile.married_only_fields)
            .chain(profile.guarded_fields.keys())
            .chain(std::iter::once(&profile.spouse_field));
        for field in named {
            self.values.entry(field.clone()).or_default();
        }
    }

    fn insert_derived_values(&mut self) {
        let client = self.client_pronouns();
        let spouse = self.spouse_pronouns();
        let count = self.children.len();

        let derived = [
            ("CLIENT_GENDER", self.client_gender.as_str().to_string()),
            ("CLIENT_PRONOUN", client.subjective.to_string()),
            ("CLIENT_PRONOUN_SUBJECTIVE", client.subjective.to_string()),
            ("CLIENT_PRONOUN_POSSESSIVE", client.possessive.to_string()),
            ("CLIENT_PRONOUN_OBJECTIVE", client.objective.to_string()),
            ("SPOUSE_GENDER", self.spouse_gender.as_str().to_string()),
            ("SPOUSE_TYPE", self.spouse_gender.spouse_noun().to_string()),
            ("SPOUSE_PRONOUN", spouse.subjective.to_string()),
            ("SPOUSE_PRONOUN_SUBJECTIVE", spouse.subjective.to_string()),
            ("SPOUSE_PRONOUN_POSSESSIVE", spouse.possessive.to_string()),
            ("SPOUSE_PRONOUN_OBJECTIVE", spouse.objective.to_string()),
            ("TESTATOR_TITLE", self.client_gender.testator_title().to_string()),
            ("EXECUTOR_TITLE", self.client_gender.executor_title().to_string()),
            ("NUMBER_OF_CHILDREN", children::count_word(count)),
            ("NUM_CHILDREN", children::count_with_digits(count)),
            ("CHILDREN_LIST", children::simple_list(&self.children)),
            ("CHILDREN_DETAILED", children::detailed_list(&self.children)),
            ("CHILDREN_DESCRIPTION", children::detailed_list(&self.children)),
            (
                "CHILD_OR_CHILDREN",
                if count == 1 { "child" } else { "children" }.to_string(),
            ),
        ];

        for (key, value) in derived {
            // Explicit input wins over anything derived, except normalized gender
            if key.ends_with("_GENDER") {
                self.values.insert(key.to_string(), value);
            } else {
                self.values.entry(key.to_string()).or_insert(value);
            }
        }
    }

    /// Resolved value of a field (without braces)
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Every resolved field and value
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn client_pronouns(&self) -> Pronouns {
        self.client_gender.pronouns()
    }

    pub fn spouse_pronouns(&self) -> Pronouns {
        self.spouse_gender.pronouns()
    }

    /// Build the placeholder map for `profile`
    ///
    /// Every resolved field becomes `{FIELD}`; profile aliases then point extra
    /// tokens at existing ones, and spaced variants are added last when the
    /// profile accepts them.
    pub fn placeholder_map(&self, profile: &DocumentProfile) -> PlaceholderMap {
        let mut map: PlaceholderMap = self
            .values
            .iter()
            .map(|(k, v)| (format!("{{{}}}", k), v.clone()))
            .collect();

        for (alias, target) in &profile.placeholder_aliases {
            match map.get(target).map(str::to_string) {
                Some(value) => map.insert_default(alias.clone(), value),
                None => log::debug!("Alias {} points at unmapped token {}", alias, target),
            }
        }

        if profile.spaced_tokens {
            map.add_spaced_variants();
        }

        map
    }
}

impl Facts for GenerationContext {
    /// Exact fact name first, then the name without an `IS_` or `HAS_` prefix
    fn fact(&self, name: &str) -> Option<bool> {
        if let Some(value) = self.facts.get(name) {
            return Some(*value);
        }
        ["IS_", "HAS_"]
            .iter()
            .filter_map(|prefix| name.strip_prefix(prefix))
            .find_map(|stem| self.facts.get(stem).copied())
    }
}
