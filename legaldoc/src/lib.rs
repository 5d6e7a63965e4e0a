//! legaldoc - legal document generation for a law practice
//!
//! Generates wills, powers of attorney, healthcare powers of attorney and
//! advance care plans by merging client input into .docx templates:
//! placeholders are substituted, conditional paragraphs resolved, optional
//! clauses inserted and section labels renumbered.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::enum_variant_names)]

pub mod children;
pub mod clause_library;
pub mod context;
pub mod docx;
pub mod error;
pub mod filename;
pub mod input;
pub mod inspect;
pub mod merge;
pub mod pipeline;
pub mod practice_config;
pub mod profile_config;
pub mod profiles;
pub mod template_model;
pub mod template_source;

pub use error::GenerateError;
pub use pipeline::{generate, generate_batch, GenerateOptions, Generated, GenerationReport};
