//! Errors raised while generating a document

use thiserror::Error;

/// Failure of a single generation request
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Missing required field {field} for {document_type}")]
    MissingRequiredField {
        field: String,
        document_type: String,
    },

    #[error("Placeholder map could not be compiled: {0}")]
    PlaceholderPattern(#[from] regex::Error),

    #[error("Invalid renumbering keyword '{0}': {1}")]
    LabelPattern(String, #[source] regex::Error),
}
