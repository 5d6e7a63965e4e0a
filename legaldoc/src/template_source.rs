//! Template sources
//!
//! A template source resolves a document profile to a parsed template
//! snapshot. The snapshot is read-only: generation clones its document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::docx::{self, DocxError, DocxPackage};
use crate::profile_config::DocumentProfile;
use crate::template_model::Document;

/// Errors loading a template
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template for {profile} not found at {}", .path.display())]
    NotFound { profile: String, path: PathBuf },

    #[error("Invalid template {path}: {source}", path = .0.display(), source = .1)]
    Invalid(PathBuf, #[source] DocxError),
}

/// A parsed template: the package to write into and its editable content
#[derive(Debug, Clone)]
pub struct TemplateSnapshot {
    pub package: DocxPackage,
    pub document: Document,
}

impl TemplateSnapshot {
    /// Parse a snapshot from .docx bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let (package, document) = docx::read_package(bytes)?;
        Ok(Self { package, document })
    }

    /// Serialize `document` into this snapshot's package
    pub fn render(&self, document: &Document) -> Result<Vec<u8>, DocxError> {
        docx::write_package(&self.package, document)
    }
}

/// Source of templates for document profiles
pub trait TemplateSource: Send + Sync {
    /// Load the template for `profile`
    fn load(&self, profile: &DocumentProfile) -> Result<TemplateSnapshot, TemplateError>;
}

/// Templates read from a directory, with per-profile file overrides
#[derive(Debug, Clone, Default)]
pub struct FsTemplateSource {
    dir: PathBuf,
    overrides: BTreeMap<String, PathBuf>,
}

impl FsTemplateSource {
    /// Resolve profile template names against `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            overrides: BTreeMap::new(),
        }
    }

    /// Use `path` for the profile `profile_id` instead of its default template
    pub fn with_override(mut self, profile_id: &str, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(profile_id.to_string(), path.into());
        self
    }

    /// The file that would be read for `profile`
    pub fn path_for(&self, profile: &DocumentProfile) -> PathBuf {
        self.overrides
            .get(&profile.id)
            .cloned()
            .unwrap_or_else(|| self.dir.join(&profile.template))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TemplateSource for FsTemplateSource {
    fn load(&self, profile: &DocumentProfile) -> Result<TemplateSnapshot, TemplateError> {
        let path = self.path_for(profile);
        if !path.is_file() {
            return Err(TemplateError::NotFound {
                profile: profile.id.clone(),
                path,
            });
        }

        log::info!("Loading {} template from {}", profile.id, path.display());
        let (package, document) =
            docx::read_path(&path).map_err(|e| TemplateError::Invalid(path.clone(), e))?;
        Ok(TemplateSnapshot { package, document })
    }
}
