//! Clause libraries
//!
//! A clause library hands out fragments by name. The filesystem library
//! indexes a directory tree once and loads `.docx` or `.txt` clause files on
//! demand; names are matched after folding case and punctuation, so
//! `LWT_-_Clause_-_No_Contest_Provision` finds `LWT - Clause - No Contest Provision.docx`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::docx::{self, DocxError};
use crate::merge::{tokenize, ClauseFragment, Marker, Segment};
use crate::template_model::Block;

/// Errors loading a single clause
#[derive(Error, Debug)]
pub enum ClauseError {
    #[error("Clause '{0}' not found in library")]
    NotFound(String),

    #[error("Clause library root {path} is not a directory", path = .0.display())]
    NotADirectory(PathBuf),

    #[error("IO error reading {path}: {source}", path = .0.display(), source = .1)]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("Invalid clause document {path}: {source}", path = .0.display(), source = .1)]
    DocxError(PathBuf, #[source] DocxError),
}

/// Source of clause fragments
pub trait ClauseLibrary: Send + Sync {
    /// Load the fragment called `name`
    fn load(&self, name: &str) -> Result<ClauseFragment, ClauseError>;

    /// Names of every clause the library can load
    fn names(&self) -> Vec<String>;
}

/// Fold a clause name to its lookup key: lowercase words joined by `_`
pub fn clause_key(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// True for an author note: text starting with `##` that does not open with
/// a conditional marker
pub fn is_author_note(text: &str) -> bool {
    let text = text.trim_start();
    if !text.starts_with("##") {
        return false;
    }
    !matches!(
        tokenize(text).first(),
        Some(Segment::Token { body, .. }) if Marker::parse(body).is_some()
    )
}

/// Parse a plain-text clause: paragraphs separated by blank lines
///
/// Author-note lines are skipped. Lines inside a paragraph are joined with a
/// single space.
pub fn parse_text_clause(name: &str, text: &str) -> ClauseFragment {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if is_author_note(line) {
            continue;
        }
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    ClauseFragment::from_paragraphs(name, paragraphs)
}

/// Take the body of a clause document as a fragment
///
/// Author-note paragraphs are dropped, and so are opaque
/// blocks: they may reference relationships that exist only in the clause's
/// own package.
pub fn fragment_from_docx(name: &str, bytes: &[u8]) -> Result<ClauseFragment, DocxError> {
    let document = docx::read_document(bytes)?;

    let blocks: Vec<Block> = document
        .body
        .into_iter()
        .filter(|block| match block {
            Block::Paragraph(p) => !is_author_note(&p.text()),
            Block::Table(_) => true,
            Block::Opaque(raw) => {
                if !raw.starts_with("<w:sectPr") {
                    log::warn!("Clause '{}': dropping unsupported content", name);
                }
                false
            }
        })
        .collect();

    Ok(ClauseFragment::new(name, blocks))
}

/// Clause files discovered under a directory tree
#[derive(Debug, Clone)]
pub struct FsClauseLibrary {
    root: PathBuf,
    index: BTreeMap<String, PathBuf>,
}

impl FsClauseLibrary {
    /// Index every `.docx` and `.txt` file under `root`
    ///
    /// When a `.docx` and a `.txt` share a name, the `.docx` wins.
    pub fn open(root: &Path) -> Result<Self, ClauseError> {
        if !root.is_dir() {
            return Err(ClauseError::NotADirectory(root.to_path_buf()));
        }

        let mut index: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Word lock files
            if stem.starts_with("~$") {
                continue;
            }

            let key = clause_key(stem);
            match ext.to_ascii_lowercase().as_str() {
                "docx" => {
                    index.insert(key, path.to_path_buf());
                }
                "txt" => {
                    index.entry(key).or_insert_with(|| path.to_path_buf());
                }
                _ => {}
            }
        }

        log::info!("Indexed {} clauses under {}", index.len(), root.display());
        Ok(Self {
            root: root.to_path_buf(),
            index,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing a clause name, if indexed
    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.index.get(&clause_key(name)).map(PathBuf::as_path)
    }
}

impl ClauseLibrary for FsClauseLibrary {
    fn load(&self, name: &str) -> Result<ClauseFragment, ClauseError> {
        let path = self
            .path_of(name)
            .ok_or_else(|| ClauseError::NotFound(name.to_string()))?;

        let is_docx = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));

        if is_docx {
            let bytes =
                std::fs::read(path).map_err(|e| ClauseError::IoError(path.to_path_buf(), e))?;
            fragment_from_docx(name, &bytes)
                .map_err(|e| ClauseError::DocxError(path.to_path_buf(), e))
        } else {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ClauseError::IoError(path.to_path_buf(), e))?;
            Ok(parse_text_clause(name, &text))
        }
    }

    fn names(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }
}

/// Clause fragments held in memory, keyed like the filesystem library
#[derive(Debug, Clone, Default)]
pub struct MemoryClauseLibrary {
    clauses: HashMap<String, ClauseFragment>,
}

impl MemoryClauseLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment under `name`
    pub fn insert(&mut self, name: &str, fragment: ClauseFragment) {
        self.clauses.insert(clause_key(name), fragment);
    }

    /// Builder form of [`MemoryClauseLibrary::insert`] for plain paragraphs
    pub fn with_text<I, S>(mut self, name: &str, paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(name, ClauseFragment::from_paragraphs(name, paragraphs));
        self
    }
}

impl ClauseLibrary for MemoryClauseLibrary {
    fn load(&self, name: &str) -> Result<ClauseFragment, ClauseError> {
        self.clauses
            .get(&clause_key(name))
            .cloned()
            .ok_or_else(|| ClauseError::NotFound(name.to_string()))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clauses.keys().cloned().collect();
        names.sort();
        names
    }
}
