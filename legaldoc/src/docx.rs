//! DOCX package reading and writing
//!
//! A .docx file is a ZIP archive of XML parts. Reading keeps every entry of the
//! archive and, for the main document and each header and footer part, splits
//! the part XML into a frame (everything before and after the block content)
//! and the blocks themselves. Writing copies every entry back and regenerates
//! only the block content of framed parts, so styles, numbering, section
//! properties, themes and document properties survive untouched.

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

// Submodules
mod reader;
mod text_nodes;
mod writer;

// Re-export public functions
pub use reader::{read_document, read_package, read_path};
pub use text_nodes::{opaque_text, opaque_text_nodes, rewrite_text_nodes, unescape_xml};
pub use writer::{build_package, escape_xml, write_package, write_path};

/// WordprocessingML main namespace
pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Entry name of the main document part
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Errors reading or writing a DOCX package
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("IO error on {path}: {source}", path = .0.display(), source = .1)]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Write error: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Part {0} is not valid UTF-8")]
    EncodingError(String),

    #[error("Malformed XML in {0}: {1}")]
    XmlError(String, #[source] roxmltree::Error),

    #[error("Package has no {0} part")]
    MissingPart(String),

    #[error("Unexpected structure in {0}: {1}")]
    FormatError(String, String),
}

/// Raw XML surrounding the block content of a part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartFrame {
    /// Everything up to and including the container's opening tag
    pub head: String,
    /// Everything from the container's closing tag on
    pub tail: String,
}

/// Every entry of a .docx archive plus frames for the editable parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxPackage {
    /// Archive entries in original order: (name, bytes)
    pub entries: Vec<(String, Vec<u8>)>,

    /// Frames keyed by part name for parts whose blocks were read
    pub frames: BTreeMap<String, PartFrame>,
}

impl DocxPackage {
    /// Bytes of an entry
    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// True when the part was split into a frame and blocks
    pub fn is_framed(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }
}

/// True for `word/headerN.xml`
pub fn is_header_part(name: &str) -> bool {
    is_numbered_part(name, "word/header")
}

/// True for `word/footerN.xml`
pub fn is_footer_part(name: &str) -> bool {
    is_numbered_part(name, "word/footer")
}

fn is_numbered_part(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|digits| digits.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_names() {
        assert!(is_header_part("word/header1.xml"));
        assert!(is_header_part("word/header.xml"));
        assert!(!is_header_part("word/_rels/header1.xml.rels"));
        assert!(is_footer_part("word/footer12.xml"));
        assert!(!is_footer_part("word/footnotes.xml"));
    }
}
