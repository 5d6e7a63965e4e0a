//! Text run representation with formatting
//!
//! A text run is a span of text with consistent formatting applied.
//! Tabs and line breaks inside a run are carried in the text as `\t` and `\n`.

/// Character formatting shared by every character of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFormat {
    /// Bold formatting
    pub bold: bool,

    /// Italic formatting
    pub italic: bool,

    /// Single underline
    pub underline: bool,

    /// Small capitals
    pub small_caps: bool,

    /// Font size in half-points (`w:sz`), if set on the run
    pub size: Option<u32>,

    /// Font family (`w:rFonts/@w:ascii`), if set on the run
    pub font: Option<String>,

    /// Verbatim `w:rPr` markup read from a package; written back in place of
    /// the flags above so character styles and colors survive
    pub properties_xml: Option<String>,
}

impl RunFormat {
    /// Check if any formatting is applied
    pub fn has_formatting(&self) -> bool {
        self.bold
            || self.italic
            || self.underline
            || self.small_caps
            || self.size.is_some()
            || self.font.is_some()
            || self.properties_xml.is_some()
    }
}

/// A span of text with consistent formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Formatting applied to the whole run
    pub format: RunFormat,
}

impl TextRun {
    /// Create a new plain text run
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::default(),
        }
    }

    /// Create a new text run with the specified formatting
    pub fn with_format(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    /// Check if this text run has any formatting applied
    pub fn has_formatting(&self) -> bool {
        self.format.has_formatting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_run_has_no_formatting() {
        let run = TextRun::new("plain");
        assert!(!run.has_formatting());
    }

    #[test]
    fn test_size_counts_as_formatting() {
        let run = TextRun::with_format(
            "sized",
            RunFormat {
                size: Some(24),
                ..RunFormat::default()
            },
        );
        assert!(run.has_formatting());
    }
}
