//! Run normalization
//!
//! Word splits text into runs wherever editing history or spell-check touched
//! it, so a token like `{CLIENT_NAME}` often spans several runs. Normalizing a
//! paragraph collapses its runs into one so tokens can be matched against the
//! paragraph's full text. Formatting that varied inside the paragraph is lost;
//! the merged run carries the first run's formatting.

use crate::template_model::{Paragraph, TextRun};

/// Merge all runs of `paragraph` into a single run with the first run's formatting
///
/// A paragraph with zero or one run is left untouched.
pub fn normalize(paragraph: &mut Paragraph) {
    if paragraph.runs.len() < 2 {
        return;
    }

    let mut runs = std::mem::take(&mut paragraph.runs).into_iter();
    if let Some(first) = runs.next() {
        let mut text = first.text;
        for run in runs {
            text.push_str(&run.text);
        }
        paragraph.runs.push(TextRun::with_format(text, first.format));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_model::RunFormat;

    #[test]
    fn test_normalize_preserves_text() {
        let mut p = Paragraph::from_runs(vec![
            TextRun::new("I, {CLIENT"),
            TextRun::new("_NAME}"),
            TextRun::new(", of {COUNTY} County"),
        ]);
        let before = p.text();

        normalize(&mut p);

        assert_eq!(p.text(), before);
        assert_eq!(p.runs.len(), 1);
    }

    #[test]
    fn test_normalize_keeps_first_format() {
        let italic = RunFormat {
            italic: true,
            ..RunFormat::default()
        };
        let mut p = Paragraph::from_runs(vec![
            TextRun::with_format("first", italic.clone()),
            TextRun::with_format(
                " second",
                RunFormat {
                    bold: true,
                    ..RunFormat::default()
                },
            ),
        ]);

        normalize(&mut p);

        assert_eq!(p.runs[0].format, italic);
    }

    #[test]
    fn test_normalize_empty_paragraph_is_noop() {
        let mut p = Paragraph::from_runs(Vec::new());
        normalize(&mut p);
        assert!(p.runs.is_empty());
    }
}
