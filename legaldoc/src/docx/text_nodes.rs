//! Visible text inside raw block markup
//!
//! Opaque blocks (paragraphs with fields, hyperlinks or content controls) are
//! written back verbatim, but their visible text still sits in `w:t`
//! elements. These helpers read and rewrite that text one node at a time
//! without touching any other markup.

use std::ops::Range;

use super::writer::escape_xml;

const CLOSE_TAG: &str = "</w:t>";

/// One `w:t` element
struct TextNode {
    /// The opening tag, `<w:t ...>`
    open: Range<usize>,
    /// The escaped text between the tags
    content: Range<usize>,
}

fn text_nodes(raw: &str) -> Vec<TextNode> {
    let mut nodes = Vec::new();
    let mut pos = 0;

    while let Some(found) = raw[pos..].find("<w:t") {
        let start = pos + found;
        let after_name = start + "<w:t".len();
        pos = after_name;

        // <w:tab/>, <w:tbl>, <w:tc> and friends share the prefix
        if !matches!(
            raw[after_name..].chars().next(),
            Some('>' | ' ' | '\t' | '\r' | '\n')
        ) {
            continue;
        }
        let Some(tag_len) = raw[after_name..].find('>') else {
            break;
        };
        let content_start = after_name + tag_len + 1;
        pos = content_start;
        if raw[..content_start].ends_with("/>") {
            continue;
        }
        let Some(content_len) = raw[content_start..].find(CLOSE_TAG) else {
            break;
        };

        nodes.push(TextNode {
            open: start..content_start,
            content: content_start..content_start + content_len,
        });
        pos = content_start + content_len + CLOSE_TAG.len();
    }

    nodes
}

/// Resolve the predefined entities and character references in XML text
pub fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let c = match &tail[1..semi] {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                entity => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Unescaped text of each `w:t` node in raw block markup, in order
pub fn opaque_text_nodes(raw: &str) -> Vec<String> {
    text_nodes(raw)
        .into_iter()
        .map(|node| unescape_xml(&raw[node.content]))
        .collect()
}

/// Visible text of raw block markup: every `w:t` node, concatenated
pub fn opaque_text(raw: &str) -> String {
    opaque_text_nodes(raw).concat()
}

/// Rewrite the text of each `w:t` node in raw block markup
///
/// `f` receives the unescaped text of one node and returns its replacement,
/// or `None` to leave the node alone. A replacement with leading or trailing
/// whitespace gets `xml:space="preserve"` if its tag lacks it.
///
/// # Returns
/// * `Some(String)` - The rewritten markup
/// * `None` - No node changed
pub fn rewrite_text_nodes(raw: &str, f: &mut dyn FnMut(&str) -> Option<String>) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut copied = 0;
    let mut changed = false;

    for node in text_nodes(raw) {
        let Some(updated) = f(&unescape_xml(&raw[node.content.clone()])) else {
            continue;
        };
        changed = true;

        let open = &raw[node.open.clone()];
        let needs_preserve = updated.trim() != updated && !open.contains("xml:space");
        out.push_str(&raw[copied..node.open.start]);
        if needs_preserve {
            out.push_str(r#"<w:t xml:space="preserve">"#);
        } else {
            out.push_str(open);
        }
        out.push_str(&escape_xml(&updated));
        copied = node.content.end;
    }

    if !changed {
        return None;
    }
    out.push_str(&raw[copied..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HYPERLINK: &str = r#"<w:p><w:hyperlink r:id="rId9"><w:r><w:t>see {CLIENT_NAME}</w:t></w:r></w:hyperlink><w:r><w:tab/><w:t xml:space="preserve"> &amp; co</w:t></w:r></w:p>"#;

    #[test]
    fn test_opaque_text_skips_look_alike_tags() {
        assert_eq!(opaque_text(HYPERLINK), "see {CLIENT_NAME} & co");
        assert_eq!(opaque_text("<w:p><w:r><w:t/></w:r></w:p>"), "");
        assert_eq!(opaque_text("<w:sectPr/>"), "");
    }

    #[test]
    fn test_rewrite_changes_only_text() {
        let rewritten = rewrite_text_nodes(HYPERLINK, &mut |text: &str| {
            text.contains("{CLIENT_NAME}")
                .then(|| text.replace("{CLIENT_NAME}", "A <B>"))
        })
        .unwrap();

        assert_eq!(
            rewritten,
            r#"<w:p><w:hyperlink r:id="rId9"><w:r><w:t>see A &lt;B&gt;</w:t></w:r></w:hyperlink><w:r><w:tab/><w:t xml:space="preserve"> &amp; co</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_rewrite_adds_space_preserve() {
        let rewritten =
            rewrite_text_nodes("<w:r><w:t>x</w:t></w:r>", &mut |_: &str| Some("x ".to_string())).unwrap();
        assert_eq!(rewritten, r#"<w:r><w:t xml:space="preserve">x </w:t></w:r>"#);
    }

    #[test]
    fn test_rewrite_without_change_is_none() {
        assert!(rewrite_text_nodes(HYPERLINK, &mut |_: &str| None).is_none());
    }

    #[test]
    fn test_unescape_character_references() {
        assert_eq!(unescape_xml("a&#38;b&#x41;&lt;&bogus;"), "a&bA<&bogus;");
    }
}
