//! DOCX reader: ZIP entries plus WordprocessingML blocks
//!
//! Paragraphs made only of text runs become [`Paragraph`]s. A paragraph that
//! holds fields, drawings, hyperlinks or content controls is kept as opaque
//! markup, as is any body child that is neither a paragraph nor a table.

use roxmltree::Node;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::read::ZipArchive;

use super::{is_footer_part, is_header_part, DocxError, DocxPackage, PartFrame, DOCUMENT_PART, WML_NS};
use crate::template_model::{
    Block, Document, Paragraph, Part, RunFormat, Table, TableCell, TableRow, TextRun,
};

/// Read a .docx file from disk
///
/// # Parameters
/// * `path` - Path to the .docx file
///
/// # Returns
/// * `Ok((DocxPackage, Document))` - The package and its editable content
/// * `Err(DocxError)` - Error reading the archive or parsing a part
pub fn read_path(path: &Path) -> Result<(DocxPackage, Document), DocxError> {
    let bytes = std::fs::read(path).map_err(|e| DocxError::IoError(path.to_path_buf(), e))?;
    log::debug!("Reading DOCX package {}", path.display());
    read_package(&bytes)
}

/// Read a .docx package from memory
pub fn read_package(bytes: &[u8]) -> Result<(DocxPackage, Document), DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut package = DocxPackage::default();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();

        // Skip directories
        if name.ends_with('/') {
            continue;
        }

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        package.entries.push((name, contents));
    }

    let mut document = Document::default();

    let body_xml = package
        .entry(DOCUMENT_PART)
        .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;
    if let Some((frame, blocks)) = read_part(DOCUMENT_PART, body_xml)? {
        package.frames.insert(DOCUMENT_PART.to_string(), frame);
        document.body = blocks;
    }

    let mut side_parts: Vec<&str> = package
        .entries
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| is_header_part(name) || is_footer_part(name))
        .collect();
    side_parts.sort_unstable();

    let mut frames = Vec::new();
    for name in side_parts {
        let Some(xml) = package.entry(name) else {
            continue;
        };
        if let Some((frame, blocks)) = read_part(name, xml)? {
            let part = Part {
                name: name.to_string(),
                blocks,
            };
            if is_header_part(name) {
                document.headers.push(part);
            } else {
                document.footers.push(part);
            }
            frames.push((name.to_string(), frame));
        }
    }
    package.frames.extend(frames);

    log::debug!(
        "Read {} entries: {} body blocks, {} headers, {} footers",
        package.entries.len(),
        document.body.len(),
        document.headers.len(),
        document.footers.len()
    );

    Ok((package, document))
}

/// Read only the editable content of a .docx package
pub fn read_document(bytes: &[u8]) -> Result<Document, DocxError> {
    read_package(bytes).map(|(_, document)| document)
}

/// Split a part into frame and blocks; `None` when the container is empty
fn read_part(name: &str, bytes: &[u8]) -> Result<Option<(PartFrame, Vec<Block>)>, DocxError> {
    let xml = std::str::from_utf8(bytes).map_err(|_| DocxError::EncodingError(name.to_string()))?;
    let doc = roxmltree::Document::parse(xml).map_err(|e| DocxError::XmlError(name.to_string(), e))?;
    let root = doc.root_element();

    let container = if is_wml(root, "document") {
        wml(root, "body").ok_or_else(|| {
            DocxError::FormatError(name.to_string(), "document has no w:body".to_string())
        })?
    } else {
        root
    };

    let children: Vec<Node> = container.children().filter(Node::is_element).collect();
    let (Some(first), Some(last)) = (children.first(), children.last()) else {
        return Ok(None);
    };

    let frame = PartFrame {
        head: xml[..first.range().start].to_string(),
        tail: xml[last.range().end..].to_string(),
    };

    Ok(Some((frame, read_blocks(xml, container))))
}

fn read_blocks(xml: &str, container: Node) -> Vec<Block> {
    container
        .children()
        .filter(Node::is_element)
        .map(|node| read_block(xml, node))
        .collect()
}

fn read_block(xml: &str, node: Node) -> Block {
    let modeled = if is_wml(node, "p") {
        read_paragraph(xml, node).map(Block::Paragraph)
    } else if is_wml(node, "tbl") {
        read_table(xml, node).map(Block::Table)
    } else {
        None
    };
    modeled.unwrap_or_else(|| Block::Opaque(raw(xml, node).to_string()))
}

fn read_paragraph(xml: &str, node: Node) -> Option<Paragraph> {
    let mut paragraph = Paragraph::from_runs(Vec::new());

    for child in node.children().filter(Node::is_element) {
        if child.tag_name().namespace() != Some(WML_NS) {
            return None;
        }
        match child.tag_name().name() {
            "pPr" => {
                paragraph.style = wml_attr(child, "pStyle").map(str::to_string);
                paragraph.properties_xml = Some(raw(xml, child).to_string());
            }
            "r" => paragraph.runs.push(read_run(xml, child)?),
            "proofErr" | "bookmarkStart" | "bookmarkEnd" | "permStart" | "permEnd" => {}
            _ => return None,
        }
    }

    Some(paragraph)
}

fn read_run(xml: &str, node: Node) -> Option<TextRun> {
    let mut text = String::new();
    let mut format = RunFormat::default();

    for child in node.children().filter(Node::is_element) {
        if child.tag_name().namespace() != Some(WML_NS) {
            return None;
        }
        match child.tag_name().name() {
            "rPr" => format = read_run_format(xml, child),
            "t" => text.push_str(child.text().unwrap_or_default()),
            "tab" => text.push('\t'),
            "cr" => text.push('\n'),
            "br" => match child.attribute((WML_NS, "type")) {
                None | Some("textWrapping") => text.push('\n'),
                Some(_) => return None,
            },
            "noBreakHyphen" => text.push('\u{2011}'),
            "softHyphen" | "lastRenderedPageBreak" => {}
            _ => return None,
        }
    }

    Some(TextRun::with_format(text, format))
}

fn read_run_format(xml: &str, rpr: Node) -> RunFormat {
    RunFormat {
        bold: wml_bool(rpr, "b").unwrap_or(false),
        italic: wml_bool(rpr, "i").unwrap_or(false),
        underline: wml_attr(rpr, "u").is_some_and(|v| v != "none"),
        small_caps: wml_bool(rpr, "smallCaps").unwrap_or(false),
        size: wml_attr(rpr, "sz").and_then(|v| v.parse().ok()),
        font: wml(rpr, "rFonts")
            .and_then(|n| n.attribute((WML_NS, "ascii")))
            .map(str::to_string),
        properties_xml: Some(raw(xml, rpr).to_string()),
    }
}

fn read_table(xml: &str, node: Node) -> Option<Table> {
    let mut properties = String::new();
    let mut rows = Vec::new();

    for child in node.children().filter(Node::is_element) {
        if child.tag_name().namespace() != Some(WML_NS) {
            return None;
        }
        match child.tag_name().name() {
            "tblPr" | "tblGrid" => properties.push_str(raw(xml, child)),
            "tr" => rows.push(read_row(xml, child)?),
            _ => return None,
        }
    }

    let mut table = Table::new(rows);
    table.properties_xml = (!properties.is_empty()).then_some(properties);
    Some(table)
}

fn read_row(xml: &str, node: Node) -> Option<TableRow> {
    let mut properties = String::new();
    let mut cells = Vec::new();

    for child in node.children().filter(Node::is_element) {
        if child.tag_name().namespace() != Some(WML_NS) {
            return None;
        }
        match child.tag_name().name() {
            "tblPrEx" | "trPr" => properties.push_str(raw(xml, child)),
            "tc" => cells.push(read_cell(xml, child)),
            _ => return None,
        }
    }

    let mut row = TableRow::new(cells);
    row.properties_xml = (!properties.is_empty()).then_some(properties);
    Some(row)
}

fn read_cell(xml: &str, node: Node) -> TableCell {
    let mut properties = None;
    let mut blocks = Vec::new();

    for child in node.children().filter(Node::is_element) {
        if is_wml(child, "tcPr") {
            properties = Some(raw(xml, child).to_string());
        } else {
            blocks.push(read_block(xml, child));
        }
    }

    let mut cell = TableCell::new(blocks);
    cell.properties_xml = properties;
    cell
}

/// Source text of an element
fn raw<'a>(xml: &'a str, node: Node) -> &'a str {
    &xml[node.range()]
}

fn is_wml(node: Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn wml<'a>(node: Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

fn wml_attr<'a>(node: Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

/// Toggle property: present without a value, or with anything but `0`/`false`
fn wml_bool(parent: Node, name: &str) -> Option<bool> {
    wml(parent, name).map(|n| {
        n.attribute((WML_NS, "val"))
            .map_or(true, |v| v != "0" && v != "false")
    })
}
