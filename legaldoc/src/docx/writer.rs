//! DOCX writer that preserves the template package
//!
//! Every entry of the source package is copied to the output. Parts that were
//! read into blocks are rebuilt from their frame plus freshly generated block
//! markup; everything else (styles, numbering, settings, themes, media,
//! relationships, document properties) is written back byte for byte.

use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{DocxError, DocxPackage, PartFrame, DOCUMENT_PART};
use crate::template_model::{Block, Document, Paragraph, Table, TextRun};

/// Serialize `document` into the package it was read from
///
/// # Parameters
/// * `package` - The package the document was read from
/// * `document` - The edited document content
///
/// # Returns
/// * `Ok(Vec<u8>)` - The .docx bytes
/// * `Err(DocxError)` - ZIP write failure
pub fn write_package(package: &DocxPackage, document: &Document) -> Result<Vec<u8>, DocxError> {
    let mut output_zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, contents) in &package.entries {
        let regenerated = package
            .frames
            .get(name)
            .and_then(|frame| blocks_for_part(document, name).map(|blocks| (frame, blocks)))
            .map(|(frame, blocks)| generate_part_xml(frame, blocks));

        let options = if name.starts_with("word/media/") {
            // Images don't compress well
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
        };

        output_zip.start_file(name.as_str(), options)?;
        match regenerated {
            Some(xml) => output_zip.write_all(xml.as_bytes())?,
            None => output_zip.write_all(contents)?,
        }
    }

    let cursor = output_zip.finish()?;
    Ok(cursor.into_inner())
}

/// Serialize `document` and write it to `output_path`
pub fn write_path(
    package: &DocxPackage,
    document: &Document,
    output_path: &Path,
) -> Result<(), DocxError> {
    // Create output directory if it doesn't exist
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| DocxError::IoError(parent.to_path_buf(), e))?;
    }

    let bytes = write_package(package, document)?;
    std::fs::write(output_path, bytes)
        .map_err(|e| DocxError::IoError(output_path.to_path_buf(), e))?;

    log::info!("Wrote {}", output_path.display());
    Ok(())
}

/// Build a minimal package around a main document part and optional extra parts
///
/// Header and footer parts given here are not referenced from the section
/// properties; they exist so readers and writers have something to carry.
pub fn build_package(document_xml: &str, parts: &[(&str, &str)]) -> Result<Vec<u8>, DocxError> {
    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;
    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

    let mut output_zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let fixed = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        (DOCUMENT_PART, document_xml),
    ];
    for (name, xml) in fixed.iter().chain(parts.iter()) {
        output_zip.start_file(*name, options)?;
        output_zip.write_all(xml.as_bytes())?;
    }

    Ok(output_zip.finish()?.into_inner())
}

fn blocks_for_part<'a>(document: &'a Document, name: &str) -> Option<&'a [Block]> {
    if name == DOCUMENT_PART {
        return Some(&document.body);
    }
    document
        .headers
        .iter()
        .chain(document.footers.iter())
        .find(|part| part.name == name)
        .map(|part| part.blocks.as_slice())
}

fn generate_part_xml(frame: &PartFrame, blocks: &[Block]) -> String {
    let mut xml = String::with_capacity(frame.head.len() + frame.tail.len() + blocks.len() * 256);
    xml.push_str(&frame.head);
    for block in blocks {
        xml.push_str(&generate_block_xml(block));
    }
    xml.push_str(&frame.tail);
    xml
}

/// Generate OOXML for a single block
fn generate_block_xml(block: &Block) -> String {
    match block {
        Block::Paragraph(paragraph) => generate_paragraph_xml(paragraph),
        Block::Table(table) => generate_table_xml(table),
        Block::Opaque(raw) => raw.clone(),
    }
}

/// Generate OOXML for a paragraph
fn generate_paragraph_xml(paragraph: &Paragraph) -> String {
    let mut xml = String::from("<w:p>");
    match (&paragraph.properties_xml, &paragraph.style) {
        (Some(raw), _) => xml.push_str(raw),
        (None, Some(style)) => xml.push_str(&format!(
            r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#,
            escape_xml(style)
        )),
        (None, None) => {}
    }
    for run in &paragraph.runs {
        xml.push_str(&generate_run_xml(run));
    }
    xml.push_str("</w:p>");
    xml
}

/// Generate OOXML for a text run with formatting
fn generate_run_xml(run: &TextRun) -> String {
    let mut xml = String::from("<w:r>");
    let format = &run.format;

    if let Some(raw) = &format.properties_xml {
        xml.push_str(raw);
    } else if format.has_formatting() {
        xml.push_str("<w:rPr>");
        if let Some(font) = &format.font {
            let font = escape_xml(font);
            xml.push_str(&format!(
                r#"<w:rFonts w:ascii="{}" w:hAnsi="{}" w:cs="{}"/>"#,
                font, font, font
            ));
        }
        if format.bold {
            xml.push_str("<w:b/>");
        }
        if format.italic {
            xml.push_str("<w:i/>");
        }
        if format.small_caps {
            xml.push_str("<w:smallCaps/>");
        }
        if let Some(size) = format.size {
            xml.push_str(&format!(r#"<w:sz w:val="{}"/><w:szCs w:val="{}"/>"#, size, size));
        }
        if format.underline {
            xml.push_str(r#"<w:u w:val="single"/>"#);
        }
        xml.push_str("</w:rPr>");
    }

    // Tabs and line breaks travel in the text and become their own elements
    let mut segment = String::new();
    for c in run.text.chars() {
        match c {
            '\t' | '\n' => {
                push_text(&mut xml, &segment);
                segment.clear();
                xml.push_str(if c == '\t' { "<w:tab/>" } else { "<w:br/>" });
            }
            _ => segment.push(c),
        }
    }
    push_text(&mut xml, &segment);

    xml.push_str("</w:r>");
    xml
}

fn push_text(xml: &mut String, text: &str) {
    if !text.is_empty() {
        xml.push_str(&format!(
            r#"<w:t xml:space="preserve">{}</w:t>"#,
            escape_xml(text)
        ));
    }
}

/// Generate OOXML for a table, keeping its recorded properties
fn generate_table_xml(table: &Table) -> String {
    let mut xml = String::from("<w:tbl>");
    if let Some(raw) = &table.properties_xml {
        xml.push_str(raw);
    }

    for row in &table.rows {
        xml.push_str("<w:tr>");
        if let Some(raw) = &row.properties_xml {
            xml.push_str(raw);
        }
        for cell in &row.cells {
            xml.push_str("<w:tc>");
            if let Some(raw) = &cell.properties_xml {
                xml.push_str(raw);
            }
            for block in &cell.blocks {
                xml.push_str(&generate_block_xml(block));
            }
            // A cell must end with a paragraph
            if !matches!(cell.blocks.last(), Some(Block::Paragraph(_))) {
                xml.push_str("<w:p/>");
            }
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    xml
}

/// Escape special XML characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
