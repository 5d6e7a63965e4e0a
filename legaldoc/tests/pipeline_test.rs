use chrono::NaiveDate;
use std::fs;
use std::path::Path;

use legaldoc::clause_library::{FsClauseLibrary, MemoryClauseLibrary};
use legaldoc::docx::{self, build_package};
use legaldoc::input::InputRecord;
use legaldoc::profiles::load_profile;
use legaldoc::template_model::{Block, Document};
use legaldoc::template_source::{FsTemplateSource, TemplateSource};
use legaldoc::{generate, GenerateError, GenerateOptions};

const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

fn p(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#, text)
}

fn document_xml(paragraphs: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {W}><w:body>{paragraphs}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn will_template_bytes() -> Vec<u8> {
    let title = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>LAST WILL AND TESTAMENT OF {CLIENT_</w:t></w:r><w:r><w:t>NAME}</w:t></w:r></w:p>"#;
    let body: String = std::iter::once(title.to_string())
        .chain(
            [
                "I, {CLIENT_NAME}, a resident of {CLIENT_COUNTY} County, Tennessee, declare this to be my Will.",
                "Article I - Family",
                "##IF_MARRIED##I am married to {CLIENT_SPOUSE_NAME}.##END_IF##",
                "##IF_NOT_MARRIED##I am not currently married.##END_IF##",
                "I have {NUMBER_OF_CHILDREN} {CHILD_OR_CHILDREN}: {CHILDREN_DETAILED}.",
                "Article II - Executor",
                "I appoint my {SPOUSE_TYPE}, {CLIENT_SPOUSE_NAME}, as {EXECUTOR_TITLE} of this Will.",
                "Article III - Disposition",
                "##INSERT_ARTICLE_III_CLAUSES##",
                "I give the residue of my estate to my said {SPOUSE_TYPE}, {CLIENT_SPOUSE_NAME}, if surviving.",
                "Article IV - Guardian",
                "Article V - Powers",
                "##INSERT_NEW_ARTICLES##",
                "Article VI - Miscellaneous",
                "IN WITNESS WHEREOF, I, {CLIENT_NAME}, sign this Will as {TESTATOR_TITLE}.",
            ]
            .into_iter()
            .map(p),
        )
        .collect();

    let header = format!(
        r#"<w:hdr {W}><w:p><w:r><w:t>Last Will and Testament of {{CLIENT_NAME}}</w:t></w:r></w:p></w:hdr>"#
    );
    let footer = format!(
        r#"<w:ftr {W}><w:p><w:fldSimple w:instr="PAGE"><w:r><w:t>1</w:t></w:r></w:fldSimple></w:p></w:ftr>"#
    );
    build_package(
        &document_xml(&body),
        &[
            ("word/header1.xml", header.as_str()),
            ("word/footer1.xml", footer.as_str()),
        ],
    )
    .unwrap()
}

fn write_clauses(dir: &Path) {
    let will = dir.join("will");
    fs::create_dir_all(&will).unwrap();
    fs::write(
        will.join("LWT - Clause - Handwritten List.txt"),
        "## Keep this clause short\nI may leave a written list\ndisposing of tangible items.\n",
    )
    .unwrap();
    fs::write(
        will.join("LWT - Clause - No Contest Provision.txt"),
        "If any beneficiary contests this Will, that gift lapses.\n",
    )
    .unwrap();
    fs::write(
        will.join("LWT - Trust for Minor Children.txt"),
        "{TRUSTEE_NAME} shall hold the share of any child under twenty-five in trust.\n",
    )
    .unwrap();
}

fn will_record() -> InputRecord {
    InputRecord::from_json_str(
        r#"{
            "CLIENT_NAME": "Jane Q. Doe",
            "CLIENT_GENDER": "female",
            "ALTERNATE_EXECUTOR_NAME": "Sam Roe",
            "TRUSTEE_NAME": "Pat Roe",
            "INCLUDE_HANDWRITTEN_LIST": true,
            "INCLUDE_NO_CONTEST": true,
            "children": [
                {"name": "Alice", "dob": "1990-01-01"},
                {"name": "Bob", "dob": "1992-02-02"},
                {"name": "Carol", "dateOfBirth": "2015-03-03"}
            ]
        }"#,
    )
    .unwrap()
}

fn memory_library() -> MemoryClauseLibrary {
    MemoryClauseLibrary::new()
        .with_text(
            "LWT_-_Trust_for_Minor_Children",
            ["{TRUSTEE_NAME} shall hold the share of any child under twenty-five in trust."],
        )
        .with_text(
            "LWT_-_Clause_-_No_Contest_Provision",
            ["If any beneficiary contests this Will, that gift lapses."],
        )
}

fn will_document() -> Document {
    docx::read_document(&will_template_bytes()).unwrap()
}

#[test]
fn test_will_from_files_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("will_template.docx"), will_template_bytes()).unwrap();
    let clauses = dir.path().join("clauses");
    write_clauses(&clauses);

    let will = load_profile("will").unwrap().unwrap();
    let snapshot = FsTemplateSource::new(&templates).load(&will).unwrap();
    let library = FsClauseLibrary::open(&clauses).unwrap();
    let options = GenerateOptions::new(date(2025, 10, 3));

    let generated = generate(
        &snapshot.document,
        &library,
        &will,
        &will_record(),
        &options,
    )
    .unwrap();
    assert_eq!(generated.filename, "2025-10-03 LWT Doe Jane.docx");

    let output = dir.path().join("out").join(&generated.filename);
    docx::write_path(&snapshot.package, &generated.document, &output).unwrap();
    let written = docx::read_document(&fs::read(&output).unwrap()).unwrap();

    assert_eq!(
        written.body_texts(),
        [
            "LAST WILL AND TESTAMENT OF JANE Q. DOE",
            "I, JANE Q. DOE, a resident of Maury County, Tennessee, declare this to be my Will.",
            "Article I - Family",
            "I am not currently married.",
            "I have three children: Alice, born January 1, 1990; Bob, born February 2, 1992; and Carol, born March 3, 2015.",
            "Article II - Executor",
            "I appoint SAM ROE, as Executrix of this Will.",
            "Article III - Disposition",
            "I may leave a written list disposing of tangible items.",
            "I give the residue of my estate to my children if surviving.",
            "Article IV - Guardian",
            "Article V - Powers",
            "Article VI - No Contest",
            "If any beneficiary contests this Will, that gift lapses.",
            "Article VII - Trust for Minor Children",
            "PAT ROE shall hold the share of any child under twenty-five in trust.",
            "Article VIII - Miscellaneous",
            "IN WITNESS WHEREOF, I, JANE Q. DOE, sign this Will as Testatrix.",
        ]
    );

    // Title keeps its alignment and the first run's bold
    let title = written.body[0].as_paragraph().unwrap();
    assert!(title.properties_xml.as_deref().unwrap().contains("w:jc"));
    assert!(title.runs[0].format.bold);

    // Header substituted, footer field untouched, section properties kept
    assert_eq!(
        written.headers[0].blocks[0].as_paragraph().unwrap().text(),
        "Last Will and Testament of JANE Q. DOE"
    );
    assert!(matches!(&written.footers[0].blocks[0], Block::Opaque(raw) if raw.contains("fldSimple")));
    assert!(matches!(written.body.last(), Some(Block::Opaque(raw)) if raw.starts_with("<w:sectPr")));
}

#[test]
fn test_generation_is_idempotent() {
    let will = load_profile("will").unwrap().unwrap();
    let options = GenerateOptions::new(date(2025, 10, 3));
    let library = memory_library();

    let first = generate(&will_document(), &library, &will, &will_record(), &options).unwrap();
    let second = generate(&first.document, &library, &will, &will_record(), &options).unwrap();

    assert_eq!(second.document, first.document);
    assert_eq!(second.report.replacements, 0);
    assert!(second.report.inserted_clauses.is_empty());
}

#[test]
fn test_marital_paragraphs_are_exclusive() {
    let will = load_profile("will").unwrap().unwrap();
    let options = GenerateOptions::new(date(2025, 10, 3));
    let library = memory_library();

    let married = will_record().with_text("CLIENT_SPOUSE_NAME", "John Doe");
    for (record, expected, absent) in [
        (
            will_record(),
            "I am not currently married.",
            "I am married to",
        ),
        (
            married,
            "I am married to JOHN DOE.",
            "I am not currently married.",
        ),
    ] {
        let text = generate(&will_document(), &library, &will, &record, &options)
            .unwrap()
            .document
            .full_text();
        assert!(text.contains(expected), "missing '{}' in:\n{}", expected, text);
        assert!(!text.contains(absent), "unexpected '{}' in:\n{}", absent, text);
        assert!(!text.contains("##"));
        assert!(!text.contains(", ,"));
    }
}

#[test]
fn test_married_will_keeps_spouse_references() {
    let will = load_profile("will").unwrap().unwrap();
    let record = will_record().with_text("CLIENT_SPOUSE_NAME", "John Doe");
    let generated = generate(
        &will_document(),
        &memory_library(),
        &will,
        &record,
        &GenerateOptions::new(date(2025, 10, 3)),
    )
    .unwrap();

    let texts = generated.document.body_texts();
    assert!(texts.contains(&"I appoint my husband, JOHN DOE, as Executrix of this Will.".to_string()));
    assert!(texts.contains(
        &"I give the residue of my estate to my said husband, JOHN DOE, if surviving.".to_string()
    ));
    assert_eq!(generated.report.rewrites, 0);
}

#[test]
fn test_trust_age_boundary() {
    let will = load_profile("will").unwrap().unwrap();
    let today = date(2025, 10, 3);
    let options = GenerateOptions::new(today);
    let library = memory_library();

    // Exactly 24 today: still under the trust age
    let mut record = will_record();
    record.children.clear();
    let record = record.with_child("Dana", "2001-10-03");
    let generated = generate(&will_document(), &library, &will, &record, &options).unwrap();
    assert!(generated
        .report
        .inserted_clauses
        .contains(&"trust_for_minor_children".to_string()));

    // 25 years and a day: no trust
    let mut record = will_record();
    record.children.clear();
    let record = record.with_child("Evan", "2000-10-02");
    let generated = generate(&will_document(), &library, &will, &record, &options).unwrap();
    assert!(!generated
        .report
        .inserted_clauses
        .contains(&"trust_for_minor_children".to_string()));
    assert!(!generated.document.full_text().contains("Trust for Minor Children"));
}

#[test]
fn test_renumbered_labels_are_sequential() {
    let will = load_profile("will").unwrap().unwrap();
    let generated = generate(
        &will_document(),
        &memory_library(),
        &will,
        &will_record(),
        &GenerateOptions::new(date(2025, 10, 3)),
    )
    .unwrap();

    let numerals: Vec<String> = generated
        .document
        .body_texts()
        .iter()
        .filter_map(|t| t.strip_prefix("Article "))
        .filter_map(|t| t.split_whitespace().next())
        .map(str::to_string)
        .collect();
    assert_eq!(numerals, ["I", "II", "III", "IV", "V", "VI", "VII", "VIII"]);
}

#[test]
fn test_poa_pronouns_follow_gender() {
    let poa = load_profile("poa").unwrap().unwrap();
    let template = docx::read_document(
        &build_package(
            &document_xml(&[
                p("I, {CLIENT_NAME}, of {COUNTY} County, appoint {AIF_NAME} as my attorney-in-fact."),
                p("If {PRONOUN_SUBJECTIVE} becomes disabled, {PRONOUN_POSSESSIVE} agent acts for {PRONOUN_OBJECTIVE}."),
                p("Signed this {EXEC_MONTH} {EXEC_YEAR} by {CLIENT PRONOUN SUBJECTIVE}."),
            ]
            .concat()),
            &[],
        )
        .unwrap(),
    )
    .unwrap();

    let base = InputRecord::new()
        .with_text("CLIENT_NAME", "Chris Poe")
        .with_text("COUNTY", "Maury")
        .with_text("AIF_NAME", "Lee Poe")
        .with_text("ALTERNATE_AIF_NAME", "Kim Poe");
    let options = GenerateOptions::new(date(2025, 10, 3));
    let library = MemoryClauseLibrary::new();

    let female = base.clone().with_text("CLIENT_GENDER", "Female");
    let texts = generate(&template, &library, &poa, &female, &options)
        .unwrap()
        .document
        .body_texts();
    assert_eq!(
        texts[1],
        "If she becomes disabled, her agent acts for her."
    );
    assert_eq!(texts[2], "Signed this OCTOBER 2025 by she.");

    let male = base.with_text("CLIENT_GENDER", "M");
    let generated = generate(&template, &library, &poa, &male, &options).unwrap();
    let texts = generated.document.body_texts();
    assert_eq!(texts[0], "I, CHRIS POE, of Maury County, appoint LEE POE as my attorney-in-fact.");
    assert_eq!(texts[1], "If he becomes disabled, his agent acts for him.");
    assert_eq!(generated.filename, "2025-10-03 POA Poe Chris.docx");
}

#[test]
fn test_missing_required_field_produces_nothing() {
    let poa = load_profile("poa").unwrap().unwrap();
    let record = InputRecord::new()
        .with_text("CLIENT_NAME", "Chris Poe")
        .with_text("COUNTY", "Maury")
        .with_text("ALTERNATE_AIF_NAME", "Kim Poe");

    let result = generate(
        &Document::default(),
        &MemoryClauseLibrary::new(),
        &poa,
        &record,
        &GenerateOptions::new(date(2025, 10, 3)),
    );

    match result {
        Err(GenerateError::MissingRequiredField {
            field,
            document_type,
        }) => {
            assert_eq!(field, "AIF_NAME");
            assert_eq!(document_type, "Durable General Power of Attorney");
        }
        other => panic!("expected a missing field error, got {:?}", other.map(|g| g.filename)),
    }
}
