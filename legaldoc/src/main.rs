//! legaldoc - legal document generator
//!
//! A CLI tool for generating wills, powers of attorney, healthcare powers of
//! attorney and advance care plans from .docx templates and client input.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod cli;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use cli::{Cli, Commands, InspectFormat, SourceArgs};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use legaldoc::clause_library::{ClauseLibrary, FsClauseLibrary, MemoryClauseLibrary};
use legaldoc::input::InputRecord;
use legaldoc::practice_config::{PracticeConfig, CONFIG_FILE_NAME};
use legaldoc::profile_config::DocumentProfile;
use legaldoc::template_source::{FsTemplateSource, TemplateSnapshot, TemplateSource};
use legaldoc::{docx, inspect, pipeline, profiles, GenerateOptions, GenerationReport};

/// Templates directory used when neither the CLI nor the config names one
const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Main entry point for the legaldoc CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Info);
    }
    logger.init();

    match cli.command {
        Commands::Generate {
            doc_type,
            input,
            output,
            sources,
        } => {
            handle_generate_command(&doc_type, &input, output, &sources, cli.verbose)?;
        }

        Commands::Batch {
            doc_type,
            input,
            output_dir,
            sources,
        } => {
            handle_batch_command(&doc_type, &input, output_dir, &sources)?;
        }

        Commands::Inspect {
            path,
            keyword,
            format,
        } => {
            handle_inspect_command(&path, &keyword, format)?;
        }

        Commands::ListTypes => {
            handle_list_types_command()?;
        }
    }

    Ok(())
}

/// Everything a generation run needs besides the client records
struct Session {
    config: PracticeConfig,
    profile: DocumentProfile,
    snapshot: TemplateSnapshot,
    library: Box<dyn ClauseLibrary>,
    options: GenerateOptions,
}

impl Session {
    /// Resolve config, profile, template and clause library for `doc_type`
    fn open(doc_type: &str, sources: &SourceArgs) -> Result<Self> {
        let config = load_config(sources.config.as_deref())?;
        let profile = load_profile(doc_type, &config)?;

        let templates_dir = config
            .templates_dir()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR));
        let mut source = FsTemplateSource::new(templates_dir);
        if let Some(path) = config.template_for(&profile.id) {
            source = source.with_override(&profile.id, path);
        }
        if let Some(path) = &sources.template {
            source = source.with_override(&profile.id, path.clone());
        }
        let snapshot = source
            .load(&profile)
            .with_context(|| format!("Failed to load the {} template", profile.title))?;

        let library: Box<dyn ClauseLibrary> =
            match sources.clauses.clone().or_else(|| config.clauses_dir()) {
                Some(dir) => Box::new(FsClauseLibrary::open(&dir).with_context(|| {
                    format!("Failed to open clause library {}", dir.display())
                })?),
                None => {
                    log::warn!("No clause directory configured; optional clauses will be skipped");
                    Box::new(MemoryClauseLibrary::new())
                }
            };

        let today = sources
            .date
            .unwrap_or_else(|| Local::now().date_naive());
        let options = GenerateOptions::new(today).with_defaults(config.defaults.clone());

        Ok(Self {
            config,
            profile,
            snapshot,
            library,
            options,
        })
    }

    /// Output directory from the config, or the working directory
    fn output_dir(&self) -> PathBuf {
        self.config
            .output_dir()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Load the practice configuration, if any
fn load_config(path: Option<&Path>) -> Result<PracticeConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(CONFIG_FILE_NAME);
            if !default.is_file() {
                return Ok(PracticeConfig::default());
            }
            default
        }
    };

    log::info!("Loading practice configuration from {}", path.display());
    PracticeConfig::load(&path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}

/// Look up the built-in profile for `doc_type`, honoring a configured override file
fn load_profile(doc_type: &str, config: &PracticeConfig) -> Result<DocumentProfile> {
    let info = profiles::get_profile(doc_type).with_context(|| {
        format!(
            "Document type '{}' not found. Run 'legaldoc list-types' to see available types",
            doc_type
        )
    })?;

    match config.profile_for(&info.id) {
        Some(path) => {
            log::info!("Using profile override {}", path.display());
            DocumentProfile::load(&path)
                .with_context(|| format!("Failed to load profile {}", path.display()))
        }
        None => profiles::parse_profile(&info)
            .with_context(|| format!("Failed to parse built-in profile '{}'", info.id)),
    }
}

/// Handle the generate command
fn handle_generate_command(
    doc_type: &str,
    input: &Path,
    output: Option<PathBuf>,
    sources: &SourceArgs,
    verbose: bool,
) -> Result<()> {
    let session = Session::open(doc_type, sources)?;

    let mut records = InputRecord::load_all(input)
        .with_context(|| format!("Failed to read input {}", input.display()))?;
    if records.len() > 1 {
        log::warn!(
            "{} holds {} records; generating the first. Use 'legaldoc batch' for all of them",
            input.display(),
            records.len()
        );
    }
    if records.is_empty() {
        anyhow::bail!("{} holds no input records", input.display());
    }
    let record = records.swap_remove(0);

    println!("Generating {}...", session.profile.title);
    let generated = pipeline::generate(
        &session.snapshot.document,
        session.library.as_ref(),
        &session.profile,
        &record,
        &session.options,
    )
    .with_context(|| format!("Failed to generate {}", session.profile.title))?;

    let output_path = match output {
        Some(path) if path.is_dir() => path.join(&generated.filename),
        Some(path) => path,
        None => session.output_dir().join(&generated.filename),
    };

    docx::write_path(&session.snapshot.package, &generated.document, &output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    print_report(&generated.report, verbose);
    println!("✓ Successfully wrote: {}", output_path.display());

    Ok(())
}

/// Handle the batch command
fn handle_batch_command(
    doc_type: &str,
    input: &Path,
    output_dir: Option<PathBuf>,
    sources: &SourceArgs,
) -> Result<()> {
    let session = Session::open(doc_type, sources)?;
    let output_dir = output_dir.unwrap_or_else(|| session.output_dir());

    let records = InputRecord::load_all(input)
        .with_context(|| format!("Failed to read input {}", input.display()))?;
    println!(
        "Generating {} {} documents...",
        records.len(),
        session.profile.abbreviation
    );

    let results = pipeline::generate_batch(
        &session.snapshot.document,
        session.library.as_ref(),
        &session.profile,
        &records,
        &session.options,
    );

    let mut used_names: HashSet<String> = HashSet::new();
    let mut failures = 0;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(generated) => {
                let filename = unique_filename(&generated.filename, &mut used_names);
                let path = output_dir.join(&filename);
                docx::write_path(&session.snapshot.package, &generated.document, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("✓ [{}] {}", index + 1, path.display());
            }
            Err(e) => {
                eprintln!("✗ [{}] {}", index + 1, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} records failed", failures, records.len());
    }
    println!("\n✓ Batch completed successfully!");

    Ok(())
}

/// Append ` (2)`, ` (3)`, ... until `filename` is unused
fn unique_filename(filename: &str, used: &mut HashSet<String>) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string();
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("docx");

    let mut candidate = filename.to_string();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{} ({}).{}", stem, n, extension);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Print the warnings of a generation report
fn print_report(report: &GenerationReport, verbose: bool) {
    for skipped in &report.skipped_clauses {
        println!("  ! Skipped clause {}: {}", skipped.id, skipped.reason);
    }
    if !report.unmapped_tokens.is_empty() {
        println!(
            "  ! No value for {}",
            report.unmapped_tokens.join(", ")
        );
    }
    for anomaly in &report.renumber_anomalies {
        println!("  ! Section label left unchanged: {}", anomaly.text);
    }
    if !report.unresolved_markers.is_empty() {
        println!(
            "  ! Removed {} unresolved marker(s): {}",
            report.unresolved_markers.len(),
            report.unresolved_markers.join(", ")
        );
    }
    if !report.split_tokens.is_empty() {
        println!(
            "  ! Left in a field or hyperlink, split by Word formatting: {}",
            report.split_tokens.join(", ")
        );
    }

    if verbose {
        println!("  - {} placeholder replacements", report.replacements);
        println!(
            "  - {} conditional paragraphs kept, {} removed",
            report.conditionals.kept, report.conditionals.dropped
        );
        println!("  - clauses: {}", report.inserted_clauses.join(", "));
        println!("  - {} section labels renumbered", report.renumbered);
        println!("  - {} cleanup rewrites", report.rewrites);
    }
}

/// Handle the inspect command
fn handle_inspect_command(path: &Path, keyword: &str, format: InspectFormat) -> Result<()> {
    let (_, document) =
        docx::read_path(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let inventory = inspect::inventory(&document, keyword)
        .with_context(|| format!("Invalid label keyword '{}'", keyword))?;

    match format {
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&inventory)
                .context("Failed to serialize inventory")?;
            println!("{}", json);
        }
        InspectFormat::Text => {
            println!("Template: {}\n", path.display());

            println!("Placeholders:");
            for entry in &inventory.placeholders {
                println!("  {} (x{})", entry.token, entry.count);
            }

            println!("\nMarkers:");
            for marker in &inventory.markers {
                println!("  {} [{:?}]", marker.token, marker.kind);
            }

            println!("\n{} labels:", keyword);
            for label in &inventory.labels {
                match label.value {
                    Some(value) => println!("  {} ({}) - {}", label.numeral, value, label.title),
                    None => println!("  {} (unreadable) - {}", label.numeral, label.title),
                }
            }

            println!(
                "\n{} header(s), {} footer(s), {} block(s) kept verbatim",
                inventory.headers, inventory.footers, inventory.opaque_blocks
            );
        }
    }

    Ok(())
}

/// Handle the list-types command
fn handle_list_types_command() -> Result<()> {
    println!("Available document types:\n");

    for info in profiles::get_all_profiles() {
        let profile = profiles::parse_profile(&info)
            .with_context(|| format!("Failed to parse built-in profile '{}'", info.id))?;
        println!("  {} - {} ({})", profile.id, profile.title, profile.abbreviation);
        if !profile.aliases.is_empty() {
            println!("    Aliases: {}", profile.aliases.join(", "));
        }
        println!("    Template: {}", profile.template);
        println!("    Required: {}", profile.required_fields.join(", "));
        println!();
    }

    println!("Usage: legaldoc generate <type> --input client.json");
    println!("Example: legaldoc generate will --input doe.json --clauses ./clauses");

    Ok(())
}
