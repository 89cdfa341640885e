//! Command-line interface for vexkit.
//!
//! Validation failures exit with code 1 and a line-by-line listing of
//! errors (red) and warnings (yellow). Malformed external input never
//! panics; it surfaces as an application error with a hint.

use anyhow::Context;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use crate::config::discover_config;
use crate::converter;
use crate::exporter::summary_text;
use crate::generator::{Generator, GeneratorConfig, SbomDocument};
use crate::model::{Justification, Status};
use crate::parser::{load, save, SerializeOptions};
use crate::query::DocumentQuery;
use crate::shared::{ExitCode, Result, VexError};
use crate::validator::Validator;

const DEFAULT_AUTHOR: &str = "Security Team";

/// Manage VEX (Vulnerability Exploitability eXchange) documents
#[derive(Parser, Debug)]
#[command(name = "vexkit")]
#[command(version)]
#[command(about = "Build, validate, query, and convert VEX documents", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new VEX document from flags
    Create {
        /// CVE identifier (e.g., CVE-2024-1234)
        #[arg(long)]
        cve: String,
        /// Product identifier in PURL format
        #[arg(long)]
        product: String,
        /// VEX status (not_affected, affected, fixed, under_investigation)
        #[arg(long)]
        status: Status,
        /// Document author
        #[arg(long)]
        author: Option<String>,
        /// Justification for not_affected status
        #[arg(long)]
        justification: Option<Justification>,
        /// Impact statement
        #[arg(long)]
        impact: Option<String>,
        /// Action statement
        #[arg(long)]
        action: Option<String>,
        /// Output file
        #[arg(short, long, default_value = "vex-document.json")]
        output: PathBuf,
    },
    /// Validate a VEX document
    Validate {
        /// VEX document file to validate
        file: PathBuf,
        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },
    /// Query vulnerability status from a VEX document
    Query {
        /// VEX document file
        file: PathBuf,
        /// CVE identifier to query
        cve: String,
    },
    /// Display statistics for a VEX document
    Stats {
        /// VEX document file
        file: PathBuf,
    },
    /// Generate a template VEX document
    Template {
        /// Document author
        #[arg(long)]
        author: Option<String>,
        /// Omit the example statements
        #[arg(long)]
        no_examples: bool,
        /// Output file
        #[arg(short, long, default_value = "vex-template.json")]
        output: PathBuf,
    },
    /// Merge multiple VEX documents
    Merge {
        /// VEX document files to merge
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output file
        #[arg(short, long, default_value = "merged-vex.json")]
        output: PathBuf,
    },
    /// Convert a VEX document between formats (inferred from extensions)
    Convert {
        /// Input file
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Generate a VEX document from an SBOM (CycloneDX or SPDX JSON)
    GenerateFromSbom {
        /// SBOM file (JSON)
        sbom: PathBuf,
        /// Document author
        #[arg(long)]
        author: Option<String>,
        /// Output file
        #[arg(short, long, default_value = "vex-from-sbom.json")]
        output: PathBuf,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Resolve the effective author: explicit flag, then a discovered
/// `vexkit.config.yml`, then the built-in default.
fn resolve_generator_config(author: Option<String>) -> GeneratorConfig {
    let discovered = discover_config(Path::new(".")).ok().flatten();
    let author = author
        .or_else(|| discovered.as_ref().and_then(|c| c.author.clone()))
        .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

    let config = GeneratorConfig::new(author);
    match discovered {
        Some(file) => file.apply_to(config),
        None => config,
    }
}

/// Dispatch a parsed command. Returns the process exit code.
pub fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Command::Create {
            cve,
            product,
            status,
            author,
            justification,
            impact,
            action,
            output,
        } => create(
            &cve,
            &product,
            status,
            author,
            justification,
            impact,
            action,
            &output,
        ),
        Command::Validate { file, strict } => validate(&file, strict),
        Command::Query { file, cve } => query(&file, &cve),
        Command::Stats { file } => stats(&file),
        Command::Template {
            author,
            no_examples,
            output,
        } => template(author, !no_examples, &output),
        Command::Merge { files, output } => merge(&files, &output),
        Command::Convert { input, output } => convert(&input, &output),
        Command::GenerateFromSbom {
            sbom,
            author,
            output,
        } => generate_from_sbom(&sbom, author, &output),
    }
}

#[allow(clippy::too_many_arguments)]
fn create(
    cve: &str,
    product: &str,
    status: Status,
    author: Option<String>,
    justification: Option<Justification>,
    impact: Option<String>,
    action: Option<String>,
    output: &Path,
) -> Result<ExitCode> {
    let config = resolve_generator_config(author);
    let generator = Generator::new(config.clone());
    let statement = generator.statement(cve, product, status, justification, impact, action);

    let mut document = generator.template(false);
    document.add_statement(statement);

    save(&document, output, SerializeOptions::default())?;
    println!(
        "{} VEX document created: {}",
        "✓".green(),
        output.display()
    );
    Ok(ExitCode::Success)
}

fn validate(file: &Path, strict: bool) -> Result<ExitCode> {
    let document = load(file)?;
    let report = Validator::new().validate(&document);

    if report.valid {
        println!("{} VEX document is valid", "✓".green());
    } else {
        println!("{} VEX document has errors:", "✗".red());
        for error in &report.errors {
            println!("  - {}", format!("{}: {}", error.field, error.message).red());
        }
    }

    if !report.warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow());
        for warning in &report.warnings {
            println!("  - {}", warning.yellow());
        }
    }

    let failed = !report.valid || (strict && !report.warnings.is_empty());
    Ok(if failed {
        ExitCode::ValidationFailed
    } else {
        ExitCode::Success
    })
}

fn query(file: &Path, cve: &str) -> Result<ExitCode> {
    let document = load(file)?;
    let result = DocumentQuery::new(&document).query_vulnerability(cve);

    if !result.found {
        println!("{}", format!("{} not found in VEX document", cve).yellow());
        return Ok(ExitCode::Success);
    }

    println!("{}", format!("Found {}:", cve).green());
    if let Some(status) = result.status {
        println!("  Status: {}", status.bold());
    }
    if let Some(products) = result.products {
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        println!("  Products: {}", ids.join(", "));
    }
    if let Some(statement) = result.statement {
        if let Some(justification) = statement.justification {
            println!("  Justification: {}", justification);
        }
        if let Some(impact) = &statement.impact_statement {
            println!("  Impact: {}", impact);
        }
        if let Some(action) = &statement.action_statement {
            println!("  Action: {}", action);
        }
    }
    Ok(ExitCode::Success)
}

fn stats(file: &Path) -> Result<ExitCode> {
    let document = load(file)?;
    let summary = DocumentQuery::new(&document).summary();

    println!("{}", summary_text(&document));
    println!("\n{}", format!("Risk Score: {}/100", summary.risk_score).bold());
    Ok(ExitCode::Success)
}

fn template(author: Option<String>, include_examples: bool, output: &Path) -> Result<ExitCode> {
    let generator = Generator::new(resolve_generator_config(author));
    let document = generator.template(include_examples);

    save(&document, output, SerializeOptions::default())?;
    println!("{} Template created: {}", "✓".green(), output.display());
    Ok(ExitCode::Success)
}

fn merge(files: &[PathBuf], output: &Path) -> Result<ExitCode> {
    let documents = files
        .iter()
        .map(|path| load(path))
        .collect::<Result<Vec<_>>>()?;
    let merged = converter::merge(&documents)?;

    save(&merged, output, SerializeOptions::default())?;
    println!(
        "{} Merged {} documents into: {}",
        "✓".green(),
        files.len(),
        output.display()
    );
    Ok(ExitCode::Success)
}

fn convert(input: &Path, output: &Path) -> Result<ExitCode> {
    let document = load(input)?;
    save(&document, output, SerializeOptions::default())?;
    println!(
        "{} Converted {} to {}",
        "✓".green(),
        input.display(),
        output.display()
    );
    Ok(ExitCode::Success)
}

fn generate_from_sbom(sbom_path: &Path, author: Option<String>, output: &Path) -> Result<ExitCode> {
    let content = std::fs::read_to_string(sbom_path).map_err(|e| VexError::FileReadError {
        path: sbom_path.to_path_buf(),
        details: e.to_string(),
    })?;
    let sbom: SbomDocument = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse SBOM file: {}\n\n💡 Hint: Ensure the file contains valid CycloneDX or SPDX JSON.",
            sbom_path.display()
        )
    })?;

    let generator = Generator::new(resolve_generator_config(author));
    let document = generator.from_sbom(&sbom);
    let component_count = sbom.all_components().count();

    save(&document, output, SerializeOptions::default())?;
    println!(
        "{} Generated VEX document from SBOM: {}",
        "✓".green(),
        output.display()
    );
    println!("  Processed {} components", component_count);
    Ok(ExitCode::Success)
}
