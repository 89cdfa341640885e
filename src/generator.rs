//! VEX document generation from SBOMs, CVE lists, and templates.
//!
//! Generation defaults come from an explicit [`GeneratorConfig`] passed to
//! the constructor - there are no module-level mutable defaults.

use crate::builder::{BuilderOptions, DocumentBuilder};
use crate::model::{
    now_timestamp, Document, Justification, Product, Statement, Status, Version, Vulnerability,
    DEFAULT_CONTEXT,
};
use crate::parser::{parse, serialize, Format, ParseOptions, SerializeOptions};
use crate::shared::Result;
use crate::validator::{ValidationReport, Validator};
use serde::Deserialize;
use uuid::Uuid;

/// Explicit generation defaults.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub author: String,
    pub context: Option<String>,
    pub document_id: Option<String>,
    pub default_status: Option<Status>,
    pub default_justification: Option<Justification>,
}

impl GeneratorConfig {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            context: None,
            document_id: None,
            default_status: None,
            default_justification: None,
        }
    }
}

/// A vulnerability entry attached to an SBOM component.
#[derive(Debug, Clone, Deserialize)]
pub struct SbomVulnerability {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

/// One component from a CycloneDX `components` or SPDX `packages` array.
///
/// Only the fields the generator needs are modeled; unknown SBOM fields are
/// ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct SbomComponent {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub purl: Option<String>,
    #[serde(default)]
    pub vulnerabilities: Vec<SbomVulnerability>,
}

impl SbomComponent {
    /// Product id for this component: the purl when present, otherwise a
    /// `pkg:generic` fallback.
    fn product_id(&self) -> String {
        if let Some(purl) = &self.purl {
            return purl.clone();
        }
        match &self.version {
            Some(version) => format!("pkg:generic/{}@{}", self.name, version),
            None => format!("pkg:generic/{}", self.name),
        }
    }
}

/// An SBOM input document: CycloneDX-style `components` or SPDX-style
/// `packages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SbomDocument {
    #[serde(default)]
    pub components: Vec<SbomComponent>,
    #[serde(default)]
    pub packages: Vec<SbomComponent>,
}

impl SbomDocument {
    /// Components regardless of which array the source format used.
    pub fn all_components(&self) -> impl Iterator<Item = &SbomComponent> {
        self.components.iter().chain(self.packages.iter())
    }
}

/// Generates VEX documents from various sources.
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    fn empty_document(&self) -> Document {
        Document {
            context: self
                .config
                .context
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTEXT.to_string()),
            id: self
                .config
                .document_id
                .clone()
                .unwrap_or_else(|| format!("urn:uuid:{}", Uuid::new_v4())),
            author: self.config.author.clone(),
            author_role: None,
            timestamp: now_timestamp(),
            version: Version::Integer(1),
            tooling: None,
            supplier: None,
            last_updated: None,
            metadata: None,
            statements: Vec::new(),
        }
    }

    /// One statement per vulnerability entry per component, with the
    /// configured default status (falling back to `under_investigation`).
    pub fn from_sbom(&self, sbom: &SbomDocument) -> Document {
        let mut document = self.empty_document();
        let status = self
            .config
            .default_status
            .unwrap_or(Status::UnderInvestigation);

        for component in sbom.all_components() {
            for vulnerability in &component.vulnerabilities {
                let mut vuln = Vulnerability::new(&vulnerability.id);
                vuln.description = vulnerability.description.clone();

                let mut statement =
                    Statement::new(vuln, vec![Product::new(component.product_id())], status);
                if status == Status::NotAffected {
                    statement.justification = self.config.default_justification;
                }
                if let Some(severity) = &vulnerability.severity {
                    statement.status_notes = Some(format!("Severity: {}", severity));
                }
                document.add_statement(statement);
            }
        }

        document
    }

    /// One statement per CVE, each covering all given product ids.
    pub fn from_cves(
        &self,
        cves: &[String],
        product_ids: &[String],
        status: Option<Status>,
        justification: Option<Justification>,
    ) -> Document {
        let mut document = self.empty_document();
        let status = status
            .or(self.config.default_status)
            .unwrap_or(Status::UnderInvestigation);

        for cve in cves {
            let mut statement = Statement::new(
                Vulnerability::new(cve),
                product_ids.iter().map(Product::new).collect(),
                status,
            );
            if status == Status::NotAffected {
                statement.justification =
                    justification.or(self.config.default_justification);
            }
            document.add_statement(statement);
        }

        document
    }

    /// A single statement; the justification is dropped unless status is
    /// `not_affected`.
    pub fn statement(
        &self,
        cve: &str,
        product_id: &str,
        status: Status,
        justification: Option<Justification>,
        impact_statement: Option<String>,
        action_statement: Option<String>,
    ) -> Statement {
        let mut statement = Statement::new(
            Vulnerability::new(cve),
            vec![Product::new(product_id)],
            status,
        );
        if status == Status::NotAffected {
            statement.justification = justification;
        }
        statement.impact_statement = impact_statement;
        statement.action_statement = action_statement;
        statement
    }

    /// A template document with one example statement per status value.
    pub fn template(&self, include_examples: bool) -> Document {
        let mut document = self.empty_document();
        if !include_examples {
            return document;
        }

        let mut not_affected = Statement::new(
            Vulnerability::new("CVE-2024-0001"),
            vec![Product::new("pkg:npm/example-package@1.0.0")],
            Status::NotAffected,
        );
        not_affected.vulnerability.description =
            Some("Example vulnerability description".to_string());
        not_affected.justification = Some(Justification::VulnerableCodeNotInExecutePath);
        not_affected.impact_statement =
            Some("The vulnerable code path is not used in our application.".to_string());
        document.add_statement(not_affected);

        let mut affected = Statement::new(
            Vulnerability::new("CVE-2024-0002"),
            vec![Product::new("pkg:npm/another-package@2.0.0")],
            Status::Affected,
        );
        affected.action_statement =
            Some("Upgrade to version 2.1.0 or apply security patch.".to_string());
        document.add_statement(affected);

        let mut fixed = Statement::new(
            Vulnerability::new("CVE-2024-0003"),
            vec![Product::new("pkg:npm/fixed-package@3.0.0")],
            Status::Fixed,
        );
        fixed.status_notes = Some("Fixed in version 3.0.0".to_string());
        document.add_statement(fixed);

        document.add_statement(Statement::new(
            Vulnerability::new("CVE-2024-0004"),
            vec![Product::new("pkg:npm/pending-package@4.0.0")],
            Status::UnderInvestigation,
        ));

        document
    }
}

/// Integration point for hosting applications: build a document asserting
/// `under_investigation` for every (vulnerability, dependency) pair and
/// return it serialized as JSON.
pub fn generate_vex_document(
    dependencies: &[String],
    vulnerabilities: &[String],
    config: GeneratorConfig,
) -> Result<String> {
    let generator = Generator::new(config);
    let document = generator.from_cves(vulnerabilities, dependencies, None, None);
    serialize(&document, Format::Json, SerializeOptions::default())
}

/// Integration point for hosting applications: parse raw JSON text and
/// return the full validation report. Malformed text is an error;
/// rule violations are reported in the result.
pub fn validate_vex_document(text: &str) -> Result<ValidationReport> {
    let document = parse(
        text,
        Format::Json,
        ParseOptions {
            validate: false,
            strict: false,
        },
    )?;
    Ok(Validator::new().validate(&document))
}
