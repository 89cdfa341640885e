//! Structural and semantic validation of VEX documents.
//!
//! Validation never fails with an `Err` for data-shape issues: problems are
//! reported through [`ValidationReport`] so callers can decide how to react.
//! The one hard semantic rule is that `not_affected` requires a
//! justification; everything else advisory is a warning.

use crate::model::{Document, Statement, Status};
use serde::Serialize;

/// A single validation error with the field path it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Outcome of validating a document.
///
/// `valid` is true iff there are no errors; warnings never block success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

/// Validates VEX documents against structural rules and business rules.
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Full validation: structural checks plus per-statement semantic rules.
    ///
    /// Pure function of the input; no side effects.
    pub fn validate(&self, document: &Document) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        self.check_document_fields(document, &mut errors);

        if document.statements.is_empty() {
            warnings.push("Document contains no statements".to_string());
        }

        for (index, statement) in document.statements.iter().enumerate() {
            self.check_statement(statement, index, &mut errors, &mut warnings);
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Structural-only fast path for hot paths where only shape matters.
    pub fn quick_validate(&self, document: &Document) -> bool {
        let mut errors = Vec::new();
        self.check_document_fields(document, &mut errors);
        if !errors.is_empty() {
            return false;
        }
        document.statements.iter().all(|statement| {
            !statement.vulnerability.name.is_empty()
                && !statement.products.is_empty()
                && statement.products.iter().all(|p| !p.id.is_empty())
        })
    }

    fn check_document_fields(&self, document: &Document, errors: &mut Vec<ValidationError>) {
        if document.author.trim().is_empty() {
            errors.push(ValidationError {
                field: "author".to_string(),
                message: "Missing required field: author".to_string(),
            });
        }
        if document.timestamp.is_empty() {
            errors.push(ValidationError {
                field: "timestamp".to_string(),
                message: "Missing required field: timestamp".to_string(),
            });
        }
        if !document.version.is_present() {
            errors.push(ValidationError {
                field: "version".to_string(),
                message: "Missing required field: version".to_string(),
            });
        }
    }

    fn check_statement(
        &self,
        statement: &Statement,
        index: usize,
        errors: &mut Vec<ValidationError>,
        warnings: &mut Vec<String>,
    ) {
        let prefix = format!("statements[{}]", index);

        if statement.vulnerability.name.is_empty() {
            errors.push(ValidationError {
                field: format!("{}.vulnerability.name", prefix),
                message: "Vulnerability missing required field: name".to_string(),
            });
        } else if !is_cve_format(&statement.vulnerability.name) {
            warnings.push(format!(
                "{}: \"{}\" does not match standard CVE format",
                prefix, statement.vulnerability.name
            ));
        }

        if statement.products.is_empty() {
            errors.push(ValidationError {
                field: format!("{}.products", prefix),
                message: "Statement must have at least one product".to_string(),
            });
        }
        for (p_index, product) in statement.products.iter().enumerate() {
            if product.id.is_empty() {
                errors.push(ValidationError {
                    field: format!("{}.products[{}].@id", prefix, p_index),
                    message: "Product missing required field: @id".to_string(),
                });
            } else if !product.id.starts_with("pkg:") {
                warnings.push(format!(
                    "{}.products[{}]: Product ID should use PURL format (pkg:...)",
                    prefix, p_index
                ));
            }
        }

        match statement.status {
            Status::NotAffected => {
                if statement.justification.is_none() {
                    errors.push(ValidationError {
                        field: format!("{}.justification", prefix),
                        message: "Justification is required when status is \"not_affected\""
                            .to_string(),
                    });
                }
                if statement.impact_statement.is_none() {
                    warnings.push(format!(
                        "{}: Consider adding impact_statement explaining why not affected",
                        prefix
                    ));
                }
            }
            Status::Affected => {
                if statement.justification.is_some() {
                    warnings.push(format!(
                        "{}: Justification should only be used with \"not_affected\" status",
                        prefix
                    ));
                }
                if statement.action_statement.is_none() {
                    warnings.push(format!(
                        "{}: Consider adding action_statement for affected vulnerabilities",
                        prefix
                    ));
                }
            }
            Status::Fixed => {
                if statement.justification.is_some() {
                    warnings.push(format!(
                        "{}: Justification should only be used with \"not_affected\" status",
                        prefix
                    ));
                }
            }
            Status::UnderInvestigation => {}
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks the `CVE-YYYY-NNNN+` pattern, case-insensitively.
fn is_cve_format(name: &str) -> bool {
    let rest = match strip_prefix_ignore_case(name, "CVE-") {
        Some(rest) => rest,
        None => return false,
    };
    let Some((year, number)) = rest.split_once('-') else {
        return false;
    };
    year.len() == 4
        && year.bytes().all(|b| b.is_ascii_digit())
        && number.len() >= 4
        && number.bytes().all(|b| b.is_ascii_digit())
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}
