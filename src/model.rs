//! VEX document data model.
//!
//! The types here mirror the OpenVEX document shape: a [`Document`] carries
//! authorship metadata and an ordered sequence of [`Statement`]s, each of
//! which asserts the exploitability [`Status`] of one vulnerability for a
//! set of products.
//!
//! Status and justification vocabularies are closed enums rather than
//! free-form strings, so exhaustiveness is enforced at every `match` and an
//! out-of-vocabulary value in ingested text is rejected at parse time.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default JSON-LD context for generated documents.
pub const DEFAULT_CONTEXT: &str = "https://openvex.dev/ns/v0.2.0";

/// Current time as an RFC 3339 timestamp string.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Exploitability status of a vulnerability for a set of products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotAffected,
    Affected,
    Fixed,
    UnderInvestigation,
}

impl Status {
    /// All status values, in vocabulary order.
    pub const ALL: [Status; 4] = [
        Status::NotAffected,
        Status::Affected,
        Status::Fixed,
        Status::UnderInvestigation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotAffected => "not_affected",
            Status::Affected => "affected",
            Status::Fixed => "fixed",
            Status::UnderInvestigation => "under_investigation",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_affected" => Ok(Status::NotAffected),
            "affected" => Ok(Status::Affected),
            "fixed" => Ok(Status::Fixed),
            "under_investigation" => Ok(Status::UnderInvestigation),
            _ => Err(format!(
                "Invalid status: {}. Must be one of: not_affected, affected, fixed, under_investigation",
                s
            )),
        }
    }
}

/// Reason code explaining why a `not_affected` claim holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Justification {
    ComponentNotPresent,
    VulnerableCodeNotPresent,
    VulnerableCodeNotInExecutePath,
    VulnerableCodeCannotBeControlledByAdversary,
    InlineMitigationsAlreadyExist,
}

impl Justification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Justification::ComponentNotPresent => "component_not_present",
            Justification::VulnerableCodeNotPresent => "vulnerable_code_not_present",
            Justification::VulnerableCodeNotInExecutePath => "vulnerable_code_not_in_execute_path",
            Justification::VulnerableCodeCannotBeControlledByAdversary => {
                "vulnerable_code_cannot_be_controlled_by_adversary"
            }
            Justification::InlineMitigationsAlreadyExist => "inline_mitigations_already_exist",
        }
    }
}

impl fmt::Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Justification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "component_not_present" => Ok(Justification::ComponentNotPresent),
            "vulnerable_code_not_present" => Ok(Justification::VulnerableCodeNotPresent),
            "vulnerable_code_not_in_execute_path" => {
                Ok(Justification::VulnerableCodeNotInExecutePath)
            }
            "vulnerable_code_cannot_be_controlled_by_adversary" => {
                Ok(Justification::VulnerableCodeCannotBeControlledByAdversary)
            }
            "inline_mitigations_already_exist" => Ok(Justification::InlineMitigationsAlreadyExist),
            _ => Err(format!("Invalid justification: {}", s)),
        }
    }
}

/// Document version: a positive integer or a semantic-version string.
///
/// Untagged so that `"version": 1` and `"version": "1.0.0"` both round-trip
/// without coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
    Integer(u64),
    Text(String),
}

impl Default for Version {
    fn default() -> Self {
        Version::Integer(0)
    }
}

impl Version {
    /// A missing or zero version is treated as absent by the validator.
    pub fn is_present(&self) -> bool {
        match self {
            Version::Integer(n) => *n > 0,
            Version::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Integer(n) => write!(f, "{}", n),
            Version::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Open key/value metadata attached to documents.
///
/// A constrained value union rather than an arbitrary dynamic object, so
/// metadata survives serialization round-trips with full fidelity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Integer(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(items: Vec<String>) -> Self {
        MetadataValue::List(items.into_iter().map(MetadataValue::String).collect())
    }
}

/// Document metadata map. BTreeMap keeps serialized key order deterministic.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Tool that produced a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooling {
    pub vendor: String,
    pub name: String,
    pub version: String,
}

/// The vulnerability a statement makes a claim about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
}

impl Vulnerability {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            aliases: None,
        }
    }

    /// True if `id` matches the vulnerability name or any alias.
    pub fn matches(&self, id: &str) -> bool {
        self.name == id
            || self
                .aliases
                .as_ref()
                .is_some_and(|aliases| aliases.iter().any(|a| a == id))
    }
}

/// A software component a statement applies to.
///
/// The `@id` SHOULD be a package URL but free text is tolerated; it is the
/// key used for product lookups and diff matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcomponents: Option<Vec<Product>>,
}

impl Product {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identifiers: None,
            hashes: None,
            subcomponents: None,
        }
    }

    /// A product identified by package URL, recorded in the identifiers map.
    pub fn from_purl(purl: impl Into<String>) -> Self {
        let purl = purl.into();
        let mut identifiers = BTreeMap::new();
        identifiers.insert("purl".to_string(), purl.clone());
        Self {
            id: purl,
            identifiers: Some(identifiers),
            hashes: None,
            subcomponents: None,
        }
    }
}

/// One VEX claim: a vulnerability, a set of products, a status, and
/// supporting justification/impact/action text.
///
/// Statements exist only inside a document and are never mutated in place;
/// conversions that change a statement produce a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub vulnerability: Vulnerability,
    pub products: Vec<Product>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<Justification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_statement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_statement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_statement_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

impl Statement {
    pub fn new(vulnerability: Vulnerability, products: Vec<Product>, status: Status) -> Self {
        Self {
            vulnerability,
            products,
            status,
            justification: None,
            impact_statement: None,
            action_statement: None,
            action_statement_timestamp: None,
            status_notes: None,
            supplier: None,
        }
    }

    /// The primary product identifier, used for merge/diff key matching.
    pub fn primary_product_id(&self) -> &str {
        self.products.first().map(|p| p.id.as_str()).unwrap_or("")
    }

    /// Identity key for merge, diff, and status-update matching: two
    /// statements are the same claim iff this pair matches.
    pub fn key(&self) -> (String, String) {
        (
            self.vulnerability.name.clone(),
            self.primary_product_id().to_string(),
        )
    }

    /// Deduplication key over the full, order-insensitive product set.
    pub fn dedup_key(&self) -> String {
        let ids: BTreeSet<&str> = self.products.iter().map(|p| p.id.as_str()).collect();
        let mut key = self.vulnerability.name.clone();
        key.push(':');
        key.push_str(&ids.into_iter().collect::<Vec<_>>().join(","));
        key
    }

    /// True if any product id contains `product_id` as a substring.
    /// Substring-tolerant because identifiers often carry version suffixes.
    pub fn mentions_product(&self, product_id: &str) -> bool {
        self.products.iter().any(|p| p.id.contains(product_id))
    }
}

/// Per-status statement counts for a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub not_affected: usize,
    pub affected: usize,
    pub fixed: usize,
    pub under_investigation: usize,
}

impl StatusCounts {
    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::NotAffected => self.not_affected,
            Status::Affected => self.affected,
            Status::Fixed => self.fixed,
            Status::UnderInvestigation => self.under_investigation,
        }
    }

    fn bump(&mut self, status: Status) {
        match status {
            Status::NotAffected => self.not_affected += 1,
            Status::Affected => self.affected += 1,
            Status::Fixed => self.fixed += 1,
            Status::UnderInvestigation => self.under_investigation += 1,
        }
    }
}

/// Aggregate statistics over a document's statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStats {
    pub total_statements: usize,
    pub by_status: StatusCounts,
    pub unique_vulnerabilities: usize,
    pub unique_products: usize,
}

/// A VEX document: authorship context plus an ordered statement sequence.
///
/// Field declaration order fixes the serialized key order, so serialization
/// is deterministic and `parse(serialize(d))` is structurally equal to `d`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "@context", default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(rename = "@id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_role: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooling: Option<Tooling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Document {
    /// Append a statement.
    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Append multiple statements at once.
    pub fn add_statements(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.statements.extend(statements);
    }

    /// Statements whose vulnerability name or aliases match `cve`.
    pub fn find_by_cve(&self, cve: &str) -> Vec<&Statement> {
        self.statements
            .iter()
            .filter(|s| s.vulnerability.matches(cve))
            .collect()
    }

    /// Statements whose product set contains the exact id.
    pub fn find_by_product(&self, product_id: &str) -> Vec<&Statement> {
        self.statements
            .iter()
            .filter(|s| s.products.iter().any(|p| p.id == product_id))
            .collect()
    }

    /// Statements with the given status.
    pub fn find_by_status(&self, status: Status) -> Vec<&Statement> {
        self.statements
            .iter()
            .filter(|s| s.status == status)
            .collect()
    }

    /// Set a metadata entry and bump `last_updated`.
    pub fn update_metadata(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self.last_updated = Some(now_timestamp());
    }

    /// Totals, per-status counts, and unique vulnerability/product counts.
    pub fn stats(&self) -> DocumentStats {
        let mut by_status = StatusCounts::default();
        let mut vulnerabilities = BTreeSet::new();
        let mut products = BTreeSet::new();

        for statement in &self.statements {
            by_status.bump(statement.status);
            vulnerabilities.insert(statement.vulnerability.name.as_str());
            for product in &statement.products {
                products.insert(product.id.as_str());
            }
        }

        DocumentStats {
            total_statements: self.statements.len(),
            by_status,
            unique_vulnerabilities: vulnerabilities.len(),
            unique_products: products.len(),
        }
    }

    /// Age of the document in whole days, or None if the timestamp does not
    /// parse as RFC 3339.
    pub fn age_days(&self) -> Option<i64> {
        let timestamp = chrono::DateTime::parse_from_rfc3339(&self.timestamp).ok()?;
        Some((Utc::now() - timestamp.with_timezone(&Utc)).num_days())
    }

    /// True if the document is older than `days_threshold` days.
    pub fn is_stale(&self, days_threshold: i64) -> bool {
        self.age_days().is_some_and(|age| age > days_threshold)
    }
}
