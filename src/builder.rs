//! Fluent construction of VEX documents.
//!
//! Builders are owned and consuming: `create_statement()` moves the parent
//! builder into a [`StatementBuilder`], and `done()` moves it back out once
//! the statement is complete. Incomplete statements are rejected at `done()`
//! with an error naming the missing field, and `build()` rejects documents
//! with no statements. These are construction errors - caller bugs, not bad
//! external data - and should be treated as fatal by the calling operation.

use crate::model::{
    now_timestamp, Document, Justification, Metadata, MetadataValue, Product, Statement, Status,
    Tooling, Version, Vulnerability, DEFAULT_CONTEXT,
};
use crate::shared::{Result, VexError};
use uuid::Uuid;

/// Authorship options for a new document builder.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    pub author: String,
    pub author_role: Option<String>,
    pub context: Option<String>,
    pub id: Option<String>,
    pub version: Option<Version>,
    pub tooling: Option<Tooling>,
    pub metadata: Option<Metadata>,
}

impl BuilderOptions {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            ..Default::default()
        }
    }
}

/// Incremental, fail-fast VEX document builder.
#[derive(Debug)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Initializes context, id, author, timestamp and version defaults with
    /// an empty statement sequence.
    pub fn new(options: BuilderOptions) -> Self {
        let document = Document {
            context: options
                .context
                .unwrap_or_else(|| DEFAULT_CONTEXT.to_string()),
            id: options
                .id
                .unwrap_or_else(|| format!("urn:uuid:{}", Uuid::new_v4())),
            author: options.author,
            author_role: options.author_role,
            timestamp: now_timestamp(),
            version: options.version.unwrap_or(Version::Integer(1)),
            tooling: options.tooling,
            supplier: None,
            last_updated: None,
            metadata: options.metadata,
            statements: Vec::new(),
        };
        Self { document }
    }

    pub fn set_tooling(
        mut self,
        vendor: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.document.tooling = Some(Tooling {
            vendor: vendor.into(),
            name: name.into(),
            version: version.into(),
        });
        self
    }

    pub fn set_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.document.supplier = Some(supplier.into());
        self
    }

    pub fn set_metadata(mut self, metadata: Metadata) -> Self {
        self.document.metadata = Some(metadata);
        self
    }

    pub fn add_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.document
            .metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    /// Append an already-assembled statement.
    pub fn add_statement(mut self, statement: Statement) -> Self {
        self.document.statements.push(statement);
        self
    }

    /// Begin a statement sub-builder; `done()` returns control here.
    pub fn create_statement(self) -> StatementBuilder {
        StatementBuilder::new(self)
    }

    /// Finalize into an immutable document snapshot.
    ///
    /// Fails if zero statements were added.
    pub fn build(self) -> Result<Document> {
        if self.document.statements.is_empty() {
            return Err(VexError::EmptyDocument.into());
        }
        Ok(self.document)
    }
}

/// Sub-builder scoped to one statement.
///
/// Requires a vulnerability, at least one product, and a status before
/// `done()` hands the parent builder back.
#[derive(Debug)]
pub struct StatementBuilder {
    parent: DocumentBuilder,
    vulnerability: Option<Vulnerability>,
    products: Vec<Product>,
    status: Option<Status>,
    justification: Option<Justification>,
    impact_statement: Option<String>,
    action_statement: Option<String>,
    action_statement_timestamp: Option<String>,
    status_notes: Option<String>,
    supplier: Option<String>,
}

impl StatementBuilder {
    fn new(parent: DocumentBuilder) -> Self {
        Self {
            parent,
            vulnerability: None,
            products: Vec::new(),
            status: None,
            justification: None,
            impact_statement: None,
            action_statement: None,
            action_statement_timestamp: None,
            status_notes: None,
            supplier: None,
        }
    }

    pub fn vulnerability(mut self, name: impl Into<String>) -> Self {
        self.vulnerability = Some(Vulnerability::new(name));
        self
    }

    /// Set a CVE vulnerability with an optional description.
    pub fn cve(mut self, cve_id: impl Into<String>, description: Option<String>) -> Self {
        let mut vuln = Vulnerability::new(cve_id);
        vuln.description = description;
        self.vulnerability = Some(vuln);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        if let Some(vuln) = self.vulnerability.as_mut() {
            vuln.description = Some(description.into());
        }
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let Some(vuln) = self.vulnerability.as_mut() {
            vuln.aliases.get_or_insert_with(Vec::new).push(alias.into());
        }
        self
    }

    pub fn add_product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }

    pub fn product(self, id: impl Into<String>) -> Self {
        self.add_product(Product::new(id))
    }

    /// Add a product identified by package URL.
    pub fn product_purl(self, purl: impl Into<String>) -> Self {
        self.add_product(Product::from_purl(purl))
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Status `not_affected` with its required justification, set together
    /// so the validator's hard rule holds by construction.
    pub fn not_affected(mut self, justification: Justification) -> Self {
        self.status = Some(Status::NotAffected);
        self.justification = Some(justification);
        self
    }

    /// Status `affected` with its recommended action statement.
    pub fn affected(mut self, action_statement: impl Into<String>) -> Self {
        self.status = Some(Status::Affected);
        self.action_statement = Some(action_statement.into());
        self
    }

    pub fn fixed(mut self, action_statement: impl Into<String>) -> Self {
        self.status = Some(Status::Fixed);
        self.action_statement = Some(action_statement.into());
        self
    }

    pub fn under_investigation(mut self) -> Self {
        self.status = Some(Status::UnderInvestigation);
        self
    }

    pub fn impact(mut self, statement: impl Into<String>) -> Self {
        self.impact_statement = Some(statement.into());
        self
    }

    pub fn action(mut self, statement: impl Into<String>, timestamp: Option<String>) -> Self {
        self.action_statement = Some(statement.into());
        self.action_statement_timestamp = timestamp;
        self
    }

    pub fn status_notes(mut self, notes: impl Into<String>) -> Self {
        self.status_notes = Some(notes.into());
        self
    }

    pub fn supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    /// Complete the statement and return the parent builder.
    ///
    /// Fails with a construction error naming the missing field.
    pub fn done(self) -> Result<DocumentBuilder> {
        let vulnerability = self
            .vulnerability
            .ok_or(VexError::IncompleteStatement {
                field: "vulnerability",
            })?;
        if self.products.is_empty() {
            return Err(VexError::IncompleteStatement { field: "products" }.into());
        }
        let status = self
            .status
            .ok_or(VexError::IncompleteStatement { field: "status" })?;

        let statement = Statement {
            vulnerability,
            products: self.products,
            status,
            justification: self.justification,
            impact_statement: self.impact_statement,
            action_statement: self.action_statement,
            action_statement_timestamp: self.action_statement_timestamp,
            status_notes: self.status_notes,
            supplier: self.supplier,
        };

        let mut parent = self.parent;
        parent.document.statements.push(statement);
        Ok(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_minimal_document() {
        let doc = DocumentBuilder::new(BuilderOptions::new("Security Team"))
            .create_statement()
            .cve("CVE-2024-1234".to_string(), None)
            .product_purl("pkg:npm/example@1.0.0")
            .not_affected(Justification::VulnerableCodeNotInExecutePath)
            .done()
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(doc.author, "Security Team");
        assert_eq!(doc.context, DEFAULT_CONTEXT);
        assert!(doc.id.starts_with("urn:uuid:"));
        assert_eq!(doc.version, Version::Integer(1));
        assert_eq!(doc.statements.len(), 1);
        assert_eq!(doc.statements[0].status, Status::NotAffected);
        assert_eq!(
            doc.statements[0].justification,
            Some(Justification::VulnerableCodeNotInExecutePath)
        );
    }

    #[test]
    fn test_build_empty_document_fails() {
        let result = DocumentBuilder::new(BuilderOptions::new("Security Team")).build();
        assert!(result.is_err());
        assert!(format!("{}", result.unwrap_err()).contains("at least one statement"));
    }

    #[test]
    fn test_done_without_vulnerability_fails() {
        let result = DocumentBuilder::new(BuilderOptions::new("Security Team"))
            .create_statement()
            .product("pkg:npm/example@1.0.0")
            .status(Status::Fixed)
            .done();
        assert!(result.is_err());
        assert!(format!("{}", result.unwrap_err()).contains("vulnerability"));
    }

    #[test]
    fn test_done_without_products_fails() {
        let result = DocumentBuilder::new(BuilderOptions::new("Security Team"))
            .create_statement()
            .vulnerability("CVE-2024-1234")
            .status(Status::Fixed)
            .done();
        assert!(result.is_err());
        assert!(format!("{}", result.unwrap_err()).contains("products"));
    }

    #[test]
    fn test_done_without_status_fails() {
        let result = DocumentBuilder::new(BuilderOptions::new("Security Team"))
            .create_statement()
            .vulnerability("CVE-2024-1234")
            .product("pkg:npm/example@1.0.0")
            .done();
        assert!(result.is_err());
        assert!(format!("{}", result.unwrap_err()).contains("status"));
    }

    #[test]
    fn test_affected_sets_action_statement_atomically() {
        let doc = DocumentBuilder::new(BuilderOptions::new("Security Team"))
            .create_statement()
            .vulnerability("CVE-2024-5678")
            .product("pkg:npm/example@1.0.0")
            .affected("Upgrade to 2.0.0")
            .impact("Remote code execution")
            .done()
            .unwrap()
            .build()
            .unwrap();

        let stmt = &doc.statements[0];
        assert_eq!(stmt.status, Status::Affected);
        assert_eq!(stmt.action_statement.as_deref(), Some("Upgrade to 2.0.0"));
        assert_eq!(
            stmt.impact_statement.as_deref(),
            Some("Remote code execution")
        );
        assert!(stmt.justification.is_none());
    }

    #[test]
    fn test_builder_options_override_defaults() {
        let doc = DocumentBuilder::new(BuilderOptions {
            author: "Acme PSIRT".to_string(),
            author_role: Some("Document Owner".to_string()),
            context: Some("https://example.com/ns".to_string()),
            id: Some("https://example.com/vex/2026/001".to_string()),
            version: Some(Version::Text("1.0.0".to_string())),
            tooling: None,
            metadata: None,
        })
        .set_tooling("Acme", "vexkit", "0.3.0")
        .set_supplier("Acme Corp")
        .add_metadata("environment", "production")
        .create_statement()
        .vulnerability("CVE-2024-1234")
        .product("pkg:npm/example@1.0.0")
        .under_investigation()
        .done()
        .unwrap()
        .build()
        .unwrap();

        assert_eq!(doc.id, "https://example.com/vex/2026/001");
        assert_eq!(doc.author_role.as_deref(), Some("Document Owner"));
        assert_eq!(doc.version, Version::Text("1.0.0".to_string()));
        assert_eq!(doc.tooling.as_ref().unwrap().name, "vexkit");
        assert_eq!(doc.supplier.as_deref(), Some("Acme Corp"));
        assert_eq!(
            doc.metadata.unwrap().get("environment"),
            Some(&MetadataValue::String("production".to_string()))
        );
    }

    #[test]
    fn test_multiple_statements_preserve_order() {
        let doc = DocumentBuilder::new(BuilderOptions::new("Security Team"))
            .create_statement()
            .vulnerability("CVE-2024-0001")
            .product("pkg:npm/a@1.0.0")
            .affected("Upgrade a")
            .done()
            .unwrap()
            .create_statement()
            .vulnerability("CVE-2024-0002")
            .product("pkg:npm/b@1.0.0")
            .fixed("Fixed in 2.0.0")
            .done()
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(doc.statements[0].vulnerability.name, "CVE-2024-0001");
        assert_eq!(doc.statements[1].vulnerability.name, "CVE-2024-0002");
    }

    #[test]
    fn test_alias_and_describe() {
        let doc = DocumentBuilder::new(BuilderOptions::new("Security Team"))
            .create_statement()
            .vulnerability("CVE-2024-1234")
            .describe("Prototype pollution in example")
            .alias("GHSA-abcd-efgh-ijkl")
            .product("pkg:npm/example@1.0.0")
            .under_investigation()
            .done()
            .unwrap()
            .build()
            .unwrap();

        let vuln = &doc.statements[0].vulnerability;
        assert_eq!(
            vuln.description.as_deref(),
            Some("Prototype pollution in example")
        );
        assert_eq!(
            vuln.aliases.as_ref().unwrap(),
            &vec!["GHSA-abcd-efgh-ijkl".to_string()]
        );
    }
}
