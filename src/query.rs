//! Read-only analysis over a single VEX document.
//!
//! When multiple statements reference the same vulnerability, queries
//! resolve to one statement per a fixed priority order:
//! `affected > under_investigation > fixed > not_affected`. The ordering
//! surfaces the most actionable claim first and must be preserved exactly
//! for compatibility with existing consumers.

use crate::model::{Document, Product, Statement, Status};
use serde::Serialize;

/// Statement-resolution priority. Lower rank wins.
fn priority(status: Status) -> usize {
    match status {
        Status::Affected => 0,
        Status::UnderInvestigation => 1,
        Status::Fixed => 2,
        Status::NotAffected => 3,
    }
}

/// Result of a vulnerability lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<'a> {
    pub found: bool,
    pub statement: Option<&'a Statement>,
    pub status: Option<Status>,
    pub products: Option<&'a [Product]>,
}

impl QueryResult<'_> {
    fn not_found() -> Self {
        QueryResult {
            found: false,
            statement: None,
            status: None,
            products: None,
        }
    }
}

/// Document-level summary statistics with a 0-100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub affected: usize,
    pub not_affected: usize,
    pub fixed: usize,
    pub under_investigation: usize,
    pub risk_score: u32,
}

/// One status difference between two documents sharing a claim key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub cve: String,
    pub product: String,
    pub old_status: Status,
    pub new_status: Status,
}

/// Structural comparison of two documents, keyed by
/// (vulnerability name, primary product id).
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison<'a> {
    pub only_in_this: Vec<&'a Statement>,
    pub only_in_other: Vec<&'a Statement>,
    pub status_changed: Vec<StatusChange>,
}

/// Query engine borrowing one document.
pub struct DocumentQuery<'a> {
    document: &'a Document,
}

impl<'a> DocumentQuery<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Resolve the authoritative statement for a CVE (name or alias match).
    pub fn query_vulnerability(&self, cve: &str) -> QueryResult<'a> {
        let mut statements = self.document.find_by_cve(cve);
        if statements.is_empty() {
            return QueryResult::not_found();
        }

        statements.sort_by_key(|s| priority(s.status));
        let primary = statements[0];

        QueryResult {
            found: true,
            statement: Some(primary),
            status: Some(primary.status),
            products: Some(&primary.products),
        }
    }

    /// All statements whose product set contains a substring match.
    pub fn query_product(&self, product_id: &str) -> Vec<&'a Statement> {
        self.document
            .statements
            .iter()
            .filter(|s| s.mentions_product(product_id))
            .collect()
    }

    /// True iff any matching statement claims `affected`.
    pub fn is_product_affected(&self, product_id: &str) -> bool {
        self.query_product(product_id)
            .iter()
            .any(|s| s.status == Status::Affected)
    }

    /// Unique product ids from affected statements, in first-appearance order.
    pub fn affected_products(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut products = Vec::new();
        for statement in self.document.find_by_status(Status::Affected) {
            for product in &statement.products {
                if seen.insert(product.id.as_str()) {
                    products.push(product.id.clone());
                }
            }
        }
        products
    }

    /// Vulnerability names of all statements with the given status.
    pub fn vulnerabilities_by_status(&self, status: Status) -> Vec<String> {
        self.document
            .find_by_status(status)
            .iter()
            .map(|s| s.vulnerability.name.clone())
            .collect()
    }

    /// Case-insensitive substring search across vulnerability name,
    /// description, impact statement, action statement, and product ids.
    pub fn search(&self, keyword: &str) -> Vec<&'a Statement> {
        let keyword = keyword.to_lowercase();
        let contains = |field: &Option<String>| {
            field
                .as_ref()
                .is_some_and(|text| text.to_lowercase().contains(&keyword))
        };

        self.document
            .statements
            .iter()
            .filter(|s| {
                s.vulnerability.name.to_lowercase().contains(&keyword)
                    || contains(&s.vulnerability.description)
                    || contains(&s.impact_statement)
                    || contains(&s.action_statement)
                    || s.products
                        .iter()
                        .any(|p| p.id.to_lowercase().contains(&keyword))
            })
            .collect()
    }

    /// Totals, per-status counts, and the document risk score.
    ///
    /// The score weights an affected statement twice as heavily as one under
    /// investigation, and treats not_affected/fixed as zero risk:
    /// `round((affected*100 + under_investigation*50) / (total*100) * 100)`.
    pub fn summary(&self) -> Summary {
        let stats = self.document.stats();
        let total = stats.total_statements;
        let affected = stats.by_status.affected;
        let under_investigation = stats.by_status.under_investigation;

        let risk_score = if total > 0 {
            let weighted = (affected * 100 + under_investigation * 50) as f64;
            ((weighted / (total * 100) as f64) * 100.0).round() as u32
        } else {
            0
        };

        Summary {
            total,
            affected,
            not_affected: stats.by_status.not_affected,
            fixed: stats.by_status.fixed,
            under_investigation,
            risk_score,
        }
    }

    /// Statements that still need action: affected or under investigation.
    pub fn actionable(&self) -> Vec<&'a Statement> {
        self.document
            .statements
            .iter()
            .filter(|s| matches!(s.status, Status::Affected | Status::UnderInvestigation))
            .collect()
    }

    /// Compare against another document by claim key, reporting statements
    /// unique to each side and matched keys whose status differs.
    pub fn compare_with<'b>(&self, other: &'b Document) -> Comparison<'a>
    where
        'b: 'a,
    {
        let mut only_in_this = Vec::new();
        let mut only_in_other = Vec::new();
        let mut status_changed = Vec::new();

        for statement in &self.document.statements {
            match other.statements.iter().find(|s| s.key() == statement.key()) {
                None => only_in_this.push(statement),
                Some(found) if found.status != statement.status => {
                    status_changed.push(StatusChange {
                        cve: statement.vulnerability.name.clone(),
                        product: statement.primary_product_id().to_string(),
                        old_status: statement.status,
                        new_status: found.status,
                    });
                }
                Some(_) => {}
            }
        }

        for statement in &other.statements {
            if !self
                .document
                .statements
                .iter()
                .any(|s| s.key() == statement.key())
            {
                only_in_other.push(statement);
            }
        }

        Comparison {
            only_in_this,
            only_in_other,
            status_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuilderOptions, DocumentBuilder, StatementBuilder};
    use crate::model::Justification;

    fn doc_with(
        build: impl FnOnce(DocumentBuilder) -> DocumentBuilder,
    ) -> Document {
        build(DocumentBuilder::new(BuilderOptions::new("Security Team")))
            .build()
            .unwrap()
    }

    fn add(
        builder: DocumentBuilder,
        cve: &str,
        product: &str,
        configure: impl FnOnce(StatementBuilder) -> StatementBuilder,
    ) -> DocumentBuilder {
        configure(builder.create_statement().vulnerability(cve).product(product))
            .done()
            .unwrap()
    }

    #[test]
    fn test_query_vulnerability_found() {
        let doc = doc_with(|b| {
            add(b, "CVE-2024-1234", "pkg:npm/example@1.0.0", |s| {
                s.fixed("Fixed in 1.0.1")
            })
        });
        let query = DocumentQuery::new(&doc);

        let result = query.query_vulnerability("CVE-2024-1234");
        assert!(result.found);
        assert_eq!(result.status, Some(Status::Fixed));
        assert_eq!(result.products.unwrap()[0].id, "pkg:npm/example@1.0.0");
    }

    #[test]
    fn test_query_vulnerability_not_found() {
        let doc = doc_with(|b| {
            add(b, "CVE-2024-1234", "pkg:npm/example@1.0.0", |s| {
                s.under_investigation()
            })
        });
        let result = DocumentQuery::new(&doc).query_vulnerability("CVE-2024-9999");
        assert!(!result.found);
        assert!(result.statement.is_none());
        assert!(result.status.is_none());
    }

    #[test]
    fn test_query_priority_affected_wins() {
        let doc = doc_with(|b| {
            let b = add(b, "CVE-2024-1234", "pkg:npm/a@1.0.0", |s| {
                s.not_affected(Justification::ComponentNotPresent)
            });
            add(b, "CVE-2024-1234", "pkg:npm/b@1.0.0", |s| {
                s.affected("Upgrade b")
            })
        });

        let result = DocumentQuery::new(&doc).query_vulnerability("CVE-2024-1234");
        assert_eq!(result.status, Some(Status::Affected));
    }

    #[test]
    fn test_query_priority_full_order() {
        let doc = doc_with(|b| {
            let b = add(b, "CVE-2024-1234", "pkg:npm/a@1.0.0", |s| {
                s.fixed("patched")
            });
            add(b, "CVE-2024-1234", "pkg:npm/b@1.0.0", |s| {
                s.under_investigation()
            })
        });

        let result = DocumentQuery::new(&doc).query_vulnerability("CVE-2024-1234");
        assert_eq!(result.status, Some(Status::UnderInvestigation));
    }

    #[test]
    fn test_query_vulnerability_matches_alias() {
        let doc = doc_with(|b| {
            add(b, "CVE-2024-1234", "pkg:npm/example@1.0.0", |s| {
                s.alias("GHSA-abcd-efgh-ijkl").under_investigation()
            })
        });
        let result = DocumentQuery::new(&doc).query_vulnerability("GHSA-abcd-efgh-ijkl");
        assert!(result.found);
    }

    #[test]
    fn test_query_product_substring_tolerant() {
        let doc = doc_with(|b| {
            add(b, "CVE-2024-1234", "pkg:npm/example@1.0.0", |s| {
                s.affected("Upgrade")
            })
        });
        let query = DocumentQuery::new(&doc);
        assert_eq!(query.query_product("example").len(), 1);
        assert!(query.is_product_affected("example"));
        assert!(!query.is_product_affected("missing"));
    }

    #[test]
    fn test_affected_products_unique() {
        let doc = doc_with(|b| {
            let b = add(b, "CVE-2024-0001", "pkg:npm/a@1.0.0", |s| {
                s.affected("Upgrade a")
            });
            let b = add(b, "CVE-2024-0002", "pkg:npm/a@1.0.0", |s| {
                s.affected("Upgrade a again")
            });
            add(b, "CVE-2024-0003", "pkg:npm/b@1.0.0", |s| s.fixed("done"))
        });
        let products = DocumentQuery::new(&doc).affected_products();
        assert_eq!(products, vec!["pkg:npm/a@1.0.0".to_string()]);
    }

    #[test]
    fn test_vulnerabilities_by_status() {
        let doc = doc_with(|b| {
            let b = add(b, "CVE-2024-0001", "pkg:npm/a@1.0.0", |s| {
                s.affected("Upgrade")
            });
            add(b, "CVE-2024-0002", "pkg:npm/b@1.0.0", |s| s.fixed("done"))
        });
        let fixed = DocumentQuery::new(&doc).vulnerabilities_by_status(Status::Fixed);
        assert_eq!(fixed, vec!["CVE-2024-0002".to_string()]);
    }

    #[test]
    fn test_search_case_insensitive() {
        let doc = doc_with(|b| {
            add(b, "CVE-2024-1234", "pkg:npm/Example@1.0.0", |s| {
                s.describe("Prototype Pollution")
                    .affected("Upgrade to 2.0.0")
            })
        });
        let query = DocumentQuery::new(&doc);
        assert_eq!(query.search("pollution").len(), 1);
        assert_eq!(query.search("EXAMPLE").len(), 1);
        assert_eq!(query.search("upgrade").len(), 1);
        assert!(query.search("heartbleed").is_empty());
    }

    #[test]
    fn test_summary_risk_score() {
        // 1 affected, 1 under investigation, 2 not affected:
        // round((100 + 50) / 400 * 100) = 38
        let doc = doc_with(|b| {
            let b = add(b, "CVE-2024-0001", "pkg:npm/a@1.0.0", |s| {
                s.affected("Upgrade")
            });
            let b = add(b, "CVE-2024-0002", "pkg:npm/b@1.0.0", |s| {
                s.under_investigation()
            });
            let b = add(b, "CVE-2024-0003", "pkg:npm/c@1.0.0", |s| {
                s.not_affected(Justification::ComponentNotPresent)
            });
            add(b, "CVE-2024-0004", "pkg:npm/d@1.0.0", |s| {
                s.not_affected(Justification::VulnerableCodeNotPresent)
            })
        });

        let summary = DocumentQuery::new(&doc).summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.affected, 1);
        assert_eq!(summary.under_investigation, 1);
        assert_eq!(summary.not_affected, 2);
        assert_eq!(summary.risk_score, 38);
    }

    #[test]
    fn test_summary_empty_document_zero_risk() {
        let doc = Document {
            context: String::new(),
            id: String::new(),
            author: "a".to_string(),
            author_role: None,
            timestamp: String::new(),
            version: crate::model::Version::Integer(1),
            tooling: None,
            supplier: None,
            last_updated: None,
            metadata: None,
            statements: vec![],
        };
        let summary = DocumentQuery::new(&doc).summary();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.risk_score, 0);
    }

    #[test]
    fn test_actionable() {
        let doc = doc_with(|b| {
            let b = add(b, "CVE-2024-0001", "pkg:npm/a@1.0.0", |s| {
                s.affected("Upgrade")
            });
            let b = add(b, "CVE-2024-0002", "pkg:npm/b@1.0.0", |s| {
                s.under_investigation()
            });
            add(b, "CVE-2024-0003", "pkg:npm/c@1.0.0", |s| s.fixed("done"))
        });
        let actionable = DocumentQuery::new(&doc).actionable();
        assert_eq!(actionable.len(), 2);
    }

    #[test]
    fn test_compare_with() {
        let old = doc_with(|b| {
            let b = add(b, "CVE-2024-0001", "pkg:npm/a@1.0.0", |s| {
                s.affected("Upgrade")
            });
            add(b, "CVE-2024-0002", "pkg:npm/b@1.0.0", |s| {
                s.under_investigation()
            })
        });
        let new = doc_with(|b| {
            let b = add(b, "CVE-2024-0001", "pkg:npm/a@1.0.0", |s| {
                s.fixed("Fixed in 2.0.0")
            });
            add(b, "CVE-2024-0003", "pkg:npm/c@1.0.0", |s| {
                s.affected("Upgrade c")
            })
        });

        let comparison = DocumentQuery::new(&old).compare_with(&new);
        assert_eq!(comparison.only_in_this.len(), 1);
        assert_eq!(
            comparison.only_in_this[0].vulnerability.name,
            "CVE-2024-0002"
        );
        assert_eq!(comparison.only_in_other.len(), 1);
        assert_eq!(
            comparison.only_in_other[0].vulnerability.name,
            "CVE-2024-0003"
        );
        assert_eq!(comparison.status_changed.len(), 1);
        let change = &comparison.status_changed[0];
        assert_eq!(change.cve, "CVE-2024-0001");
        assert_eq!(change.old_status, Status::Affected);
        assert_eq!(change.new_status, Status::Fixed);
    }
}
