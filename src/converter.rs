//! Document-to-document transformations.
//!
//! Every operation here produces a new document value and leaves its inputs
//! untouched, so merge/diff inputs stay stable and callers can process
//! documents concurrently without locks.
//!
//! Identity matching uses the claim key (vulnerability name, primary
//! product id) for merge, diff, and status updates; deduplication uses the
//! stricter (vulnerability, sorted product-id set) key.

use crate::model::{now_timestamp, Document, MetadataValue, Statement, Status};
use crate::shared::{Result, VexError};
use crate::validator::Validator;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Structural difference between two documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    /// Statements in the new document with no key match in the old.
    pub added: Vec<Statement>,
    /// Statements in the old document with no key match in the new.
    pub removed: Vec<Statement>,
    /// Matched keys whose status differs; carries the new document's value.
    pub modified: Vec<Statement>,
}

/// Merge multiple documents into one.
///
/// Later documents win on claim-key collision; first-appearance order is
/// preserved. The output records the source document identifiers and merge
/// timestamp in its metadata. A single-input merge is a passthrough.
pub fn merge(documents: &[Document]) -> Result<Document> {
    let first = documents.first().ok_or(VexError::NothingToMerge)?;
    if documents.len() == 1 {
        return Ok(first.clone());
    }

    let mut order: Vec<(String, String)> = Vec::new();
    let mut by_key: HashMap<(String, String), Statement> = HashMap::new();
    for document in documents {
        for statement in &document.statements {
            let key = statement.key();
            if !by_key.contains_key(&key) {
                order.push(key.clone());
            }
            by_key.insert(key, statement.clone());
        }
    }
    let statements = order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect();

    let mut metadata = first.metadata.clone().unwrap_or_default();
    metadata.insert(
        "merged_from".to_string(),
        MetadataValue::from(
            documents
                .iter()
                .map(|d| d.id.clone())
                .collect::<Vec<String>>(),
        ),
    );
    metadata.insert(
        "merge_timestamp".to_string(),
        MetadataValue::String(now_timestamp()),
    );

    Ok(Document {
        context: first.context.clone(),
        id: format!("urn:uuid:{}", Uuid::new_v4()),
        author: first.author.clone(),
        author_role: first.author_role.clone(),
        timestamp: now_timestamp(),
        version: first.version.clone(),
        tooling: first.tooling.clone(),
        supplier: first.supplier.clone(),
        last_updated: None,
        metadata: Some(metadata),
        statements,
    })
}

fn filtered(
    document: &Document,
    id_suffix: &str,
    metadata_key: &str,
    metadata_value: &str,
    keep: impl Fn(&Statement) -> bool,
) -> Document {
    let mut result = document.clone();
    result.id = format!("{}{}", document.id, id_suffix);
    result.statements.retain(|s| keep(s));

    let metadata = result.metadata.get_or_insert_with(BTreeMap::new);
    metadata.insert(
        metadata_key.to_string(),
        MetadataValue::String(metadata_value.to_string()),
    );
    metadata.insert(
        "filter_timestamp".to_string(),
        MetadataValue::String(now_timestamp()),
    );
    result
}

/// Restrict statements to one status.
pub fn filter_by_status(document: &Document, status: Status) -> Document {
    filtered(
        document,
        &format!("/filtered-{}", status),
        "filtered_by_status",
        status.as_str(),
        |s| s.status == status,
    )
}

/// Keep statements whose vulnerability name contains `pattern`.
pub fn filter_by_vulnerability(document: &Document, pattern: &str) -> Document {
    filtered(
        document,
        "/filtered-vuln",
        "filtered_by_vulnerability",
        pattern,
        |s| s.vulnerability.name.contains(pattern),
    )
}

/// Keep statements with a product id containing `product_id`.
pub fn filter_by_product(document: &Document, product_id: &str) -> Document {
    filtered(
        document,
        "/filtered-product",
        "filtered_by_product",
        product_id,
        |s| s.mentions_product(product_id),
    )
}

/// One filtered document per status value; all four keys always present.
pub fn split_by_status(document: &Document) -> BTreeMap<Status, Document> {
    Status::ALL
        .iter()
        .map(|&status| (status, filter_by_status(document, status)))
        .collect()
}

/// Replace the status on all statements matching `vulnerability_name` and
/// bump the document timestamp.
///
/// Does not re-validate the status/justification pairing - the caller is
/// responsible for re-validating after conversion. Use
/// [`update_status_checked`] for a validating variant.
pub fn update_status(
    document: &Document,
    vulnerability_name: &str,
    new_status: Status,
) -> Document {
    let mut result = document.clone();
    result.id = format!("{}/updated", document.id);
    result.timestamp = now_timestamp();
    for statement in &mut result.statements {
        if statement.vulnerability.name == vulnerability_name {
            statement.status = new_status;
        }
    }

    let metadata = result.metadata.get_or_insert_with(BTreeMap::new);
    metadata.insert(
        "status_updated".to_string(),
        MetadataValue::String(vulnerability_name.to_string()),
    );
    metadata.insert(
        "update_timestamp".to_string(),
        MetadataValue::String(now_timestamp()),
    );
    result
}

/// Like [`update_status`], but fails if the resulting document violates a
/// hard validation rule (e.g. `not_affected` without justification).
pub fn update_status_checked(
    document: &Document,
    vulnerability_name: &str,
    new_status: Status,
) -> Result<Document> {
    let result = update_status(document, vulnerability_name, new_status);
    let report = Validator::new().validate(&result);
    if !report.valid {
        let message = report
            .errors
            .first()
            .map(|e| format!("{}: {}", e.field, e.message))
            .unwrap_or_else(|| "unknown validation error".to_string());
        return Err(VexError::ValidationFailed { message }.into());
    }
    Ok(result)
}

/// Collapse statements sharing a (vulnerability, sorted product-id set)
/// key, keeping the first occurrence.
///
/// Metadata records the original and deduplicated counts only when
/// duplicates were actually removed, so the operation is idempotent.
pub fn deduplicate(document: &Document) -> Document {
    let mut seen = HashSet::new();
    let mut result = document.clone();
    result.statements.retain(|s| seen.insert(s.dedup_key()));

    if result.statements.len() < document.statements.len() {
        let metadata = result.metadata.get_or_insert_with(BTreeMap::new);
        metadata.insert("deduplicated".to_string(), MetadataValue::Bool(true));
        metadata.insert(
            "original_count".to_string(),
            MetadataValue::Integer(document.statements.len() as i64),
        );
        metadata.insert(
            "deduplicated_count".to_string(),
            MetadataValue::Integer(result.statements.len() as i64),
        );
    }
    result
}

/// Compute the structural diff between an old and a new document.
pub fn diff(old: &Document, new: &Document) -> Diff {
    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut modified = Vec::new();

    for statement in &new.statements {
        match old.statements.iter().find(|s| s.key() == statement.key()) {
            None => added.push(statement.clone()),
            Some(previous) if previous.status != statement.status => {
                modified.push(statement.clone());
            }
            Some(_) => {}
        }
    }

    for statement in &old.statements {
        if !new.statements.iter().any(|s| s.key() == statement.key()) {
            removed.push(statement.clone());
        }
    }

    Diff {
        added,
        removed,
        modified,
    }
}
