//! Plain-text export helpers for human-readable output.

use crate::model::Document;

/// Fixed-layout text summary of a document, used by the CLI `stats` command
/// and suitable for dropping into reports.
pub fn summary_text(document: &Document) -> String {
    let stats = document.stats();

    format!(
        "VEX Document Summary\n\
         ====================\n\
         ID: {}\n\
         Author: {}\n\
         Version: {}\n\
         Timestamp: {}\n\
         \n\
         Statements: {}\n\
         \x20 - Not Affected: {}\n\
         \x20 - Affected: {}\n\
         \x20 - Fixed: {}\n\
         \x20 - Under Investigation: {}\n\
         \n\
         Vulnerabilities: {} unique\n\
         Products: {} unique",
        document.id,
        document.author,
        document.version,
        document.timestamp,
        stats.total_statements,
        stats.by_status.not_affected,
        stats.by_status.affected,
        stats.by_status.fixed,
        stats.by_status.under_investigation,
        stats.unique_vulnerabilities,
        stats.unique_products,
    )
}
