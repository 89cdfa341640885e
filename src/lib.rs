//! vexkit - a toolkit for VEX (Vulnerability Exploitability eXchange)
//! documents.
//!
//! Builds, parses, validates, queries, merges, and converts OpenVEX-shaped
//! documents. The CLI (`vexkit`) wraps the same library surface used
//! programmatically:
//!
//! ```
//! use vexkit::builder::{BuilderOptions, DocumentBuilder};
//!
//! let doc = DocumentBuilder::new(BuilderOptions::new("Security Team"))
//!     .create_statement()
//!     .vulnerability("CVE-2024-1234")
//!     .product("pkg:npm/example@1.0.0")
//!     .not_affected(vexkit::model::Justification::ComponentNotPresent)
//!     .done()
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(doc.statements.len(), 1);
//! ```

pub mod builder;
pub mod cli;
pub mod config;
pub mod converter;
pub mod exporter;
pub mod generator;
pub mod model;
pub mod parser;
pub mod query;
pub mod shared;
pub mod validator;

pub use shared::{ExitCode, Result, VexError};
