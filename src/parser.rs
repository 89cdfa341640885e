//! Round-trip conversion between persisted text and the in-memory model.
//!
//! Parsing distinguishes malformed text (a parse error, no document
//! returned) from a well-formed document that violates validation rules
//! (reported through the validator, and fatal only in strict mode).
//! Serialization uses the model's declared field order, so
//! `parse(serialize(d))` is structurally equal to `d` for any valid `d`.

use crate::model::Document;
use crate::shared::{Result, VexError};
use crate::validator::Validator;
use serde::Serialize;
use std::path::Path;

/// Persisted document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Select a format by file-extension convention:
    /// `.yaml`/`.yml` map to YAML, everything else to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::Yaml => "YAML",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            _ => Err(format!(
                "Invalid format: {}. Please specify 'json' or 'yaml'",
                s
            )),
        }
    }
}

/// Options controlling parse-time validation.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Run the validator after deserialization.
    pub validate: bool,
    /// Fail the parse when validation reports errors.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            validate: true,
            strict: false,
        }
    }
}

/// Options controlling serialized output.
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    pub pretty: bool,
    pub indent: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 2,
        }
    }
}

/// Deserialize a document from text.
///
/// Malformed text fails with a parse error and no partial document. With
/// `options.validate`, the validator runs on the result; in strict mode an
/// invalid document fails with the first validation error's message.
/// Warnings are discarded - callers wanting them should run the validator
/// separately.
pub fn parse(text: &str, format: Format, options: ParseOptions) -> Result<Document> {
    let document: Document = match format {
        Format::Json => serde_json::from_str(text).map_err(|e| VexError::Parse {
            format: format.as_str().to_string(),
            details: e.to_string(),
        })?,
        Format::Yaml => serde_yaml_ng::from_str(text).map_err(|e| VexError::Parse {
            format: format.as_str().to_string(),
            details: e.to_string(),
        })?,
    };

    if options.validate {
        let report = Validator::new().validate(&document);
        if !report.valid && options.strict {
            let message = report
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "unknown validation error".to_string());
            return Err(VexError::ValidationFailed { message }.into());
        }
    }

    Ok(document)
}

/// Serialize a document with deterministic field ordering.
pub fn serialize(document: &Document, format: Format, options: SerializeOptions) -> Result<String> {
    match format {
        Format::Json => {
            if options.pretty {
                let indent = b" ".repeat(options.indent);
                let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
                let mut buf = Vec::new();
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                document.serialize(&mut ser)?;
                Ok(String::from_utf8(buf)?)
            } else {
                Ok(serde_json::to_string(document)?)
            }
        }
        Format::Yaml => Ok(serde_yaml_ng::to_string(document)?),
    }
}

/// Load a document from a file, selecting the format by extension.
pub fn load(path: &Path) -> Result<Document> {
    load_with_options(path, ParseOptions::default())
}

/// Load with explicit parse options.
pub fn load_with_options(path: &Path, options: ParseOptions) -> Result<Document> {
    let content = std::fs::read_to_string(path).map_err(|e| VexError::FileReadError {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    parse(&content, Format::from_path(path), options)
}

/// Save a document to a file, selecting the format by extension.
pub fn save(document: &Document, path: &Path, options: SerializeOptions) -> Result<()> {
    let content = serialize(document, Format::from_path(path), options)?;
    std::fs::write(path, content).map_err(|e| VexError::FileWriteError {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuilderOptions, DocumentBuilder};
    use crate::model::{Justification, Status, Version};
    use std::path::PathBuf;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn sample_document() -> Document {
        DocumentBuilder::new(BuilderOptions::new("Security Team"))
            .create_statement()
            .cve("CVE-2024-1234".to_string(), Some("Example vuln".to_string()))
            .product_purl("pkg:npm/example@1.0.0")
            .not_affected(Justification::VulnerableCodeNotInExecutePath)
            .impact("Vulnerable path is never executed")
            .done()
            .unwrap()
            .create_statement()
            .vulnerability("CVE-2024-5678")
            .product("pkg:npm/other@2.0.0")
            .affected("Upgrade to 2.1.0")
            .done()
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("doc.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("doc.YML")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("doc.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("doc")), Format::Json);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(Format::from_str("json").unwrap(), Format::Json);
        assert_eq!(Format::from_str("YAML").unwrap(), Format::Yaml);
        assert!(Format::from_str("xml").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample_document();
        let json = serialize(&doc, Format::Json, SerializeOptions::default()).unwrap();
        let back = parse(&json, Format::Json, ParseOptions::default()).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_yaml_round_trip() {
        let doc = sample_document();
        let yaml = serialize(&doc, Format::Yaml, SerializeOptions::default()).unwrap();
        let back = parse(&yaml, Format::Yaml, ParseOptions::default()).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_version_survives_round_trip_without_coercion() {
        let mut doc = sample_document();
        doc.version = Version::Text("1.0.0".to_string());
        let json = serialize(&doc, Format::Json, SerializeOptions::default()).unwrap();
        let back = parse(&json, Format::Json, ParseOptions::default()).unwrap();
        assert_eq!(back.version, Version::Text("1.0.0".to_string()));

        doc.version = Version::Integer(3);
        let json = serialize(&doc, Format::Json, SerializeOptions::default()).unwrap();
        let back = parse(&json, Format::Json, ParseOptions::default()).unwrap();
        assert_eq!(back.version, Version::Integer(3));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let result = parse("{not json", Format::Json, ParseOptions::default());
        assert!(result.is_err());
        let message = format!("{}", result.unwrap_err());
        assert!(message.contains("Failed to parse VEX JSON document"));
    }

    #[test]
    fn test_strict_mode_fails_on_invalid_document() {
        // Well-formed JSON, but not_affected without justification.
        let text = r#"{
            "author": "Security Team",
            "timestamp": "2026-01-01T00:00:00Z",
            "version": 1,
            "statements": [{
                "vulnerability": {"name": "CVE-2024-1234"},
                "products": [{"@id": "pkg:npm/example@1.0.0"}],
                "status": "not_affected"
            }]
        }"#;

        let lenient = parse(text, Format::Json, ParseOptions::default());
        assert!(lenient.is_ok());

        let strict = parse(
            text,
            Format::Json,
            ParseOptions {
                validate: true,
                strict: true,
            },
        );
        assert!(strict.is_err());
        let message = format!("{}", strict.unwrap_err());
        assert!(message.contains("VEX validation failed"));
        assert!(message.contains("Justification is required"));
    }

    #[test]
    fn test_unknown_status_is_parse_error() {
        let text = r#"{
            "author": "Security Team",
            "timestamp": "2026-01-01T00:00:00Z",
            "version": 1,
            "statements": [{
                "vulnerability": {"name": "CVE-2024-1234"},
                "products": [{"@id": "pkg:npm/example@1.0.0"}],
                "status": "exploited"
            }]
        }"#;
        let result = parse(text, Format::Json, ParseOptions::default());
        assert!(result.is_err());
        assert!(format!("{}", result.unwrap_err()).contains("Failed to parse"));
    }

    #[test]
    fn test_pretty_output_uses_indent() {
        let doc = sample_document();
        let two = serialize(&doc, Format::Json, SerializeOptions::default()).unwrap();
        assert!(two.contains("\n  \"author\""));
        let four = serialize(
            &doc,
            Format::Json,
            SerializeOptions {
                pretty: true,
                indent: 4,
            },
        )
        .unwrap();
        assert!(four.contains("\n    \"author\""));
        let compact = serialize(
            &doc,
            Format::Json,
            SerializeOptions {
                pretty: false,
                indent: 2,
            },
        )
        .unwrap();
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vex.json");
        let doc = sample_document();
        save(&doc, &path, SerializeOptions::default()).unwrap();
        let back = load(&path).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_save_and_load_yaml_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vex.yaml");
        let doc = sample_document();
        save(&doc, &path, SerializeOptions::default()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.trim_start().starts_with('{'));
        let back = load(&path).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load(&PathBuf::from("/nonexistent/vex.json"));
        assert!(result.is_err());
        assert!(format!("{}", result.unwrap_err()).contains("Failed to read file"));
    }
}
