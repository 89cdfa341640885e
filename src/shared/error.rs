use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes allow CI systems to distinguish between different
/// types of failures and successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - document is valid, or the operation completed
    Success = 0,
    /// The document failed validation
    ValidationFailed = 1,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (file I/O error, malformed input, builder misuse, etc.)
    ApplicationError = 3,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::ValidationFailed => write!(f, "Validation Failed (1)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
        }
    }
}

/// Application-specific errors for VEX document processing.
///
/// Uses thiserror to derive Display and Error traits automatically,
/// reducing boilerplate while maintaining user-friendly error messages.
///
/// The taxonomy separates parse errors (malformed text), validation
/// failures (well-formed but rule-violating documents, surfaced only in
/// strict mode), and construction errors (incomplete builder usage, which
/// reflects a caller bug rather than bad external data).
#[derive(Debug, Error)]
pub enum VexError {
    #[error("Failed to parse VEX {format} document\nDetails: {details}\n\n💡 Hint: Please verify that the input is well-formed {format}")]
    Parse { format: String, details: String },

    #[error("VEX validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Statement is missing required field: {field}\n\n💡 Hint: Call the corresponding builder method before done()")]
    IncompleteStatement { field: &'static str },

    #[error("VEX document must contain at least one statement")]
    EmptyDocument,

    #[error("At least one document is required for merging")]
    NothingToMerge,

    #[error("Invalid {what}: {value}\n\n💡 Hint: {hint}")]
    InvalidValue {
        what: &'static str,
        value: String,
        hint: String,
    },

    #[error("Failed to read file: {path}\nDetails: {details}\n\n💡 Hint: Please verify that the file exists and you have read permissions")]
    FileReadError { path: PathBuf, details: String },

    #[error("Failed to write to file: {path}\nDetails: {details}\n\n💡 Hint: Please verify that the directory exists and you have write permissions")]
    FileWriteError { path: PathBuf, details: String },
}
