pub mod error;
pub mod result;

pub use error::{ExitCode, VexError};
pub use result::Result;
