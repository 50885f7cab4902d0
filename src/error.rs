use std::sync::Arc;

use crate::conditions::ParseError;
use crate::Str;

/// Represents a result type for operations in the Vexil engine.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the Vexil engine.
///
/// All of these surface at load/validation time. Evaluation itself never returns an error: a
/// malformed variant degrades to "never matches" (see the crate documentation).
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A condition expression is structurally invalid.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An allocation or namespace range is out of bounds.
    #[error("range [{start}, {end}] on variant {variant} is out of bounds")]
    InvalidRange {
        /// Id of the variant carrying the range.
        variant: Str,
        /// Range start as configured.
        start: f64,
        /// Range end as configured.
        end: f64,
    },

    /// A feature set document could not be deserialized at all.
    #[error(transparent)]
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    Deserialize(Arc<serde_json::Error>),
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Deserialize(Arc::new(value))
    }
}
