//! Filter parse error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchParseError {
    #[error("filter must be a JSON object, got {0}")]
    NotADocument(String),

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("operator '{op}' on field '{field}': {detail}")]
    BadOperand {
        op: String,
        field: String,
        detail: String,
    },

    #[error("'{0}' requires a non-empty array of filter documents")]
    BadLogicalArray(String),

    #[error("field '{0}' mixes operator and literal keys")]
    MixedOperatorDocument(String),
}
