use std::fmt::{self, Display};

/// Errors produced while parsing or validating model values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownProtocol(String),
    UnknownVariant { kind: &'static str, value: String },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownProtocol(value) => {
                write!(f, "unknown storage protocol: {value}")
            }
            ModelError::UnknownVariant { kind, value } => {
                write!(f, "unknown {kind}: {value}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
