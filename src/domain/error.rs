use thiserror::Error;

/// A domain value broke one of its rules. The message is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn into_message(self) -> String {
        match self {
            Self::Validation { message } => message,
        }
    }
}
