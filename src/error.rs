use thiserror::Error;

/// A prediction or outcome rejected before anything was written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} prediction {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("{kind} prediction {id} already has a recorded outcome")]
    Conflict { kind: &'static str, id: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<chrono::ParseError> for StoreError {
    fn from(err: chrono::ParseError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = StoreError::from(ValidationError::MissingField("home_team"));
        assert_eq!(err.to_string(), "missing required field: home_team");
    }

    #[test]
    fn test_conflict_message() {
        let err = StoreError::Conflict { kind: "game", id: 7 };
        assert!(err.to_string().contains("game prediction 7"));
    }
}
