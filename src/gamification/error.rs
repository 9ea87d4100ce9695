//! Error taxonomy for the gamification engine

/// Errors reported by engine operations.
///
/// Callers decide per call whether to retry, skip or surface the failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Store unavailable, write conflict or a corrupt row.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A referenced user or achievement definition does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Negative XP, unknown streak kind, malformed trigger arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Only persistence failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Persistence("store lock poisoned".to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_is_retryable() {
        assert!(EngineError::Persistence("locked".into()).is_retryable());
        assert!(!EngineError::not_found("user", "u1").is_retryable());
        assert!(!EngineError::invalid("negative xp").is_retryable());
    }

    #[test]
    fn test_display() {
        let err = EngineError::not_found("achievement", "mystery");
        assert_eq!(err.to_string(), "achievement not found: mystery");
    }
}
