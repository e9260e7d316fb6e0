use crate::state::RestartState;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid restart transition: {from} -> {to}")]
    InvalidTransition {
        from: RestartState,
        to: RestartState,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
