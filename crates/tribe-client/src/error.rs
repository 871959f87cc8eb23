use thiserror::Error;

use tribe_store::StoreError;

/// Errors surfaced by the conversation-state core.
///
/// Everything here is scoped to the single user action that triggered it;
/// no variant is fatal to the process.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A required input was empty or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation requires a signed-in user and none is present.
    #[error("Operation requires a signed-in user")]
    Authentication,

    /// The signed-in user lacks permission for the operation.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// A mutating operation was attempted with no scope selected.
    #[error("No active conversation selected")]
    NoActiveConversation,

    /// The AI pipeline failed to produce a reply.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The persona id has no configuration / voice mapping.
    #[error("Unknown character: {0}")]
    UnknownCharacter(String),

    /// Underlying store failure.
    #[error("Backend error: {0}")]
    Backend(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatError>;
