//! Errors returned by timeline mutations.

use uuid::Uuid;

use crate::actor::ActorError;

/// Typed failure of a timeline request.
///
/// Structural errors leave the timeline exactly as it was before the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    /// An item with this id is already part of the timeline.
    #[error("item {0} is already in the timeline")]
    DuplicateIdentifier(Uuid),

    /// No item with this id is part of the timeline.
    #[error("item {0} is not in the timeline")]
    NotFound(Uuid),

    /// A structural description could not be applied.
    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    /// The handle does not refer to a live item actor.
    #[error("item {0} cannot be resolved to a live actor")]
    UnresolvableHandle(Uuid),

    /// The timeline actor could not be reached.
    #[error(transparent)]
    Actor(#[from] ActorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_item() {
        let id = Uuid::nil();
        assert!(TimelineError::DuplicateIdentifier(id).to_string().contains(&id.to_string()));
        assert!(TimelineError::NotFound(id).to_string().contains("not in the timeline"));
    }

    #[test]
    fn test_actor_error_converts() {
        let err: TimelineError = ActorError::SendFailed.into();
        assert_eq!(err, TimelineError::Actor(ActorError::SendFailed));
    }
}
