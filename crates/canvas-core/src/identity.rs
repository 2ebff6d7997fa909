use crate::ids::{AssistantId, UserId};

/// Source of the current user and assistant identifiers.
///
/// Either may be absent, for example before sign-in finishes.
pub trait IdentityProvider: Send + Sync {
    fn user_id(&self) -> Option<UserId>;
    fn assistant_id(&self) -> Option<AssistantId>;
}

/// Fixed identities, as read from settings or CLI flags.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentity {
    pub user_id: Option<UserId>,
    pub assistant_id: Option<AssistantId>,
}

impl StaticIdentity {
    pub fn new(user_id: UserId, assistant_id: AssistantId) -> Self {
        Self {
            user_id: Some(user_id),
            assistant_id: Some(assistant_id),
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }

    fn assistant_id(&self) -> Option<AssistantId> {
        self.assistant_id.clone()
    }
}
