use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::errors::PersistenceError;
use crate::ids::{ThreadId, UserId};
use crate::messages::Message;

/// What a conversation thread carries once something has happened in it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadValues {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: ThreadId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    /// `None` until the first save. Such threads are "empty" and prunable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<ThreadValues>,
}

impl Thread {
    pub fn is_empty(&self) -> bool {
        self.values.is_none()
    }
}

/// Durable home of conversation threads.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn create(&self, user_id: &UserId) -> Result<Thread, PersistenceError>;

    async fn get(&self, id: &ThreadId) -> Result<Thread, PersistenceError>;

    /// Newest thread for the user by creation time, if any.
    async fn find_latest_for_user(&self, user_id: &UserId) -> Result<Option<Thread>, PersistenceError>;

    /// All of the user's threads, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Thread>, PersistenceError>;

    async fn save_values(&self, id: &ThreadId, values: &ThreadValues) -> Result<(), PersistenceError>;

    async fn delete(&self, id: &ThreadId) -> Result<(), PersistenceError>;

    /// Delete the user's threads that never received values, except `keep`.
    /// Returns the ids that were removed.
    async fn delete_empty_for_user(
        &self,
        user_id: &UserId,
        keep: Option<&ThreadId>,
    ) -> Result<Vec<ThreadId>, PersistenceError>;
}
