use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use canvas_core::errors::PersistenceError;
use canvas_core::ids::{ThreadId, UserId};
use canvas_core::persistence::{Thread, ThreadStore, ThreadValues};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TABLE: &str = "threads";
const COLUMNS: &str = "id, user_id, created_at, values_json";

/// SQLite-backed thread records.
#[derive(Clone)]
pub struct ThreadRepo {
    db: Database,
}

impl ThreadRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn create(&self, user_id: &UserId) -> Result<Thread, StoreError> {
        let thread = Thread {
            id: ThreadId::new(),
            user_id: user_id.clone(),
            created_at: Utc::now(),
            values: None,
        };
        let now = row_helpers::format_timestamp(&thread.created_at);
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO threads (id, user_id, created_at, updated_at, values_json)
                 VALUES (?1, ?2, ?3, ?4, NULL)",
                rusqlite::params![thread.id.as_str(), user_id.as_str(), now, now],
            )?;
            Ok(())
        })?;
        info!(thread_id = %thread.id, "thread created");
        Ok(thread)
    }

    #[instrument(skip(self), fields(thread_id = %id))]
    pub fn get(&self, id: &ThreadId) -> Result<Thread, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM threads WHERE id = ?1"))?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_thread(row),
                None => Err(StoreError::NotFound(format!("thread {id}"))),
            }
        })
    }

    /// All threads of a user, newest first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Thread>, StoreError> {
        self.query_user(user_id, None)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn find_latest_for_user(&self, user_id: &UserId) -> Result<Option<Thread>, StoreError> {
        Ok(self.query_user(user_id, Some(1))?.into_iter().next())
    }

    fn query_user(&self, user_id: &UserId, limit: Option<u32>) -> Result<Vec<Thread>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM threads WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
            ))?;
            // SQLite treats a negative LIMIT as unbounded
            let limit = limit.map_or(-1, i64::from);
            let mut rows = stmt.query(rusqlite::params![user_id.as_str(), limit])?;
            let mut threads = Vec::new();
            while let Some(row) = rows.next()? {
                threads.push(row_to_thread(row)?);
            }
            Ok(threads)
        })
    }

    #[instrument(skip(self, values), fields(thread_id = %id, messages = values.messages.len()))]
    pub fn save_values(&self, id: &ThreadId, values: &ThreadValues) -> Result<(), StoreError> {
        let json = serde_json::to_string(values)?;
        let now = row_helpers::format_timestamp(&Utc::now());
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE threads SET values_json = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![json, now, id.as_str()],
            )?)
        })?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("thread {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(thread_id = %id))]
    pub fn delete(&self, id: &ThreadId) -> Result<(), StoreError> {
        let deleted = self.db.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM threads WHERE id = ?1", [id.as_str()])?)
        })?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("thread {id}")));
        }
        info!("thread deleted");
        Ok(())
    }

    /// Delete the user's threads that were never saved, sparing `keep`.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn delete_empty_for_user(
        &self,
        user_id: &UserId,
        keep: Option<&ThreadId>,
    ) -> Result<Vec<ThreadId>, StoreError> {
        let removed = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "DELETE FROM threads
                 WHERE user_id = ?1 AND values_json IS NULL AND (?2 IS NULL OR id != ?2)
                 RETURNING id",
            )?;
            let ids = stmt
                .query_map(
                    rusqlite::params![user_id.as_str(), keep.map(ThreadId::as_str)],
                    |row| row.get::<_, String>(0),
                )?
                .map(|r| r.map(ThreadId::from_raw))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })?;
        if !removed.is_empty() {
            info!(count = removed.len(), "pruned empty threads");
        }
        Ok(removed)
    }
}

fn row_to_thread(row: &rusqlite::Row<'_>) -> Result<Thread, StoreError> {
    let id: String = row_helpers::get(row, 0, TABLE, "id")?;
    let user_id: String = row_helpers::get(row, 1, TABLE, "user_id")?;
    let created_at: String = row_helpers::get(row, 2, TABLE, "created_at")?;
    let values_json: Option<String> = row_helpers::get_opt(row, 3, TABLE, "values_json")?;

    Ok(Thread {
        id: ThreadId::from_raw(id),
        user_id: UserId::from_raw(user_id),
        created_at: row_helpers::parse_timestamp(&created_at, TABLE, "created_at")?,
        values: values_json
            .map(|raw| row_helpers::parse_json(&raw, TABLE, "values_json"))
            .transpose()?,
    })
}

#[async_trait]
impl ThreadStore for ThreadRepo {
    async fn create(&self, user_id: &UserId) -> Result<Thread, PersistenceError> {
        Ok(ThreadRepo::create(self, user_id)?)
    }

    async fn get(&self, id: &ThreadId) -> Result<Thread, PersistenceError> {
        Ok(ThreadRepo::get(self, id)?)
    }

    async fn find_latest_for_user(&self, user_id: &UserId) -> Result<Option<Thread>, PersistenceError> {
        Ok(ThreadRepo::find_latest_for_user(self, user_id)?)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Thread>, PersistenceError> {
        Ok(ThreadRepo::list_for_user(self, user_id)?)
    }

    async fn save_values(&self, id: &ThreadId, values: &ThreadValues) -> Result<(), PersistenceError> {
        Ok(ThreadRepo::save_values(self, id, values)?)
    }

    async fn delete(&self, id: &ThreadId) -> Result<(), PersistenceError> {
        Ok(ThreadRepo::delete(self, id)?)
    }

    async fn delete_empty_for_user(
        &self,
        user_id: &UserId,
        keep: Option<&ThreadId>,
    ) -> Result<Vec<ThreadId>, PersistenceError> {
        Ok(ThreadRepo::delete_empty_for_user(self, user_id, keep)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::artifact::{Artifact, ContentPayload, ContentVersion};
    use canvas_core::messages::Message;

    fn repo() -> ThreadRepo {
        ThreadRepo::new(Database::in_memory().unwrap())
    }

    fn user(name: &str) -> UserId {
        UserId::from_raw(name)
    }

    fn values() -> ThreadValues {
        ThreadValues {
            messages: vec![Message::user("write a haiku")],
            artifact: Some(Artifact::with_first_version(
                "Haiku",
                ContentVersion {
                    index: 1,
                    title: "Haiku".into(),
                    payload: ContentPayload::text("old pond"),
                },
            )),
        }
    }

    #[test]
    fn create_and_get() {
        let repo = repo();
        let created = repo.create(&user("u1")).unwrap();
        let fetched = repo.get(&created.id).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.user_id, user("u1"));
        assert!(fetched.is_empty());
    }

    #[test]
    fn get_missing_is_not_found() {
        let err = repo().get(&ThreadId::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(matches!(PersistenceError::from(err), PersistenceError::NotFound(_)));
    }

    #[test]
    fn latest_and_list_are_newest_first() {
        let repo = repo();
        let first = repo.create(&user("u1")).unwrap();
        let second = repo.create(&user("u1")).unwrap();
        repo.create(&user("u2")).unwrap();

        let latest = repo.find_latest_for_user(&user("u1")).unwrap().unwrap();
        assert_eq!(latest.id, second.id);

        let ids: Vec<_> = repo.list_for_user(&user("u1")).unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(repo.find_latest_for_user(&user("nobody")).unwrap().is_none());
    }

    #[test]
    fn save_values_roundtrip() {
        let repo = repo();
        let thread = repo.create(&user("u1")).unwrap();
        let saved = values();
        repo.save_values(&thread.id, &saved).unwrap();
        let loaded = repo.get(&thread.id).unwrap();
        assert_eq!(loaded.values.as_ref(), Some(&saved));
        assert_eq!(loaded.values.unwrap().artifact.unwrap().current_markdown(), Some("old pond"));
    }

    #[test]
    fn save_to_missing_thread_fails() {
        let err = repo().save_values(&ThreadId::new(), &values()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn delete_removes_thread() {
        let repo = repo();
        let thread = repo.create(&user("u1")).unwrap();
        repo.delete(&thread.id).unwrap();
        assert!(matches!(repo.get(&thread.id), Err(StoreError::NotFound(_))));
        assert!(matches!(repo.delete(&thread.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_empty_spares_saved_kept_and_other_users() {
        let repo = repo();
        let saved = repo.create(&user("u1")).unwrap();
        repo.save_values(&saved.id, &values()).unwrap();
        let empty = repo.create(&user("u1")).unwrap();
        let kept = repo.create(&user("u1")).unwrap();
        let other = repo.create(&user("u2")).unwrap();

        let removed = repo.delete_empty_for_user(&user("u1"), Some(&kept.id)).unwrap();
        assert_eq!(removed, vec![empty.id.clone()]);
        assert!(repo.get(&saved.id).is_ok());
        assert!(repo.get(&kept.id).is_ok());
        assert!(repo.get(&other.id).is_ok());

        // idempotent
        assert!(repo.delete_empty_for_user(&user("u1"), Some(&kept.id)).unwrap().is_empty());
        // without a keep, the remaining empty thread goes too
        assert_eq!(repo.delete_empty_for_user(&user("u1"), None).unwrap(), vec![kept.id]);
    }

    #[test]
    fn corrupt_values_surface_as_corrupt_row() {
        let repo = repo();
        let thread = repo.create(&user("u1")).unwrap();
        repo.db
            .with_conn(|conn| {
                conn.execute("UPDATE threads SET values_json = 'not json' WHERE id = ?1", [thread.id.as_str()])?;
                Ok(())
            })
            .unwrap();
        let err = repo.get(&thread.id).unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { column: "values_json", .. }));
        assert!(matches!(PersistenceError::from(err), PersistenceError::Corrupt(_)));
    }

    #[tokio::test]
    async fn trait_object_delegates() {
        let store: std::sync::Arc<dyn ThreadStore> = std::sync::Arc::new(repo());
        let thread = store.create(&user("u1")).await.unwrap();
        store.save_values(&thread.id, &ThreadValues::default()).await.unwrap();
        let loaded = store.get(&thread.id).await.unwrap();
        assert_eq!(loaded.values, Some(ThreadValues::default()));
        assert!(matches!(
            store.delete(&ThreadId::new()).await,
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[test]
    fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threads.db");
        let id = {
            let repo = ThreadRepo::new(Database::open(&path).unwrap());
            let thread = repo.create(&user("u1")).unwrap();
            repo.save_values(&thread.id, &values()).unwrap();
            thread.id
        };
        let repo = ThreadRepo::new(Database::open(&path).unwrap());
        assert!(repo.get(&id).unwrap().values.is_some());
    }
}
