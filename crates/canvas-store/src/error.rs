use canvas_core::errors::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },

    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for PersistenceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => PersistenceError::NotFound(what),
            StoreError::Io(detail) => PersistenceError::Unavailable(detail),
            StoreError::CorruptRow { .. } | StoreError::Serialization(_) => {
                PersistenceError::Corrupt(e.to_string())
            }
            StoreError::Database(detail) => PersistenceError::Backend(detail),
        }
    }
}
