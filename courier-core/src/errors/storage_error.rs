/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("unknown event category '{name}'")]
    UnknownCategory { name: String },

    #[error("corrupt record {id}: {details}")]
    CorruptRecord { id: i64, details: String },
}
