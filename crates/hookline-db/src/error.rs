//! Error type for the persistence layer.

/// Errors surfaced by `WebhookStore` implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),

    /// Unique-constraint violation on a natural key (e.g. event type name).
    #[error("Duplicate {entity}: {value}")]
    Duplicate { entity: &'static str, value: String },

    #[error("Referenced {entity} not found")]
    MissingReference { entity: &'static str },
}

impl StoreError {
    /// True when the error is a duplicate-key rejection.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}
