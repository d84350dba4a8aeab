/// Errors that can occur within the storage layer.
///
/// Public `ReportStore` methods return `anyhow::Result`; these variants sit
/// inside it so callers can `downcast_ref` when they need to tell a missing
/// row apart from a broken database.
///
/// # Examples
///
/// ```rust
/// use ideaforge_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "report",
///     id: "1234".to_string(),
/// };
/// assert!(err.to_string().contains("report"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found, or belongs to another user.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The `analysis_json` column could not be read or written.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored analysis is valid JSON but not an object.
    #[error("Storage: column '{column}' does not hold a JSON object")]
    NotAnObject { column: &'static str },
}
