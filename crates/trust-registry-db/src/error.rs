//! Errors raised by the artifact store

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

/// Failure reading or writing artifacts, dependency edges or relationships
#[derive(Debug, Error)]
pub enum DbError {
    /// The store could not be reached, or the pool gave up waiting
    #[error("Artifact store unreachable: {0}")]
    Connection(String),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    /// A statement was rejected for a reason other than a constraint
    #[error("Query rejected: {0}")]
    Query(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Duplicate key, self-loop or other check failure on an edge or artifact
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    /// An edge names an artifact that is not stored
    #[error("Dangling reference: {0}")]
    ForeignKeyViolation(String),

    /// A stored column holds a value the domain types do not accept
    #[error("Malformed stored value: {0}")]
    InvalidData(String),

    #[error("Metadata encoding failed: {0}")]
    Serialization(String),

    #[error("Invalid store configuration: {0}")]
    Configuration(String),

    #[error("Unexpected store failure: {0}")]
    Internal(String),

    #[error(transparent)]
    Domain(#[from] trust_registry_core::error::RegistryError),
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }

    /// True when the write conflicted with stored state rather than failing outright
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::ConstraintViolation(_) | DbError::ForeignKeyViolation(_)
        )
    }

    /// True when retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }

    /// Classify a PostgreSQL SQLSTATE from the integrity-constraint class
    fn from_sqlstate(code: Option<&str>, message: String) -> Self {
        match code {
            Some("23503") => DbError::ForeignKeyViolation(message),
            Some(state) if state.starts_with("23") => DbError::ConstraintViolation(message),
            // 53xxx: insufficient resources, 57P0x: server shutting down
            Some(state) if state.starts_with("53") || state.starts_with("57P") => {
                DbError::Connection(message)
            }
            _ => DbError::Query(message),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;

        match err {
            E::RowNotFound => DbError::NotFound("no matching row".into()),
            E::Database(db_err) => {
                let message = db_err.message().to_string();
                DbError::from_sqlstate(db_err.code().as_deref(), message)
            }
            E::PoolTimedOut | E::PoolClosed | E::WorkerCrashed => {
                DbError::Connection(err.to_string())
            }
            E::Io(_) | E::Tls(_) | E::Protocol(_) => DbError::Connection(err.to_string()),
            E::ColumnNotFound(_) | E::ColumnDecode { .. } | E::Decode(_) => {
                DbError::InvalidData(err.to_string())
            }
            E::Configuration(cause) => DbError::Configuration(cause.to_string()),
            E::Migrate(cause) => DbError::Migration(cause.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}
