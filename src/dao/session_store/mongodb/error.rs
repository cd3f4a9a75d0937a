use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB DAO operations.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Errors produced by the MongoDB backend before they are folded into the
/// backend-agnostic [`StorageError`](crate::dao::storage::StorageError).
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("invalid MongoDB URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// A required environment variable is missing.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The client handle could not be constructed.
    #[error("failed to construct MongoDB client")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// The initial connectivity ping kept failing.
    #[error("MongoDB did not answer the initial ping after {attempts} attempts")]
    InitialPing {
        /// Number of attempts made.
        attempts: u32,
        /// Last driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// A health-check ping failed.
    #[error("MongoDB health ping failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// Index bootstrap failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index description.
        index: &'static str,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// A session document could not be written.
    #[error("failed to save session `{id}`")]
    SaveSession {
        /// Session id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// A session document could not be read.
    #[error("failed to load session `{id}`")]
    LoadSession {
        /// Session id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// The session listing query failed.
    #[error("failed to list sessions for project `{project_id}`")]
    ListSessions {
        /// Project filter.
        project_id: Uuid,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// A participant record could not be written or read.
    #[error("participant operation failed for session `{session_id}`")]
    Participant {
        /// Session id.
        session_id: Uuid,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// A vote row could not be written or read.
    #[error("vote operation failed for session `{session_id}`")]
    Vote {
        /// Session id.
        session_id: Uuid,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// The final estimate could not be written to the task record.
    #[error("failed to record estimate on task `{task_id}`")]
    TaskEstimate {
        /// Task id.
        task_id: Uuid,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
}
