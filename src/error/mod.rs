use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Corrupt session record {session_id}: {reason}")]
    CorruptData { session_id: String, reason: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised by a narrator while producing a draft
#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("Narrator backend failed: {0}")]
    Backend(#[from] LangbaseError),

    #[error("Narration could not be parsed: {message}")]
    Unparseable { message: String },
}

/// Path engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation is not allowed in the session's current state.
    #[error("Invalid state for {operation}: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: String,
    },

    /// The narrator produced no usable step. The session is unchanged.
    #[error("Generation failed: {message}")]
    Generation { message: String },
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn invalid_state(operation: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidState {
            operation,
            reason: reason.into(),
        }
    }

    pub(crate) fn generation(message: impl Into<String>) -> Self {
        EngineError::Generation {
            message: message.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Generation { .. })
    }
}

impl From<NarratorError> for EngineError {
    fn from(err: NarratorError) -> Self {
        EngineError::Generation {
            message: err.to_string(),
        }
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

impl From<EngineError> for McpError {
    fn from(err: EngineError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for McpError {
    fn from(err: StorageError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for narrator operations
pub type NarratorResult<T> = Result<T, NarratorError>;

/// Result type alias for path engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
