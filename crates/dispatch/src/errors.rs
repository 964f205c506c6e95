use std::fmt;

use crate::queue::DispatchId;
use crate::remote::RemoteDiagnostics;

/// SQLSTATE used when a remote failure carries no code of its own.
pub const SQLSTATE_CONNECTION_FAILURE: &str = "08006";

/// SQLSTATE used when a remote connection could not be opened.
pub const SQLSTATE_UNABLE_TO_ESTABLISH_CONNECTION: &str = "08001";

/// SQLSTATE for internal errors.
pub const SQLSTATE_INTERNAL_ERROR: &str = "XX000";

const MISSING_REMOTE_MESSAGE: &str = "could not obtain message string for remote error";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("could not establish connection: {detail}")]
    Connection { detail: String },

    #[error(transparent)]
    RemoteExecution(#[from] RemoteExecutionError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Tokenize(#[from] sqlparser::tokenizer::TokenizerError),

    #[error("{0}")]
    Fallback(Box<dyn std::error::Error + Send + Sync>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// SQLSTATE code to report for this error.
    pub fn sqlstate(&self) -> &str {
        match self {
            DispatchError::Connection { .. } => SQLSTATE_UNABLE_TO_ESTABLISH_CONNECTION,
            DispatchError::RemoteExecution(e) => &e.code,
            DispatchError::InvalidConfig(_) => "22023",
            DispatchError::Tokenize(_) => "42601",
            DispatchError::Fallback(_) | DispatchError::Internal(_) => SQLSTATE_INTERNAL_ERROR,
        }
    }

    /// Returns the remote failure if this error is a deferred failure of an
    /// earlier dispatch.
    pub fn as_remote_execution(&self) -> Option<&RemoteExecutionError> {
        match self {
            DispatchError::RemoteExecution(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;

#[allow(unused_macros)]
macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::DispatchError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;

/// A previously dispatched statement failed on its remote connection.
///
/// This is only ever produced when the dispatch is reaped, which may be long
/// after the statement was submitted and in response to an unrelated
/// statement. `dispatch_id` and `statement` identify the statement that
/// actually failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct RemoteExecutionError {
    pub dispatch_id: DispatchId,
    /// Five character SQLSTATE.
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub context: Option<String>,
    /// Text of the statement that failed.
    pub statement: String,
}

impl RemoteExecutionError {
    pub(crate) fn from_diagnostics(
        dispatch_id: DispatchId,
        statement: String,
        diag: RemoteDiagnostics,
    ) -> Self {
        RemoteExecutionError {
            dispatch_id,
            code: diag
                .code
                .unwrap_or_else(|| SQLSTATE_CONNECTION_FAILURE.to_string()),
            message: diag
                .message
                .unwrap_or_else(|| MISSING_REMOTE_MESSAGE.to_string()),
            detail: diag.detail,
            hint: diag.hint,
            context: diag.context,
            statement,
        }
    }

    /// Check if this failure belongs to the given dispatch.
    pub fn is_from(&self, id: DispatchId) -> bool {
        self.dispatch_id == id
    }
}

impl fmt::Display for RemoteExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (SQLSTATE {})", self.message, self.code)?;
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {detail}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {hint}")?;
        }
        if let Some(context) = &self.context {
            write!(f, "\nCONTEXT: {context}")?;
        }
        write!(
            f,
            "\nSTATEMENT (dispatch {}): {}",
            self.dispatch_id, self.statement
        )
    }
}
