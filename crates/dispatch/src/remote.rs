//! Contract for the remote connections statements are dispatched on.
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters for opening a remote connection, as keyword/value pairs.
///
/// Order is preserved. Setting a keyword that already exists replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pairs: Vec<(String, String)>,
}

impl ConnectionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, val: impl Into<String>) -> &mut Self {
        let key = key.into();
        let val = val.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = val,
            None => self.pairs.push((key, val)),
        }
        self
    }

    pub fn with(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.set(key, val);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as a libpq style connection string.
    ///
    /// Every value is single quoted with backslashes and quotes escaped.
    pub fn to_conninfo(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| {
                let escaped = v.replace('\\', "\\\\").replace('\'', "\\'");
                format!("{k}='{escaped}'")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Structured fields of a remote failure. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDiagnostics {
    pub code: Option<String>,
    pub message: Option<String>,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub context: Option<String>,
}

impl RemoteDiagnostics {
    /// Diagnostics for a failure that did not come from the remote engine
    /// itself, only a message is known.
    pub fn from_message(message: impl Into<String>) -> Self {
        RemoteDiagnostics {
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Final outcome of a dispatched statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Ok,
    Failed(RemoteDiagnostics),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConnectError {
    pub message: String,
}

impl ConnectError {
    pub fn new(message: impl Into<String>) -> Self {
        ConnectError {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SendError {
    pub message: String,
}

impl SendError {
    pub fn new(message: impl Into<String>) -> Self {
        SendError {
            message: message.into(),
        }
    }
}

/// Opens remote connections.
#[async_trait]
pub trait RemoteConnector: Debug + Send + Sync {
    type Connection: RemoteConnection;

    /// Open a new connection. Each connection serves exactly one statement.
    async fn open(&self, params: &ConnectionParams) -> Result<Self::Connection, ConnectError>;
}

/// A live connection owned by a single dispatch.
#[async_trait]
pub trait RemoteConnection: Debug + Send {
    /// Start executing the statement without waiting for it to finish.
    fn send(&mut self, statement: &str) -> Result<(), SendError>;

    /// Wait for the final outcome of the statement passed to `send`.
    async fn await_result(&mut self) -> RemoteOutcome;

    /// Release the connection.
    fn close(self);
}
