//! Parallel dispatch of schema changes.
//!
//! Eligible statements (index builds) are sent on their own remote
//! connections and tracked in a bounded FIFO. The issuing session carries on
//! without waiting. Results are collected in submission order when the queue
//! is full, when a later statement needs everything to be finished, or at
//! shutdown.
pub mod classify;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod executor;
pub mod queue;
pub mod remote;
pub mod sql;

pub use classify::{ClassifyContext, REMOTE_APPLICATION_NAME, StatementAction, classify};
pub use config::DispatchConfig;
pub use dispatcher::{Dispatcher, ShutdownReport, Submission};
pub use errors::{DispatchError, RemoteExecutionError, Result};
pub use executor::{Executor, ExecutorStats, FallbackExecutor};
pub use queue::{DispatchId, PendingDispatch, WorkQueue};
pub use remote::{
    ConnectError, ConnectionParams, RemoteConnection, RemoteConnector, RemoteDiagnostics,
    RemoteOutcome, SendError,
};
