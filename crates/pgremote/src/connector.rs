use std::sync::Arc;

use async_trait::async_trait;
use dispatch::{
    ConnectError, ConnectionParams, RemoteConnection, RemoteConnector, RemoteDiagnostics,
    RemoteOutcome, SendError,
};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, trace};

use crate::params::config_from_params;

/// Opens a fresh Postgres connection for every dispatched statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

#[async_trait]
impl RemoteConnector for PgConnector {
    type Connection = PgConnection;

    async fn open(&self, params: &ConnectionParams) -> Result<PgConnection, ConnectError> {
        let config = config_from_params(params).map_err(|e| ConnectError::new(e.to_string()))?;
        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| ConnectError::new(e.to_string()))?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(%e, "remote postgres connection errored");
            }
        });

        trace!("opened remote connection");
        Ok(PgConnection {
            client: Arc::new(client),
            driver,
            inflight: None,
        })
    }
}

/// A remote connection running at most one statement.
#[derive(Debug)]
pub struct PgConnection {
    client: Arc<Client>,
    /// Drives the connection's socket. Exits once the client is dropped.
    driver: JoinHandle<()>,
    inflight: Option<JoinHandle<Result<(), tokio_postgres::Error>>>,
}

#[async_trait]
impl RemoteConnection for PgConnection {
    fn send(&mut self, statement: &str) -> Result<(), SendError> {
        if self.client.is_closed() {
            return Err(SendError::new("connection closed"));
        }
        if self.inflight.is_some() {
            return Err(SendError::new("another command is already in progress"));
        }

        let client = self.client.clone();
        let statement = statement.to_string();
        self.inflight = Some(tokio::spawn(async move {
            client.batch_execute(&statement).await
        }));

        Ok(())
    }

    async fn await_result(&mut self) -> RemoteOutcome {
        let handle = match self.inflight.take() {
            Some(handle) => handle,
            None => {
                return RemoteOutcome::Failed(RemoteDiagnostics::from_message(
                    "no statement in progress on remote connection",
                ));
            }
        };

        match handle.await {
            Ok(Ok(())) => RemoteOutcome::Ok,
            Ok(Err(e)) => RemoteOutcome::Failed(diagnostics_from_error(&e)),
            Err(e) => RemoteOutcome::Failed(RemoteDiagnostics::from_message(format!(
                "remote statement task failed: {e}"
            ))),
        }
    }

    fn close(self) {
        // Anything still running is abandoned along with the connection.
        if let Some(handle) = self.inflight {
            handle.abort();
        }
        // Dropping the last client handle terminates the session, the driver
        // then exits on its own.
        drop(self.client);
        trace!(driver_finished = %self.driver.is_finished(), "closed remote connection");
    }
}

/// Pull the structured fields out of a postgres error.
///
/// Errors that didn't come from the server (io, protocol) only have a
/// message, the code is left for the dispatcher to default.
pub fn diagnostics_from_error(err: &tokio_postgres::Error) -> RemoteDiagnostics {
    match err.as_db_error() {
        Some(db) => RemoteDiagnostics {
            code: Some(db.code().code().to_string()),
            message: Some(db.message().to_string()),
            detail: db.detail().map(String::from),
            hint: db.hint().map(String::from),
            context: db.where_().map(String::from),
        },
        None => RemoteDiagnostics::from_message(err.to_string()),
    }
}
