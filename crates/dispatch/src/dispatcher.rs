use tracing::{debug, error, info, warn};

use crate::config::DispatchConfig;
use crate::errors::{DispatchError, RemoteExecutionError, Result, internal};
use crate::queue::{DispatchId, PendingDispatch, WorkQueue};
use crate::remote::{ConnectionParams, RemoteConnection, RemoteConnector, RemoteOutcome};

/// Result of submitting a statement for parallel execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The statement is running remotely and is now owned by the queue. Its
    /// outcome is observed when it's reaped.
    Dispatched(DispatchId),
    /// Sending failed. The caller must run the statement through the
    /// synchronous path instead.
    NotStarted,
}

/// Summary of a shutdown drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub reaped: usize,
    pub failed: usize,
}

/// Runs statements on their own remote connections, at most `max_workers`
/// at a time.
///
/// Results are collected strictly in submission order. A slow statement at
/// the head of the queue delays collection of anything submitted after it,
/// even if those already finished.
#[derive(Debug)]
pub struct Dispatcher<C: RemoteConnector> {
    config: DispatchConfig,
    connector: C,
    /// Created on first submit.
    queue: Option<WorkQueue<PendingDispatch<C::Connection>>>,
    next_id: u64,
}

impl<C: RemoteConnector> Dispatcher<C> {
    pub fn new(config: DispatchConfig, connector: C) -> Self {
        Dispatcher {
            config,
            connector,
            queue: None,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Number of dispatches whose results haven't been collected.
    pub fn outstanding(&self) -> usize {
        self.queue.as_ref().map(|q| q.len()).unwrap_or(0)
    }

    /// Ids of outstanding dispatches, oldest first.
    pub fn outstanding_ids(&self) -> Vec<DispatchId> {
        match &self.queue {
            Some(q) => q.iter().map(|ent| ent.id).collect(),
            None => Vec::new(),
        }
    }

    /// Submit a statement to run on a new remote connection.
    ///
    /// If all workers are busy, this waits for the oldest dispatch to finish
    /// first. A failure of that dispatch is returned here, before a
    /// connection for this statement is opened.
    pub async fn submit(
        &mut self,
        statement: &str,
        params: &ConnectionParams,
    ) -> Result<Submission> {
        if !self.config.is_enabled() {
            return Err(internal!("submit called with parallel dispatch disabled"));
        }

        let capacity = self.config.max_workers();
        if self
            .queue
            .get_or_insert_with(|| WorkQueue::with_capacity(capacity))
            .is_full()
        {
            info!(outstanding = %self.outstanding(), "waiting for a worker");
            self.reap_oldest().await?;
        }

        let mut conn = self
            .connector
            .open(params)
            .await
            .map_err(|e| DispatchError::Connection { detail: e.message })?;

        if let Err(e) = conn.send(statement) {
            warn!(%e, %statement, "failed to start statement in parallel");
            conn.close();
            return Ok(Submission::NotStarted);
        }

        let id = DispatchId(self.next_id);
        self.next_id += 1;
        info!(%id, %statement, "running statement in parallel");

        let entry = PendingDispatch {
            id,
            connection: conn,
            statement: statement.to_string(),
        };
        let queue = self
            .queue
            .as_mut()
            .ok_or_else(|| internal!("missing work queue"))?;
        if let Err(entry) = queue.try_enqueue(entry) {
            entry.connection.close();
            return Err(internal!("work queue full after admission"));
        }

        Ok(Submission::Dispatched(id))
    }

    /// Wait for the oldest dispatch and collect its outcome.
    ///
    /// The connection is released whatever the outcome. Returns the id of the
    /// reaped dispatch.
    pub async fn reap_oldest(&mut self) -> Result<DispatchId> {
        let PendingDispatch {
            id,
            mut connection,
            statement,
        } = self
            .queue
            .as_mut()
            .and_then(|q| q.remove_oldest())
            .ok_or_else(|| internal!("no outstanding dispatch to reap"))?;

        debug!(%id, "waiting for dispatch");
        let outcome = connection.await_result().await;
        connection.close();

        match outcome {
            RemoteOutcome::Ok => {
                debug!(%id, "dispatch completed");
                Ok(id)
            }
            RemoteOutcome::Failed(diag) => {
                let err = RemoteExecutionError::from_diagnostics(id, statement, diag);
                debug!(%id, code = %err.code, "dispatch failed");
                Err(err.into())
            }
        }
    }

    /// Reap every outstanding dispatch, oldest first.
    ///
    /// Stops at the first failure and returns it. Dispatches after the failed
    /// one stay queued and are picked up by the next drain or by
    /// `shutdown`. Returns the number of dispatches reaped.
    pub async fn drain_all(&mut self) -> Result<usize> {
        let mut reaped = 0;
        while self.outstanding() > 0 {
            self.reap_oldest().await?;
            reaped += 1;
        }
        Ok(reaped)
    }

    /// Reap everything left before the dispatcher goes away.
    ///
    /// Failures are logged and draining continues.
    pub async fn shutdown(mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        info!(outstanding = %self.outstanding(), "waiting for all workers");
        while self.outstanding() > 0 {
            report.reaped += 1;
            if let Err(e) = self.reap_oldest().await {
                report.failed += 1;
                error!(%e, "dispatched statement failed");
            }
        }
        report
    }
}

impl<C: RemoteConnector> Drop for Dispatcher<C> {
    fn drop(&mut self) {
        let outstanding = self.outstanding();
        if outstanding > 0 {
            warn!(
                %outstanding,
                "dispatcher dropped without shutdown, outstanding results are lost"
            );
        }
        if let Some(queue) = self.queue.as_mut() {
            while let Some(pending) = queue.remove_oldest() {
                pending.connection.close();
            }
        }
    }
}
