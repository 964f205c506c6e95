use std::fmt::Debug;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::classify::{ClassifyContext, StatementAction, classify};
use crate::dispatcher::{Dispatcher, ShutdownReport, Submission};
use crate::errors::Result;
use crate::remote::{ConnectionParams, RemoteConnector};

/// The normal, synchronous way of executing a statement.
#[async_trait]
pub trait FallbackExecutor: Debug + Send {
    async fn execute(&mut self, statement: &str) -> Result<()>;
}

/// Counts of how statements were handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub dispatched: usize,
    /// Dispatch was attempted but couldn't be started.
    pub fell_back: usize,
    pub passed_through: usize,
    pub barriers: usize,
}

/// Routes statements of a session either to the dispatcher or to the
/// fallback executor.
#[derive(Debug)]
pub struct Executor<C: RemoteConnector, F: FallbackExecutor> {
    dispatcher: Dispatcher<C>,
    fallback: F,
    context: ClassifyContext,
    /// Parameters for every remote connection opened by this session.
    params: ConnectionParams,
    stats: ExecutorStats,
}

impl<C: RemoteConnector, F: FallbackExecutor> Executor<C, F> {
    pub fn new(
        dispatcher: Dispatcher<C>,
        fallback: F,
        context: ClassifyContext,
        params: ConnectionParams,
    ) -> Self {
        Executor {
            dispatcher,
            fallback,
            context,
            params,
            stats: ExecutorStats::default(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    /// Execute a statement.
    ///
    /// An error returned from here may belong to an earlier dispatched
    /// statement, check `DispatchError::as_remote_execution`.
    pub async fn execute(&mut self, statement: &str) -> Result<StatementAction> {
        let action = classify(statement, &self.context);
        debug!(?action, %statement, "classified statement");

        match action {
            StatementAction::Dispatch => {
                match self.dispatcher.submit(statement, &self.params).await? {
                    Submission::Dispatched(_) => self.stats.dispatched += 1,
                    Submission::NotStarted => {
                        self.stats.fell_back += 1;
                        self.fallback.execute(statement).await?;
                    }
                }
            }
            StatementAction::BarrierThenProceed => {
                let reaped = self.dispatcher.drain_all().await?;
                info!(%reaped, "drained dispatched statements before barrier");
                self.stats.barriers += 1;
                self.fallback.execute(statement).await?;
            }
            StatementAction::Passthrough => {
                self.stats.passed_through += 1;
                self.fallback.execute(statement).await?;
            }
        }

        Ok(action)
    }

    /// Wait for everything still in flight, logging failures.
    ///
    /// Returns the fallback executor so the caller can keep using the
    /// session.
    pub async fn shutdown(self) -> (ShutdownReport, F) {
        let report = self.dispatcher.shutdown().await;
        (report, self.fallback)
    }
}
