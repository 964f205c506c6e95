use async_trait::async_trait;
use dispatch::{DispatchError, FallbackExecutor};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls};
use tracing::debug;

use crate::errors::Result;

/// Runs statements synchronously on the issuing session's own connection.
#[derive(Debug)]
pub struct PgFallback {
    client: Client,
    config: Config,
    driver: JoinHandle<()>,
}

impl PgFallback {
    pub async fn connect(config: Config) -> Result<Self> {
        let (client, connection) = config.connect(NoTls).await?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(%e, "postgres connection errored");
            }
        });

        Ok(PgFallback {
            client,
            config,
            driver,
        })
    }

    /// Config the session was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Close the session and wait for its connection to shut down.
    pub async fn close(self) {
        drop(self.client);
        let _ = self.driver.await;
    }
}

#[async_trait]
impl FallbackExecutor for PgFallback {
    async fn execute(&mut self, statement: &str) -> dispatch::Result<()> {
        self.client
            .batch_execute(statement)
            .await
            .map_err(|e| DispatchError::Fallback(Box::new(e)))
    }
}
