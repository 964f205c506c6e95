use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::TypedValueParser;
use clap::{Parser, ValueEnum};
use dispatch::{
    ClassifyContext, DispatchConfig, DispatchError, Dispatcher, Executor, sql::split_statements,
};
use pgremote::{PgConnector, PgFallback, remote_params};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Human,
    Json,
}

impl From<LogFormat> for logutil::LogFormat {
    fn from(value: LogFormat) -> Self {
        match value {
            LogFormat::Human => logutil::LogFormat::HumanReadable,
            LogFormat::Json => logutil::LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "pg_parallizator")]
struct Arguments {
    /// Connection string for the database, e.g. "host=localhost dbname=app".
    #[clap(short = 'd', long, env = "PG_PARALLIZATOR_URL")]
    url: String,

    /// Execute file containing sql statements.
    ///
    /// Files are executed in order, before any `--command`.
    #[clap(short = 'f', long = "file")]
    files: Vec<PathBuf>,

    /// Sql to execute.
    #[clap(short = 'c', long = "command")]
    commands: Vec<String>,

    /// Maximum number of index builds running at the same time.
    ///
    /// Zero runs every statement on the main connection.
    #[clap(
        short = 'j',
        long,
        env = "PG_PARALLIZATOR_MAX_WORKERS",
        default_value_t = dispatch::config::DEFAULT_MAX_WORKERS,
        value_parser = clap::value_parser!(u16).range(0..=dispatch::config::MAX_WORKERS_LIMIT as i64).map(usize::from),
    )]
    max_workers: usize,

    /// Log output format.
    #[clap(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    /// Log at debug level.
    #[clap(short, long)]
    verbose: bool,
}

impl Arguments {
    /// Collect the sql to run, one entry per file or command.
    fn sources(&self) -> Result<Vec<(String, String)>> {
        let mut sources = Vec::with_capacity(self.files.len() + self.commands.len());
        for path in &self.files {
            let sql = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            sources.push((path.display().to_string(), sql));
        }
        for (idx, sql) in self.commands.iter().enumerate() {
            sources.push((format!("command {}", idx + 1), sql.clone()));
        }
        Ok(sources)
    }
}

fn main() {
    let args = Arguments::parse();
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    logutil::configure_global_logger(level, args.log_format.into(), io::stderr);

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
        .and_then(|runtime| runtime.block_on(run(args)));

    if let Err(err) = result {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}

async fn run(args: Arguments) -> Result<()> {
    let sources = args.sources()?;
    let config: tokio_postgres::Config = args
        .url
        .parse()
        .context("invalid connection string")?;
    let dispatch_config = DispatchConfig::new(args.max_workers)?;

    let fallback = PgFallback::connect(config.clone())
        .await
        .context("failed to connect")?;
    let params = remote_params(&config)?;
    let context = ClassifyContext {
        top_level: true,
        application_name: config.get_application_name().map(String::from),
        max_workers: dispatch_config.max_workers(),
    };

    let mut exec = Executor::new(
        Dispatcher::new(dispatch_config, PgConnector),
        fallback,
        context,
        params,
    );

    let result = run_sources(&mut exec, &sources).await;

    // Always wait for outstanding index builds, even if something failed.
    let (report, fallback) = exec.shutdown().await;
    info!(reaped = %report.reaped, failed = %report.failed, "finished");
    fallback.close().await;

    result?;
    if report.failed > 0 {
        anyhow::bail!("{} dispatched statements failed", report.failed);
    }
    Ok(())
}

async fn run_sources(
    exec: &mut Executor<PgConnector, PgFallback>,
    sources: &[(String, String)],
) -> Result<()> {
    for (name, sql) in sources {
        let statements =
            split_statements(sql).with_context(|| format!("failed to split {name}"))?;
        for statement in statements {
            debug!(%name, %statement, "executing");
            exec.execute(statement)
                .await
                .map_err(|e| describe_error(e, statement))
                .with_context(|| format!("while executing {name}"))?;
        }
    }
    let stats = exec.stats();
    info!(
        dispatched = %stats.dispatched,
        fell_back = %stats.fell_back,
        passed_through = %stats.passed_through,
        barriers = %stats.barriers,
        "all statements issued"
    );
    Ok(())
}

/// Make it obvious when the failure belongs to an earlier statement.
///
/// Remote failures are only observed when reaped, so they are always
/// reported against whatever statement was being executed at the time.
fn describe_error(err: DispatchError, current: &str) -> anyhow::Error {
    match err.as_remote_execution() {
        Some(remote) => {
            let msg = format!(
                "earlier parallel statement {} failed: {} (reported while executing: {current})",
                remote.dispatch_id, remote.statement
            );
            anyhow::Error::new(err).context(msg)
        }
        None => anyhow::Error::new(err),
    }
}
