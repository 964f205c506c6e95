#[derive(Debug, thiserror::Error)]
pub enum PgRemoteError {
    #[error("invalid connection parameters: {0}")]
    InvalidParams(String),

    #[error("unsupported host: {0}")]
    UnsupportedHost(String),

    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
}

pub type Result<T, E = PgRemoteError> = std::result::Result<T, E>;
