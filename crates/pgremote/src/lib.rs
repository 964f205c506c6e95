//! Postgres transport for dispatched statements.
pub mod connector;
pub mod errors;
pub mod fallback;
pub mod params;

pub use connector::{PgConnection, PgConnector, diagnostics_from_error};
pub use fallback::PgFallback;
pub use params::{config_from_params, remote_params};
