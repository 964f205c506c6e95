//! Connection parameters for remote sessions.
use dispatch::{ConnectionParams, REMOTE_APPLICATION_NAME};
use tokio_postgres::config::Host;

use crate::errors::{PgRemoteError, Result};

/// Derive the parameters for remote connections from the issuing session's
/// config.
///
/// Remote connections go to the same server and database as the same user,
/// with the same startup options. They identify themselves with
/// [`REMOTE_APPLICATION_NAME`] so statements they run are never dispatched
/// again. TLS is not used.
pub fn remote_params(base: &tokio_postgres::Config) -> Result<ConnectionParams> {
    let mut params = ConnectionParams::new();

    if let Some(host) = base.get_hosts().first() {
        let host = match host {
            Host::Tcp(host) => host.clone(),
            #[cfg(unix)]
            Host::Unix(path) => path
                .to_str()
                .ok_or_else(|| PgRemoteError::UnsupportedHost(path.display().to_string()))?
                .to_string(),
        };
        params.set("host", host);
    }
    if let Some(port) = base.get_ports().first() {
        params.set("port", port.to_string());
    }
    if let Some(dbname) = base.get_dbname() {
        params.set("dbname", dbname);
    }
    if let Some(user) = base.get_user() {
        params.set("user", user);
    }
    if let Some(password) = base.get_password() {
        let password = std::str::from_utf8(password)
            .map_err(|_| PgRemoteError::InvalidParams("password is not valid utf-8".to_string()))?;
        params.set("password", password);
    }
    params.set("sslmode", "disable");
    params.set("application_name", REMOTE_APPLICATION_NAME);
    if let Some(options) = base.get_options() {
        params.set("options", options);
    }

    Ok(params)
}

/// Build a client config from connection parameters.
pub fn config_from_params(params: &ConnectionParams) -> Result<tokio_postgres::Config> {
    params
        .to_conninfo()
        .parse()
        .map_err(|e: tokio_postgres::Error| PgRemoteError::InvalidParams(e.to_string()))
}
