//! MySQL source driver.
//!
//! Readable, filterable, and sortable; not writable. Introspection uses
//! `SHOW TABLES` and `SHOW COLUMNS`, row counts are taken under the
//! connection's filter configuration, and batch reads page with
//! `LIMIT offset, count` under the configured filters and ordering.

mod config;
mod connection;

/// MySQL value types and type resolution.
pub mod types;

pub use config::MySqlConfig;
pub use connection::MySqlConnection;

use async_trait::async_trait;

use crate::driver::{Connection, Driver};
use crate::error::ConnectorError;

/// The `mysql` driver.
#[derive(Debug, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    /// Creates the driver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    fn name(&self) -> &str {
        "mysql"
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        false
    }

    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>, ConnectorError> {
        let config = MySqlConfig::parse(dsn)?;
        let opts = mysql_async::Opts::from_url(&config.to_url())
            .map_err(|e| ConnectorError::InvalidDsn(e.to_string()))?;
        let conn = mysql_async::Conn::new(opts).await?;
        tracing::debug!(server = %config, "mysql connection opened");
        Ok(Box::new(MySqlConnection::new(conn, config)))
    }
}
