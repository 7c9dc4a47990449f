//! CockroachDB destination driver.
//!
//! Writable, filterable, and sortable; not readable. Introspection goes
//! through `information_schema` (carrying nullability and default
//! detection for the destination-side projection), and bulk writes use
//! transactional `COPY … FROM STDIN` with unique violations surfaced as
//! [`ConnectorError::DataSetDuplicate`].

mod config;
mod connection;

/// CockroachDB value types and type resolution.
pub mod types;

pub use config::CockroachConfig;
pub use connection::CockroachConnection;

use async_trait::async_trait;

use crate::driver::{Connection, Driver};
use crate::error::ConnectorError;

/// The `cockroach` driver.
#[derive(Debug, Default)]
pub struct CockroachDriver;

impl CockroachDriver {
    /// Creates the driver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for CockroachDriver {
    fn name(&self) -> &str {
        "cockroach"
    }

    fn is_readable(&self) -> bool {
        false
    }

    fn is_writable(&self) -> bool {
        true
    }

    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>, ConnectorError> {
        let config = CockroachConfig::parse(dsn)?;
        let (client, io) =
            tokio_postgres::connect(&config.to_conn_string(), tokio_postgres::NoTls).await?;
        let server = config.to_string();
        let io_task = tokio::spawn(async move {
            if let Err(e) = io.await {
                tracing::warn!(server = %server, error = %e, "cockroach connection task ended");
            }
        });
        tracing::debug!(server = %config, "cockroach connection opened");
        Ok(Box::new(CockroachConnection::new(client, io_task, config)))
    }
}
