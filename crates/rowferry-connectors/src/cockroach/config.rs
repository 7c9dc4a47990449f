//! CockroachDB DSN parsing.
//!
//! Accepts the same forms as the MySQL driver (`user:password@host:port/
//! database?options`, with an optional `tcp(...)` wrapper) and renders
//! the key-value connection string the postgres client consumes.

use std::fmt;

use crate::error::ConnectorError;

/// Parsed CockroachDB connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CockroachConfig {
    /// Server host name.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// User name.
    pub username: String,
    /// Password, empty when absent.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for CockroachConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 26257,
            username: "root".to_owned(),
            password: String::new(),
            database: String::new(),
        }
    }
}

impl CockroachConfig {
    /// Parses a DSN.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::InvalidDsn`] for malformed port numbers.
    pub fn parse(dsn: &str) -> Result<Self, ConnectorError> {
        let mut config = Self::default();

        let (credentials, rest) = match dsn.rsplit_once('@') {
            Some((cred, rest)) => (Some(cred), rest),
            None => (None, dsn),
        };
        if let Some(credentials) = credentials {
            match credentials.split_once(':') {
                Some((user, password)) => {
                    if !user.is_empty() {
                        config.username = user.to_owned();
                    }
                    config.password = password.to_owned();
                }
                None => {
                    if !credentials.is_empty() {
                        config.username = credentials.to_owned();
                    }
                }
            }
        }

        let (address, tail) = match rest.split_once('/') {
            Some((address, tail)) => (address, Some(tail)),
            None => (rest, None),
        };
        let address = address
            .strip_prefix("tcp(")
            .map_or(address, |inner| inner.trim_end_matches(')'));

        if !address.is_empty() {
            match address.rsplit_once(':') {
                Some((host, port)) => {
                    if !host.is_empty() {
                        config.host = host.to_owned();
                    }
                    config.port = port
                        .parse()
                        .map_err(|_| ConnectorError::InvalidDsn(format!("invalid port: {port}")))?;
                }
                None => config.host = address.to_owned(),
            }
        }

        if let Some(tail) = tail {
            let database = tail.split_once('?').map_or(tail, |(db, _)| db);
            config.database = database.to_owned();
        }

        Ok(config)
    }

    /// Renders the key-value connection string the postgres client
    /// consumes.
    #[must_use]
    pub fn to_conn_string(&self) -> String {
        let mut s = format!(
            "host={} port={} user={} dbname={}",
            self.host, self.port, self.username, self.database
        );
        if !self.password.is_empty() {
            s.push_str(" password=");
            s.push_str(&self.password);
        }
        s
    }
}

impl fmt::Display for CockroachConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Password elided from display output.
        write!(
            f,
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_dsn() {
        let c = CockroachConfig::parse("app:secret@tcp(crdb.example.com:26258)/bank?sslmode=off")
            .unwrap();
        assert_eq!(c.username, "app");
        assert_eq!(c.password, "secret");
        assert_eq!(c.host, "crdb.example.com");
        assert_eq!(c.port, 26258);
        assert_eq!(c.database, "bank");
    }

    #[test]
    fn test_parse_defaults() {
        let c = CockroachConfig::parse("root@/bank").unwrap();
        assert_eq!(c.host, "localhost");
        assert_eq!(c.port, 26257);
        assert_eq!(c.database, "bank");
    }

    #[test]
    fn test_conn_string() {
        let c = CockroachConfig::parse("app:pw@h:26257/d").unwrap();
        assert_eq!(
            c.to_conn_string(),
            "host=h port=26257 user=app dbname=d password=pw"
        );
    }

    #[test]
    fn test_display_elides_password() {
        let c = CockroachConfig::parse("app:pw@h/d").unwrap();
        assert!(!c.to_string().contains("pw"));
    }
}
