//! MySQL DSN parsing.
//!
//! Accepts the classic Go-style form
//! `user:password@tcp(host:port)/database?options` as well as the bare
//! `user:password@host:port/database` shorthand, and renders the
//! canonical `mysql://` URL the client connects with.

use std::fmt;

use crate::error::ConnectorError;

/// Parsed MySQL connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlConfig {
    /// Server host name or socket path.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// User name.
    pub username: String,
    /// Password, empty when absent.
    pub password: String,
    /// Database name.
    pub database: String,
    /// Raw option string (`key=value&…`), empty when absent.
    pub options: String,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3306,
            username: "root".to_owned(),
            password: String::new(),
            database: String::new(),
            options: String::new(),
        }
    }
}

impl MySqlConfig {
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

        // `tcp(host:port)` and `unix(path)` wrappers are unwrapped; the
        // bare `host:port` form needs none.
        let address = address
            .strip_prefix("tcp(")
            .or_else(|| address.strip_prefix("unix("))
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
            match tail.split_once('?') {
                Some((database, options)) => {
                    config.database = database.to_owned();
                    config.options = options.to_owned();
                }
                None => config.database = tail.to_owned(),
            }
        }

        Ok(config)
    }

    /// Renders the `mysql://` URL the client consumes.
    #[must_use]
    pub fn to_url(&self) -> String {
        let mut url = format!("mysql://{}", self.username);
        if !self.password.is_empty() {
            url.push(':');
            url.push_str(&self.password);
        }
        url.push('@');
        url.push_str(&self.host);
        url.push(':');
        url.push_str(&self.port.to_string());
        url.push('/');
        url.push_str(&self.database);
        if !self.options.is_empty() {
            url.push('?');
            url.push_str(&self.options);
        }
        url
    }
}

impl fmt::Display for MySqlConfig {
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
    fn test_parse_go_style_dsn() {
        let c = MySqlConfig::parse("app:secret@tcp(db.example.com:3307)/orders?tls=true").unwrap();
        assert_eq!(c.username, "app");
        assert_eq!(c.password, "secret");
        assert_eq!(c.host, "db.example.com");
        assert_eq!(c.port, 3307);
        assert_eq!(c.database, "orders");
        assert_eq!(c.options, "tls=true");
    }

    #[test]
    fn test_parse_bare_dsn() {
        let c = MySqlConfig::parse("root:root@localhost:3306/tests").unwrap();
        assert_eq!(c.host, "localhost");
        assert_eq!(c.port, 3306);
        assert_eq!(c.database, "tests");
    }

    #[test]
    fn test_parse_defaults() {
        let c = MySqlConfig::parse("root@/mydb").unwrap();
        assert_eq!(c.host, "localhost");
        assert_eq!(c.port, 3306);
        assert_eq!(c.username, "root");
        assert_eq!(c.database, "mydb");
    }

    #[test]
    fn test_parse_invalid_port() {
        assert!(matches!(
            MySqlConfig::parse("root@tcp(localhost:not-a-port)/db").unwrap_err(),
            ConnectorError::InvalidDsn(_)
        ));
    }

    #[test]
    fn test_to_url() {
        let c = MySqlConfig::parse("app:secret@tcp(h:3307)/d?a=1").unwrap();
        assert_eq!(c.to_url(), "mysql://app:secret@h:3307/d?a=1");
        let nopass = MySqlConfig::parse("app@h/d").unwrap();
        assert_eq!(nopass.to_url(), "mysql://app@h:3306/d");
    }

    #[test]
    fn test_display_elides_password() {
        let c = MySqlConfig::parse("app:secret@h/d").unwrap();
        assert!(!c.to_string().contains("secret"));
    }
}
