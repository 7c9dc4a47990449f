//! The driver and connection contract.
//!
//! A driver is the pluggable adaptor for one database engine. It
//! declares whether it can act as a source (`is_readable`) or a
//! destination (`is_writable`) and opens connections from an opaque DSN.
//! Every connection supports lifecycle and introspection; the optional
//! capabilities (bulk read, bulk write, filter and sort configuration)
//! are surfaced through `as_*` casts that return `None` on connections
//! without the capability.

use async_trait::async_trait;

use rowferry_core::{Batch, SchemaMap};

use crate::error::ConnectorError;
use crate::filter::FilterBuilder;
use crate::sort::SortBuilder;

/// A pluggable database adaptor.
#[async_trait]
pub trait Driver: Send + Sync {
    /// The registry name of the driver, e.g. `"mysql"`.
    fn name(&self) -> &str;

    /// Whether connections can stream rows out.
    fn is_readable(&self) -> bool;

    /// Whether connections can bulk-write rows in.
    fn is_writable(&self) -> bool;

    /// Opens a new connection. The DSN format is driver-specific.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::InvalidDsn`] for unparseable DSNs, or the
    /// native client's connect error.
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>, ConnectorError>;
}

impl std::fmt::Debug for dyn Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").field("name", &self.name()).finish()
    }
}

/// One live connection to a database.
#[async_trait]
pub trait Connection: Send {
    /// Closes the connection. Idempotent.
    ///
    /// # Errors
    ///
    /// The native client's close error.
    async fn close(&mut self) -> Result<(), ConnectorError>;

    /// Reports whether the connection has been closed.
    fn is_closed(&self) -> bool;

    /// Verifies the connection is alive.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::ConnectionIsClosed`] or the native client's
    /// error.
    async fn ping(&mut self) -> Result<(), ConnectorError>;

    /// Introspects the database: collection names, schema maps, and
    /// expected row counts.
    ///
    /// Row counts are taken under the connection's current filter
    /// configuration, so offsets handed to [`ReadableConnection::read`]
    /// are interpreted against the same filtered view the read streams.
    ///
    /// # Errors
    ///
    /// The native client's query errors.
    async fn get_details(&mut self) -> Result<DatabaseDetail, ConnectorError>;

    /// The bulk-read capability, if this connection has it.
    fn as_readable(&mut self) -> Option<&mut dyn ReadableConnection> {
        None
    }

    /// The bulk-write capability, if this connection has it.
    fn as_writable(&mut self) -> Option<&mut dyn WritableConnection> {
        None
    }

    /// The filter-configuration capability, if this connection has it.
    fn as_filterable(&mut self) -> Option<&mut dyn FilterableConnection> {
        None
    }

    /// The sort-configuration capability, if this connection has it.
    fn as_sortable(&mut self) -> Option<&mut dyn SortableConnection> {
        None
    }
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("is_closed", &self.is_closed()).finish()
    }
}

/// Bulk row streaming out of a source.
#[async_trait]
pub trait ReadableConnection: Send {
    /// Reads up to `end - start` rows of `collection`, projected against
    /// the source schema, filtered and ordered by the connection's
    /// current configuration.
    ///
    /// # Errors
    ///
    /// The native client's query errors.
    async fn read(
        &mut self,
        collection: &str,
        start: u64,
        end: u64,
    ) -> Result<Batch, ConnectorError>;
}

/// Bulk row writing into a destination.
#[async_trait]
pub trait WritableConnection: Send {
    /// Writes one batch to `collection`, converting each value to the
    /// destination's column types first.
    ///
    /// The write is atomic at batch granularity: it either commits whole
    /// or leaves the collection unchanged for this batch.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::DataSetDuplicate`] on a unique violation,
    /// [`ConnectorError::RequiredColumnMissing`] when a not-null,
    /// no-default column is absent, conversion errors, or the native
    /// client's errors.
    async fn write(&mut self, collection: &str, batch: Batch) -> Result<(), ConnectorError>;
}

/// Filter configuration surface of a connection.
pub trait FilterableConnection: Send {
    /// The connection's filter builder.
    fn filter_builder(&mut self) -> &mut FilterBuilder;
}

/// Sort configuration surface of a connection.
pub trait SortableConnection: Send {
    /// The connection's sort builder.
    fn sort_builder(&mut self) -> &mut SortBuilder;
}

/// Introspected details of one collection.
#[derive(Debug, Clone, Default)]
pub struct DataCollectionDetail {
    /// The collection (table) name.
    pub name: String,
    /// Ordered column schema.
    pub schema: SchemaMap,
    /// Row count under the current filter configuration.
    pub expected_row_count: u64,
}

/// Introspected details of one database.
#[derive(Debug, Clone, Default)]
pub struct DatabaseDetail {
    /// The database name.
    pub name: String,
    /// Collections in introspection order.
    pub collections: Vec<DataCollectionDetail>,
}

impl DatabaseDetail {
    /// Returns only the collections named in `names`, in introspection
    /// order.
    #[must_use]
    pub fn only(&self, names: &[String]) -> Vec<DataCollectionDetail> {
        self.collections
            .iter()
            .filter(|c| names.contains(&c.name))
            .cloned()
            .collect()
    }

    /// Returns every collection except those named in `names`.
    #[must_use]
    pub fn except(&self, names: &[String]) -> Vec<DataCollectionDetail> {
        self.collections
            .iter()
            .filter(|c| !names.contains(&c.name))
            .cloned()
            .collect()
    }

    /// Looks up one collection by name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&DataCollectionDetail> {
        self.collections.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> DatabaseDetail {
        DatabaseDetail {
            name: "db".into(),
            collections: vec![
                DataCollectionDetail {
                    name: "a".into(),
                    ..Default::default()
                },
                DataCollectionDetail {
                    name: "b".into(),
                    ..Default::default()
                },
                DataCollectionDetail {
                    name: "c".into(),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_only_and_except() {
        let d = details();
        let only: Vec<String> = d.only(&["c".into(), "a".into()])
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(only, vec!["a", "c"]);

        let except: Vec<String> = d.except(&["b".into()]).into_iter().map(|c| c.name).collect();
        assert_eq!(except, vec!["a", "c"]);
    }

    #[test]
    fn test_collection_lookup() {
        let d = details();
        assert!(d.collection("b").is_some());
        assert!(d.collection("missing").is_none());
    }
}
