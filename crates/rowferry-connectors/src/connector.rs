//! Connectors.
//!
//! A connector binds a driver to a DSN together with the filter and sort
//! configuration the caller accumulated. It never caches connections:
//! every [`Connector::connect`] opens a fresh one, pings it, and, when
//! the connection exposes the filterable/sortable surfaces, transfers
//! the configuration onto it before handing it out. The transfer is
//! one-way at handshake time; the connection owns its copy from then on.

use std::sync::Arc;

use crate::driver::{Connection, Driver};
use crate::error::ConnectorError;
use crate::filter::FilterBuilder;
use crate::sort::SortBuilder;

/// A driver bound to a DSN and query configuration.
pub struct Connector {
    driver: Arc<dyn Driver>,
    dsn: String,
    filters: FilterBuilder,
    sorts: SortBuilder,
}

impl Connector {
    /// Creates a connector with empty query configuration.
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, dsn: impl Into<String>) -> Self {
        Self {
            driver,
            dsn: dsn.into(),
            filters: FilterBuilder::new(),
            sorts: SortBuilder::new(),
        }
    }

    /// Replaces the filter configuration.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterBuilder) -> Self {
        self.filters = filters;
        self
    }

    /// Replaces the sort configuration.
    #[must_use]
    pub fn with_sorts(mut self, sorts: SortBuilder) -> Self {
        self.sorts = sorts;
        self
    }

    /// The underlying driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// The filter configuration.
    #[must_use]
    pub fn filters(&self) -> &FilterBuilder {
        &self.filters
    }

    /// Mutable access to the filter configuration. Affects connections
    /// opened after the change only.
    pub fn filters_mut(&mut self) -> &mut FilterBuilder {
        &mut self.filters
    }

    /// The sort configuration.
    #[must_use]
    pub fn sorts(&self) -> &SortBuilder {
        &self.sorts
    }

    /// Mutable access to the sort configuration. Affects connections
    /// opened after the change only.
    pub fn sorts_mut(&mut self) -> &mut SortBuilder {
        &mut self.sorts
    }

    /// Opens a new connection, pings it, and replays the filter/sort
    /// configuration onto it.
    ///
    /// # Errors
    ///
    /// Open and ping errors from the driver.
    pub async fn connect(&self) -> Result<Box<dyn Connection>, ConnectorError> {
        let mut conn = self.driver.open(&self.dsn).await?;
        conn.ping().await?;
        if let Some(filterable) = conn.as_filterable() {
            *filterable.filter_builder() = self.filters.clone();
        }
        if let Some(sortable) = conn.as_sortable() {
            *sortable.sort_builder() = self.sorts.clone();
        }
        Ok(conn)
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("driver", &self.driver.name())
            .field("filters", &self.filters.all().len())
            .field("sorts", &self.sorts.all().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, Operator};
    use crate::sort::{Direction, Sort};
    use crate::testing::{MemoryDriver, MemoryStore};

    #[tokio::test]
    async fn test_connect_replays_configuration() {
        let store = MemoryStore::new();
        let driver: Arc<dyn Driver> = Arc::new(MemoryDriver::new("mem", store));

        let mut filters = FilterBuilder::new();
        filters.push_root(Filter::new("id", Operator::Gt, "1"));
        let mut sorts = SortBuilder::new();
        sorts.push("t", Sort::new("id", Direction::Desc));

        let connector = Connector::new(driver, "")
            .with_filters(filters)
            .with_sorts(sorts);
        let mut conn = connector.connect().await.unwrap();

        let filterable = conn.as_filterable().unwrap();
        assert_eq!(filterable.filter_builder().root().len(), 1);
        let sortable = conn.as_sortable().unwrap();
        assert_eq!(sortable.sort_builder().for_collection("t").len(), 1);
    }
}
