//! Connection pooling.
//!
//! A pool owns the connections a reader's or writer's workers check out,
//! addressed by slot index. `connect` always opens a fresh connection
//! through the pool's connector (reusing the first vacated slot, else
//! appending), so the slot vector's length never decreases. The vector
//! is guarded by a short-section mutex; each connection sits behind its
//! own async mutex because workers hold it across I/O awaits.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connector::Connector;
use crate::driver::Connection;
use crate::error::ConnectorError;

/// A pooled connection handle. Workers lock it for the duration of their
/// streaming loop.
pub type SharedConnection = Arc<tokio::sync::Mutex<Box<dyn Connection>>>;

/// Index-addressed pool of connections minted by one connector.
pub struct ConnectionPool {
    connector: Arc<Connector>,
    slots: Mutex<Vec<Option<SharedConnection>>>,
}

impl ConnectionPool {
    /// Creates an empty pool over `connector`.
    #[must_use]
    pub fn new(connector: Arc<Connector>) -> Self {
        Self {
            connector,
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Opens a new connection and stores it in the first vacant slot
    /// (appending when none is vacant). Returns the handle and its slot
    /// index.
    ///
    /// # Errors
    ///
    /// Open/ping errors from the connector.
    pub async fn connect(&self) -> Result<(SharedConnection, usize), ConnectorError> {
        let conn: SharedConnection = Arc::new(tokio::sync::Mutex::new(self.connector.connect().await?));
        let mut slots = self.slots.lock();
        let index = match slots.iter().position(Option::is_none) {
            Some(vacant) => {
                slots[vacant] = Some(Arc::clone(&conn));
                vacant
            }
            None => {
                slots.push(Some(Arc::clone(&conn)));
                slots.len() - 1
            }
        };
        Ok((conn, index))
    }

    /// Returns the connection stored at `index`.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::PoolOutOfIndex`] beyond the slot vector,
    /// [`ConnectorError::ConnectionIsClosed`] for vacated slots.
    pub fn get(&self, index: usize) -> Result<SharedConnection, ConnectorError> {
        let slots = self.slots.lock();
        match slots.get(index) {
            None => Err(ConnectorError::PoolOutOfIndex {
                index,
                len: slots.len(),
            }),
            Some(None) => Err(ConnectorError::ConnectionIsClosed),
            Some(Some(conn)) => Ok(Arc::clone(conn)),
        }
    }

    /// Closes the connection at `index` and vacates the slot.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::PoolOutOfIndex`] beyond the slot vector,
    /// [`ConnectorError::ConnectionIsClosed`] for already-vacated slots,
    /// or the connection's close error.
    pub async fn close(&self, index: usize) -> Result<(), ConnectorError> {
        let conn = {
            let mut slots = self.slots.lock();
            match slots.get_mut(index) {
                None => {
                    return Err(ConnectorError::PoolOutOfIndex {
                        index,
                        len: slots.len(),
                    })
                }
                Some(slot) => slot.take().ok_or(ConnectorError::ConnectionIsClosed)?,
            }
        };
        let result = conn.lock().await.close().await;
        result
    }

    /// Closes every live connection, vacating all slots. The slot vector
    /// keeps its length.
    ///
    /// # Errors
    ///
    /// The first close error encountered; remaining connections are
    /// still closed.
    pub async fn close_all(&self) -> Result<(), ConnectorError> {
        let live: Vec<SharedConnection> = {
            let mut slots = self.slots.lock();
            slots.iter_mut().filter_map(Option::take).collect()
        };
        let mut first_err = None;
        for conn in live {
            if let Err(e) = conn.lock().await.close().await {
                tracing::warn!(error = %e, "connection close failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The slot vector's length (monotonically non-decreasing).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Reports whether the pool has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Driver;
    use crate::testing::{MemoryDriver, MemoryStore};

    fn pool() -> ConnectionPool {
        let store = MemoryStore::new();
        let driver: Arc<dyn Driver> = Arc::new(MemoryDriver::new("mem", store));
        ConnectionPool::new(Arc::new(Connector::new(driver, "")))
    }

    #[tokio::test]
    async fn test_connect_assigns_indices() {
        let pool = pool();
        let (_c0, i0) = pool.connect().await.unwrap();
        let (_c1, i1) = pool.connect().await.unwrap();
        assert_eq!((i0, i1), (0, 1));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.live(), 2);
    }

    #[tokio::test]
    async fn test_close_vacates_and_slot_is_reused() {
        let pool = pool();
        let (_c0, i0) = pool.connect().await.unwrap();
        let (_c1, _i1) = pool.connect().await.unwrap();

        pool.close(i0).await.unwrap();
        assert!(matches!(
            pool.get(i0).unwrap_err(),
            ConnectorError::ConnectionIsClosed
        ));
        assert!(matches!(
            pool.close(i0).await.unwrap_err(),
            ConnectorError::ConnectionIsClosed
        ));

        // The vacated slot is reused; the vector does not grow.
        let (_c2, i2) = pool.connect().await.unwrap();
        assert_eq!(i2, i0);
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn test_close_all_then_every_get_fails() {
        let pool = pool();
        for _ in 0..3 {
            pool.connect().await.unwrap();
        }
        let len_before = pool.len();
        pool.close_all().await.unwrap();
        assert_eq!(pool.len(), len_before);
        assert_eq!(pool.live(), 0);
        for i in 0..len_before {
            assert!(matches!(
                pool.get(i).unwrap_err(),
                ConnectorError::ConnectionIsClosed
            ));
        }
    }

    #[tokio::test]
    async fn test_get_out_of_index() {
        let pool = pool();
        assert!(matches!(
            pool.get(9).unwrap_err(),
            ConnectorError::PoolOutOfIndex { index: 9, len: 0 }
        ));
    }
}
