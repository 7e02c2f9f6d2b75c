//! Connection pool accessor contract.
//!
//! A pool hands out exclusively owned connections. Releasing a connection is
//! tied to dropping it, so a lease is returned on every exit path of the code
//! that holds it: normal return, error propagation, panic unwinding, and
//! cancellation of the owning task.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PoolResult;

/// Scoped acquisition of database connections.
///
/// Implementations decide how many leases may be outstanding at once and
/// must queue or block further `acquire` calls once that bound is reached.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    /// The leased connection. Dropping it returns it to the pool.
    type Connection: Send + 'static;

    /// Leases one connection.
    async fn acquire(&self) -> PoolResult<Self::Connection>;
}

#[async_trait]
impl<P: ConnectionPool> ConnectionPool for Arc<P> {
    type Connection = P::Connection;

    async fn acquire(&self) -> PoolResult<Self::Connection> {
        P::acquire(self.as_ref()).await
    }
}
