use crate::{Config, Connection, Result, StatementCache, StatementMonitor};
use anyhow::Context as _;
use std::sync::Arc;

/// Unit of work on a connection.
///
/// Owns the statement cache of the connection, released whenever the unit of work ends (commit,
/// rollback or drop), and the monitor used to cancel the statement currently running.
pub struct Transaction<C: Connection> {
    pub(crate) connection: C,
    pub(crate) cache: StatementCache<C::Prepared>,
    pub(crate) monitor: Arc<StatementMonitor>,
}

impl<C: Connection> Transaction<C> {
    pub fn new(connection: C, config: &Config) -> Self {
        Self {
            connection,
            cache: StatementCache::new(config),
            monitor: Default::default(),
        }
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn cache(&self) -> &StatementCache<C::Prepared> {
        &self.cache
    }

    /// Handle usable from another task to cancel the running statement.
    pub fn monitor(&self) -> Arc<StatementMonitor> {
        self.monitor.clone()
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.cache.release_all();
        let result = self
            .connection
            .commit()
            .await
            .context("Could not commit the transaction");
        if let Err(e) = &result {
            log::error!("{:#}", e);
        }
        result
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.cache.release_all();
        let result = self
            .connection
            .rollback()
            .await
            .context("Could not rollback the transaction");
        if let Err(e) = &result {
            log::error!("{:#}", e);
        }
        result
    }

    /// Ends the transaction without commit nor rollback, the cached statements are closed.
    pub fn into_connection(self) -> C {
        let Self {
            connection, cache, ..
        } = self;
        drop(cache);
        connection
    }
}
