use crate::{Config, Connection, Prepared, Result};
use lru::LruCache;
use parking_lot::Mutex;
use std::{
    num::NonZeroUsize,
    ops::{Deref, DerefMut},
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Query,
    Call,
}

type Key = (StatementKind, String);

struct Entry<P> {
    statement: P,
    created: Instant,
}

struct State<P> {
    /// First use of every SQL text seen recently.
    admission: LruCache<Key, Instant>,
    /// `None` when the cache is disabled.
    statements: Option<LruCache<Key, Entry<P>>>,
}

/// Prepared statements of one transaction, keyed by the rendered SQL.
///
/// A statement is cached only from the second use of its SQL within the admission window, until
/// then it is closed when returned. Evicted, expired and replaced statements are closed.
pub struct StatementCache<P: Prepared> {
    state: Mutex<State<P>>,
    ttl: Duration,
    window: Duration,
}

/// Statement taken from the cache for exclusive use, give it back with [`StatementCache::checkin`].
pub struct Lease<P> {
    key: Key,
    statement: P,
    created: Instant,
    keep: bool,
}

impl<P> Lease<P> {
    pub fn sql(&self) -> &str {
        &self.key.1
    }

    /// Whether the statement is kept in the cache when returned.
    pub fn is_kept(&self) -> bool {
        self.keep
    }
}

impl<P> Deref for Lease<P> {
    type Target = P;
    fn deref(&self) -> &P {
        &self.statement
    }
}

impl<P> DerefMut for Lease<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.statement
    }
}

fn close<P: Prepared>(mut statement: P, sql: &str) {
    if let Err(e) = statement.close() {
        log::warn!(
            "Could not close the statement `{}`: {:#}",
            crate::truncate_long!(sql),
            e
        );
    }
}

impl<P: Prepared> StatementCache<P> {
    pub fn new(config: &Config) -> Self {
        let admission = NonZeroUsize::new(config.admission_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(State {
                admission: LruCache::new(admission),
                statements: NonZeroUsize::new(config.statement_cache_size).map(LruCache::new),
            }),
            ttl: config.statement_ttl,
            window: config.admission_window,
        }
    }

    /// Cached statement for `sql` or a newly prepared one.
    pub async fn checkout<C>(
        &self,
        connection: &mut C,
        sql: &str,
        kind: StatementKind,
    ) -> Result<Lease<P>>
    where
        C: Connection<Prepared = P>,
    {
        let key = (kind, sql.to_string());
        let (cached, keep) = {
            let mut state = self.state.lock();
            let cached = state.statements.as_mut().and_then(|v| v.pop(&key));
            match cached {
                Some(entry) if entry.created.elapsed() < self.ttl => (Some(entry), true),
                expired => {
                    if let Some(entry) = expired {
                        log::debug!("Prepared statement expired");
                        close(entry.statement, sql);
                    }
                    let keep = match state.admission.pop(&key) {
                        Some(first) if first.elapsed() <= self.window => {
                            state.statements.is_some()
                        }
                        _ => {
                            state.admission.put(key.clone(), Instant::now());
                            false
                        }
                    };
                    (None, keep)
                }
            }
        };
        if let Some(entry) = cached {
            return Ok(Lease {
                key,
                statement: entry.statement,
                created: entry.created,
                keep,
            });
        }
        let statement = match kind {
            StatementKind::Query => connection.prepare(sql).await?,
            StatementKind::Call => connection.prepare_call(sql).await?,
        };
        Ok(Lease {
            key,
            statement,
            created: Instant::now(),
            keep,
        })
    }

    /// Returns a statement, it is either cached or closed.
    pub fn checkin(&self, lease: Lease<P>) {
        let Lease {
            key,
            mut statement,
            created,
            keep,
        } = lease;
        if !keep || created.elapsed() >= self.ttl {
            close(statement, &key.1);
            return;
        }
        if let Err(e) = statement.clear_bindings() {
            log::warn!("Could not clear the bindings, discarding the statement: {:#}", e);
            close(statement, &key.1);
            return;
        }
        let mut state = self.state.lock();
        let Some(statements) = state.statements.as_mut() else {
            close(statement, &key.1);
            return;
        };
        let expired = statements
            .iter()
            .filter(|(_, v)| v.created.elapsed() >= self.ttl)
            .map(|(k, _)| k.clone())
            .collect::<Vec<_>>();
        for k in expired {
            if let Some(entry) = statements.pop(&k) {
                close(entry.statement, &k.1);
            }
        }
        if let Some((k, old)) = statements.push(key, Entry { statement, created }) {
            close(old.statement, &k.1);
        }
    }

    /// Number of statements currently cached.
    pub fn len(&self) -> usize {
        self.state.lock().statements.as_ref().map_or(0, |v| v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every cached statement and forgets the admission history.
    pub fn release_all(&self) {
        let mut state = self.state.lock();
        state.admission.clear();
        let Some(statements) = state.statements.as_mut() else {
            return;
        };
        let released = statements.len();
        while let Some((k, entry)) = statements.pop_lru() {
            close(entry.statement, &k.1);
        }
        if released > 0 {
            log::debug!("Released {} cached statements", released);
        }
    }
}

impl<P: Prepared> Drop for StatementCache<P> {
    fn drop(&mut self) {
        self.release_all();
    }
}
