use crate::{Error, Result};
use anyhow::Context;
use std::{env, str::FromStr, time::Duration};

/// Tuning of the statement processor and of the statement cache.
///
/// ```rust
/// use bindery_core::Config;
/// use std::time::Duration;
/// let config = Config::default()
///     .with_statement_cache_size(50)
///     .with_statement_ttl(Duration::from_secs(30));
/// assert_eq!(config.statement_cache_size, 50);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of prepared statements kept per transaction.
    pub statement_cache_size: usize,
    /// Maximum lifetime of a cached prepared statement.
    pub statement_ttl: Duration,
    /// Window in which a second use of the same SQL promotes its statement into the cache.
    pub admission_window: Duration,
    /// Number of distinct SQL texts whose use count is tracked.
    pub admission_capacity: usize,
    /// Memory budget (bytes) for the rows prefetched by dialects with dynamic fetch size.
    pub max_fetch_memory: usize,
    /// Keep looking after the first argument root resolving a bind and warn on duplicates.
    pub check_duplicate_binds: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            statement_cache_size: 25,
            statement_ttl: Duration::from_secs(300),
            admission_window: Duration::from_secs(60),
            admission_capacity: 1000,
            max_fetch_memory: 1024 * 1024,
            check_duplicate_binds: false,
        }
    }
}

impl Config {
    pub fn with_statement_cache_size(mut self, size: usize) -> Self {
        self.statement_cache_size = size;
        self
    }

    pub fn with_statement_ttl(mut self, ttl: Duration) -> Self {
        self.statement_ttl = ttl;
        self
    }

    pub fn with_admission_window(mut self, window: Duration) -> Self {
        self.admission_window = window;
        self
    }

    pub fn with_admission_capacity(mut self, capacity: usize) -> Self {
        self.admission_capacity = capacity;
        self
    }

    pub fn with_max_fetch_memory(mut self, bytes: usize) -> Self {
        self.max_fetch_memory = bytes;
        self
    }

    pub fn with_check_duplicate_binds(mut self, check: bool) -> Self {
        self.check_duplicate_binds = check;
        self
    }

    /// Defaults overridden by the `BINDERY_*` environment variables.
    ///
    /// Durations are expressed in milliseconds. Unset variables keep the default, malformed ones
    /// are an error naming the variable.
    pub fn from_env() -> Result<Self> {
        fn read<T: FromStr>(name: &str) -> Result<Option<T>>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            match env::var(name) {
                Ok(v) => v
                    .trim()
                    .parse::<T>()
                    .map(Some)
                    .with_context(|| format!("Invalid value `{}` for {}", v, name)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(e) => Err(Error::new(e).context(format!("Cannot read {}", name))),
            }
        }
        let mut config = Self::default();
        if let Some(v) = read("BINDERY_STATEMENT_CACHE_SIZE")? {
            config.statement_cache_size = v;
        }
        if let Some(v) = read("BINDERY_STATEMENT_TTL_MS")? {
            config.statement_ttl = Duration::from_millis(v);
        }
        if let Some(v) = read("BINDERY_ADMISSION_WINDOW_MS")? {
            config.admission_window = Duration::from_millis(v);
        }
        if let Some(v) = read("BINDERY_ADMISSION_CAPACITY")? {
            config.admission_capacity = v;
        }
        if let Some(v) = read("BINDERY_MAX_FETCH_MEMORY")? {
            config.max_fetch_memory = v;
        }
        if let Some(v) = read("BINDERY_CHECK_DUPLICATE_BINDS")? {
            config.check_duplicate_binds = v;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.statement_cache_size, 25);
        assert_eq!(config.max_fetch_memory, 1024 * 1024);
        assert!(!config.check_duplicate_binds);
    }

    #[test]
    fn builder() {
        let config = Config::default()
            .with_admission_window(Duration::from_millis(10))
            .with_check_duplicate_binds(true);
        assert_eq!(config.admission_window, Duration::from_millis(10));
        assert!(config.check_duplicate_binds);
        assert_eq!(config.statement_cache_size, 25);
    }
}
