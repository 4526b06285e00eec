use std::{ops::Deref, sync::Arc};

/// A wrapper type for configuration values injected into a factory
///
/// Factories resolve a `Config<T>` from their arguments to receive a caller
/// supplied override by parameter name.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use wrapp_config::config::Config;
///
/// struct PoolConfig {
///     max_connections: u32,
/// }
///
/// let config = Config::new(Arc::new(PoolConfig { max_connections: 8 }));
/// assert_eq!(config.max_connections, 8);
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}
