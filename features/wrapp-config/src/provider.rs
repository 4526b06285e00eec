use std::{
    any::{type_name, Any},
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
};

use crate::errors::ConfigError;

/// A single type erased override value
#[derive(Clone)]
pub struct ConfigValue {
    pub type_name: &'static str,
    pub value: Arc<dyn Any + Send + Sync + 'static>,
}
impl Debug for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConfigValue").field(&self.type_name).finish()
    }
}
impl ConfigValue {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        ConfigValue {
            type_name: type_name::<T>(),
            value,
        }
    }
}

/// Caller supplied values, keyed by the constructor parameter they are meant for.
///
/// Overrides are passed along with a single service request and are only consulted
/// for parameters which could not be satisfied by an already built dependency.
#[derive(Default, Clone)]
pub struct ConfigOverrides {
    values: HashMap<String, ConfigValue>,
}
impl Debug for ConfigOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.values {
            map.entry(name, &value.type_name);
        }
        map.finish()
    }
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve an override by name, downcast to `T`.
    ///
    /// Returns `Ok(None)` if no override with that name exists and a
    /// [`ConfigError::TypeMismatch`] if it holds another type.
    pub fn get_config<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>, ConfigError> {
        let Some(entry) = self.values.get(name) else {
            return Ok(None);
        };

        entry
            .value
            .clone()
            .downcast::<T>()
            .map(Some)
            .map_err(|_| ConfigError::TypeMismatch {
                name: name.to_string(),
                required_type: type_name::<T>(),
                actual_type: entry.type_name,
            })
    }

    /// Retrieve the type erased override
    pub fn get_value(&self, name: &str) -> Option<&ConfigValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add an override.
    ///
    /// If the name is already taken, a [`ConfigError::AlreadyRegistered`] is returned
    pub fn add_config<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        config: T,
    ) -> Result<&mut Self, ConfigError> {
        self.add_value(name, ConfigValue::new(config))
    }

    /// Add an already shared override
    pub fn add_shared_config<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        config: Arc<T>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_value(name, ConfigValue::from_arc(config))
    }

    /// Can optionally add an override.
    ///
    /// `Some(T)` behaves like [`ConfigOverrides::add_config`], `None` just returns `Ok(self)` for chaining
    pub fn maybe_add_config<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        config: Option<T>,
    ) -> Result<&mut Self, ConfigError> {
        match config {
            Some(c) => self.add_config(name, c),
            None => Ok(self),
        }
    }

    fn add_value(
        &mut self,
        name: impl Into<String>,
        value: ConfigValue,
    ) -> Result<&mut Self, ConfigError> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(ConfigError::AlreadyRegistered(name));
        }

        self.values.insert(name, value);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct PoolConfig {
        max_connections: u32,
    }

    #[test]
    fn add_and_get_config() {
        let mut overrides = ConfigOverrides::new();
        overrides
            .add_config("pool", PoolConfig { max_connections: 4 })
            .unwrap()
            .add_config("timeout_ms", 250_u64)
            .unwrap();

        let pool = overrides.get_config::<PoolConfig>("pool").unwrap().unwrap();
        assert_eq!(pool.max_connections, 4);
        assert_eq!(*overrides.get_config::<u64>("timeout_ms").unwrap().unwrap(), 250);
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn missing_config_is_none() {
        let overrides = ConfigOverrides::new();
        assert!(overrides.get_config::<u64>("timeout_ms").unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut overrides = ConfigOverrides::new();
        overrides.add_config("region", "eu".to_string()).unwrap();

        let err = overrides.add_config("region", 1_u8).unwrap_err();
        assert_eq!(err, ConfigError::AlreadyRegistered("region".into()));
    }

    #[test]
    fn wrong_type_is_reported() {
        let mut overrides = ConfigOverrides::new();
        overrides.add_config("retries", 3_u8).unwrap();

        let err = overrides.get_config::<String>("retries").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TypeMismatch { actual_type: "u8", .. }
        ));
    }

    #[test]
    fn maybe_add_skips_none() {
        let mut overrides = ConfigOverrides::new();
        overrides
            .maybe_add_config::<u8>("retries", None)
            .unwrap()
            .maybe_add_config("region", Some("us"))
            .unwrap();

        assert!(!overrides.contains("retries"));
        assert!(overrides.contains("region"));
    }

    #[test]
    fn shared_config_keeps_the_same_allocation() {
        let pool = Arc::new(PoolConfig { max_connections: 16 });
        let mut overrides = ConfigOverrides::new();
        overrides.add_shared_config("pool", pool.clone()).unwrap();

        let stored = overrides.get_config::<PoolConfig>("pool").unwrap().unwrap();
        assert!(Arc::ptr_eq(&pool, &stored));
        assert_eq!(
            overrides.add_shared_config("pool", pool).unwrap_err(),
            ConfigError::AlreadyRegistered("pool".into())
        );
    }
}
