//! Wrapp Config holds the caller supplied configuration overrides used while building services.
//!
//! Wrapp Config is split into two major parts:
//! 1. ConfigOverrides: a name keyed set of override values for a single service request
//! 2. Config<T>: A wrapper type to receive an override inside a factory
//!
//! # Examples
//!
//! ```rust
//! use wrapp_config::provider::ConfigOverrides;
//!
//! struct PoolConfig {
//!     max_connections: u32,
//! }
//!
//! let mut overrides = ConfigOverrides::new();
//! overrides
//!     .add_config("pool", PoolConfig { max_connections: 8 })
//!     .unwrap();
//!
//! let pool = overrides.get_config::<PoolConfig>("pool").unwrap().unwrap();
//! assert_eq!(pool.max_connections, 8);
//! ```

pub mod config;
pub mod errors;
pub mod provider;
