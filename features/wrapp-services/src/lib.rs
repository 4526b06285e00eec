//! Wrapp Services builds services on demand from declarative descriptors.
//!
//! A [`ServiceDescriptor`] names a service, the locator of the factory that
//! constructs it, the services it depends on and whether a setup step must run
//! after construction. A request for a service
//! 1. returns the session's cached instance, if there is one
//! 2. discovers every transitive dependency and rejects missing ones and cycles
//! 3. builds the dependencies in dependency first order, injecting earlier results
//! 4. builds the service itself
//!
//! Every instance is cached per session and built at most once per session.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wrapp_services::{
//!     Arguments, DynError, FnFactory, ParameterInfo, ServiceDescriptor, ServiceProviderBuilder,
//! };
//!
//! struct Pool;
//! struct Users {
//!     pool: Arc<Pool>,
//! }
//!
//! let provider = ServiceProviderBuilder::new()
//!     .add_service(
//!         ServiceDescriptor::new("pool", "pool"),
//!         FnFactory::new(vec![], |_: &Arguments| Ok::<_, DynError>(Pool)),
//!     )
//!     .add_service(
//!         ServiceDescriptor::new("users", "users").depends_on("pool"),
//!         FnFactory::new(vec![ParameterInfo::required("pool")], |args: &Arguments| {
//!             Ok::<_, DynError>(Users { pool: args.resolve("pool")? })
//!         }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let users = futures::executor::block_on(provider.require::<Users>("users", "session-1", None)).unwrap();
//! let again = futures::executor::block_on(provider.require::<Users>("users", "session-1", None)).unwrap();
//! assert!(Arc::ptr_eq(&users, &again));
//! assert_eq!(provider.get_cached_services("session-1"), vec!["pool", "users"]);
//! ```

pub mod builder;
pub mod cache;
pub mod container;
pub mod dependency_graph;
pub mod descriptor;
pub mod errors;
pub mod factories;
mod initiator;
pub mod injector;
pub mod resolver;
pub mod types;

pub use builder::ServiceProviderBuilder;
pub use cache::CacheStatistics;
pub use container::ServiceProvider;
pub use dependency_graph::DependencyGraph;
pub use descriptor::{DescriptorRegistry, DescriptorSource, ServiceDescriptor};
pub use errors::{ConstructError, InjectError, RegisterError, RequireError, ServiceError};
pub use factories::{AsyncInitialize, FactoryEntry, FnFactory, Initialize, ServiceFactory};
pub use injector::{Arguments, InvocationContext};
pub use resolver::Resolver;
pub use types::{DynError, Injectable, Instance, ParameterInfo, TypeInfo};
pub use wrapp_config::{config::Config, provider::ConfigOverrides};
