use std::collections::HashMap;

use crate::errors::RegisterError;

/// Declarative metadata describing how to build a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Unique key of the service
    pub service_name: String,
    /// Key of the factory which constructs the service
    pub locator: String,
    /// Services which must be built first, in declaration order
    pub dependencies: Vec<String>,
    /// If the setup step must run after construction
    pub requires_async_init: bool,
}

impl ServiceDescriptor {
    pub fn new(service_name: impl Into<String>, locator: impl Into<String>) -> Self {
        ServiceDescriptor {
            service_name: service_name.into(),
            locator: locator.into(),
            dependencies: Vec::new(),
            requires_async_init: false,
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn requires_init(mut self, requires_async_init: bool) -> Self {
        self.requires_async_init = requires_async_init;
        self
    }
}

/// Looks up descriptors by service name
///
/// Dependency names are not checked on registration, a missing one is only
/// reported when a graph reaching it is resolved.
pub trait DescriptorSource: Send + Sync {
    fn get_descriptor(&self, service_name: &str) -> Option<ServiceDescriptor>;
}

/// In memory descriptor registry
#[derive(Debug, Default, Clone)]
pub struct DescriptorRegistry {
    descriptors: HashMap<String, ServiceDescriptor>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: ServiceDescriptor) -> Result<&mut Self, RegisterError> {
        if self.descriptors.contains_key(&descriptor.service_name) {
            return Err(RegisterError::DuplicateDescriptor(descriptor.service_name));
        }

        self.descriptors
            .insert(descriptor.service_name.clone(), descriptor);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl DescriptorSource for DescriptorRegistry {
    fn get_descriptor(&self, service_name: &str) -> Option<ServiceDescriptor> {
        self.descriptors.get(service_name).cloned()
    }
}
