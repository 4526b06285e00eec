use std::{sync::Arc, time::Duration};

use crate::{
    container::ServiceProvider,
    descriptor::{DescriptorRegistry, DescriptorSource, ServiceDescriptor},
    errors::RegisterError,
    factories::{AsyncInitialize, FactoryEntry, FactoryRegistry, Initialize, ServiceFactory},
    initiator::TwoPhaseInitializer,
};

/// Collects descriptors and factories, then assembles a [`ServiceProvider`]
///
/// Descriptors either come from [`ServiceProviderBuilder::add_descriptor`] or from
/// an external [`DescriptorSource`], not both. Factories are keyed by the locator
/// the descriptors refer to.
#[derive(Default)]
pub struct ServiceProviderBuilder {
    /// Descriptors for the in memory registry
    pub(crate) descriptors: Vec<ServiceDescriptor>,
    /// External registry replacing the in memory one
    pub(crate) descriptor_source: Option<Arc<dyn DescriptorSource>>,
    /// Registered factories, keyed by locator
    pub(crate) factories: Vec<(String, FactoryEntry)>,
    pub(crate) init_timeout: Option<Duration>,
}

impl ServiceProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_descriptor(mut self, descriptor: ServiceDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn descriptor_source(mut self, source: Arc<dyn DescriptorSource>) -> Self {
        self.descriptor_source = Some(source);
        self
    }

    pub fn add_factory<Factory: ServiceFactory>(
        mut self,
        locator: impl Into<String>,
        factory: Factory,
    ) -> Self {
        self.factories
            .push((locator.into(), FactoryEntry::plain(factory)));
        self
    }

    /// Registers a factory whose product runs a synchronous setup step
    pub fn add_factory_with_init<Factory>(
        mut self,
        locator: impl Into<String>,
        factory: Factory,
    ) -> Self
    where
        Factory: ServiceFactory,
        Factory::Provides: Initialize,
    {
        self.factories
            .push((locator.into(), FactoryEntry::with_init(factory)));
        self
    }

    /// Registers a factory whose product runs an asynchronous setup step
    pub fn add_factory_with_async_init<Factory>(
        mut self,
        locator: impl Into<String>,
        factory: Factory,
    ) -> Self
    where
        Factory: ServiceFactory,
        Factory::Provides: AsyncInitialize,
    {
        self.factories
            .push((locator.into(), FactoryEntry::with_async_init(factory)));
        self
    }

    /// Registers a descriptor together with the factory under its locator
    pub fn add_service<Factory: ServiceFactory>(
        self,
        descriptor: ServiceDescriptor,
        factory: Factory,
    ) -> Self {
        let locator = descriptor.locator.clone();
        self.add_descriptor(descriptor).add_factory(locator, factory)
    }

    /// Fails an asynchronous setup step which takes longer than `timeout`
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ServiceProvider, RegisterError> {
        let ServiceProviderBuilder {
            descriptors,
            descriptor_source,
            factories,
            init_timeout,
        } = self;

        tracing::debug!(
            "Building service provider with {} descriptors and {} factories",
            descriptors.len(),
            factories.len()
        );

        let descriptor_source: Arc<dyn DescriptorSource> = match descriptor_source {
            Some(_) if !descriptors.is_empty() => {
                return Err(RegisterError::MixedDescriptorSources)
            }
            Some(source) => source,
            None => {
                let mut registry = DescriptorRegistry::new();
                for descriptor in descriptors {
                    registry.add(descriptor)?;
                }
                Arc::new(registry)
            }
        };

        let mut registry = FactoryRegistry::new();
        for (locator, entry) in factories {
            registry.insert(locator, entry)?;
        }

        Ok(ServiceProvider::new(
            descriptor_source,
            registry,
            TwoPhaseInitializer::new(init_timeout),
        ))
    }
}
