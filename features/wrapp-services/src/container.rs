use std::{any::type_name, fmt::Debug, sync::Arc};

use wrapp_config::provider::ConfigOverrides;

use crate::{
    cache::{CacheStatistics, Claim, SessionCache},
    dependency_graph::DependencyGraph,
    descriptor::{DescriptorSource, ServiceDescriptor},
    errors::{RequireError, ServiceError},
    factories::FactoryRegistry,
    initiator::TwoPhaseInitializer,
    injector::{Constructed, InstanceInjector, InvocationContext},
    types::{Injectable, Instance},
};

/// Builds services on demand and caches them per session
#[derive(Clone)]
pub struct ServiceProvider(pub(crate) Arc<ServiceProviderInner>);
pub(crate) struct ServiceProviderInner {
    descriptors: Arc<dyn DescriptorSource>,
    factories: FactoryRegistry,
    cache: SessionCache,
    initiator: TwoPhaseInitializer,
}
impl Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("ServiceProvider");
        let statistics = self.0.cache.statistics();
        for session in statistics.services_per_session.keys() {
            map.field(session, &self.0.cache.cached_services(session));
        }
        map.finish()
    }
}

impl ServiceProvider {
    pub(crate) fn new(
        descriptors: Arc<dyn DescriptorSource>,
        factories: FactoryRegistry,
        initiator: TwoPhaseInitializer,
    ) -> Self {
        Self(Arc::new(ServiceProviderInner {
            descriptors,
            factories,
            cache: SessionCache::new(),
            initiator,
        }))
    }

    /// Returns the session's instance of `service_name`, building it and
    /// everything it depends on first if needed
    ///
    /// Dependencies are built one after another, each constructed and initialized
    /// before the next starts. On failure the root is never cached, dependencies
    /// which were already finished stay cached.
    pub async fn create_service(
        &self,
        service_name: &str,
        session_id: &str,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Instance, ServiceError> {
        if let Some(instance) = self.0.cache.get(session_id, service_name) {
            tracing::debug!(
                service = service_name,
                session = session_id,
                "Returning cached instance"
            );
            return Ok(instance);
        }

        let graph = self.dependency_graph(service_name)?;
        let order = graph.resolution_order()?;
        tracing::debug!(
            service = service_name,
            session = session_id,
            "Resolution order: {:?}",
            order.iter().map(|d| &d.service_name).collect::<Vec<_>>()
        );

        let mut context = InvocationContext::new();
        for descriptor in order {
            let instance = self
                .obtain(session_id, descriptor, &context, overrides)
                .await?;
            context.insert(descriptor.service_name.clone(), instance);
        }

        let instance = self
            .obtain(session_id, graph.root(), &context, overrides)
            .await?;

        tracing::info!(
            service = service_name,
            session = session_id,
            dependencies = context.len(),
            "Service ready"
        );
        Ok(instance)
    }

    /// Like [`ServiceProvider::create_service`], downcast to the concrete type
    pub async fn require<T: Injectable>(
        &self,
        service_name: &str,
        session_id: &str,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Arc<T>, RequireError> {
        let instance = self
            .create_service(service_name, session_id, overrides)
            .await?;

        instance
            .downcast()
            .map_err(|actual_type| RequireError::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    /// Takes the cached instance or builds it, at most one build per slot at a time
    async fn obtain(
        &self,
        session_id: &str,
        descriptor: &ServiceDescriptor,
        context: &InvocationContext,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Instance, ServiceError> {
        loop {
            match self.0.cache.claim(session_id, &descriptor.service_name) {
                Claim::Ready(instance) => return Ok(instance),
                Claim::Wait(waiter) => {
                    if let Ok(Some(instance)) = waiter.await {
                        return Ok(instance);
                    }
                    tracing::debug!(
                        service = %descriptor.service_name,
                        session = session_id,
                        "Concurrent build gave up, retrying"
                    );
                }
                Claim::Build(guard) => {
                    // On error the guard is dropped and the slot released
                    let instance = self.build(descriptor, context, overrides).await?;
                    guard.publish(instance.clone());
                    return Ok(instance);
                }
            }
        }
    }

    async fn build(
        &self,
        descriptor: &ServiceDescriptor,
        context: &InvocationContext,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Instance, ServiceError> {
        let Constructed {
            instance,
            initializer,
        } = InstanceInjector::instantiate(descriptor, &self.0.factories, context, overrides)?;

        if descriptor.requires_async_init {
            self.0
                .initiator
                .maybe_initialize(&descriptor.service_name, &instance, initializer.as_ref())
                .await?;
        }

        Ok(instance)
    }

    fn descriptor(&self, service_name: &str) -> Result<ServiceDescriptor, ServiceError> {
        self.0
            .descriptors
            .get_descriptor(service_name)
            .ok_or_else(|| ServiceError::DescriptorNotFound {
                service: service_name.to_string(),
                required_by: None,
            })
    }

    /// Dependency graph of `service_name`
    pub fn dependency_graph(&self, service_name: &str) -> Result<DependencyGraph, ServiceError> {
        let root = self.descriptor(service_name)?;
        DependencyGraph::build(root, self.0.descriptors.as_ref())
    }

    /// Names of the dependencies of `service_name` in build order, itself excluded
    pub fn resolution_order(&self, service_name: &str) -> Result<Vec<String>, ServiceError> {
        let graph = self.dependency_graph(service_name)?;
        let order = graph.resolution_order()?;
        Ok(order
            .into_iter()
            .map(|descriptor| descriptor.service_name.clone())
            .collect())
    }

    /// Checks that `service_name` could be resolved without building anything
    ///
    /// Returns one message per problem, an empty list means valid.
    pub fn validate_service_dependencies(&self, service_name: &str) -> Vec<String> {
        let root = match self.descriptor(service_name) {
            Ok(root) => root,
            Err(error) => return vec![error.to_string()],
        };

        let (graph, errors) = DependencyGraph::inspect(root, self.0.descriptors.as_ref());
        let mut messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        if let Err(error) = graph.resolution_order() {
            messages.push(error.to_string());
        }

        if !messages.is_empty() {
            tracing::debug!(
                service = service_name,
                issues = messages.len(),
                "Dependency validation failed"
            );
        }
        messages
    }

    /// Cached instance of a session, never builds
    pub fn cached_instance(&self, service_name: &str, session_id: &str) -> Option<Instance> {
        self.0.cache.get(session_id, service_name)
    }

    /// Drops every cached instance of a session, returns how many were dropped
    pub fn clear_session_cache(&self, session_id: &str) -> usize {
        let removed = self.0.cache.clear_session(session_id);
        tracing::info!(session = session_id, removed, "Cleared session cache");
        removed
    }

    /// Drops every cached instance, returns how many were dropped
    pub fn clear_all_cache(&self) -> usize {
        let removed = self.0.cache.clear_all();
        tracing::info!(removed, "Cleared all cached services");
        removed
    }

    pub fn get_cached_services(&self, session_id: &str) -> Vec<String> {
        self.0.cache.cached_services(session_id)
    }

    pub fn get_cache_statistics(&self) -> CacheStatistics {
        self.0.cache.statistics()
    }
}
