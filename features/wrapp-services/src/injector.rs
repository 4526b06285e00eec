use std::{collections::HashMap, sync::Arc};

use wrapp_config::provider::ConfigOverrides;

use crate::{
    descriptor::ServiceDescriptor,
    errors::{ConstructError, InjectError, ServiceError},
    factories::{FactoryRegistry, Initializer},
    resolver::Resolver,
    types::{Instance, ParameterInfo},
};

/// Values handed to a factory, keyed by parameter name
#[derive(Debug, Default, Clone)]
pub struct Arguments {
    values: HashMap<String, Instance>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parameter: impl Into<String>, value: Instance) -> &mut Self {
        self.values.insert(parameter.into(), value);
        self
    }

    pub fn get(&self, parameter: &str) -> Option<&Instance> {
        self.values.get(parameter)
    }

    pub fn contains(&self, parameter: &str) -> bool {
        self.values.contains_key(parameter)
    }

    /// Extracts a typed argument, see [`Resolver`] for the supported shapes
    pub fn resolve<R: Resolver>(&self, parameter: &str) -> Result<R, InjectError> {
        R::resolve(self, parameter)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Instances built so far during one request, keyed by service name
#[derive(Debug, Default)]
pub struct InvocationContext {
    instances: HashMap<String, Instance>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, service_name: impl Into<String>, instance: Instance) {
        self.instances.insert(service_name.into(), instance);
    }

    pub fn get(&self, service_name: &str) -> Option<&Instance> {
        self.instances.get(service_name)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Where an argument was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgumentSource {
    Dependency,
    DeclaredDependency,
    Override,
}

/// A freshly constructed instance, setup not yet run
pub(crate) struct Constructed {
    pub instance: Instance,
    pub initializer: Option<Initializer>,
}

pub(crate) struct InstanceInjector;

impl InstanceInjector {
    /// Resolves the factory of `descriptor` and constructs it from the available instances
    pub(crate) fn instantiate(
        descriptor: &ServiceDescriptor,
        factories: &FactoryRegistry,
        available: &InvocationContext,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Constructed, ServiceError> {
        let service = &descriptor.service_name;
        let entry = factories
            .resolve(&descriptor.locator)
            .map_err(|error| ServiceError::Construction {
                service: service.clone(),
                error,
            })?;

        let arguments =
            Self::assemble_arguments(descriptor, &entry.parameters(), available, overrides);

        let instance =
            entry
                .factory
                .construct(&arguments)
                .map_err(|error| ServiceError::Construction {
                    service: service.clone(),
                    error: ConstructError::FactoryFailed(Arc::new(error)),
                })?;

        tracing::debug!("Constructed instance of {} for '{}'", instance.info, service);

        Ok(Constructed {
            instance,
            initializer: entry.initializer.clone(),
        })
    }

    /// Decides for every parameter where its value comes from
    ///
    /// Precedence: exact dependency name, declared dependency ignoring case,
    /// config override. Parameters with a default are left unset, required ones
    /// are left unset with a warning and the factory decides if that is fatal.
    pub(crate) fn assemble_arguments(
        descriptor: &ServiceDescriptor,
        parameters: &[ParameterInfo],
        available: &InvocationContext,
        overrides: Option<&ConfigOverrides>,
    ) -> Arguments {
        let mut arguments = Arguments::new();

        for parameter in parameters {
            let name = parameter.name.as_str();
            let resolved = Self::find_dependency(descriptor, name, available)
                .or_else(|| {
                    overrides
                        .and_then(|overrides| overrides.get_value(name))
                        .map(|value| (Instance::from_config(value), ArgumentSource::Override))
                });

            match resolved {
                Some((value, source)) => {
                    tracing::trace!(
                        service = %descriptor.service_name,
                        parameter = name,
                        ?source,
                        "Injecting argument"
                    );
                    arguments.insert(name, value);
                }
                None if parameter.has_default => {}
                None => {
                    tracing::warn!(
                        service = %descriptor.service_name,
                        parameter = name,
                        "Could not resolve required parameter, constructing without it"
                    );
                }
            }
        }

        arguments
    }

    fn find_dependency(
        descriptor: &ServiceDescriptor,
        parameter: &str,
        available: &InvocationContext,
    ) -> Option<(Instance, ArgumentSource)> {
        if let Some(instance) = available.get(parameter) {
            return Some((instance.clone(), ArgumentSource::Dependency));
        }

        let wanted = parameter.to_lowercase();
        descriptor
            .dependencies
            .iter()
            .filter(|dependency| dependency.to_lowercase() == wanted)
            .find_map(|dependency| available.get(dependency))
            .map(|instance| (instance.clone(), ArgumentSource::DeclaredDependency))
    }
}
