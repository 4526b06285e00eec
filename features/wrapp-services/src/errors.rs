use std::{sync::Arc, time::Duration};

use thiserror::Error;
use wrapp_config::errors::ConfigError;

use crate::types::DynError;

/// Errors raised while building a service
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// The requested or a transitively referenced service has no descriptor
    #[error("No descriptor registered for '{service}'{}", required_by_suffix(.required_by))]
    DescriptorNotFound {
        service: String,
        required_by: Option<String>,
    },
    /// A cycle was found while ordering the dependency graph
    #[error("A circular dependency exists on '{service}' through {}", .chain.join(" -> "))]
    CircularDependency { service: String, chain: Vec<String> },
    /// The factory for a service could not be resolved or rejected its arguments
    #[error("Failed to construct '{service}': {error}")]
    Construction {
        service: String,
        error: ConstructError,
    },
    /// The setup step of a service failed
    #[error("Failed to initialize '{service}': {error}")]
    Initialization {
        service: String,
        error: Arc<DynError>,
    },
    /// The setup step did not finish within the configured timeout
    #[error("Initialization of '{service}' timed out after {timeout:?}")]
    InitializationTimeout { service: String, timeout: Duration },
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(parent) => format!(" (required by '{parent}')"),
        None => String::new(),
    }
}

impl ServiceError {
    /// Name of the service the error is about
    pub fn service(&self) -> &str {
        match self {
            ServiceError::DescriptorNotFound { service, .. }
            | ServiceError::CircularDependency { service, .. }
            | ServiceError::Construction { service, .. }
            | ServiceError::Initialization { service, .. }
            | ServiceError::InitializationTimeout { service, .. } => service,
        }
    }
}

/// Errors of the construction step itself
#[derive(Error, Debug, Clone)]
pub enum ConstructError {
    /// No factory is registered under the descriptor's locator
    #[error("no factory registered for locator '{0}'")]
    LocatorNotFound(String),
    /// The factory returned an error
    #[error("factory failed - error: {0}")]
    FactoryFailed(Arc<DynError>),
}

/// Errors when a factory extracts one of its arguments
#[derive(Error, Debug, Clone)]
pub enum InjectError {
    /// Nothing was injected for the parameter
    #[error("No value was injected for parameter '{0}'")]
    ArgumentMissing(String),
    /// Something was injected, but of another type
    #[error("Parameter '{parameter}' required '{required_type}' but got '{actual_type}'")]
    DowncastFailed {
        parameter: String,
        required_type: &'static str,
        actual_type: &'static str,
    },
    /// Reading a configuration override failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors when requiring a typed service
#[derive(Error, Debug, Clone)]
pub enum RequireError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },
}

/// Errors while assembling a provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("A descriptor has been registered twice: '{0}'")]
    DuplicateDescriptor(String),
    #[error("A factory has been registered twice for locator '{0}'")]
    DuplicateLocator(String),
    #[error("Descriptors were added although an external descriptor source is in use")]
    MixedDescriptorSources,
}
