use std::{any::type_name, sync::Arc};

use wrapp_config::config::Config;

use crate::{
    errors::InjectError,
    injector::Arguments,
    resolver::Resolver,
    types::Injectable,
};

/// Resolves a configuration override injected under the parameter name
impl<T: Injectable> Resolver for Config<T> {
    fn resolve(arguments: &Arguments, parameter: &str) -> Result<Self, InjectError> {
        let inner = Arc::<T>::resolve(arguments, parameter).map_err(|e| match e {
            InjectError::DowncastFailed { actual_type, .. } => InjectError::DowncastFailed {
                parameter: parameter.to_string(),
                required_type: type_name::<Config<T>>(),
                actual_type,
            },
            other => other,
        })?;

        Ok(Config::new(inner))
    }
}
