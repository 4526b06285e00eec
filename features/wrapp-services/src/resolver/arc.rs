use std::{any::type_name, sync::Arc};

use crate::{
    errors::InjectError,
    injector::Arguments,
    resolver::Resolver,
    types::Injectable,
};

impl<T: Injectable> Resolver for Arc<T> {
    fn resolve(arguments: &Arguments, parameter: &str) -> Result<Self, InjectError> {
        let instance = arguments
            .get(parameter)
            .ok_or_else(|| InjectError::ArgumentMissing(parameter.to_string()))?;

        instance
            .downcast::<T>()
            .map_err(|actual_type| InjectError::DowncastFailed {
                parameter: parameter.to_string(),
                required_type: type_name::<T>(),
                actual_type,
            })
    }
}

impl<Resolvable: Resolver> Resolver for Option<Resolvable> {
    fn resolve(arguments: &Arguments, parameter: &str) -> Result<Self, InjectError>
    where
        Self: Sized,
    {
        match Resolvable::resolve(arguments, parameter) {
            Ok(resolved) => Ok(Some(resolved)),
            // A missing argument is fine for Option, a wrong type is not
            Err(InjectError::ArgumentMissing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
