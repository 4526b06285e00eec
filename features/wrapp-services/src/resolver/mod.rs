use crate::{errors::InjectError, injector::Arguments};

pub mod arc;
pub mod config;

/// Extracts a typed value from the arguments handed to a factory
pub trait Resolver {
    fn resolve(arguments: &Arguments, parameter: &str) -> Result<Self, InjectError>
    where
        Self: Sized;
}
