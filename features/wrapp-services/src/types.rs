use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

use wrapp_config::provider::ConfigValue;

/// All errors must be Send + Sync so they can cross await points
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Built services are shared between every caller of a session
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A built, type erased service instance
///
/// Cloning an instance clones the reference, never the service itself.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

impl Instance {
    pub fn new<ExistingInstance: Injectable>(instance: ExistingInstance) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    pub fn from_arc<ExistingInstance: Injectable>(instance: Arc<ExistingInstance>) -> Self {
        Instance {
            info: TypeInfo::of::<ExistingInstance>(),
            instance,
        }
    }

    pub(crate) fn from_config(value: &ConfigValue) -> Self {
        Instance {
            info: TypeInfo {
                type_name: value.type_name,
                type_id: (*value.value).type_id(),
            },
            instance: value.value.clone(),
        }
    }

    /// Downcasts to the concrete service type
    ///
    /// On failure the name of the actual type is returned
    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// True if both handles point at the same service
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

/// A constructor parameter declared by a factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Name the value is injected under
    pub name: String,
    /// If the factory can do without it
    pub has_default: bool,
}
impl ParameterInfo {
    pub fn required(name: impl Into<String>) -> Self {
        ParameterInfo {
            name: name.into(),
            has_default: false,
        }
    }

    pub fn with_default(name: impl Into<String>) -> Self {
        ParameterInfo {
            name: name.into(),
            has_default: true,
        }
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
