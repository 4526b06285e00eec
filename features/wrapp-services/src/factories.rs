use std::{collections::HashMap, fmt::Debug, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    errors::{ConstructError, RegisterError},
    injector::Arguments,
    types::{DynError, Injectable, Instance, ParameterInfo, TypeInfo},
};

/// A Factory providing instances of a given type
pub trait ServiceFactory: Send + Sync + 'static {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Returns the constructor parameters, in the order they are resolved
    fn parameters(&self) -> Vec<ParameterInfo>;

    /// Constructs a new instance of the factory's provided type
    ///
    /// Only cheap work belongs here, anything slow goes into [`Initialize`] or [`AsyncInitialize`].
    fn construct(&self, args: &Arguments) -> Result<Self::Provides, impl Into<DynError>>;
}

/// Synchronous setup step, run once after construction
pub trait Initialize: Injectable {
    fn initialize(&self) -> Result<(), DynError>;
}

/// Asynchronous setup step, awaited once after construction
pub trait AsyncInitialize: Injectable {
    fn initialize(&self) -> impl Future<Output = Result<(), DynError>> + Send;
}

/// Wrapper Trait for factories, providing instances of Any
pub trait DynFactory: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    fn parameters(&self) -> Vec<ParameterInfo>;

    fn construct(&self, args: &Arguments) -> Result<Instance, DynError>;
}
// Impl DynFactory for any ServiceFactory
impl<T: Injectable, SpecificFactory: ServiceFactory<Provides = T>> DynFactory for SpecificFactory {
    fn supplies(&self) -> TypeInfo {
        <SpecificFactory as ServiceFactory>::supplies()
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        ServiceFactory::parameters(self)
    }

    fn construct(&self, args: &Arguments) -> Result<Instance, DynError> {
        // Forward the call to the specific implementation
        ServiceFactory::construct(self, args)
            .map(Instance::new)
            .map_err(Into::into)
    }
}

/// A factory backed by a closure
///
/// ```rust
/// use std::sync::Arc;
/// use wrapp_services::{Arguments, DynError, FnFactory, ParameterInfo};
///
/// struct Repository {
///     pool: Arc<String>,
/// }
///
/// let factory = FnFactory::new(vec![ParameterInfo::required("pool")], |args: &Arguments| {
///     Ok::<_, DynError>(Repository {
///         pool: args.resolve("pool")?,
///     })
/// });
/// # let _ = factory;
/// ```
pub struct FnFactory<F> {
    parameters: Vec<ParameterInfo>,
    construct: F,
}
impl<F> FnFactory<F> {
    pub fn new(parameters: Vec<ParameterInfo>, construct: F) -> Self {
        FnFactory {
            parameters,
            construct,
        }
    }
}
impl<T, E, F> ServiceFactory for FnFactory<F>
where
    T: Injectable,
    E: Into<DynError>,
    F: Fn(&Arguments) -> Result<T, E> + Send + Sync + 'static,
{
    type Provides = T;

    fn parameters(&self) -> Vec<ParameterInfo> {
        self.parameters.clone()
    }

    fn construct(&self, args: &Arguments) -> Result<T, impl Into<DynError>> {
        (self.construct)(args)
    }
}

pub type SyncInitFn = Arc<dyn Fn(&Instance) -> Result<(), DynError> + Send + Sync>;
pub type AsyncInitFn =
    Arc<dyn Fn(Instance) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>;

/// The setup capability a factory was registered with
#[derive(Clone)]
pub enum Initializer {
    Sync(SyncInitFn),
    Async(AsyncInitFn),
}
impl Debug for Initializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Initializer::Sync(_) => f.write_str("Initializer::Sync"),
            Initializer::Async(_) => f.write_str("Initializer::Async"),
        }
    }
}
impl Initializer {
    pub(crate) fn of_sync<T: Initialize>() -> Self {
        let init: SyncInitFn = Arc::new(|instance: &Instance| {
            let typed = downcast_for_init::<T>(instance)?;
            Initialize::initialize(&*typed)
        });
        Initializer::Sync(init)
    }

    pub(crate) fn of_async<T: AsyncInitialize>() -> Self {
        let init: AsyncInitFn = Arc::new(|instance: Instance| {
            async move {
                let typed = downcast_for_init::<T>(&instance)?;
                AsyncInitialize::initialize(&*typed).await
            }
            .boxed()
        });
        Initializer::Async(init)
    }
}

fn downcast_for_init<T: Injectable>(instance: &Instance) -> Result<Arc<T>, DynError> {
    instance.downcast::<T>().map_err(|actual_type| {
        format!(
            "setup expected '{}' but the instance is '{actual_type}'",
            std::any::type_name::<T>()
        )
        .into()
    })
}

/// A registered factory together with its optional setup capability
#[derive(Clone)]
pub struct FactoryEntry {
    pub(crate) factory: Arc<dyn DynFactory>,
    pub(crate) initializer: Option<Initializer>,
}
impl Debug for FactoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryEntry")
            .field("supplies", &self.factory.supplies().type_name)
            .field("initializer", &self.initializer)
            .finish()
    }
}
impl FactoryEntry {
    pub fn plain<F: ServiceFactory>(factory: F) -> Self {
        FactoryEntry {
            factory: Arc::new(factory),
            initializer: None,
        }
    }

    pub fn with_init<F>(factory: F) -> Self
    where
        F: ServiceFactory,
        F::Provides: Initialize,
    {
        FactoryEntry {
            factory: Arc::new(factory),
            initializer: Some(Initializer::of_sync::<F::Provides>()),
        }
    }

    pub fn with_async_init<F>(factory: F) -> Self
    where
        F: ServiceFactory,
        F::Provides: AsyncInitialize,
    {
        FactoryEntry {
            factory: Arc::new(factory),
            initializer: Some(Initializer::of_async::<F::Provides>()),
        }
    }

    pub fn supplies(&self) -> TypeInfo {
        self.factory.supplies()
    }

    pub fn parameters(&self) -> Vec<ParameterInfo> {
        self.factory.parameters()
    }

    pub fn initializer(&self) -> Option<&Initializer> {
        self.initializer.as_ref()
    }
}

/// Factories keyed by the locator a descriptor refers to
#[derive(Debug, Default, Clone)]
pub struct FactoryRegistry {
    entries: HashMap<String, FactoryEntry>,
}
impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        locator: impl Into<String>,
        entry: FactoryEntry,
    ) -> Result<&mut Self, RegisterError> {
        let locator = locator.into();
        if self.entries.contains_key(&locator) {
            return Err(RegisterError::DuplicateLocator(locator));
        }

        self.entries.insert(locator, entry);
        Ok(self)
    }

    /// Resolves the factory registered for a locator
    pub fn resolve(&self, locator: &str) -> Result<&FactoryEntry, ConstructError> {
        self.entries
            .get(locator)
            .ok_or_else(|| ConstructError::LocatorNotFound(locator.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mailer {
        host: String,
    }

    struct Queue;
    impl Initialize for Queue {
        fn initialize(&self) -> Result<(), DynError> {
            Err("broker unreachable".into())
        }
    }

    fn mailer_factory() -> impl ServiceFactory<Provides = Mailer> {
        FnFactory::new(vec![], |_: &Arguments| {
            Ok::<_, DynError>(Mailer {
                host: "smtp.local".into(),
            })
        })
    }

    #[test]
    fn dyn_factory_constructs_erased_instance() {
        let entry = FactoryEntry::plain(mailer_factory());
        let instance = entry.factory.construct(&Arguments::default()).unwrap();

        assert_eq!(instance.info, TypeInfo::of::<Mailer>());
        assert_eq!(instance.downcast::<Mailer>().unwrap().host, "smtp.local");
        assert!(entry.initializer().is_none());
    }

    #[test]
    fn factory_error_is_forwarded() {
        let factory = FnFactory::new(vec![ParameterInfo::required("dsn")], |_: &Arguments| {
            Err::<Mailer, _>("dsn rejected")
        });
        let err = DynFactory::construct(&factory, &Arguments::default()).unwrap_err();

        assert_eq!(err.to_string(), "dsn rejected");
        assert_eq!(DynFactory::parameters(&factory)[0].name, "dsn");
    }

    #[test]
    fn sync_initializer_runs_against_instance() {
        let entry = FactoryEntry::with_init(FnFactory::new(vec![], |_: &Arguments| {
            Ok::<_, DynError>(Queue)
        }));
        let instance = Instance::new(Queue);

        let Some(Initializer::Sync(init)) = entry.initializer() else {
            panic!("expected a sync initializer");
        };
        assert_eq!(init(&instance).unwrap_err().to_string(), "broker unreachable");
    }

    #[test]
    fn registry_resolves_by_locator() {
        let mut registry = FactoryRegistry::new();
        registry
            .insert("smtp", FactoryEntry::plain(mailer_factory()))
            .unwrap();

        assert!(registry.resolve("smtp").is_ok());
        assert!(matches!(
            registry.resolve("sendgrid"),
            Err(ConstructError::LocatorNotFound(locator)) if locator == "sendgrid"
        ));
    }

    #[test]
    fn duplicate_locator_is_rejected() {
        let mut registry = FactoryRegistry::new();
        registry
            .insert("smtp", FactoryEntry::plain(mailer_factory()))
            .unwrap();

        let err = registry
            .insert("smtp", FactoryEntry::plain(mailer_factory()))
            .unwrap_err();
        assert_eq!(err, RegisterError::DuplicateLocator("smtp".into()));
    }
}
