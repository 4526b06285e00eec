use std::{sync::Arc, time::Duration};

use futures::future::{self, Either};
use futures_timer::Delay;

use crate::{errors::ServiceError, factories::Initializer, types::Instance};

/// Runs the optional setup step of freshly constructed services
#[derive(Debug, Clone, Default)]
pub(crate) struct TwoPhaseInitializer {
    timeout: Option<Duration>,
}

impl TwoPhaseInitializer {
    pub(crate) fn new(timeout: Option<Duration>) -> Self {
        TwoPhaseInitializer { timeout }
    }

    /// Runs the setup capability of `instance`, if it was registered with one
    ///
    /// Only called for descriptors which require initialization. A service without
    /// a setup capability is accepted with a warning.
    pub(crate) async fn maybe_initialize(
        &self,
        service: &str,
        instance: &Instance,
        initializer: Option<&Initializer>,
    ) -> Result<(), ServiceError> {
        let result = match initializer {
            None => {
                tracing::warn!(
                    service,
                    "Service requires initialization but has no setup step, skipping"
                );
                return Ok(());
            }
            Some(Initializer::Sync(init)) => init(instance),
            Some(Initializer::Async(init)) => {
                let setup = init(instance.clone());
                match self.timeout {
                    None => setup.await,
                    Some(timeout) => {
                        // The delay is dropped with the select, a finished setup leaves no timer behind
                        match future::select(setup, Delay::new(timeout)).await {
                            Either::Left((result, _)) => result,
                            Either::Right(_) => {
                                return Err(ServiceError::InitializationTimeout {
                                    service: service.to_string(),
                                    timeout,
                                })
                            }
                        }
                    }
                }
            }
        };

        result.map_err(|error| ServiceError::Initialization {
            service: service.to_string(),
            error: Arc::new(error),
        })?;

        tracing::debug!("Initialized '{}'", service);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::executor::block_on;
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        factories::{AsyncInitialize, Initialize},
        types::DynError,
    };

    #[derive(Default)]
    struct Index {
        loads: AtomicUsize,
    }
    impl AsyncInitialize for Index {
        async fn initialize(&self) -> Result<(), DynError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Broken;
    impl Initialize for Broken {
        fn initialize(&self) -> Result<(), DynError> {
            Err("schema mismatch".into())
        }
    }

    struct Stuck;
    impl AsyncInitialize for Stuck {
        async fn initialize(&self) -> Result<(), DynError> {
            future::pending::<()>().await;
            Ok(())
        }
    }

    #[test]
    fn async_setup_is_awaited() {
        let instance = Instance::new(Index::default());
        let initializer = Initializer::of_async::<Index>();

        block_on(TwoPhaseInitializer::default().maybe_initialize(
            "index",
            &instance,
            Some(&initializer),
        ))
        .unwrap();

        let index = instance.downcast::<Index>().unwrap();
        assert_eq!(index.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sync_setup_error_is_wrapped_with_service() {
        let instance = Instance::new(Broken);
        let initializer = Initializer::of_sync::<Broken>();

        let err = block_on(TwoPhaseInitializer::default().maybe_initialize(
            "schema",
            &instance,
            Some(&initializer),
        ))
        .unwrap_err();

        assert!(matches!(err, ServiceError::Initialization { ref service, .. } if service == "schema"));
        assert!(err.to_string().contains("schema mismatch"));
    }

    #[test]
    #[traced_test]
    fn missing_setup_only_warns() {
        let instance = Instance::new(Broken);

        block_on(TwoPhaseInitializer::default().maybe_initialize("plain", &instance, None))
            .unwrap();

        assert!(logs_contain("has no setup step"));
    }

    #[test]
    fn fast_setup_beats_timeout() {
        let instance = Instance::new(Index::default());
        let initializer = Initializer::of_async::<Index>();
        let initiator = TwoPhaseInitializer::new(Some(Duration::from_secs(30)));

        for _ in 0..3 {
            block_on(initiator.maybe_initialize("index", &instance, Some(&initializer))).unwrap();
        }

        let index = instance.downcast::<Index>().unwrap();
        assert_eq!(index.loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn setup_timeout_is_fatal() {
        let instance = Instance::new(Stuck);
        let initializer = Initializer::of_async::<Stuck>();
        let initiator = TwoPhaseInitializer::new(Some(Duration::from_millis(20)));

        let err = block_on(initiator.maybe_initialize("stuck", &instance, Some(&initializer)))
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::InitializationTimeout { ref service, timeout }
                if service == "stuck" && timeout == Duration::from_millis(20)
        ));
    }
}
