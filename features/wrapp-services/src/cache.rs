use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use futures_channel::oneshot;

use crate::types::Instance;

/// Counters over the session cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    /// Number of cached instances over all sessions
    pub total_cached: usize,
    /// Number of sessions holding at least one instance
    pub sessions_count: usize,
    /// Cached instances per session
    pub services_per_session: BTreeMap<String, usize>,
}

type WaiterSender = oneshot::Sender<Option<Instance>>;
pub(crate) type WaiterReceiver = oneshot::Receiver<Option<Instance>>;

enum Slot {
    /// Built and initialized, shared by every reader of the session
    Ready(Instance),
    /// Claimed by one request, others wait for its outcome
    Building(Vec<WaiterSender>),
}

/// Result of claiming a (session, service) slot
pub(crate) enum Claim<'a> {
    Ready(Instance),
    /// Another request is building, `None` is sent if it gave up
    Wait(WaiterReceiver),
    /// The caller must build and publish through the guard
    Build(BuildGuard<'a>),
}

/// Built instances per session and service
///
/// Each slot is built at most once at a time: the first claimant builds, concurrent
/// claimants wait for it. The lock is never held across an await.
#[derive(Default)]
pub(crate) struct SessionCache {
    sessions: Mutex<HashMap<String, BTreeMap<String, Slot>>>,
}

impl SessionCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BTreeMap<String, Slot>>> {
        // Slots are only swapped whole, so a poisoned map is still consistent
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the instance if it is cached, never starts a build
    pub(crate) fn get(&self, session_id: &str, service_name: &str) -> Option<Instance> {
        match self.lock().get(session_id)?.get(service_name)? {
            Slot::Ready(instance) => Some(instance.clone()),
            Slot::Building(_) => None,
        }
    }

    pub(crate) fn claim<'a>(&'a self, session_id: &str, service_name: &str) -> Claim<'a> {
        let mut sessions = self.lock();
        let services = sessions.entry(session_id.to_string()).or_default();

        match services.get_mut(service_name) {
            Some(Slot::Ready(instance)) => Claim::Ready(instance.clone()),
            Some(Slot::Building(waiters)) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Claim::Wait(rx)
            }
            None => {
                services.insert(service_name.to_string(), Slot::Building(Vec::new()));
                Claim::Build(BuildGuard {
                    cache: self,
                    session_id: session_id.to_string(),
                    service_name: service_name.to_string(),
                    published: false,
                })
            }
        }
    }

    fn finish(&self, session_id: &str, service_name: &str, instance: Option<Instance>) {
        let waiters = {
            let mut sessions = self.lock();
            let services = sessions.entry(session_id.to_string()).or_default();

            let previous = match &instance {
                Some(instance) => {
                    services.insert(service_name.to_string(), Slot::Ready(instance.clone()))
                }
                None => services.remove(service_name),
            };
            if services.is_empty() {
                sessions.remove(session_id);
            }

            match previous {
                Some(Slot::Building(waiters)) => waiters,
                _ => Vec::new(),
            }
        };

        for waiter in waiters {
            let _ = waiter.send(instance.clone());
        }
    }

    /// Removes every cached instance of a session, returns how many were removed
    ///
    /// Builds still in flight are left alone and publish when they finish.
    pub(crate) fn clear_session(&self, session_id: &str) -> usize {
        let mut sessions = self.lock();
        let Some(services) = sessions.get_mut(session_id) else {
            return 0;
        };

        let removed = Self::remove_ready(services);
        if services.is_empty() {
            sessions.remove(session_id);
        }
        removed
    }

    /// Removes every cached instance, returns how many were removed
    pub(crate) fn clear_all(&self) -> usize {
        let mut sessions = self.lock();
        let removed: usize = sessions.values_mut().map(Self::remove_ready).sum();
        sessions.retain(|_, services| !services.is_empty());
        removed
    }

    fn remove_ready(services: &mut BTreeMap<String, Slot>) -> usize {
        let before = services.len();
        services.retain(|_, slot| matches!(slot, Slot::Building(_)));
        before - services.len()
    }

    /// Names of the cached services of a session, sorted
    pub(crate) fn cached_services(&self, session_id: &str) -> Vec<String> {
        self.lock()
            .get(session_id)
            .map(|services| {
                services
                    .iter()
                    .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn statistics(&self) -> CacheStatistics {
        let sessions = self.lock();
        let services_per_session: BTreeMap<String, usize> = sessions
            .iter()
            .map(|(session, services)| {
                let ready = services
                    .values()
                    .filter(|slot| matches!(slot, Slot::Ready(_)))
                    .count();
                (session.clone(), ready)
            })
            .filter(|(_, ready)| *ready > 0)
            .collect();

        CacheStatistics {
            total_cached: services_per_session.values().sum(),
            sessions_count: services_per_session.len(),
            services_per_session,
        }
    }
}

/// Exclusive right to build one (session, service) slot
///
/// Dropping the guard without publishing releases the slot and wakes all waiters.
pub(crate) struct BuildGuard<'a> {
    cache: &'a SessionCache,
    session_id: String,
    service_name: String,
    published: bool,
}

impl BuildGuard<'_> {
    /// Stores the instance and hands it to every waiter
    pub(crate) fn publish(mut self, instance: Instance) {
        self.published = true;
        self.cache
            .finish(&self.session_id, &self.service_name, Some(instance));
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.cache.finish(&self.session_id, &self.service_name, None);
        }
    }
}
