#![cfg(target_os = "linux")]

use std::{fs, time::Duration};

use futures::executor::block_on;
use wrapp_services::{
    Arguments, AsyncInitialize, DynError, FnFactory, ServiceDescriptor, ServiceProviderBuilder,
};

struct Warm;
impl AsyncInitialize for Warm {
    async fn initialize(&self) -> Result<(), DynError> {
        Ok(())
    }
}

fn thread_count() -> usize {
    fs::read_dir("/proc/self/task").map_or(0, |tasks| tasks.count())
}

// Kept alone in this file so no other test threads show up in the count
#[test]
fn finished_setups_leave_no_timer_threads() {
    let provider = ServiceProviderBuilder::new()
        .add_descriptor(ServiceDescriptor::new("warm", "warm").requires_init(true))
        .add_factory_with_async_init(
            "warm",
            FnFactory::new(vec![], |_: &Arguments| Ok::<_, DynError>(Warm)),
        )
        .init_timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    // The first request starts the shared timer
    block_on(provider.create_service("warm", "warmup", None)).unwrap();
    let before = thread_count();

    for session in 0..200 {
        block_on(provider.create_service("warm", &format!("session-{session}"), None)).unwrap();
    }

    assert_eq!(thread_count(), before);
    assert_eq!(provider.get_cache_statistics().sessions_count, 201);
}
