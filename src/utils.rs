use std::io;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

/// Pin the calling thread to `core`, if that core exists
pub fn pin_current_thread(core: usize) -> bool {
    let Some(core_ids) = core_affinity::get_core_ids() else {
        warn!("Cannot enumerate CPU cores, thread left unpinned");
        return false;
    };

    match core_ids.into_iter().find(|id| id.id == core) {
        Some(id) if core_affinity::set_for_current(id) => {
            info!("Pinned {} to core {}", thread_name(), core);
            true
        }
        Some(_) => {
            warn!("Failed to pin {} to core {}", thread_name(), core);
            false
        }
        None => {
            warn!("Core {} not available, {} left unpinned", core, thread_name());
            false
        }
    }
}

/// Spawn a named thread, optionally pinned to a CPU core
pub fn spawn_pinned<T, F>(name: &str, core: Option<usize>, f: F) -> io::Result<JoinHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new().name(name.into()).spawn(move || {
        if let Some(core) = core {
            pin_current_thread(core);
        }
        f()
    })
}

fn thread_name() -> String {
    thread::current().name().unwrap_or("<unnamed>").to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_thread_carries_name() {
        let handle = spawn_pinned("relay-test", None, || {
            thread::current().name().map(str::to_owned)
        })
        .unwrap();
        assert_eq!(handle.join().unwrap().as_deref(), Some("relay-test"));
    }

    #[test]
    fn pinning_to_missing_core_fails_softly() {
        let handle = spawn_pinned("relay-pin", Some(usize::MAX), || ()).unwrap();
        handle.join().unwrap();
        assert!(!pin_current_thread(usize::MAX));
    }
}
