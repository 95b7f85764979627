//! Execution contexts for clipboard work.
//!
//! The clipboard is touched from a dedicated worker that satisfies the
//! platform's threading constraints; the caller blocks until the job is done.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crate::error::{BridgeError, Result};

pub type Job<'a> = Box<dyn FnOnce() + Send + 'a>;

pub trait Executor: Send + Sync {
    /// Run `job` to completion before returning.
    fn execute<'a>(&self, job: Job<'a>) -> Result<()>;
}

/// Spawns one named thread per job and joins it.
///
/// On Windows the thread enters a single-threaded COM apartment for the
/// duration of the job.
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    name: String,
}

impl ThreadExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("clipboard-worker")
    }
}

impl Executor for ThreadExecutor {
    fn execute<'a>(&self, job: Job<'a>) -> Result<()> {
        thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name(self.name.clone())
                .spawn_scoped(scope, move || {
                    let _apartment = apartment::Apartment::enter();
                    job()
                })
                .map_err(BridgeError::WorkerSpawn)?;
            handle.join().map_err(|_| BridgeError::WorkerPanicked)
        })
    }
}

/// Runs jobs on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute<'a>(&self, job: Job<'a>) -> Result<()> {
        panic::catch_unwind(AssertUnwindSafe(job)).map_err(|_| BridgeError::WorkerPanicked)
    }
}

#[cfg(windows)]
mod apartment {
    use windows_sys::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};

    pub(super) struct Apartment {
        entered: bool,
    }

    impl Apartment {
        pub(super) fn enter() -> Self {
            // S_OK and S_FALSE both need a matching CoUninitialize.
            let hr = unsafe { CoInitializeEx(std::ptr::null(), COINIT_APARTMENTTHREADED as _) };
            Self { entered: hr >= 0 }
        }
    }

    impl Drop for Apartment {
        fn drop(&mut self) {
            if self.entered {
                unsafe { CoUninitialize() };
            }
        }
    }
}

#[cfg(not(windows))]
mod apartment {
    pub(super) struct Apartment;

    impl Apartment {
        pub(super) fn enter() -> Self {
            Apartment
        }
    }
}
