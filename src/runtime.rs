//! NDI runtime management and initialization.

use once_cell::sync::Lazy;

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};

use tracing::{error, info};

use crate::{ndi_lib::FunctionTable, Error, Result};

/// State of the NDI runtime lifecycle.
enum State {
    /// Runtime has not been initialized yet; no library is loaded.
    Uninitialized,
    /// Runtime is currently being initialized by another thread.
    Initializing,
    /// Runtime is initialized and active with the given reference count.
    /// Holds the resolved function table; dropping it unloads the library.
    Initialized {
        refcount: usize,
        funcs: Arc<FunctionTable>,
    },
    /// Runtime is currently being destroyed.
    Destroying,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Uninitialized => write!(f, "Uninitialized"),
            State::Initializing => write!(f, "Initializing"),
            State::Initialized { refcount, .. } => {
                write!(f, "Initialized {{ refcount: {refcount} }}")
            }
            State::Destroying => write!(f, "Destroying"),
        }
    }
}

/// Process-global runtime manager for NDI.
struct RuntimeManager {
    state: Mutex<State>,
    cv: Condvar,
}

impl RuntimeManager {
    const fn new() -> Self {
        Self {
            state: Mutex::new(State::Uninitialized),
            cv: Condvar::new(),
        }
    }

    fn acquire(&self) -> Result<Arc<FunctionTable>> {
        let mut state = self.state.lock().unwrap();

        loop {
            match &mut *state {
                State::Uninitialized => {
                    // We'll be the initializer
                    *state = State::Initializing;
                    drop(state); // Release lock before binding and calling FFI

                    let opened = Self::open_runtime();

                    // Reacquire lock to update state
                    state = self.state.lock().unwrap();

                    return match opened {
                        Ok(funcs) => {
                            *state = State::Initialized {
                                refcount: 1,
                                funcs: funcs.clone(),
                            };
                            self.cv.notify_all();
                            Ok(funcs)
                        }
                        Err(err) => {
                            *state = State::Uninitialized;
                            self.cv.notify_all();
                            Err(err)
                        }
                    };
                }
                State::Initializing | State::Destroying => {
                    // Wait for the state to change
                    state = self.cv.wait(state).unwrap();
                }
                State::Initialized { refcount, funcs } => {
                    *refcount += 1;
                    return Ok(funcs.clone());
                }
            }
        }
    }

    /// Attach to an already-open session without initializing one.
    fn attach(&self) -> Result<Arc<FunctionTable>> {
        let mut state = self.state.lock().unwrap();

        loop {
            match &mut *state {
                State::Initialized { refcount, funcs } => {
                    *refcount += 1;
                    return Ok(funcs.clone());
                }
                State::Initializing | State::Destroying => {
                    state = self.cv.wait(state).unwrap();
                }
                State::Uninitialized => return Err(Error::SessionNotReady),
            }
        }
    }

    /// Bind the library and initialize the runtime. On an initialize
    /// failure the table is dropped, unloading the library, so no loaded
    /// handle is left behind without a usable session.
    fn open_runtime() -> Result<Arc<FunctionTable>> {
        let funcs = FunctionTable::bind()?;

        // SAFETY: the table is complete; bind() never returns a partial one.
        let init_succeeded = unsafe { (funcs.initialize)() };
        if !init_succeeded {
            error!("NDIlib_initialize reported failure");
            drop(funcs);
            return Err(Error::InitializationFailed);
        }

        info!("NDI runtime initialized");
        Ok(Arc::new(funcs))
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap();

        match std::mem::replace(&mut *state, State::Destroying) {
            State::Initialized { refcount: 1, funcs } => {
                // We're the last reference, destroy the runtime
                drop(state); // Release lock before calling FFI

                // SAFETY: the runtime is initialized and no finder/receiver
                // can outlive its session handle.
                unsafe { (funcs.destroy)() };

                // The library unloads when the final Arc drops, which is
                // after destroy has returned.
                drop(funcs);

                // Reacquire lock to update state
                state = self.state.lock().unwrap();
                *state = State::Uninitialized;
                self.cv.notify_all();
                info!("NDI runtime destroyed");
            }
            State::Initialized { refcount, funcs } => {
                *state = State::Initialized {
                    refcount: refcount - 1,
                    funcs,
                };
            }
            other => {
                // This should never happen in correct usage
                *state = other;
                #[cfg(debug_assertions)]
                panic!("release() called in invalid state: {:?}", *state);
            }
        }
    }

    fn is_running(&self) -> bool {
        let state = self.state.lock().unwrap();
        matches!(*state, State::Initialized { .. })
    }
}

static RUNTIME: Lazy<RuntimeManager> = Lazy::new(RuntimeManager::new);

/// Manages the NDI runtime lifecycle.
///
/// The `NDI` struct is the entry point for all NDI operations. The first
/// handle loads the runtime library, resolves its entry points, and
/// initializes the protocol; the last handle to drop destroys the protocol
/// and unloads the library. Multiple handles share the runtime through
/// reference counting.
///
/// # Examples
///
/// ```no_run
/// use ndi_bridge::NDI;
///
/// # fn main() -> Result<(), ndi_bridge::Error> {
/// // Load and initialize the runtime
/// let ndi = NDI::new()?;
///
/// // The runtime stays alive as long as any handle exists
/// let ndi2 = ndi.clone(); // Cheap reference-counted clone
///
/// // Runtime is automatically torn down when all handles are dropped
/// # Ok(())
/// # }
/// ```
pub struct NDI {
    funcs: Arc<FunctionTable>,
}

impl NDI {
    /// Opens the NDI session, loading the runtime if necessary.
    ///
    /// Thread-safe: the first call binds the library and invokes
    /// `NDIlib_initialize`; concurrent callers block until that attempt
    /// settles rather than double-initializing. A failed attempt leaves
    /// nothing loaded, and the caller decides whether to retry.
    ///
    /// # Errors
    ///
    /// - [`Error::LibraryNotFound`] if no runtime library could be loaded
    /// - [`Error::MissingSymbol`] if a mandatory entry point is absent
    /// - [`Error::InitializationFailed`] if the runtime refuses to start
    pub fn new() -> Result<Self> {
        let funcs = RUNTIME.acquire()?;
        Ok(Self { funcs })
    }

    /// Attaches to the session some other part of the process already
    /// opened.
    ///
    /// Unlike [`NDI::new`] this never loads the library; it fails with
    /// [`Error::SessionNotReady`] when no session is open. Use it from
    /// components that must not be the ones paying the initialization cost.
    pub fn current() -> Result<Self> {
        let funcs = RUNTIME.attach()?;
        Ok(Self { funcs })
    }

    /// Checks if the NDI runtime is currently initialized.
    pub fn is_running() -> bool {
        RUNTIME.is_running()
    }

    pub(crate) fn funcs(&self) -> &FunctionTable {
        &self.funcs
    }
}

impl fmt::Debug for NDI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NDI").finish_non_exhaustive()
    }
}

impl Clone for NDI {
    fn clone(&self) -> Self {
        let funcs = RUNTIME
            .attach()
            .expect("Runtime should be initialized when cloning existing NDI handle");
        Self { funcs }
    }
}

impl Drop for NDI {
    fn drop(&mut self) {
        RUNTIME.release();
    }
}
