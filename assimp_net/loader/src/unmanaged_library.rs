//! A native library plus the functions bound from it.
//!
//! `UnmanagedLibrary` owns the load/free lifecycle: it asks the resolver for
//! candidates, walks them through the platform backend, resolves every registered
//! function once per load and tells observers when the library comes and goes.

use crate::backend::{LibraryHandle, LoaderBackend, NativeBackend};
use crate::platform;
use api::{Bitness, CallingConvention, FunctionDescriptor, LibraryEvent, LoaderError, Platform};
use common::{LibraryPath, LibraryResolver, LoaderConfig};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Observer = Box<dyn Fn(LibraryEvent) + Send + Sync>;
type RedundantLoadHook = Box<dyn Fn(&str) + Send + Sync>;

/// Returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy)]
struct FunctionBinding {
    address: NonNull<c_void>,
    convention: CallingConvention,
}

// SAFETY: the address is only dereferenced by callers through `get_function`'s contract.
unsafe impl Send for FunctionBinding {}
unsafe impl Sync for FunctionBinding {}

enum Subscriber {
    Callback(Observer),
    // Dropped once its receiver is gone.
    Channel(Sender<LibraryEvent>),
}

impl Subscriber {
    /// Delivers `event`; false when the subscriber can no longer receive.
    fn deliver(&self, event: LibraryEvent) -> bool {
        match self {
            Self::Callback(observer) => {
                observer(event);
                true
            }
            Self::Channel(tx) => tx.send(event).is_ok(),
        }
    }
}

struct PointerSized<F>(PhantomData<F>);

impl<F> PointerSized<F> {
    const CHECK: () = assert!(
        std::mem::size_of::<F>() == std::mem::size_of::<*mut c_void>(),
        "get_function target must be a function pointer type"
    );
}

struct LoaderState {
    backend: Box<dyn LoaderBackend>,
    handle: Option<LibraryHandle>,
}

pub struct UnmanagedLibrary {
    default_path: LibraryPath,
    functions: Vec<FunctionDescriptor>,
    platform: Platform,
    bitness: Bitness,
    throw_on_load_failure: AtomicBool,
    needs_load_check: AtomicBool,
    resolver: RwLock<LibraryResolver>,
    // Serializes load and free. Everything observers may read lives outside it.
    state: Mutex<LoaderState>,
    loaded_path: RwLock<Option<String>>,
    bindings: RwLock<HashMap<String, FunctionBinding>>,
    observers: Mutex<Vec<(ObserverId, Subscriber)>>,
    next_observer_id: AtomicU64,
    redundant_load_hook: Mutex<Option<RedundantLoadHook>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl UnmanagedLibrary {
    /// Uses the native backend for the detected platform. Fails if the host OS
    /// cannot be classified.
    pub fn new(
        default_path: impl Into<LibraryPath>,
        functions: impl IntoIterator<Item = FunctionDescriptor>,
    ) -> Result<Self, LoaderError> {
        let platform = platform::detect()?;
        let backend = NativeBackend::for_platform(platform)?;
        Ok(Self::with_backend(
            default_path,
            functions,
            Box::new(backend),
            Bitness::current(),
        ))
    }

    /// Builds on an explicit backend, e.g. a simulated one, for a given process bitness.
    pub fn with_backend(
        default_path: impl Into<LibraryPath>,
        functions: impl IntoIterator<Item = FunctionDescriptor>,
        backend: Box<dyn LoaderBackend>,
        bitness: Bitness,
    ) -> Self {
        let platform = backend.platform();
        Self {
            default_path: default_path.into(),
            functions: functions.into_iter().collect(),
            platform,
            bitness,
            throw_on_load_failure: AtomicBool::new(true),
            needs_load_check: AtomicBool::new(true),
            resolver: RwLock::new(LibraryResolver::new(platform, bitness)),
            state: Mutex::new(LoaderState {
                backend,
                handle: None,
            }),
            loaded_path: RwLock::new(None),
            bindings: RwLock::new(HashMap::new()),
            observers: Mutex::new(Vec::new()),
            next_observer_id: AtomicU64::new(0),
            redundant_load_hook: Mutex::new(None),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn bitness(&self) -> Bitness {
        self.bitness
    }

    pub fn default_path(&self) -> &LibraryPath {
        &self.default_path
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn is_loaded(&self) -> bool {
        read(&self.loaded_path).is_some()
    }

    /// Path of the candidate that loaded, or empty while unloaded.
    pub fn library_path(&self) -> String {
        read(&self.loaded_path).clone().unwrap_or_default()
    }

    pub fn throw_on_load_failure(&self) -> bool {
        self.throw_on_load_failure.load(Ordering::Relaxed)
    }

    pub fn set_throw_on_load_failure(&self, throw: bool) {
        self.throw_on_load_failure.store(throw, Ordering::Relaxed);
    }

    pub fn register_alternate(&self, library: &str, name: impl Into<String>) {
        write(&self.resolver).register_alternate(library, name);
    }

    pub fn register_alternate_for(
        &self,
        library: &str,
        name: impl Into<String>,
        platform: Option<Platform>,
        bitness: Option<Bitness>,
    ) {
        write(&self.resolver).register_alternate_for(library, name, platform, bitness);
    }

    pub fn add_probe_directory(&self, dir: impl Into<PathBuf>) {
        write(&self.resolver).add_probe_directory(dir);
    }

    /// Applies the toggle, alternates and probe directories from `config`.
    pub fn apply_config(&self, config: &LoaderConfig) {
        self.set_throw_on_load_failure(config.throw_on_load_failure);
        config.apply_to(&mut write(&self.resolver));
    }

    /// Candidates `load(path)` would try, in order.
    pub fn candidates(&self, path: &LibraryPath) -> Vec<String> {
        read(&self.resolver).resolve_path(path)
    }

    /// Observers run with the observer list locked; they may read bindings but must not
    /// load, free or change subscriptions.
    pub fn subscribe(&self, observer: impl Fn(LibraryEvent) + Send + Sync + 'static) -> ObserverId {
        self.add_subscriber(Subscriber::Callback(Box::new(observer)))
    }

    fn add_subscriber(&self, subscriber: Subscriber) -> ObserverId {
        let id = ObserverId(self.next_observer_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, subscriber));
        id
    }

    /// Callbacks and live channels currently registered.
    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Lifecycle events delivered over a channel instead of a callback.
    ///
    /// The subscription ends at the first event after the receiver is dropped.
    pub fn subscribe_channel(&self) -> Receiver<LibraryEvent> {
        let (tx, rx) = channel();
        self.add_subscriber(Subscriber::Channel(tx));
        rx
    }

    /// Called with the current path whenever `load` runs while already loaded.
    pub fn on_redundant_load(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *lock(&self.redundant_load_hook) = Some(Box::new(hook));
    }

    pub fn load_default(&self) -> Result<bool, LoaderError> {
        let default_path = self.default_path.clone();
        self.load(default_path)
    }

    /// Loads the first candidate for `path` (a single path or a 32/64-bit pair) that the
    /// OS accepts and binds every registered function.
    ///
    /// `Ok(false)` means nothing loaded and `throw_on_load_failure` is off.
    pub fn load(&self, path: impl Into<LibraryPath>) -> Result<bool, LoaderError> {
        let path = path.into();
        let mut state = lock(&self.state);
        self.load_locked(&mut state, &path)
    }

    fn load_locked(&self, state: &mut LoaderState, path: &LibraryPath) -> Result<bool, LoaderError> {
        if state.handle.is_some() {
            let current = self.library_path();
            debug!("Library already loaded from {}; ignoring load request", current);
            if let Some(hook) = lock(&self.redundant_load_hook).as_ref() {
                hook(&current);
            }
            return Ok(true);
        }

        let requested = path.select(self.bitness).to_string();
        let candidates = self.candidates(path);
        let mut attempted = Vec::with_capacity(candidates.len());
        let mut winner = None;

        for candidate in candidates {
            attempted.push(candidate.clone());
            match unsafe { state.backend.open(&candidate) } {
                Some(handle) => {
                    winner = Some((candidate, handle));
                    break;
                }
                None => debug!(
                    "Candidate {} not loadable: {}",
                    candidate,
                    state.backend.last_error()
                ),
            }
        }

        let Some((loaded_from, handle)) = winner else {
            return self.fail(LoaderError::LoadExhausted {
                library: requested,
                attempted,
                last_error: state.backend.last_error(),
            });
        };

        let mut bindings = HashMap::with_capacity(self.functions.len());
        for function in &self.functions {
            match unsafe { state.backend.get_symbol(&handle, &function.name) } {
                Some(address) => {
                    bindings.insert(
                        function.name.clone(),
                        FunctionBinding {
                            address,
                            convention: function.convention,
                        },
                    );
                }
                None if function.required => {
                    let last_error = state.backend.last_error();
                    if !unsafe { state.backend.close(handle) } {
                        warn!("Failed to unload {}: {}", loaded_from, state.backend.last_error());
                    }
                    return self.fail(LoaderError::SymbolMissing {
                        path: loaded_from,
                        symbol: function.name.clone(),
                        last_error,
                    });
                }
                None => debug!(
                    "Optional function {} not exported by {}",
                    function.name, loaded_from
                ),
            }
        }

        info!(
            "Loaded {} ({} of {} functions bound)",
            loaded_from,
            bindings.len(),
            self.functions.len()
        );

        state.handle = Some(handle);
        *write(&self.bindings) = bindings;
        *write(&self.loaded_path) = Some(loaded_from);
        self.notify(LibraryEvent::Loaded);
        Ok(true)
    }

    fn fail(&self, err: LoaderError) -> Result<bool, LoaderError> {
        if self.throw_on_load_failure() {
            error!("{}", err);
            Err(err)
        } else {
            warn!("{}", err);
            Ok(false)
        }
    }

    /// Unloads the library. `false` if nothing was loaded.
    ///
    /// Observers see `Freed` while bindings are still present; afterwards every pointer
    /// previously returned by `get_function` is dangling.
    pub fn free(&self) -> bool {
        let mut state = lock(&self.state);
        let Some(handle) = state.handle.take() else {
            return false;
        };

        self.notify(LibraryEvent::Freed);

        write(&self.bindings).clear();
        let path = write(&self.loaded_path).take().unwrap_or_default();
        if !unsafe { state.backend.close(handle) } {
            warn!("Failed to unload {}: {}", path, state.backend.last_error());
        }
        self.needs_load_check.store(true, Ordering::Release);

        info!("Freed {}", path);
        true
    }

    /// Loads the default library the first time a native call needs it.
    ///
    /// Once a check has completed, later calls only read an atomic flag. A failure
    /// reported as an error leaves the flag set so the next call tries again.
    pub fn ensure_loaded_for_use(&self) -> Result<bool, LoaderError> {
        if !self.needs_load_check.load(Ordering::Acquire) {
            return Ok(self.is_loaded());
        }

        let mut state = lock(&self.state);
        if !self.needs_load_check.load(Ordering::Acquire) {
            return Ok(state.handle.is_some());
        }

        let loaded = if state.handle.is_some() {
            true
        } else {
            let default_path = self.default_path.clone();
            self.load_locked(&mut state, &default_path)?
        };
        self.needs_load_check.store(false, Ordering::Release);
        Ok(loaded)
    }

    pub fn has_function(&self, name: &str) -> bool {
        read(&self.bindings).contains_key(name)
    }

    /// Calling convention recorded for a bound function.
    pub fn function_convention(&self, name: &str) -> Option<CallingConvention> {
        read(&self.bindings).get(name).map(|b| b.convention)
    }

    /// The function bound at load time under `name`, as the pointer type `F`.
    ///
    /// Never resolves lazily: `None` before a load, after a failed load, or when the
    /// library does not export `name`.
    ///
    /// # Safety
    /// `F` must be an `unsafe extern` fn pointer type matching the export's signature and
    /// calling convention. The pointer is valid until the next `free`; the caller must
    /// not call it while another thread frees the library.
    ///
    /// A target that is not pointer sized is rejected at compile time:
    ///
    /// ```compile_fail
    /// use loader::UnmanagedLibrary;
    ///
    /// fn read_byte(library: &UnmanagedLibrary) -> Option<u8> {
    ///     unsafe { library.get_function::<u8>("aiGetVersionMajor") }
    /// }
    ///
    /// let read: fn(&UnmanagedLibrary) -> Option<u8> = read_byte;
    /// let _ = read;
    /// ```
    pub unsafe fn get_function<F: Copy>(&self, name: &str) -> Option<F> {
        let () = PointerSized::<F>::CHECK;
        let binding = read(&self.bindings).get(name).copied()?;
        Some(std::mem::transmute_copy::<*mut c_void, F>(
            &binding.address.as_ptr(),
        ))
    }

    fn notify(&self, event: LibraryEvent) {
        lock(&self.observers).retain(|(id, subscriber)| {
            let live = subscriber.deliver(event);
            if !live {
                debug!("Dropping observer {:?}: receiver is gone", id);
            }
            live
        });
    }
}

impl Drop for UnmanagedLibrary {
    fn drop(&mut self) {
        self.free();
    }
}

impl std::fmt::Debug for UnmanagedLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnmanagedLibrary")
            .field("default_path", &self.default_path)
            .field("platform", &self.platform)
            .field("bitness", &self.bitness)
            .field("library_path", &self.library_path())
            .finish()
    }
}
