//! OS-native shared library primitives, one backend per platform family.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixBackend;
#[cfg(windows)]
pub use windows::WindowsBackend;

use api::{LoaderError, Platform};
use std::ffi::c_void;
use std::ptr::NonNull;

/// Opaque OS handle to a mapped shared library. Not `Clone`; `close` consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct LibraryHandle(NonNull<c_void>);

// SAFETY: module handles are process-wide values; the orchestrator serializes open/close.
unsafe impl Send for LibraryHandle {}
unsafe impl Sync for LibraryHandle {}

impl LibraryHandle {
    /// Wraps a raw handle returned by the OS loader. `None` for null.
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// The primitives the orchestrator needs from an OS loader.
///
/// Failures are reported as `None`/`false` and described by `last_error`; nothing here
/// is fatal on its own.
pub trait LoaderBackend: Send {
    fn platform(&self) -> Platform;

    /// Maps `path` into the process through the OS loader.
    ///
    /// # Safety
    /// Loading runs the library's initialization routines.
    unsafe fn open(&mut self, path: &str) -> Option<LibraryHandle>;

    /// # Safety
    /// `handle` must come from `open` on this backend and not be closed yet.
    unsafe fn get_symbol(&mut self, handle: &LibraryHandle, name: &str) -> Option<NonNull<c_void>>;

    /// # Safety
    /// No pointer resolved from `handle` may be used after this returns.
    unsafe fn close(&mut self, handle: LibraryHandle) -> bool;

    /// Diagnostic text for the most recent failure. Only meant for messages.
    fn last_error(&self) -> String;
}

/// The backend for the running OS, chosen once at construction.
#[derive(Debug)]
pub enum NativeBackend {
    #[cfg(windows)]
    Windows(WindowsBackend),
    #[cfg(unix)]
    Linux(UnixBackend),
    #[cfg(unix)]
    Mac(UnixBackend),
}

impl NativeBackend {
    pub fn for_platform(platform: Platform) -> Result<Self, LoaderError> {
        match platform {
            #[cfg(windows)]
            Platform::Windows => Ok(Self::Windows(WindowsBackend::new())),
            #[cfg(unix)]
            Platform::Linux => Ok(Self::Linux(UnixBackend::new(Platform::Linux))),
            #[cfg(unix)]
            Platform::Mac => Ok(Self::Mac(UnixBackend::new(Platform::Mac))),
            #[allow(unreachable_patterns)]
            other => Err(LoaderError::BackendUnavailable { platform: other }),
        }
    }
}

impl LoaderBackend for NativeBackend {
    fn platform(&self) -> Platform {
        match self {
            #[cfg(windows)]
            Self::Windows(b) => b.platform(),
            #[cfg(unix)]
            Self::Linux(b) | Self::Mac(b) => b.platform(),
        }
    }

    unsafe fn open(&mut self, path: &str) -> Option<LibraryHandle> {
        match self {
            #[cfg(windows)]
            Self::Windows(b) => b.open(path),
            #[cfg(unix)]
            Self::Linux(b) | Self::Mac(b) => b.open(path),
        }
    }

    unsafe fn get_symbol(&mut self, handle: &LibraryHandle, name: &str) -> Option<NonNull<c_void>> {
        match self {
            #[cfg(windows)]
            Self::Windows(b) => b.get_symbol(handle, name),
            #[cfg(unix)]
            Self::Linux(b) | Self::Mac(b) => b.get_symbol(handle, name),
        }
    }

    unsafe fn close(&mut self, handle: LibraryHandle) -> bool {
        match self {
            #[cfg(windows)]
            Self::Windows(b) => b.close(handle),
            #[cfg(unix)]
            Self::Linux(b) | Self::Mac(b) => b.close(handle),
        }
    }

    fn last_error(&self) -> String {
        match self {
            #[cfg(windows)]
            Self::Windows(b) => b.last_error(),
            #[cfg(unix)]
            Self::Linux(b) | Self::Mac(b) => b.last_error(),
        }
    }
}
