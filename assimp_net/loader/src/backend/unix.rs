use super::{LibraryHandle, LoaderBackend};
use api::Platform;
use libloading::os::unix::{Library, RTLD_LOCAL, RTLD_NOW};
use log::trace;
use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

/// `dlopen`/`dlsym`/`dlclose`, shared by the Linux and Mac variants.
#[derive(Debug)]
pub struct UnixBackend {
    platform: Platform,
    last_error: String,
}

impl UnixBackend {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            last_error: String::new(),
        }
    }
}

impl LoaderBackend for UnixBackend {
    fn platform(&self) -> Platform {
        self.platform
    }

    unsafe fn open(&mut self, path: &str) -> Option<LibraryHandle> {
        // RTLD_NOW surfaces unresolved dependencies here instead of at first call.
        match Library::open(Some(path), RTLD_NOW | RTLD_LOCAL) {
            Ok(library) => {
                trace!("dlopen({}) succeeded", path);
                LibraryHandle::from_raw(library.into_raw())
            }
            Err(e) => {
                self.last_error = e.to_string();
                None
            }
        }
    }

    unsafe fn get_symbol(&mut self, handle: &LibraryHandle, name: &str) -> Option<NonNull<c_void>> {
        // The handle stays owned by the orchestrator; never dlclose it from here.
        let library = ManuallyDrop::new(Library::from_raw(handle.as_raw()));
        match library.get::<*mut c_void>(name.as_bytes()) {
            Ok(symbol) => {
                let address = NonNull::new(symbol.into_raw());
                if address.is_none() {
                    self.last_error = format!("symbol '{}' resolved to null", name);
                }
                address
            }
            Err(e) => {
                self.last_error = e.to_string();
                None
            }
        }
    }

    unsafe fn close(&mut self, handle: LibraryHandle) -> bool {
        match Library::from_raw(handle.as_raw()).close() {
            Ok(()) => true,
            Err(e) => {
                self.last_error = e.to_string();
                false
            }
        }
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }
}
