use super::{LibraryHandle, LoaderBackend};
use ::windows::core::{Error, HSTRING, PCSTR};
use ::windows::Win32::Foundation::{FreeLibrary, HMODULE};
use ::windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW, LoadPackagedLibrary};
use api::Platform;
use log::trace;
use std::ffi::{c_void, CString};
use std::ptr::NonNull;

/// `LoadLibraryW`/`GetProcAddress`/`FreeLibrary`, falling back to
/// `LoadPackagedLibrary` for packaged (UWP) processes.
#[derive(Debug, Default)]
pub struct WindowsBackend {
    last_error: String,
}

impl WindowsBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoaderBackend for WindowsBackend {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    unsafe fn open(&mut self, path: &str) -> Option<LibraryHandle> {
        let wide = HSTRING::from(path);

        let conventional = match LoadLibraryW(&wide) {
            Ok(module) => return LibraryHandle::from_raw(module.0),
            Err(e) => e,
        };

        match LoadPackagedLibrary(&wide, 0) {
            Ok(module) => {
                trace!("LoadPackagedLibrary({}) succeeded", path);
                LibraryHandle::from_raw(module.0)
            }
            Err(packaged) => {
                self.last_error = format!(
                    "LoadLibraryW: {}; LoadPackagedLibrary: {}",
                    conventional, packaged
                );
                None
            }
        }
    }

    unsafe fn get_symbol(&mut self, handle: &LibraryHandle, name: &str) -> Option<NonNull<c_void>> {
        let Ok(proc_name) = CString::new(name) else {
            self.last_error = format!("function name '{}' contains a NUL byte", name);
            return None;
        };

        let module = HMODULE(handle.as_raw());
        match GetProcAddress(module, PCSTR::from_raw(proc_name.as_ptr() as *const u8)) {
            Some(function) => NonNull::new(function as *mut c_void),
            None => {
                self.last_error = Error::from_win32().to_string();
                None
            }
        }
    }

    unsafe fn close(&mut self, handle: LibraryHandle) -> bool {
        match FreeLibrary(HMODULE(handle.as_raw())) {
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
