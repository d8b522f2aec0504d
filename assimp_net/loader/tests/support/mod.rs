#![allow(dead_code)]

use loader::{LibraryHandle, LoaderBackend, Platform};
use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

/// Shared view of everything a `SimulatedBackend` was asked to do.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub opened: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<Mutex<Vec<String>>>,
}

impl Calls {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

/// A backend whose "file system" is a map from path to exported symbols.
pub struct SimulatedBackend {
    platform: Platform,
    files: HashMap<String, HashMap<String, usize>>,
    live: HashMap<usize, String>,
    next_handle: usize,
    last_error: String,
    calls: Calls,
}

impl SimulatedBackend {
    pub fn new(platform: Platform) -> (Self, Calls) {
        let calls = Calls::default();
        let backend = Self {
            platform,
            files: HashMap::new(),
            live: HashMap::new(),
            next_handle: 1,
            last_error: String::new(),
            calls: calls.clone(),
        };
        (backend, calls)
    }

    /// Makes `path` loadable, exporting `symbols` at the given addresses.
    pub fn with_file(mut self, path: &str, symbols: &[(&str, usize)]) -> Self {
        let exports = symbols
            .iter()
            .map(|(name, addr)| (name.to_string(), *addr))
            .collect();
        self.files.insert(path.to_string(), exports);
        self
    }
}

impl LoaderBackend for SimulatedBackend {
    fn platform(&self) -> Platform {
        self.platform
    }

    unsafe fn open(&mut self, path: &str) -> Option<LibraryHandle> {
        self.calls.opened.lock().unwrap().push(path.to_string());
        if !self.files.contains_key(path) {
            self.last_error = format!("{}: cannot open shared object file: No such file or directory", path);
            return None;
        }
        let id = self.next_handle;
        self.next_handle += 1;
        self.live.insert(id, path.to_string());
        LibraryHandle::from_raw(id as *mut c_void)
    }

    unsafe fn get_symbol(&mut self, handle: &LibraryHandle, name: &str) -> Option<NonNull<c_void>> {
        let path = self
            .live
            .get(&(handle.as_raw() as usize))
            .expect("symbol lookup on a handle that is not open");
        match self.files[path].get(name) {
            Some(addr) => NonNull::new(*addr as *mut c_void),
            None => {
                self.last_error = format!("{}: undefined symbol: {}", path, name);
                None
            }
        }
    }

    unsafe fn close(&mut self, handle: LibraryHandle) -> bool {
        let path = self
            .live
            .remove(&(handle.as_raw() as usize))
            .expect("double close of a simulated handle");
        self.calls.closed.lock().unwrap().push(path);
        true
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
