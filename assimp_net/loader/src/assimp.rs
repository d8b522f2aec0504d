//! The Assimp library instance and the handful of entry points the binding calls
//! directly. Everything else goes through `library()`.

use crate::UnmanagedLibrary;
use api::{Bitness, FunctionDescriptor, LoaderError, Platform};
use once_cell::sync::OnceCell;
use std::ffi::{c_char, CStr};
use std::fmt;

pub const DEFAULT_LIBRARY_NAME: &str = "assimp";

type GetUIntFn = unsafe extern "C" fn() -> u32;
type GetStringFn = unsafe extern "C" fn() -> *const c_char;

const GET_VERSION_MAJOR: &str = "aiGetVersionMajor";
const GET_VERSION_MINOR: &str = "aiGetVersionMinor";
const GET_VERSION_REVISION: &str = "aiGetVersionRevision";
const GET_VERSION_PATCH: &str = "aiGetVersionPatch";
const GET_LEGAL_STRING: &str = "aiGetLegalString";
const GET_COMPILE_FLAGS: &str = "aiGetCompileFlags";
const GET_BRANCH_NAME: &str = "aiGetBranchName";

static INSTANCE: OnceCell<AssimpLibrary> = OnceCell::new();

/// Functions bound on every load. Patch and branch queries only exist in newer releases.
pub fn functions() -> Vec<FunctionDescriptor> {
    vec![
        FunctionDescriptor::required(GET_VERSION_MAJOR),
        FunctionDescriptor::required(GET_VERSION_MINOR),
        FunctionDescriptor::required(GET_VERSION_REVISION),
        FunctionDescriptor::optional(GET_VERSION_PATCH),
        FunctionDescriptor::required(GET_LEGAL_STRING),
        FunctionDescriptor::required(GET_COMPILE_FLAGS),
        FunctionDescriptor::optional(GET_BRANCH_NAME),
    ]
}

/// Names the Assimp packages ship under, besides the decorated default.
fn register_default_alternates(library: &UnmanagedLibrary) {
    let name = DEFAULT_LIBRARY_NAME;
    library.register_alternate_for(name, "Assimp32.dll", Some(Platform::Windows), Some(Bitness::X86));
    library.register_alternate_for(name, "Assimp64.dll", Some(Platform::Windows), Some(Bitness::X64));
    library.register_alternate_for(name, "libassimp.so.5", Some(Platform::Linux), None);
    library.register_alternate_for(name, "libassimp.5.dylib", Some(Platform::Mac), None);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssimpVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
    pub patch: Option<u32>,
}

impl fmt::Display for AssimpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)?;
        if let Some(patch) = self.patch {
            write!(f, " (patch {})", patch)?;
        }
        Ok(())
    }
}

/// Bits reported by `aiGetCompileFlags`.
pub mod compile_flags {
    pub const SHARED: u32 = 0x1;
    pub const STLPORT: u32 = 0x2;
    pub const DEBUG: u32 = 0x4;
    pub const NOBOOST: u32 = 0x8;
    pub const SINGLETHREADED: u32 = 0x10;
}

#[derive(Debug)]
pub struct AssimpLibrary {
    library: UnmanagedLibrary,
}

impl AssimpLibrary {
    /// The process-wide instance, created on first use.
    pub fn instance() -> Result<&'static AssimpLibrary, LoaderError> {
        INSTANCE.get_or_try_init(|| {
            let library = UnmanagedLibrary::new(DEFAULT_LIBRARY_NAME, functions())?;
            Ok(Self::from_library(library))
        })
    }

    /// Wraps an already constructed library and registers the packaged Assimp names.
    pub fn from_library(library: UnmanagedLibrary) -> Self {
        register_default_alternates(&library);
        Self { library }
    }

    pub fn library(&self) -> &UnmanagedLibrary {
        &self.library
    }

    /// `None` when the library could not be loaded and failures are configured as silent.
    pub fn version(&self) -> Result<Option<AssimpVersion>, LoaderError> {
        if !self.library.ensure_loaded_for_use()? {
            return Ok(None);
        }
        unsafe {
            let (Some(major), Some(minor), Some(revision)) = (
                self.library.get_function::<GetUIntFn>(GET_VERSION_MAJOR),
                self.library.get_function::<GetUIntFn>(GET_VERSION_MINOR),
                self.library.get_function::<GetUIntFn>(GET_VERSION_REVISION),
            ) else {
                return Ok(None);
            };
            let patch = self.library.get_function::<GetUIntFn>(GET_VERSION_PATCH);
            Ok(Some(AssimpVersion {
                major: major(),
                minor: minor(),
                revision: revision(),
                patch: patch.map(|f| f()),
            }))
        }
    }

    pub fn compile_flags(&self) -> Result<Option<u32>, LoaderError> {
        self.call_uint(GET_COMPILE_FLAGS)
    }

    pub fn legal_string(&self) -> Result<Option<String>, LoaderError> {
        self.call_string(GET_LEGAL_STRING)
    }

    pub fn branch_name(&self) -> Result<Option<String>, LoaderError> {
        self.call_string(GET_BRANCH_NAME)
    }

    fn call_uint(&self, name: &str) -> Result<Option<u32>, LoaderError> {
        if !self.library.ensure_loaded_for_use()? {
            return Ok(None);
        }
        Ok(unsafe { self.library.get_function::<GetUIntFn>(name).map(|f| f()) })
    }

    fn call_string(&self, name: &str) -> Result<Option<String>, LoaderError> {
        if !self.library.ensure_loaded_for_use()? {
            return Ok(None);
        }
        unsafe {
            let Some(function) = self.library.get_function::<GetStringFn>(name) else {
                return Ok(None);
            };
            let ptr = function();
            if ptr.is_null() {
                return Ok(None);
            }
            Ok(Some(CStr::from_ptr(ptr).to_string_lossy().into_owned()))
        }
    }
}
