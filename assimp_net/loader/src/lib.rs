//! Cross-platform loading of the native Assimp library

pub mod assimp;
pub mod backend;
pub mod platform;
mod unmanaged_library;

pub use api::{
    Bitness, CallingConvention, FunctionDescriptor, LibraryEvent, LoaderError, Platform,
};
pub use assimp::{AssimpLibrary, AssimpVersion};
pub use backend::{LibraryHandle, LoaderBackend, NativeBackend};
pub use common::{LibraryPath, LibraryResolver, LoaderConfig};
pub use unmanaged_library::{ObserverId, UnmanagedLibrary};
