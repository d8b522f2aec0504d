pub use api::{Bitness, CallingConvention, FunctionDescriptor, LibraryEvent, LoaderError, Platform};

mod config;
pub mod resolver;

pub use config::{load_config, AlternateConfig, LoaderConfig};
pub use resolver::{
    default_probe_directories, resolve_candidates, runtime_identifier, LibraryPath,
    LibraryResolver,
};
