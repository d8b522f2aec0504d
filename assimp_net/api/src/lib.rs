mod platform;
pub use platform::{Bitness, Platform};

use std::fmt;

/// Lifecycle transitions an `UnmanagedLibrary` reports to its observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryEvent {
    Loaded,
    Freed,
}

/// ABI an exported function is declared with.
///
/// The typed pointer handed out by the loader must use the matching Rust ABI:
/// `extern "C"` for `Cdecl`, `extern "system"` for `System` (stdcall on 32-bit Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConvention {
    #[default]
    Cdecl,
    System,
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cdecl => f.write_str("extern \"C\""),
            Self::System => f.write_str("extern \"system\""),
        }
    }
}

/// An exported function the loader resolves eagerly after every successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub convention: CallingConvention,
    /// A missing required function fails the whole load; a missing optional one is left unbound.
    pub required: bool,
}

impl FunctionDescriptor {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            convention: CallingConvention::default(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            convention: CallingConvention::default(),
            required: false,
        }
    }

    pub fn with_convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }
}

/// Errors surfaced by the loader. Everything below the orchestrator is reported
/// through return values; only these escape to callers.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Unable to classify host operating system '{descriptor}' as Windows, Linux or Mac")]
    PlatformUndetectable { descriptor: String },
    #[error("No native loader backend for {platform} in this build")]
    BackendUnavailable { platform: Platform },
    #[error(
        "Failed to load native library '{library}'. Attempted: [{}]. Last error: {last_error}",
        .attempted.join(", ")
    )]
    LoadExhausted {
        library: String,
        attempted: Vec<String>,
        last_error: String,
    },
    #[error("Required function '{symbol}' not found in '{path}': {last_error}")]
    SymbolMissing {
        path: String,
        symbol: String,
        last_error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_exhausted_lists_every_candidate() {
        let err = LoaderError::LoadExhausted {
            library: "assimp".into(),
            attempted: vec!["libassimp.so".into(), "assimp".into()],
            last_error: "assimp: cannot open shared object file".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("libassimp.so, assimp"));
        assert!(msg.contains("cannot open shared object file"));
    }

    #[test]
    fn test_descriptor_builders() {
        let f = FunctionDescriptor::optional("aiGetBranchName")
            .with_convention(CallingConvention::System);
        assert!(!f.required);
        assert_eq!(f.convention, CallingConvention::System);
        assert!(FunctionDescriptor::required("aiGetVersionMajor").required);
    }
}
