use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system family a shared library is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(alias = "windows", alias = "Win32", alias = "win")]
    Windows,
    #[serde(alias = "linux")]
    Linux,
    #[serde(alias = "mac", alias = "macOS", alias = "macos", alias = "osx", alias = "OSX")]
    Mac,
}

impl Platform {
    /// File name prefix the platform's linker uses for shared libraries.
    pub fn library_prefix(self) -> &'static str {
        match self {
            Self::Windows => "",
            Self::Linux | Self::Mac => "lib",
        }
    }

    /// File extension, including the leading dot.
    pub fn library_extension(self) -> &'static str {
        match self {
            Self::Windows => ".dll",
            Self::Linux => ".so",
            Self::Mac => ".dylib",
        }
    }

    /// Whether `name` already carries this platform's shared library extension.
    ///
    /// Versioned sonames such as `libassimp.so.5` count as decorated on Linux.
    pub fn is_decorated(self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        let ext = self.library_extension();
        match self {
            Self::Linux => lower.ends_with(ext) || lower.contains(".so."),
            Self::Windows | Self::Mac => lower.ends_with(ext),
        }
    }

    /// `assimp` becomes `assimp.dll`, `libassimp.so` or `libassimp.dylib`.
    ///
    /// Only the file name is decorated; `native/assimp` becomes `native/libassimp.so`.
    pub fn decorate(self, name: &str) -> String {
        let (dir, file) = self.split_file_name(name);
        if file.is_empty() || self.is_decorated(file) {
            return name.to_string();
        }
        format!(
            "{}{}{}{}",
            dir,
            self.library_prefix(),
            file,
            self.library_extension()
        )
    }

    /// Splits after the last path separator. Windows accepts both slashes.
    fn split_file_name(self, name: &str) -> (&str, &str) {
        let separator = match self {
            Self::Windows => name.rfind(|c: char| c == '/' || c == '\\'),
            Self::Linux | Self::Mac => name.rfind('/'),
        };
        match separator {
            Some(i) => name.split_at(i + 1),
            None => ("", name),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::Mac => "Mac",
        };
        f.write_str(name)
    }
}

/// Pointer width of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bitness {
    #[serde(alias = "x86", alias = "32", alias = "X32")]
    X86,
    #[serde(alias = "x64", alias = "64", alias = "amd64")]
    X64,
}

impl Bitness {
    pub fn current() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::X64
        } else {
            Self::X86
        }
    }

    pub fn is_64bit(self) -> bool {
        self == Self::X64
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86 => f.write_str("32-bit"),
            Self::X64 => f.write_str("64-bit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decorate_per_platform() {
        assert_eq!(Platform::Windows.decorate("assimp"), "assimp.dll");
        assert_eq!(Platform::Linux.decorate("assimp"), "libassimp.so");
        assert_eq!(Platform::Mac.decorate("assimp"), "libassimp.dylib");
    }

    #[test]
    fn test_decorate_keeps_existing_extension() {
        assert_eq!(Platform::Windows.decorate("Assimp64.DLL"), "Assimp64.DLL");
        assert_eq!(Platform::Linux.decorate("libassimp.so.5"), "libassimp.so.5");
        assert_eq!(Platform::Mac.decorate("libassimp.5.dylib"), "libassimp.5.dylib");
        // Another platform's extension is not ours.
        assert_eq!(Platform::Linux.decorate("assimp.dll"), "libassimp.dll.so");
    }

    #[test]
    fn test_decorate_only_touches_file_name() {
        assert_eq!(
            Platform::Linux.decorate("runtimes/linux-x64/native/assimp"),
            "runtimes/linux-x64/native/libassimp.so"
        );
        assert_eq!(
            Platform::Linux.decorate("/opt/assimp/lib/assimp"),
            "/opt/assimp/lib/libassimp.so"
        );
        assert_eq!(Platform::Mac.decorate("native/assimp"), "native/libassimp.dylib");
        assert_eq!(
            Platform::Windows.decorate("C:\\assimp\\x64/Assimp64"),
            "C:\\assimp\\x64/Assimp64.dll"
        );
        assert_eq!(Platform::Linux.decorate("native/"), "native/");
        assert_eq!(Platform::Linux.decorate("lib.so.d/assimp"), "lib.so.d/libassimp.so");
    }

    #[test]
    fn test_bitness_matches_pointer_width() {
        assert_eq!(
            Bitness::current().is_64bit(),
            std::mem::size_of::<usize>() == 8
        );
    }

    #[test]
    fn test_platform_aliases_deserialize() {
        let p: Platform = serde_json::from_str("\"osx\"").unwrap();
        assert_eq!(p, Platform::Mac);
        let b: Bitness = serde_json::from_str("\"x86\"").unwrap();
        assert_eq!(b, Bitness::X86);
    }
}
