use api::{Bitness, Platform};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A library location given either once for every bitness or as a 32/64-bit pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryPath {
    Single(String),
    Pair { x86: String, x64: String },
}

impl LibraryPath {
    pub fn select(&self, bitness: Bitness) -> &str {
        match self {
            Self::Single(path) => path,
            Self::Pair { x86, x64 } => match bitness {
                Bitness::X86 => x86,
                Bitness::X64 => x64,
            },
        }
    }
}

impl From<&str> for LibraryPath {
    fn from(path: &str) -> Self {
        Self::Single(path.to_string())
    }
}

impl From<String> for LibraryPath {
    fn from(path: String) -> Self {
        Self::Single(path)
    }
}

impl<A: Into<String>, B: Into<String>> From<(A, B)> for LibraryPath {
    fn from((x86, x64): (A, B)) -> Self {
        Self::Pair {
            x86: x86.into(),
            x64: x64.into(),
        }
    }
}

/// A registered alternate candidate, optionally limited to one platform and/or bitness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternate {
    pub name: String,
    pub platform: Option<Platform>,
    pub bitness: Option<Bitness>,
}

impl Alternate {
    fn applies_to(&self, platform: Platform, bitness: Bitness) -> bool {
        self.platform.map_or(true, |p| p == platform) && self.bitness.map_or(true, |b| b == bitness)
    }
}

/// Candidate order for `name`: alternates as given, the platform-decorated name, then
/// `name` verbatim. Duplicates keep their first position.
pub fn resolve_candidates(platform: Platform, name: &str, alternates: &[&str]) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(alternates.len() + 2);
    let decorated = platform.decorate(name);
    for candidate in alternates
        .iter()
        .copied()
        .chain([decorated.as_str(), name])
    {
        if !candidate.is_empty() && !candidates.iter().any(|c| c == candidate) {
            candidates.push(candidate.to_string());
        }
    }
    candidates
}

/// Runtime identifier used by package layouts (`runtimes/<rid>/native`).
pub fn runtime_identifier(platform: Platform, bitness: Bitness, arch: &str) -> String {
    let os = match platform {
        Platform::Windows => "win",
        Platform::Linux => "linux",
        Platform::Mac => "osx",
    };
    let arch = match (arch, bitness) {
        ("aarch64", _) => "arm64",
        ("arm", _) => "arm",
        (_, Bitness::X64) => "x64",
        (_, Bitness::X86) => "x86",
    };
    format!("{}-{}", os, arch)
}

/// The executable's directory and its `runtimes/<rid>/native` subdirectory.
pub fn default_probe_directories(platform: Platform, bitness: Bitness) -> Vec<PathBuf> {
    let Some(base) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    else {
        return Vec::new();
    };
    let rid = runtime_identifier(platform, bitness, std::env::consts::ARCH);
    vec![
        base.join("runtimes").join(rid).join("native"),
        base,
    ]
}

/// Turns logical library names into ordered lists of concrete candidates for one
/// platform and bitness.
#[derive(Debug, Clone)]
pub struct LibraryResolver {
    platform: Platform,
    bitness: Bitness,
    alternates: HashMap<String, Vec<Alternate>>,
    probe_directories: Vec<PathBuf>,
}

impl LibraryResolver {
    pub fn new(platform: Platform, bitness: Bitness) -> Self {
        Self {
            platform,
            bitness,
            alternates: HashMap::new(),
            probe_directories: Vec::new(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn bitness(&self) -> Bitness {
        self.bitness
    }

    pub fn register_alternate(&mut self, library: &str, name: impl Into<String>) {
        self.register_alternate_for(library, name, None, None);
    }

    pub fn register_alternate_for(
        &mut self,
        library: &str,
        name: impl Into<String>,
        platform: Option<Platform>,
        bitness: Option<Bitness>,
    ) {
        let alternate = Alternate {
            name: name.into(),
            platform,
            bitness,
        };
        debug!("Registered alternate {:?} for '{}'", alternate, library);
        self.alternates
            .entry(library.to_string())
            .or_default()
            .push(alternate);
    }

    pub fn clear_alternates(&mut self, library: &str) {
        self.alternates.remove(library);
    }

    /// Alternates for `library` that apply to this platform and bitness, in registration order.
    pub fn alternates(&self, library: &str) -> Vec<&str> {
        self.alternates
            .get(library)
            .map(|list| {
                list.iter()
                    .filter(|a| a.applies_to(self.platform, self.bitness))
                    .map(|a| a.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn add_probe_directory(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.probe_directories.contains(&dir) {
            self.probe_directories.push(dir);
        }
    }

    pub fn probe_directories(&self) -> &[PathBuf] {
        &self.probe_directories
    }

    /// Every candidate to hand the backend for `name`, in the order to try them.
    pub fn resolve(&self, name: &str) -> Vec<String> {
        let names = resolve_candidates(self.platform, name, &self.alternates(name));
        if self.probe_directories.is_empty() {
            return names;
        }

        let mut candidates = Vec::new();
        for name in names {
            if Path::new(&name).is_relative() {
                for dir in &self.probe_directories {
                    let probed = dir.join(&name).to_string_lossy().into_owned();
                    if !candidates.contains(&probed) {
                        candidates.push(probed);
                    }
                }
            }
            if !candidates.contains(&name) {
                candidates.push(name);
            }
        }
        candidates
    }

    /// Picks the side of `path` matching this resolver's bitness, then resolves it.
    pub fn resolve_path(&self, path: &LibraryPath) -> Vec<String> {
        self.resolve(path.select(self.bitness))
    }
}
