use crate::resolver::{LibraryPath, LibraryResolver};
use anyhow::{Context, Result};
use api::{Bitness, Platform};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One extra candidate for a logical library, e.g. a versioned soname.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternateConfig {
    pub library: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitness: Option<Bitness>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Fail with an error when no candidate loads; otherwise loading just reports `false`.
    pub throw_on_load_failure: bool,

    /// Explicit library location used instead of the default name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "library_path_x86")]
    pub library_path_32: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "library_path_x64")]
    pub library_path_64: Option<String>,

    pub alternates: Vec<AlternateConfig>,

    /// Directories searched for relative candidates before the OS search path.
    pub probe_directories: Vec<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            throw_on_load_failure: true,
            library_path: None,
            library_path_32: None,
            library_path_64: None,
            alternates: Vec::new(),
            probe_directories: Vec::new(),
        }
    }
}

impl LoaderConfig {
    /// The configured location override, if any. A 32/64-bit pair wins over a single path.
    pub fn library_path(&self) -> Option<LibraryPath> {
        match (&self.library_path_32, &self.library_path_64, &self.library_path) {
            (Some(x86), Some(x64), _) => Some(LibraryPath::from((x86.clone(), x64.clone()))),
            (_, _, Some(path)) => Some(LibraryPath::from(path.clone())),
            (None, None, None) => None,
            (x86, x64, None) => {
                warn!(
                    "Ignoring incomplete library path pair (32-bit: {:?}, 64-bit: {:?})",
                    x86, x64
                );
                None
            }
        }
    }

    pub fn apply_to(&self, resolver: &mut LibraryResolver) {
        for alt in &self.alternates {
            resolver.register_alternate_for(&alt.library, alt.name.clone(), alt.platform, alt.bitness);
        }
        for dir in &self.probe_directories {
            resolver.add_probe_directory(dir.clone());
        }
    }
}

/// Reads the config at `path`, writing out the defaults first if the file is missing.
pub fn load_config(path: &Path) -> Result<LoaderConfig> {
    if path.exists() {
        info!("Loading config from {:?}", path);
        let file = fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let reader = std::io::BufReader::new(file);
        let config = serde_json::from_reader(reader).context("Failed to parse loader config")?;
        Ok(config)
    } else {
        info!("Config not found. Creating default at {:?}", path);
        let config = LoaderConfig::default();
        let file = fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &config).context("Failed to write loader config")?;
        Ok(config)
    }
}
