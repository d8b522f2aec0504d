use api::{LoaderError, Platform};
use once_cell::sync::OnceCell;

static PLATFORM: OnceCell<Platform> = OnceCell::new();

/// The running OS family, classified once per process.
pub fn detect() -> Result<Platform, LoaderError> {
    PLATFORM
        .get_or_try_init(|| classify(compiled_platform(), &os_descriptor()))
        .copied()
}

/// Generic OS description, e.g. `"linux unix"` or `"windows windows"`.
pub fn os_descriptor() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::FAMILY)
}

fn compiled_platform() -> Option<Platform> {
    if cfg!(target_os = "windows") {
        Some(Platform::Windows)
    } else if cfg!(target_os = "linux") {
        Some(Platform::Linux)
    } else if cfg!(target_os = "macos") {
        Some(Platform::Mac)
    } else {
        None
    }
}

/// Uses `primary` when the target OS is one of the three known ones, otherwise looks for
/// a known family name inside `descriptor`.
pub fn classify(primary: Option<Platform>, descriptor: &str) -> Result<Platform, LoaderError> {
    if let Some(platform) = primary {
        return Ok(platform);
    }

    let lower = descriptor.to_ascii_lowercase();
    let matches = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if matches(&["windows"]) {
        Ok(Platform::Windows)
    } else if matches(&["macos", "darwin", "ios"]) {
        Ok(Platform::Mac)
    } else if matches(&["linux", "android", "unix"]) {
        Ok(Platform::Linux)
    } else {
        Err(LoaderError::PlatformUndetectable {
            descriptor: descriptor.to_string(),
        })
    }
}
