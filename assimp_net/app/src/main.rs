mod args;

use anyhow::{Context, Result};
use args::ProbeArgs;
use common::{default_probe_directories, load_config, LoaderConfig};
use loader::assimp::compile_flags;
use loader::{AssimpLibrary, LibraryEvent};
use log::{debug, error, info, warn};
use std::path::Path;

fn describe_flags(flags: u32) -> String {
    let names = [
        (compile_flags::SHARED, "shared"),
        (compile_flags::STLPORT, "stlport"),
        (compile_flags::DEBUG, "debug"),
        (compile_flags::NOBOOST, "noboost"),
        (compile_flags::SINGLETHREADED, "singlethreaded"),
    ];
    let set: Vec<&str> = names
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        format!("{:#x}", flags)
    } else {
        format!("{:#x} ({})", flags, set.join(", "))
    }
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let args = ProbeArgs::parse(&args);

    let config = load_config(Path::new(&args.config)).unwrap_or_else(|e| {
        error!("Failed to load config: {}. Using defaults.", e);
        LoaderConfig::default()
    });
    debug!("Loaded Config: {:?}", config);

    let assimp = AssimpLibrary::instance().context("Failed to set up the native loader")?;
    let library = assimp.library();
    library.apply_config(&config);
    if args.probe_runtimes {
        for dir in default_probe_directories(library.platform(), library.bitness()) {
            library.add_probe_directory(dir);
        }
    }
    library.subscribe(|event| match event {
        LibraryEvent::Loaded => debug!("Observer: library loaded"),
        LibraryEvent::Freed => debug!("Observer: library freed"),
    });

    let path = args.path.clone().or_else(|| config.library_path());
    let target = path.clone().unwrap_or_else(|| library.default_path().clone());

    info!("Platform: {} ({})", library.platform(), library.bitness());
    for (i, candidate) in library.candidates(&target).iter().enumerate() {
        info!("  candidate {}: {}", i + 1, candidate);
    }
    if args.candidates_only {
        return Ok(());
    }

    let loaded = match path {
        Some(path) => library.load(path)?,
        None => library.load_default()?,
    };
    if !loaded {
        warn!("Assimp could not be loaded from any candidate");
        return Ok(());
    }

    info!("✓ Loaded {}", library.library_path());
    match assimp.version()? {
        Some(version) => info!("Assimp version {}", version),
        None => warn!("Version functions are not bound"),
    }
    if let Some(branch) = assimp.branch_name()? {
        info!("Branch: {}", branch);
    }
    if let Some(flags) = assimp.compile_flags()? {
        info!("Compile flags: {}", describe_flags(flags));
    }
    if let Some(legal) = assimp.legal_string()? {
        debug!("{}", legal);
    }

    library.free();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_flags() {
        assert_eq!(describe_flags(0), "0x0");
        assert_eq!(
            describe_flags(compile_flags::SHARED | compile_flags::DEBUG),
            "0x5 (shared, debug)"
        );
    }
}
