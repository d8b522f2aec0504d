use common::LibraryPath;

const DEFAULT_CONFIG: &str = "assimp_loader.json";

/// Command line of the probe. Flags are matched literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeArgs {
    pub config: String,
    pub path: Option<LibraryPath>,
    pub candidates_only: bool,
    pub probe_runtimes: bool,
}

fn value_of(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
        .cloned()
}

impl ProbeArgs {
    pub fn parse(args: &[String]) -> Self {
        let path = match (
            value_of(args, "--path32"),
            value_of(args, "--path64"),
            value_of(args, "--path"),
        ) {
            (Some(x86), Some(x64), _) => Some(LibraryPath::from((x86, x64))),
            (_, _, Some(path)) => Some(LibraryPath::from(path)),
            _ => None,
        };

        Self {
            config: value_of(args, "--config").unwrap_or_else(|| DEFAULT_CONFIG.to_string()),
            path,
            candidates_only: args.iter().any(|a| a == "--candidates"),
            probe_runtimes: !args.iter().any(|a| a == "--no-probe"),
        }
    }
}
