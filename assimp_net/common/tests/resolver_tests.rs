use common::{
    resolve_candidates, runtime_identifier, Bitness, LibraryPath, LibraryResolver, Platform,
};
use std::path::PathBuf;

#[test]
fn test_no_alternates_yields_decorated_then_verbatim() {
    let expected = [
        (Platform::Windows, "foo.dll"),
        (Platform::Linux, "libfoo.so"),
        (Platform::Mac, "libfoo.dylib"),
    ];
    for (platform, decorated) in expected {
        let candidates = resolve_candidates(platform, "foo", &[]);
        assert_eq!(candidates, vec![decorated.to_string(), "foo".to_string()], "{}", platform);
    }
}

#[test]
fn test_alternates_come_first_in_registration_order() {
    let mut resolver = LibraryResolver::new(Platform::Linux, Bitness::X64);
    resolver.register_alternate("assimp", "libassimp.so.5");
    resolver.register_alternate("assimp", "/opt/assimp/lib/libassimp.so");

    assert_eq!(
        resolver.resolve("assimp"),
        vec![
            "libassimp.so.5",
            "/opt/assimp/lib/libassimp.so",
            "libassimp.so",
            "assimp",
        ]
    );
}

#[test]
fn test_alternates_scoped_to_other_platform_or_bitness_are_skipped() {
    let mut resolver = LibraryResolver::new(Platform::Windows, Bitness::X86);
    resolver.register_alternate_for("assimp", "Assimp64.dll", Some(Platform::Windows), Some(Bitness::X64));
    resolver.register_alternate_for("assimp", "Assimp32.dll", Some(Platform::Windows), Some(Bitness::X86));
    resolver.register_alternate_for("assimp", "libassimp.so.5", Some(Platform::Linux), None);

    assert_eq!(resolver.alternates("assimp"), vec!["Assimp32.dll"]);
    assert_eq!(
        resolver.resolve("assimp"),
        vec!["Assimp32.dll", "assimp.dll", "assimp"]
    );
}

#[test]
fn test_alternates_are_keyed_by_name() {
    let mut resolver = LibraryResolver::new(Platform::Mac, Bitness::X64);
    resolver.register_alternate("assimp", "libassimp.5.dylib");
    assert_eq!(resolver.resolve("other"), vec!["libother.dylib", "other"]);

    resolver.clear_alternates("assimp");
    assert_eq!(resolver.resolve("assimp"), vec!["libassimp.dylib", "assimp"]);
}

#[test]
fn test_already_decorated_name_is_not_repeated() {
    let candidates = resolve_candidates(Platform::Linux, "libfoo.so", &[]);
    assert_eq!(candidates, vec!["libfoo.so"]);

    let candidates = resolve_candidates(Platform::Windows, "foo.dll", &["foo.dll", "bar.dll"]);
    assert_eq!(candidates, vec!["foo.dll", "bar.dll"]);
}

#[test]
fn test_pair_selects_by_bitness() {
    let path = LibraryPath::from(("Assimp32.dll", "Assimp64.dll"));
    assert_eq!(path.select(Bitness::X86), "Assimp32.dll");
    assert_eq!(path.select(Bitness::X64), "Assimp64.dll");

    let resolver = LibraryResolver::new(Platform::Windows, Bitness::X64);
    assert_eq!(resolver.resolve_path(&path), vec!["Assimp64.dll"]);
}

#[test]
fn test_directory_qualified_names_decorate_the_file_name() {
    assert_eq!(
        resolve_candidates(Platform::Linux, "runtimes/linux-x64/native/assimp", &[]),
        vec![
            "runtimes/linux-x64/native/libassimp.so",
            "runtimes/linux-x64/native/assimp",
        ]
    );
    assert_eq!(
        resolve_candidates(Platform::Linux, "/opt/assimp/lib/assimp", &[]),
        vec!["/opt/assimp/lib/libassimp.so", "/opt/assimp/lib/assimp"]
    );
    assert_eq!(
        resolve_candidates(Platform::Mac, "native/assimp", &[]),
        vec!["native/libassimp.dylib", "native/assimp"]
    );

    let resolver = LibraryResolver::new(Platform::Linux, Bitness::X86);
    let path = LibraryPath::from(("lib32/assimp", "lib64/assimp"));
    assert_eq!(
        resolver.resolve_path(&path),
        vec!["lib32/libassimp.so", "lib32/assimp"]
    );
}

#[test]
#[cfg(unix)]
fn test_probe_directories_prefix_relative_candidates() {
    let mut resolver = LibraryResolver::new(Platform::Linux, Bitness::X64);
    resolver.add_probe_directory("runtimes/linux-x64/native");
    resolver.register_alternate("assimp", "/usr/lib/libassimp.so.5");

    let probed = PathBuf::from("runtimes/linux-x64/native")
        .join("libassimp.so")
        .to_string_lossy()
        .into_owned();
    let probed_verbatim = PathBuf::from("runtimes/linux-x64/native")
        .join("assimp")
        .to_string_lossy()
        .into_owned();

    assert_eq!(
        resolver.resolve("assimp"),
        vec![
            "/usr/lib/libassimp.so.5".to_string(),
            probed,
            "libassimp.so".to_string(),
            probed_verbatim,
            "assimp".to_string(),
        ]
    );
}

#[test]
fn test_resolution_is_repeatable() {
    let mut resolver = LibraryResolver::new(Platform::Linux, Bitness::X64);
    resolver.register_alternate("assimp", "libassimp.so.5");
    assert_eq!(resolver.resolve("assimp"), resolver.resolve("assimp"));
}

#[test]
fn test_runtime_identifier() {
    assert_eq!(runtime_identifier(Platform::Windows, Bitness::X86, "x86"), "win-x86");
    assert_eq!(runtime_identifier(Platform::Linux, Bitness::X64, "x86_64"), "linux-x64");
    assert_eq!(runtime_identifier(Platform::Mac, Bitness::X64, "aarch64"), "osx-arm64");
}
