#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for namespaces built over real directories
//!
//! Each test lays out a throwaway game directory with loose files and mix
//! archives, builds a namespace from configuration and checks precedence,
//! case handling and write behavior end to end.

use mixfs_formats::mix::MixHeaderFormat;
use mixfs_formats::{MixBuilder, TablePolicy};
use mixfs_storage::{
    MemoryDirectory, StorageDirectory, StorageErrorKind, StorageRoot, TextEncoding, VfsConfig,
    VirtualFile, VirtualFileSystem,
};
use proptest::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_archive(dir: &Path, name: &str, format: MixHeaderFormat, files: &[(&str, &[u8])]) {
    let mut builder = MixBuilder::new().with_format(format);
    for (file, data) in files {
        builder.add_file(file, data.to_vec()).unwrap();
    }
    std::fs::write(dir.join(name), builder.build().unwrap()).unwrap();
}

fn game_dir() -> TempDir {
    let temp_dir = TempDir::new().expect("Operation should succeed");
    let root = temp_dir.path();

    let mut local = MixBuilder::new();
    local.add_file("rules.ini", b"[General]\nSource=local".to_vec()).unwrap();
    local.add_file("art.ini", b"[Art]".to_vec()).unwrap();

    let mut base = MixBuilder::new().with_key_source([0x42; 80]);
    base.add_file("local.mix", local.build().unwrap()).unwrap();
    base.add_file("mouse.sha", b"cursor".to_vec()).unwrap();
    std::fs::write(root.join("RA2.MIX"), base.build().unwrap()).unwrap();

    write_archive(
        root,
        "expandmd01.mix",
        MixHeaderFormat::Extended,
        &[("rules.ini", b"[General]\nSource=expansion")],
    );
    std::fs::write(root.join("Art.ini"), b"[Art]\nSource=loose").unwrap();
    std::fs::write(root.join("ra2md.ini"), b"[Video]").unwrap();

    temp_dir
}

fn config(root: &Path) -> VfsConfig {
    VfsConfig::new(root)
        .with_archive("ra2.mix")
        .with_archive("local.mix")
        .with_archive("expandmd01.mix")
        .with_standalone_exclusion("ra2md.ini")
}

#[tokio::test]
async fn config_builds_precedence_order() {
    let game = game_dir();
    let vfs = VirtualFileSystem::from_config(&config(game.path()))
        .await
        .unwrap();

    assert_eq!(
        vfs.archive_labels(),
        vec!["expandmd01.mix", "local.mix", "ra2.mix"]
    );

    // Later archive beats earlier archive
    let rules = vfs.open_file("RULES.INI").await.unwrap();
    assert!(rules.read_as_text(TextEncoding::Utf8).ends_with("expansion"));
    assert!(rules.is_zero_copy());

    // Loose file beats every archive
    let art = vfs.open_file("art.ini").await.unwrap();
    assert_eq!(art.read_as_text(TextEncoding::Utf8), "[Art]\nSource=loose");

    // Found only in the encrypted base archive
    assert_eq!(vfs.open_file("mouse.sha").await.unwrap().as_slice(), b"cursor");

    // Archives and excluded files are not standalone
    assert!(vfs.standalone_files().contains(&"Art.ini"));
    assert!(!vfs.standalone_files().contains(&"RA2.MIX"));
    assert!(!vfs.standalone_files().contains(&"ra2md.ini"));
    assert!(!vfs.file_exists("ra2md.ini"));
}

#[tokio::test]
async fn missing_names_report_every_source() {
    let game = game_dir();
    let vfs = VirtualFileSystem::from_config(&config(game.path()))
        .await
        .unwrap();

    let err = vfs.open_file("missing.shp").await.unwrap_err();
    assert_eq!(err.kind(), StorageErrorKind::NotFound);
    let message = err.to_string();
    assert!(message.contains("expandmd01.mix, local.mix, ra2.mix"), "{message}");
}

#[tokio::test]
async fn missing_archive_fails_config() {
    let game = game_dir();
    let config = config(game.path()).with_archive("missing.mix");
    let err = VirtualFileSystem::from_config(&config).await.unwrap_err();
    assert_eq!(err.kind(), StorageErrorKind::NotFound);
}

#[tokio::test]
async fn overlays_are_searched_after_root() {
    let game = game_dir();
    let mods = TempDir::new().expect("Operation should succeed");
    std::fs::write(mods.path().join("RA2.MIX"), b"shadowed").unwrap();
    std::fs::write(mods.path().join("yuri.ini"), b"[Yuri]").unwrap();

    let config = config(game.path()).with_overlay(mods.path());
    let vfs = VirtualFileSystem::from_config(&config).await.unwrap();

    let storage = vfs.storage();
    assert_eq!(storage.directories().len(), 2);
    assert_eq!(&storage.get_raw_file("yuri.ini").await.unwrap()[..], b"[Yuri]");
    // The root copy of ra2.mix was loaded, not the overlay's
    assert!(vfs.archive("ra2.mix").unwrap().is_encrypted());
}

#[tokio::test]
async fn writes_land_in_root_and_resolve_case() {
    let game = game_dir();
    let vfs = VirtualFileSystem::from_config(&config(game.path()))
        .await
        .unwrap();
    let storage = vfs.storage();

    storage
        .write_file(&VirtualFile::from_text("Cache.Dat", "v1"), None)
        .await
        .unwrap();
    storage
        .write_file(&VirtualFile::from_text("CACHE.DAT", "v2"), None)
        .await
        .unwrap();

    let on_disk: Vec<String> = std::fs::read_dir(game.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.to_lowercase() == "cache.dat")
        .collect();
    assert_eq!(on_disk, vec!["Cache.Dat".to_string()]);
    assert_eq!(&storage.get_raw_file("cache.dat").await.unwrap()[..], b"v2");
}

#[tokio::test]
async fn case_sensitive_root_misses_other_case() {
    let game = game_dir();
    let config = VfsConfig::new(game.path()).with_case_sensitive(true);
    let vfs = VirtualFileSystem::from_config(&config).await.unwrap();

    let err = vfs.storage().open_file("art.ini").await.unwrap_err();
    assert_eq!(err.kind(), StorageErrorKind::NotFound);
    assert!(vfs.storage().open_file("Art.ini").await.is_ok());
}

#[tokio::test]
async fn strict_policy_rejects_truncated_archive() {
    let game = game_dir();
    let mut builder = MixBuilder::new();
    for i in 0..4 {
        builder.add_file(&format!("f{i}.bin"), vec![0u8; 2]).unwrap();
    }
    let data = builder.build().unwrap();
    std::fs::write(game.path().join("cut.mix"), &data[..6 + 12 + 5]).unwrap();

    let lenient = VfsConfig::new(game.path()).with_archive("cut.mix");
    let vfs = VirtualFileSystem::from_config(&lenient).await.unwrap();
    let archive = vfs.archive("cut.mix").unwrap();
    assert!(archive.is_truncated());
    assert_eq!(archive.len(), 1);

    let strict = lenient.with_table_policy(TablePolicy::Strict);
    let err = VirtualFileSystem::from_config(&strict).await.unwrap_err();
    assert_eq!(err.kind(), StorageErrorKind::Io);
}

#[tokio::test]
async fn missing_root_uses_memory_fallback_only_when_allowed() {
    let temp_dir = TempDir::new().expect("Operation should succeed");
    let missing = temp_dir.path().join("not-installed");

    let err = VirtualFileSystem::from_config(&VfsConfig::new(&missing))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), StorageErrorKind::Io);

    let vfs = VirtualFileSystem::from_config(&VfsConfig::new(&missing).with_memory_fallback(true))
        .await
        .unwrap();
    assert_eq!(vfs.storage().primary().name(), "memory");
    assert!(vfs.standalone_files().is_empty());
}

#[tokio::test]
async fn created_root_starts_empty() {
    let temp_dir = TempDir::new().expect("Operation should succeed");
    let path = temp_dir.path().join("fresh");
    let config = VfsConfig::new(&path).with_create_root(true);
    let vfs = VirtualFileSystem::from_config(&config).await.unwrap();

    assert!(path.is_dir());
    assert!(vfs.list_storage_entries().await.unwrap().is_empty());
}

proptest! {
    #[test]
    fn stored_name_resolves_in_any_case(name in "[A-Za-z][A-Za-z0-9_]{0,11}\\.[A-Za-z]{3}") {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let backend = MemoryDirectory::new("game");
            let root = StorageRoot::new(StorageDirectory::new(Arc::new(backend.clone())));
            let mut vfs = VirtualFileSystem::new(Arc::new(root));

            vfs.storage()
                .write_file(&VirtualFile::from_text(name.as_str(), "data"), None)
                .await
                .unwrap();
            vfs.load_standalone_files::<&str>(&[]).await.unwrap();

            let upper = vfs.open_file(&name.to_uppercase()).await.unwrap();
            let lower = vfs.open_file(&name.to_lowercase()).await.unwrap();
            assert_eq!(upper.as_slice(), b"data");
            assert_eq!(lower.as_slice(), b"data");
            assert_eq!(vfs.standalone_files(), vec![name.as_str()]);
        });
    }
}
