use super::*;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, name.as_bytes()).unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    path
}

#[test]
fn test_parse_backup_name() {
    assert_eq!(
        parse_backup_name("vzdump-qemu-101-2024_01_02-03_04_05.vma.zst"),
        Some((101, ArchiveKind::VmaZst))
    );
    assert_eq!(
        parse_backup_name("vzdump-qemu-7-x.vma"),
        Some((7, ArchiveKind::Vma))
    );
    assert_eq!(
        parse_backup_name("vzdump-qemu-102-x.vma.lzo"),
        Some((102, ArchiveKind::VmaLzo))
    );
    assert_eq!(
        parse_backup_name("vzdump-qemu-103-x.vma.gz"),
        Some((103, ArchiveKind::VmaGz))
    );
}

#[test]
fn test_parse_backup_name_rejects_others() {
    assert_eq!(parse_backup_name("vzdump-lxc-101-x.tar.zst"), None);
    assert_eq!(parse_backup_name("vzdump-qemu-101-x.log"), None);
    assert_eq!(parse_backup_name("vzdump-qemu-101-x.vma.zst.tmp"), None);
    assert_eq!(parse_backup_name("manifest.json"), None);
    assert_eq!(parse_backup_name("old-vzdump-qemu-101-x.vma"), None);
}

#[test]
fn test_find_backups_missing_dir() {
    let temp = TempDir::new().unwrap();
    let found = find_backups(&temp.path().join("missing")).unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_find_backups_skips_directories_and_unrelated_files() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "vzdump-qemu-101-a.vma.zst", 10);
    touch(temp.path(), "notes.txt", 10);
    touch(temp.path(), "vzdump-qemu-101-a.log", 10);
    fs::create_dir(temp.path().join("vzdump-qemu-101-dir.vma")).unwrap();

    let found = find_backups(temp.path()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].file_name, "vzdump-qemu-101-a.vma.zst");
    assert_eq!(found[0].vmid, 101);
}

#[test]
fn test_newest_backup_filters_by_vmid() {
    let temp = TempDir::new().unwrap();
    // 102 is the most recent file overall, and sorts after 101 by name
    touch(temp.path(), "vzdump-qemu-102-2024_05_01.vma.zst", 1);
    touch(temp.path(), "vzdump-qemu-101-2024_01_01.vma.zst", 100);
    touch(temp.path(), "readme.md", 0);

    let archive = newest_backup(temp.path(), 101).unwrap().unwrap();
    assert_eq!(archive.vmid, 101);
    assert_eq!(archive.file_name, "vzdump-qemu-101-2024_01_01.vma.zst");

    assert!(newest_backup(temp.path(), 103).unwrap().is_none());
}

#[test]
fn test_newest_backup_uses_mtime_not_name() {
    let temp = TempDir::new().unwrap();
    // the name that sorts last is the older file
    touch(temp.path(), "vzdump-qemu-101-2024_12_31.vma.zst", 500);
    let newer = touch(temp.path(), "vzdump-qemu-101-2024_01_01.vma.gz", 5);

    let archive = newest_backup(temp.path(), 101).unwrap().unwrap();
    assert_eq!(archive.path, newer);
    assert_eq!(archive.kind, ArchiveKind::VmaGz);
}

#[test]
fn test_identify_new_backup_prefers_unseen_name() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "vzdump-qemu-101-old.vma.zst", 50);
    let before = snapshot_names(temp.path(), 101).unwrap();
    assert_eq!(before.len(), 1);

    // the old archive is touched again, but the new name still wins
    touch(temp.path(), "vzdump-qemu-101-new.vma.zst", 20);
    touch(temp.path(), "vzdump-qemu-101-old.vma.zst", 0);

    let archive = identify_new_backup(temp.path(), 101, &before)
        .unwrap()
        .unwrap();
    assert_eq!(archive.file_name, "vzdump-qemu-101-new.vma.zst");
}

#[test]
fn test_identify_new_backup_falls_back_to_newest() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "vzdump-qemu-101-a.vma.zst", 50);
    touch(temp.path(), "vzdump-qemu-101-b.vma.zst", 10);
    let before = snapshot_names(temp.path(), 101).unwrap();

    let archive = identify_new_backup(temp.path(), 101, &before)
        .unwrap()
        .unwrap();
    assert_eq!(archive.file_name, "vzdump-qemu-101-b.vma.zst");
}

#[test]
fn test_identify_new_backup_nothing_present() {
    let temp = TempDir::new().unwrap();
    let archive = identify_new_backup(temp.path(), 101, &BTreeSet::new()).unwrap();
    assert!(archive.is_none());
}

#[test]
fn test_snapshot_names_ignores_other_vmids() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "vzdump-qemu-101-a.vma", 1);
    touch(temp.path(), "vzdump-qemu-102-a.vma", 1);

    let names = snapshot_names(temp.path(), 102).unwrap();
    assert_eq!(
        names.into_iter().collect::<Vec<_>>(),
        vec!["vzdump-qemu-102-a.vma".to_string()]
    );
}
