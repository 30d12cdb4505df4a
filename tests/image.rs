//! Tests against a real disk image file on the host.

mod common;

use minifat::{DiskImage, Error, FatFs};
use tempfile::tempdir;

#[test]
fn test_format_then_reopen() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("fs.img");

    {
        let device = DiskImage::create(&image).unwrap();
        let mut fs = FatFs::format(device, 1024).unwrap();
        fs.create_directory("/docs").unwrap();
        fs.write_file("/docs/readme", b"persisted bytes").unwrap();
    }

    let mut fs = FatFs::open(DiskImage::open(&image).unwrap()).unwrap();
    log!("reopened: {}", fs.dump().unwrap());

    assert_eq!(fs.superblock().block_size, 1024);
    assert_eq!(fs.read_file("/docs/readme").unwrap(), b"persisted bytes");

    let list = fs.list_directory("/").unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "docs");
    assert!(list[0].is_directory);
}

#[test]
fn test_mutations_persist_across_reopen() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("fs.img");

    {
        let device = DiskImage::create(&image).unwrap();
        let mut fs = FatFs::format(device, 512).unwrap();
        fs.write_file("/a", b"one").unwrap();
        fs.write_file("/b", b"two").unwrap();
        fs.chmod("/a", "-w").unwrap();
    }

    {
        let mut fs = FatFs::open(DiskImage::open(&image).unwrap()).unwrap();
        let attributes = fs.read_attributes("/a").unwrap();
        assert!(attributes.can_read && !attributes.can_write);
        assert!(matches!(
            fs.write_file("/a", b"denied"),
            Err(Error::Permission(_))
        ));
        fs.delete_file("/b").unwrap();
    }

    let mut fs = FatFs::open(DiskImage::open(&image).unwrap()).unwrap();
    assert!(matches!(
        fs.read_file("/b"),
        Err(Error::NoSuchFileOrDirectory(_))
    ));
    assert_eq!(fs.read_file("/a").unwrap(), b"one");
}

#[test]
fn test_free_count_survives_reopen() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("fs.img");

    let free = {
        let device = DiskImage::create(&image).unwrap();
        let mut fs = FatFs::format(device, 512).unwrap();
        fs.write_file("/f", &[9u8; 4000]).unwrap();
        fs.free_blocks()
    };

    let fs = FatFs::open(DiskImage::open(&image).unwrap()).unwrap();
    assert_eq!(fs.free_blocks(), free);
    assert_eq!(fs.data_address(), 16);
}

#[test]
fn test_create_truncates_existing_image() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("fs.img");

    {
        let device = DiskImage::create(&image).unwrap();
        let mut fs = FatFs::format(device, 512).unwrap();
        fs.write_file("/old", b"to be discarded").unwrap();
    }

    // Formatting anew starts from an empty namespace.
    let device = DiskImage::create(&image).unwrap();
    let mut fs = FatFs::format(device, 512).unwrap();
    assert!(matches!(
        fs.read_attributes("/old"),
        Err(Error::NoSuchFileOrDirectory(_))
    ));
    assert!(fs.list_directory("/").unwrap().is_empty());
}

#[test]
fn test_open_rejects_blank_image() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("blank.img");
    std::fs::write(&image, vec![0u8; 512]).unwrap();

    let device = DiskImage::open(&image).unwrap();
    assert!(matches!(FatFs::open(device), Err(Error::InvalidSuperblock)));
}
