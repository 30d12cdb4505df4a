//! Sector-level access to the disk image.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::SECTOR_SIZE;
use crate::error::Result;

/// Fixed-size random-access sector store backing the filesystem.
///
/// Sector 0 holds the superblock; blocks start at sector 1. All I/O is in
/// whole sectors. The engine owns its device for its whole lifetime and is
/// single-threaded, so implementations take `&mut self`.
pub trait SectorDevice {
    fn read_sector(&mut self, index: usize, buf: &mut [u8; SECTOR_SIZE]) -> Result<()>;

    fn write_sector(&mut self, index: usize, buf: &[u8; SECTOR_SIZE]) -> Result<()>;
}

/// Disk image stored in a single host file.
#[derive(Debug)]
pub struct DiskImage {
    file: File,
}

impl DiskImage {
    /// Creates a new image file, truncating any existing content.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(DiskImage { file })
    }

    /// Opens an existing image file without truncating it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(DiskImage { file })
    }
}

impl SectorDevice for DiskImage {
    fn read_sector(&mut self, index: usize, buf: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start((index * SECTOR_SIZE) as u64))?;

        // The image file only grows when a sector is written, so sectors
        // past its current end read as zeroes.
        buf.fill(0);
        let mut filled = 0;
        while filled < SECTOR_SIZE {
            let count = self.file.read(&mut buf[filled..])?;
            if count == 0 {
                break;
            }
            filled += count;
        }
        Ok(())
    }

    fn write_sector(&mut self, index: usize, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start((index * SECTOR_SIZE) as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }
}
