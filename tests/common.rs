//! Common utilities for tests
#![allow(unused)]

use minifat::{FatFs, Result, SectorDevice, FAT_ENTRIES, SECTOR_SIZE};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Memory-backed sector device standing in for a disk image.
#[derive(Debug)]
pub struct RamDisk {
    sectors: Vec<u8>,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified number of sectors.
    pub fn new(num_sectors: usize) -> Self {
        RamDisk {
            sectors: vec![0u8; num_sectors * SECTOR_SIZE],
        }
    }
}

impl SectorDevice for RamDisk {
    fn read_sector(&mut self, index: usize, buf: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        let start = index * SECTOR_SIZE;
        buf.copy_from_slice(&self.sectors[start..start + SECTOR_SIZE]);
        Ok(())
    }

    fn write_sector(&mut self, index: usize, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        let start = index * SECTOR_SIZE;
        self.sectors[start..start + SECTOR_SIZE].copy_from_slice(buf);
        Ok(())
    }
}

/// Formats a fresh filesystem on a RamDisk large enough for the full image.
pub fn format_ram(block_size: u16) -> FatFs<RamDisk> {
    let sectors = 1 + FAT_ENTRIES * block_size as usize / SECTOR_SIZE;
    FatFs::format(RamDisk::new(sectors), block_size).unwrap()
}
