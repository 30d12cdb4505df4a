//! Reading and writing the superblock record at sector 0.

use crate::codec::{self, ByteReader};
use crate::config::{BLOCK_SIZES, PARTITION_ID, SECTOR_SIZE};
use crate::device::SectorDevice;
use crate::error::{FsError, Result};
use crate::structs::Superblock;

impl Superblock {
    pub fn new(block_size: u16) -> Self {
        Superblock {
            partition_id: PARTITION_ID,
            block_size,
            root_directory_entry_size: 0,
        }
    }
}

pub fn write_superblock<D: SectorDevice>(device: &mut D, superblock: &Superblock) -> Result<()> {
    let mut buffer = Vec::with_capacity(SECTOR_SIZE);
    codec::put_u8(&mut buffer, superblock.partition_id);
    codec::put_u16(&mut buffer, superblock.block_size);
    codec::put_i16(&mut buffer, superblock.root_directory_entry_size);
    buffer.resize(SECTOR_SIZE, 0);

    let mut sector = [0u8; SECTOR_SIZE];
    sector.copy_from_slice(&buffer);
    device.write_sector(0, &sector)
}

pub fn read_superblock<D: SectorDevice>(device: &mut D) -> Result<Superblock> {
    let mut sector = [0u8; SECTOR_SIZE];
    device.read_sector(0, &mut sector)?;

    let mut reader = ByteReader::new(&sector);
    let superblock = Superblock {
        partition_id: reader.read_u8()?,
        block_size: reader.read_u16()?,
        root_directory_entry_size: reader.read_i16()?,
    };

    if superblock.partition_id != PARTITION_ID {
        return Err(FsError::InvalidSuperblock);
    }
    if !BLOCK_SIZES.contains(&superblock.block_size) {
        return Err(FsError::InvalidSuperblock);
    }

    Ok(superblock)
}
