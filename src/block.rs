//! Logical blocks mapped onto contiguous runs of sectors, offset by the
//! sector that holds the superblock.

use crate::config::{BlockAddress, FAT_ENTRIES, SECTOR_SIZE};
use crate::device::SectorDevice;
use crate::error::Result;

fn sector_run(block_size: u16, address: BlockAddress) -> (usize, usize) {
    assert!((0..FAT_ENTRIES as BlockAddress).contains(&address));
    let sectors_per_block = block_size as usize / SECTOR_SIZE;
    (1 + address as usize * sectors_per_block, sectors_per_block)
}

/// Writes one whole block. `block.len()` must equal the block size.
pub fn write_block<D: SectorDevice>(
    device: &mut D,
    block_size: u16,
    address: BlockAddress,
    block: &[u8],
) -> Result<()> {
    assert_eq!(block.len(), block_size as usize);
    let (start, sectors_per_block) = sector_run(block_size, address);

    let mut sector = [0u8; SECTOR_SIZE];
    for offset in 0..sectors_per_block {
        sector.copy_from_slice(&block[offset * SECTOR_SIZE..(offset + 1) * SECTOR_SIZE]);
        device.write_sector(start + offset, &sector)?;
    }
    Ok(())
}

/// Reads one whole block.
pub fn read_block<D: SectorDevice>(
    device: &mut D,
    block_size: u16,
    address: BlockAddress,
) -> Result<Vec<u8>> {
    let (start, sectors_per_block) = sector_run(block_size, address);

    let mut block = vec![0u8; block_size as usize];
    let mut sector = [0u8; SECTOR_SIZE];
    for offset in 0..sectors_per_block {
        device.read_sector(start + offset, &mut sector)?;
        block[offset * SECTOR_SIZE..(offset + 1) * SECTOR_SIZE].copy_from_slice(&sector);
    }
    Ok(block)
}
