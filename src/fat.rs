//! The file allocation table: block states, chain allocation and walking.

use log::debug;

use crate::block;
use crate::codec::{self, ByteReader};
use crate::config::{BlockAddress, FAT_BYTES, FAT_ENTRIES, FREE_BLOCK, LAST_BLOCK};
use crate::device::SectorDevice;
use crate::error::{FsError, Result};

/// In-memory copy of the allocation table. Each entry is either
/// [`FREE_BLOCK`], [`LAST_BLOCK`] or the address of the next block in a
/// chain. Persisted as raw little-endian entries in blocks
/// `[0, data_address)`, which are pinned to END-OF-CHAIN since they back
/// the table itself.
#[derive(Debug, Clone)]
pub struct Fat {
    entries: [BlockAddress; FAT_ENTRIES],
}

impl Fat {
    /// First data block; the table occupies every block before it.
    pub fn data_address(block_size: u16) -> BlockAddress {
        (FAT_BYTES / block_size as usize) as BlockAddress
    }

    /// Fresh table for a newly formatted image: everything free except the
    /// blocks backing the table.
    pub fn format(block_size: u16) -> Self {
        let mut entries = [FREE_BLOCK; FAT_ENTRIES];
        for address in 0..Self::data_address(block_size) {
            entries[address as usize] = LAST_BLOCK;
        }
        Fat { entries }
    }

    pub fn get(&self, address: BlockAddress) -> BlockAddress {
        self.entries[address as usize]
    }

    pub fn set(&mut self, address: BlockAddress, value: BlockAddress) {
        self.entries[address as usize] = value;
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|&&entry| entry == FREE_BLOCK).count()
    }

    /// Writes `buffer` to a chain of blocks and returns the first block of
    /// the new chain, or [`LAST_BLOCK`] when `buffer` is empty.
    ///
    /// `start == LAST_BLOCK` allocates a brand-new chain, scanning from the
    /// first data block. Otherwise the chain rooted at `start` is freed
    /// first and the scan begins there, so an in-place rewrite tends to
    /// land on the blocks it occupied before. The scan wraps around the
    /// whole table; coming back to the starting point without finishing
    /// means the filesystem is full.
    pub fn write_chain<D: SectorDevice>(
        &mut self,
        device: &mut D,
        block_size: u16,
        start: BlockAddress,
        buffer: &[u8],
    ) -> Result<BlockAddress> {
        let start = if start == LAST_BLOCK {
            Self::data_address(block_size)
        } else {
            self.free_chain(device, block_size, start)?;
            start
        };

        if buffer.is_empty() {
            return Ok(LAST_BLOCK);
        }

        let mut current = start;
        let mut previous = LAST_BLOCK;
        let mut first = LAST_BLOCK;
        let mut offset = 0;
        loop {
            if self.get(current) == FREE_BLOCK {
                // Free block found: write the next slice of the buffer to
                // it, zero-padded up to a whole block.
                let end = buffer.len().min(offset + block_size as usize);
                let mut block = buffer[offset..end].to_vec();
                block.resize(block_size as usize, 0);
                offset += block_size as usize;
                block::write_block(device, block_size, current, &block)?;

                if first == LAST_BLOCK {
                    first = current;
                }
                if previous != LAST_BLOCK {
                    self.set(previous, current);
                }
                previous = current;

                if offset >= buffer.len() {
                    self.set(current, LAST_BLOCK);
                    self.store(device, block_size)?;
                    debug!("wrote {} byte chain starting at block {first}", buffer.len());
                    return Ok(first);
                }
            }

            current = (current + 1) % FAT_ENTRIES as BlockAddress;
            if current == start {
                return Err(FsError::FilesystemFull);
            }
        }
    }

    /// Marks every block of the chain rooted at `start` free and persists
    /// the table. No-op walk for [`LAST_BLOCK`].
    pub fn free_chain<D: SectorDevice>(
        &mut self,
        device: &mut D,
        block_size: u16,
        start: BlockAddress,
    ) -> Result<()> {
        assert!(start == LAST_BLOCK || start >= Self::data_address(block_size));

        let mut current = start;
        while current != LAST_BLOCK {
            let next = self.get(current);
            self.set(current, FREE_BLOCK);
            current = next;
        }
        self.store(device, block_size)?;
        debug!("freed chain starting at block {start}");
        Ok(())
    }

    /// Concatenates the blocks of the chain rooted at `start`. Empty for
    /// [`LAST_BLOCK`].
    pub fn read_chain<D: SectorDevice>(
        &self,
        device: &mut D,
        block_size: u16,
        start: BlockAddress,
    ) -> Result<Vec<u8>> {
        assert!(start == LAST_BLOCK || start >= Self::data_address(block_size));

        let mut buffer = Vec::new();
        let mut current = start;
        while current != LAST_BLOCK {
            buffer.extend_from_slice(&block::read_block(device, block_size, current)?);
            current = self.get(current);
        }
        Ok(buffer)
    }

    /// Persists the table into its reserved blocks.
    pub fn store<D: SectorDevice>(&self, device: &mut D, block_size: u16) -> Result<()> {
        let mut buffer = Vec::with_capacity(FAT_BYTES);
        for &entry in self.entries.iter() {
            codec::put_i16(&mut buffer, entry);
        }

        for address in 0..Self::data_address(block_size) {
            let begin = address as usize * block_size as usize;
            block::write_block(device, block_size, address, &buffer[begin..begin + block_size as usize])?;
        }
        Ok(())
    }

    /// Reads the table back from its reserved blocks.
    pub fn load<D: SectorDevice>(device: &mut D, block_size: u16) -> Result<Self> {
        let mut buffer = Vec::with_capacity(FAT_BYTES);
        for address in 0..Self::data_address(block_size) {
            buffer.extend_from_slice(&block::read_block(device, block_size, address)?);
        }

        let mut reader = ByteReader::new(&buffer);
        let mut entries = [FREE_BLOCK; FAT_ENTRIES];
        for entry in entries.iter_mut() {
            *entry = reader.read_i16()?;
        }
        Ok(Fat { entries })
    }

    /// Renders a chain as contiguous runs: `17-20->25` means blocks 17
    /// through 20 followed by a jump to block 25.
    pub fn chain_runs(&self, first: BlockAddress) -> String {
        let mut out = String::new();
        if first == LAST_BLOCK {
            return out;
        }

        let mut begin = first;
        out.push_str(&first.to_string());

        let mut address = first;
        while address != LAST_BLOCK {
            let next = self.get(address);
            if next != address + 1 {
                if address != begin {
                    out.push_str(&format!("-{address}"));
                }
                if next != LAST_BLOCK {
                    out.push_str(&format!("->{next}"));
                    begin = next;
                }
            }
            address = next;
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_chain_runs() {
        let mut fat = Fat::format(512);
        assert_eq!(fat.chain_runs(LAST_BLOCK), "");

        fat.set(17, LAST_BLOCK);
        assert_eq!(fat.chain_runs(17), "17");

        fat.set(17, 18);
        fat.set(18, 19);
        fat.set(19, LAST_BLOCK);
        assert_eq!(fat.chain_runs(17), "17-19");

        fat.set(19, 25);
        fat.set(25, 26);
        fat.set(26, LAST_BLOCK);
        assert_eq!(fat.chain_runs(17), "17-19->25-26");
    }

    #[test]
    fn test_data_address_per_block_size() {
        assert_eq!(Fat::data_address(512), 16);
        assert_eq!(Fat::data_address(1024), 8);
        assert_eq!(Fat::data_address(2048), 4);
        assert_eq!(Fat::data_address(4096), 2);
    }
}
