/// Signed 16-bit block address used throughout the on-image format.
pub type BlockAddress = i16;

/// Sector size of the underlying device. Blocks are whole multiples of it.
pub const SECTOR_SIZE: usize = 512;

/// Number of FAT entries. A format constant shared by the formatter and the
/// opener; it is not persisted in the image.
pub const FAT_ENTRIES: usize = 4096;

/// Byte size of the serialized FAT (little-endian i16 per entry).
pub const FAT_BYTES: usize = FAT_ENTRIES * 2;

/// FAT entry value marking an unallocated block.
pub const FREE_BLOCK: BlockAddress = 0;

/// FAT entry value terminating a chain.
pub const LAST_BLOCK: BlockAddress = -1;

/// Reserved partition identifier stored in the superblock.
pub const PARTITION_ID: u8 = 1;

/// Block sizes an image may be formatted with.
pub const BLOCK_SIZES: [u16; 4] = [512, 1024, 2048, 4096];

/// Upper bound on a single file or serialized directory, imposed by the
/// signed 16-bit `size` field of a directory entry.
pub const MAX_ENTRY_SIZE: usize = i16::MAX as usize;
