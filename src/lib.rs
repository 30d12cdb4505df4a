//! minifat is a small FAT-style file system stored inside a single disk
//! image file, with a hierarchical namespace, per-entry read/write bits
//! and timestamps.
//!
//! On-image layout:
//! - Sector 0: superblock
//! - Blocks [0, data_address): the file allocation table
//! - Blocks [data_address, 4095]: data blocks (file bytes and serialized
//!   directories), with the root container pinned at data_address
//!
//! Layers (from bottom to top):
//! 1. Sector device: 512-byte random access over the image file.  | device
//! 2. Block I/O: logical blocks over runs of sectors.             | block
//! 3. FAT: block states, chain allocation and walking.            | fat
//! 4. Codec: little-endian length-prefixed record encoding.       | codec
//! 5. Directory store: entry lists serialized into chains.        | directory
//! 6. Engine: path resolution and the namespace operations.       | fs

mod block;
mod codec;
mod config;
mod device;
mod directory;
mod error;
mod fat;
mod fs;
mod path;
mod structs;
mod superblock;

pub use config::*;
pub use device::{DiskImage, SectorDevice};
pub use error::FsError as Error;
pub use error::Result;
pub use fs::FatFs;
pub use path::normalize;
pub use structs::{DirEntry, FileAttributes, Superblock};
