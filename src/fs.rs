//! The filesystem engine: resolves paths, maintains directories and drives
//! the chain allocator.
//!
//! One [`FatFs`] owns its device, the in-memory FAT and the superblock for
//! its whole lifetime. Every operation runs to completion before returning;
//! the engine is not reentrant and not safe for concurrent callers. Within
//! one mutation, writes are issued in the order data blocks, FAT, parent
//! directory, superblock — the window between the FAT persist and the
//! parent rewrite is the only partial-failure window and is accepted as is.

use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::config::{BlockAddress, BLOCK_SIZES, FAT_ENTRIES, LAST_BLOCK, MAX_ENTRY_SIZE};
use crate::device::SectorDevice;
use crate::directory::{decode_directory, encode_directory};
use crate::error::{FsError, Result};
use crate::fat::Fat;
use crate::path;
use crate::structs::{DirEntry, FileAttributes, Superblock};
use crate::superblock::{read_superblock, write_superblock};

enum Access {
    Read,
    Write,
}

#[derive(Debug)]
pub struct FatFs<D: SectorDevice> {
    device: D,
    superblock: Superblock,
    fat: Fat,
}

impl<D: SectorDevice> FatFs<D> {
    /// Formats a fresh image on `device` and mounts it.
    pub fn format(device: D, block_size: u16) -> Result<Self> {
        if !BLOCK_SIZES.contains(&block_size) {
            return Err(FsError::InvalidBlockSize { block_size });
        }

        let mut fs = FatFs {
            device,
            superblock: Superblock::new(block_size),
            fat: Fat::format(block_size),
        };

        // Seed the root container slot so its first write lands exactly on
        // the first data block.
        fs.fat.set(fs.data_address(), LAST_BLOCK);

        let now = now_nanos();
        let root = DirEntry::new(FileAttributes {
            is_directory: true,
            name: String::from("/"),
            created: now,
            last_modified: now,
            ..FileAttributes::default()
        });
        fs.write_directory("", &[root], false)?;

        write_superblock(&mut fs.device, &fs.superblock)?;
        fs.fat.store(&mut fs.device, block_size)?;

        info!("formatted image with block size {block_size}");
        Ok(fs)
    }

    /// Mounts an existing image: the superblock from sector 0, then the
    /// FAT from its reserved blocks.
    pub fn open(mut device: D) -> Result<Self> {
        let superblock = read_superblock(&mut device)?;
        let fat = Fat::load(&mut device, superblock.block_size)?;
        info!("opened image with block size {}", superblock.block_size);
        Ok(FatFs {
            device,
            superblock,
            fat,
        })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Number of FREE entries in the FAT.
    pub fn free_blocks(&self) -> usize {
        self.fat.free_count()
    }

    /// First data block; the FAT occupies every block before it. The root
    /// container always starts here.
    pub fn data_address(&self) -> BlockAddress {
        Fat::data_address(self.superblock.block_size)
    }

    /// Replaces the attributes of the entry at `path`.
    pub fn write_attributes(&mut self, path: &str, attributes: FileAttributes) -> Result<()> {
        check_external(path)?;
        let mut entry = self.read_directory_entry(path)?;
        entry.attributes = attributes;
        self.write_directory_entry(path, entry)
    }

    pub fn read_attributes(&mut self, path: &str) -> Result<FileAttributes> {
        check_external(path)?;
        Ok(self.read_directory_entry(path)?.attributes)
    }

    /// Creates an empty directory at `path`.
    pub fn create_directory(&mut self, path: &str) -> Result<()> {
        check_external(path)?;
        let parent_path = path::parent(path);
        self.check_permission(&parent_path, Access::Write)?;

        let mut parent = self.read_directory(&parent_path)?;
        let name = path::file_name(path);

        if parent.iter().any(|entry| entry.attributes.name == name) {
            return Err(FsError::FileExists(path.to_string()));
        }

        let now = now_nanos();
        parent.push(DirEntry::new(FileAttributes {
            is_directory: true,
            name: name.to_string(),
            created: now,
            last_modified: now,
            ..FileAttributes::default()
        }));
        self.write_directory(&parent_path, &parent, true)?;
        Ok(())
    }

    /// Lists `path`: children in stored order for a directory, the entry
    /// itself for a file.
    pub fn list_directory(&mut self, path: &str) -> Result<Vec<FileAttributes>> {
        check_external(path)?;
        self.check_permission(path, Access::Read)?;

        let attributes = self.read_attributes(path)?;
        if !attributes.is_directory {
            return Ok(vec![attributes]);
        }

        let directory = self.read_directory(path)?;
        Ok(directory.into_iter().map(|entry| entry.attributes).collect())
    }

    /// Deletes the directory at `path` and, recursively, everything below
    /// it, reclaiming all of their blocks.
    pub fn delete_directory(&mut self, path: &str) -> Result<()> {
        check_external(path)?;
        self.check_permission(path, Access::Write)?;

        let own = self.read_directory(path)?;
        let parent_path = path::parent(path);
        let mut parent = self.read_directory(&parent_path)?;
        let name = path::file_name(path).to_string();

        for entry in &own {
            if entry.attributes.is_directory {
                self.delete_directory(&path::join(path, &entry.attributes.name))?;
            } else {
                let block_size = self.superblock.block_size;
                self.fat
                    .free_chain(&mut self.device, block_size, entry.first_block)?;
            }
        }

        // Re-resolve: the recursion rewrites this directory and may have
        // moved its chain.
        let (address, _) = self.resolve(path)?;
        let block_size = self.superblock.block_size;
        self.fat.free_chain(&mut self.device, block_size, address)?;

        if let Some(at) = parent.iter().position(|entry| entry.attributes.name == name) {
            parent.remove(at);
            self.write_directory(&parent_path, &parent, true)?;
        }
        Ok(())
    }

    /// Writes `data` to the file at `path`, creating the file when absent.
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        check_external(path)?;
        if data.len() > MAX_ENTRY_SIZE {
            return Err(FsError::FileTooLarge(path.to_string()));
        }

        match self.check_is_directory(path, false) {
            Ok(()) => {
                // Overwrite in place, scanning from the old first block so
                // a steady-state rewrite reuses its blocks.
                self.check_permission(path, Access::Write)?;
                let (address, _) = self.resolve(path)?;
                let block_size = self.superblock.block_size;
                let address = self
                    .fat
                    .write_chain(&mut self.device, block_size, address, data)?;

                let mut entry = self.read_directory_entry(path)?;
                entry.attributes.size = data.len() as BlockAddress;
                entry.attributes.last_modified = now_nanos();
                entry.first_block = address;
                self.write_directory_entry(path, entry)
            }
            Err(FsError::NoSuchFileOrDirectory(_)) => {
                // Create a new file in the parent.
                let parent_path = path::parent(path);
                self.check_permission(&parent_path, Access::Write)?;

                let block_size = self.superblock.block_size;
                let address = self
                    .fat
                    .write_chain(&mut self.device, block_size, LAST_BLOCK, data)?;

                let now = now_nanos();
                let mut parent = self.read_directory(&parent_path)?;
                parent.push(DirEntry {
                    attributes: FileAttributes {
                        name: path::file_name(path).to_string(),
                        size: data.len() as BlockAddress,
                        created: now,
                        last_modified: now,
                        ..FileAttributes::default()
                    },
                    first_block: address,
                });
                self.write_directory(&parent_path, &parent, true)?;
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Reads the file at `path`, trimmed to its recorded size.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        check_external(path)?;
        self.check_is_directory(path, false)?;
        self.check_permission(path, Access::Read)?;

        let (address, size) = self.resolve(path)?;
        let mut data =
            self.fat
                .read_chain(&mut self.device, self.superblock.block_size, address)?;
        data.truncate(size.max(0) as usize);
        Ok(data)
    }

    /// Deletes the file at `path`, reclaiming its blocks.
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        check_external(path)?;
        self.check_is_directory(path, false)?;
        self.check_permission(path, Access::Write)?;

        let parent_path = path::parent(path);
        let mut parent = self.read_directory(&parent_path)?;
        let name = path::file_name(path);

        let (address, _) = self.resolve(path)?;
        let block_size = self.superblock.block_size;
        self.fat.free_chain(&mut self.device, block_size, address)?;

        if let Some(at) = parent.iter().position(|entry| entry.attributes.name == name) {
            parent.remove(at);
            self.write_directory(&parent_path, &parent, true)?;
        }
        Ok(())
    }

    /// Applies a chmod mode string such as `+r`, `-w` or `+r-w`.
    pub fn chmod(&mut self, path: &str, mode: &str) -> Result<()> {
        let mut attributes = self.read_attributes(path)?;
        attributes.apply_mode(mode, path)?;
        self.write_attributes(path, attributes)
    }

    /// Renders a diagnostic overview: allocation counters plus the
    /// directory tree with each entry's block-chain runs.
    pub fn dump(&mut self) -> Result<String> {
        let mut file_count = 0;
        let mut directory_count = 0;
        let tree = self.dump_directory("", 0, &mut file_count, &mut directory_count)?;

        let mut out = String::new();
        out.push_str(&format!("Block count: {FAT_ENTRIES}\n"));
        out.push_str(&format!("Free blocks: {}\n", self.fat.free_count()));
        out.push_str(&format!("Block size: {}\n", self.superblock.block_size));
        out.push_str(&format!("File count: {file_count}\n"));
        out.push_str(&format!("Directory count: {directory_count}\n"));
        out.push_str(&tree);
        Ok(out)
    }

    fn dump_directory(
        &mut self,
        path: &str,
        indent: usize,
        file_count: &mut usize,
        directory_count: &mut usize,
    ) -> Result<String> {
        let mut out = String::new();
        let directory = self.read_directory(path)?;

        for entry in &directory {
            out.push_str(&" ".repeat(indent));
            out.push_str(&entry.attributes.name);
            out.push(' ');
            out.push_str(&self.fat.chain_runs(entry.first_block));
            out.push('\n');

            if entry.attributes.is_directory {
                *directory_count += 1;
                out.push_str(&self.dump_directory(
                    &path::join(path, &entry.attributes.name),
                    indent + 2,
                    file_count,
                    directory_count,
                )?);
            } else {
                *file_count += 1;
            }
        }
        Ok(out)
    }

    /// Resolves `path` to the first block and byte size of whatever it
    /// names. The empty path is the root container itself.
    fn resolve(&mut self, path: &str) -> Result<(BlockAddress, BlockAddress)> {
        let mut address = self.data_address();
        let mut size = self.superblock.root_directory_entry_size;

        if path.is_empty() {
            return Ok((address, size));
        }

        let mut directory = self.read_directory_at(address, size)?;
        let mut file_found = false;
        let mut walked = String::new();

        for component in path::components(path) {
            if file_found {
                return Err(FsError::NotADirectory(walked));
            }
            walked = path::join(&walked, component);

            let (first_block, entry_size, is_directory) = directory
                .iter()
                .find(|entry| entry.attributes.name == component)
                .map(|entry| {
                    (
                        entry.first_block,
                        entry.attributes.size,
                        entry.attributes.is_directory,
                    )
                })
                .ok_or_else(|| FsError::NoSuchFileOrDirectory(walked.clone()))?;

            address = first_block;
            size = entry_size;
            if is_directory {
                directory = self.read_directory_at(address, size)?;
            } else {
                file_found = true;
            }
        }

        Ok((address, size))
    }

    fn read_directory_at(
        &mut self,
        address: BlockAddress,
        size: BlockAddress,
    ) -> Result<Vec<DirEntry>> {
        let buffer =
            self.fat
                .read_chain(&mut self.device, self.superblock.block_size, address)?;
        decode_directory(&buffer, size)
    }

    fn read_directory(&mut self, path: &str) -> Result<Vec<DirEntry>> {
        self.check_is_directory(path, true)?;
        let (address, size) = self.resolve(path)?;
        self.read_directory_at(address, size)
    }

    /// Serializes and stores a directory, then propagates the new size and
    /// first block upward: into the superblock for the root container, or
    /// into the directory's entry in its parent otherwise. The parent
    /// rewrite is skipped when nothing changed, which bounds the recursion
    /// by tree depth. Returns the serialized byte length.
    fn write_directory(
        &mut self,
        path: &str,
        entries: &[DirEntry],
        update_mtime: bool,
    ) -> Result<BlockAddress> {
        self.check_is_directory(path, true)?;

        let buffer = encode_directory(entries);
        if buffer.len() > MAX_ENTRY_SIZE {
            return Err(FsError::FileTooLarge(path.to_string()));
        }

        let (address, _) = self.resolve(path)?;
        let block_size = self.superblock.block_size;
        let address = self
            .fat
            .write_chain(&mut self.device, block_size, address, &buffer)?;

        if path.is_empty() {
            self.superblock.root_directory_entry_size = buffer.len() as BlockAddress;
            write_superblock(&mut self.device, &self.superblock)?;
        } else {
            let mut entry = self.read_directory_entry(path)?;
            let mut updated = false;

            if entry.attributes.size as usize != buffer.len() || entry.first_block != address {
                entry.attributes.size = buffer.len() as BlockAddress;
                entry.first_block = address;
                updated = true;
            }
            if update_mtime {
                entry.attributes.last_modified = now_nanos();
                updated = true;
            }
            if updated {
                self.write_directory_entry(path, entry)?;
            }
        }

        Ok(buffer.len() as BlockAddress)
    }

    /// Looks up the entry for `path` inside its parent directory.
    fn read_directory_entry(&mut self, path: &str) -> Result<DirEntry> {
        let parent = self.read_directory(&path::parent(path))?;
        let name = path::file_name(path);

        parent
            .into_iter()
            .find(|entry| entry.attributes.name == name)
            .ok_or_else(|| FsError::NoSuchFileOrDirectory(path.to_string()))
    }

    fn write_directory_entry(&mut self, path: &str, entry: DirEntry) -> Result<()> {
        let parent_path = path::parent(path);
        let mut parent = self.read_directory(&parent_path)?;
        let name = path::file_name(path);

        if let Some(at) = parent.iter().position(|stored| stored.attributes.name == name) {
            parent[at] = entry;
            self.write_directory(&parent_path, &parent, false)?;
            Ok(())
        } else {
            Err(FsError::NoSuchFileOrDirectory(path.to_string()))
        }
    }

    fn check_is_directory(&mut self, path: &str, should_be_directory: bool) -> Result<()> {
        let is_directory =
            path.is_empty() || self.read_directory_entry(path)?.attributes.is_directory;
        if should_be_directory && !is_directory {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        if !should_be_directory && is_directory {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        Ok(())
    }

    fn check_permission(&mut self, path: &str, access: Access) -> Result<()> {
        // The root container has no attributes and passes every check.
        if path.is_empty() {
            return Ok(());
        }

        let attributes = self.read_directory_entry(path)?.attributes;
        let allowed = match access {
            Access::Read => attributes.can_read,
            Access::Write => attributes.can_write,
        };
        if !allowed {
            return Err(FsError::Permission(path.to_string()));
        }
        Ok(())
    }
}

/// Engine paths must be absolute. The empty path is the root-container
/// sentinel and stays internal; a relative path would resolve against the
/// container too, so both are rejected here.
fn check_external(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(FsError::NoSuchFileOrDirectory(path.to_string()));
    }
    Ok(())
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or(0)
}
