//! Serialized form of directories: an ordered sequence of entries.

use crate::codec::{self, ByteReader};
use crate::config::BlockAddress;
use crate::error::Result;
use crate::structs::{DirEntry, FileAttributes};

/// Serializes all entries of a directory into one buffer, in storage order.
pub fn encode_directory(entries: &[DirEntry]) -> Vec<u8> {
    let mut buffer = Vec::new();
    for entry in entries {
        encode_entry(&mut buffer, entry);
    }
    buffer
}

fn encode_entry(buffer: &mut Vec<u8>, entry: &DirEntry) {
    codec::put_bool(buffer, entry.attributes.is_directory);
    codec::put_string(buffer, &entry.attributes.name);
    codec::put_i16(buffer, entry.attributes.size);
    codec::put_bool(buffer, entry.attributes.can_read);
    codec::put_bool(buffer, entry.attributes.can_write);
    codec::put_i64(buffer, entry.attributes.created);
    codec::put_i64(buffer, entry.attributes.last_modified);
    codec::put_i16(buffer, entry.first_block);
}

/// Decodes entries from chain data until `size` bytes are consumed. The
/// chain is block-padded, so the recorded byte length decides where the
/// directory ends.
pub fn decode_directory(buffer: &[u8], size: BlockAddress) -> Result<Vec<DirEntry>> {
    let size = size.max(0) as usize;
    let mut reader = ByteReader::new(buffer);
    let mut entries = Vec::new();
    while reader.offset() < size {
        entries.push(decode_entry(&mut reader)?);
    }
    Ok(entries)
}

fn decode_entry(reader: &mut ByteReader<'_>) -> Result<DirEntry> {
    Ok(DirEntry {
        attributes: FileAttributes {
            is_directory: reader.read_bool()?,
            name: reader.read_string()?,
            size: reader.read_i16()?,
            can_read: reader.read_bool()?,
            can_write: reader.read_bool()?,
            created: reader.read_i64()?,
            last_modified: reader.read_i64()?,
        },
        first_block: reader.read_i16()?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::LAST_BLOCK;

    #[test]
    fn test_directory_roundtrip() {
        let entries = vec![
            DirEntry {
                attributes: FileAttributes {
                    is_directory: true,
                    name: String::from("docs"),
                    size: 64,
                    can_read: true,
                    can_write: false,
                    created: 10,
                    last_modified: 20,
                },
                first_block: 17,
            },
            DirEntry::new(FileAttributes {
                name: String::from("notes.txt"),
                ..FileAttributes::default()
            }),
        ];

        let buffer = encode_directory(&entries);
        let decoded = decode_directory(&buffer, buffer.len() as BlockAddress).unwrap();
        assert_eq!(decoded, entries);
        assert_eq!(decoded[1].first_block, LAST_BLOCK);
    }

    #[test]
    fn test_decode_stops_at_recorded_size() {
        let entries = vec![DirEntry::new(FileAttributes::default())];
        let mut buffer = encode_directory(&entries);
        let size = buffer.len() as BlockAddress;
        // Chain data is padded to whole blocks; the padding must be ignored.
        buffer.resize(buffer.len() + 100, 0);

        let decoded = decode_directory(&buffer, size).unwrap();
        assert_eq!(decoded, entries);
    }
}
