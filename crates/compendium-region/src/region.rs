//! Anvil region file: 32×32 chunks behind an 8 KiB header.
//!
//! ```text
//! [0, 4096)     1024 × [offset:u24][sectors:u8]   (offset/sectors in 4 KiB units)
//! [4096, 8192)  1024 × [timestamp:u32]
//! sector data   [length:u32][compression:u8][payload; length - 1]
//! ```
//!
//! Chunks whose payload cannot be decoded (LZ4, external `.mcc`, corrupt data)
//! are carried through as opaque bytes so saving never loses them.

use std::path::Path;

use bytes::BufMut;
use compendium_nbt::NbtRoot;
use tracing::{trace, warn};

use crate::compression::{self, ChunkCompression};
use crate::error::RegionError;

const SECTOR: usize = 4096;
const HEADER_LEN: usize = 2 * SECTOR;
const CHUNKS_PER_REGION: usize = 1024;

/// Payload of one chunk slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkPayload {
    /// Decoded tree, re-encoded with the same compression on save.
    Nbt {
        compression: ChunkCompression,
        root: NbtRoot,
    },
    /// Undecodable payload, written back verbatim.
    Opaque { compression_byte: u8, data: Vec<u8> },
}

/// One populated chunk slot.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionChunk {
    /// Local x within the region (0-31).
    pub x: u8,
    /// Local z within the region (0-31).
    pub z: u8,
    pub timestamp: u32,
    pub payload: ChunkPayload,
}

impl RegionChunk {
    /// The decoded tree, if this chunk could be decoded.
    pub fn nbt_mut(&mut self) -> Option<&mut NbtRoot> {
        match &mut self.payload {
            ChunkPayload::Nbt { root, .. } => Some(root),
            ChunkPayload::Opaque { .. } => None,
        }
    }
}

/// An in-memory region file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    chunks: Vec<RegionChunk>,
}

fn slot_index(x: u8, z: u8) -> usize {
    (x as usize & 31) + (z as usize & 31) * 32
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a region file image.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RegionError> {
        if data.len() < HEADER_LEN {
            return Err(RegionError::TooSmall(data.len()));
        }

        let mut chunks = Vec::new();
        for i in 0..CHUNKS_PER_REGION {
            let entry = read_u32(data, i * 4);
            let offset = (entry >> 8) as usize;
            let sectors = (entry & 0xFF) as usize;
            if offset < 2 || sectors == 0 {
                continue;
            }

            let x = (i % 32) as u8;
            let z = (i / 32) as u8;
            let timestamp = read_u32(data, SECTOR + i * 4);

            let start = offset * SECTOR;
            if start + 5 > data.len() {
                warn!("Chunk ({x}, {z}) points past end of region file, dropping entry");
                continue;
            }
            let length = read_u32(data, start) as usize;
            if length == 0 || start + 4 + length > data.len() {
                warn!("Chunk ({x}, {z}) has invalid length {length}, dropping entry");
                continue;
            }
            let compression_byte = data[start + 4];
            let raw = &data[start + 5..start + 4 + length];

            let payload = decode_payload(x, z, compression_byte, raw);
            chunks.push(RegionChunk {
                x,
                z,
                timestamp,
                payload,
            });
        }

        Ok(Self { chunks })
    }

    /// Serialize to a region file image, packing chunks into consecutive sectors.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RegionError> {
        let mut locations = vec![0u32; CHUNKS_PER_REGION];
        let mut timestamps = vec![0u32; CHUNKS_PER_REGION];
        let mut body: Vec<u8> = Vec::new();
        let mut next_sector = 2usize;

        for chunk in &self.chunks {
            let (compression_byte, payload) = match &chunk.payload {
                ChunkPayload::Nbt { compression, root } => {
                    let mut raw = Vec::new();
                    compendium_nbt::write_nbt(&mut raw, root);
                    (compression.to_byte(), compression::compress(&raw, *compression)?)
                }
                ChunkPayload::Opaque {
                    compression_byte,
                    data,
                } => (*compression_byte, data.clone()),
            };

            let total = 5 + payload.len();
            let sectors = total.div_ceil(SECTOR);
            if sectors > 0xFF {
                return Err(RegionError::ChunkTooLarge {
                    x: chunk.x,
                    z: chunk.z,
                    sectors,
                });
            }
            if next_sector + sectors > 0xFF_FFFF {
                return Err(RegionError::FileTooLarge);
            }

            let index = slot_index(chunk.x, chunk.z);
            locations[index] = ((next_sector as u32) << 8) | sectors as u32;
            timestamps[index] = chunk.timestamp;

            body.put_u32(payload.len() as u32 + 1);
            body.put_u8(compression_byte);
            body.extend_from_slice(&payload);
            body.resize(body.len() + (sectors * SECTOR - total), 0);
            next_sector += sectors;
        }

        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        for loc in locations {
            out.put_u32(loc);
        }
        for ts in timestamps {
            out.put_u32(ts);
        }
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn load(path: &Path) -> Result<Self, RegionError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn save(&self, path: &Path) -> Result<(), RegionError> {
        let data = self.to_bytes()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Insert or replace the chunk at its slot.
    pub fn insert(&mut self, chunk: RegionChunk) {
        match self.chunks.iter_mut().find(|c| c.x == chunk.x && c.z == chunk.z) {
            Some(existing) => *existing = chunk,
            None => self.chunks.push(chunk),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &RegionChunk> {
        self.chunks.iter()
    }

    pub fn chunks_mut(&mut self) -> impl Iterator<Item = &mut RegionChunk> {
        self.chunks.iter_mut()
    }
}

fn decode_payload(x: u8, z: u8, compression_byte: u8, raw: &[u8]) -> ChunkPayload {
    let opaque = || ChunkPayload::Opaque {
        compression_byte,
        data: raw.to_vec(),
    };

    let Some(compression) = ChunkCompression::from_byte(compression_byte) else {
        trace!("Chunk ({x}, {z}) uses compression {compression_byte}, keeping as-is");
        return opaque();
    };

    let decoded = compression::decompress(raw, compression)
        .map_err(|e| e.to_string())
        .and_then(|bytes| {
            compendium_nbt::read_nbt(&mut bytes.as_slice()).map_err(|e| e.to_string())
        });

    match decoded {
        Ok(root) => ChunkPayload::Nbt { compression, root },
        Err(e) => {
            warn!("Chunk ({x}, {z}) could not be decoded ({e}), keeping as-is");
            opaque()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compendium_nbt::{NbtCompound, NbtTag};

    fn chunk_root(x: i32, z: i32) -> NbtRoot {
        let mut c = NbtCompound::new();
        c.insert("xPos".into(), NbtTag::Int(x));
        c.insert("zPos".into(), NbtTag::Int(z));
        c.insert("block_entities".into(), NbtTag::List(vec![]));
        NbtRoot::new("", c)
    }

    fn nbt_chunk(x: u8, z: u8, compression: ChunkCompression) -> RegionChunk {
        RegionChunk {
            x,
            z,
            timestamp: 1_700_000_000 + x as u32,
            payload: ChunkPayload::Nbt {
                compression,
                root: chunk_root(x as i32, z as i32),
            },
        }
    }

    #[test]
    fn header_only_region_is_empty() {
        let region = Region::from_bytes(&vec![0u8; HEADER_LEN]).unwrap();
        assert!(region.is_empty());
    }

    #[test]
    fn too_small_is_rejected() {
        assert!(matches!(
            Region::from_bytes(&[0u8; 100]),
            Err(RegionError::TooSmall(100))
        ));
    }

    #[test]
    fn chunks_survive_save_and_load() {
        let mut region = Region::new();
        region.insert(nbt_chunk(0, 0, ChunkCompression::Zlib));
        region.insert(nbt_chunk(31, 5, ChunkCompression::Gzip));
        region.insert(nbt_chunk(7, 31, ChunkCompression::None));

        let bytes = region.to_bytes().unwrap();
        assert_eq!(bytes.len() % SECTOR, 0);

        let decoded = Region::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.len(), 3);
        for chunk in region.chunks() {
            let found = decoded
                .chunks()
                .find(|c| c.x == chunk.x && c.z == chunk.z)
                .unwrap();
            assert_eq!(found, chunk);
        }
    }

    #[test]
    fn location_entries_point_at_sectors() {
        let mut region = Region::new();
        region.insert(nbt_chunk(1, 0, ChunkCompression::Zlib));
        let bytes = region.to_bytes().unwrap();

        let entry = read_u32(&bytes, slot_index(1, 0) * 4);
        assert_eq!(entry >> 8, 2);
        assert_eq!(entry & 0xFF, 1);
        assert_eq!(read_u32(&bytes, SECTOR + 4), 1_700_000_001);
        assert_eq!(bytes[2 * SECTOR + 4], 2);
    }

    #[test]
    fn opaque_chunks_are_preserved() {
        let mut region = Region::new();
        region.insert(RegionChunk {
            x: 3,
            z: 4,
            timestamp: 9,
            payload: ChunkPayload::Opaque {
                compression_byte: 4,
                data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            },
        });
        let decoded = Region::from_bytes(&region.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, region);
    }

    #[test]
    fn corrupt_payload_becomes_opaque() {
        let mut region = Region::new();
        region.insert(RegionChunk {
            x: 0,
            z: 0,
            timestamp: 0,
            payload: ChunkPayload::Opaque {
                compression_byte: 2,
                data: vec![1, 2, 3],
            },
        });
        let mut decoded = Region::from_bytes(&region.to_bytes().unwrap()).unwrap();
        let chunk = decoded.chunks_mut().next().unwrap();
        assert!(chunk.nbt_mut().is_none());
        assert!(matches!(
            chunk.payload,
            ChunkPayload::Opaque { compression_byte: 2, .. }
        ));
    }

    #[test]
    fn insert_replaces_same_slot() {
        let mut region = Region::new();
        region.insert(nbt_chunk(2, 2, ChunkCompression::Zlib));
        region.insert(nbt_chunk(2, 2, ChunkCompression::Gzip));
        assert_eq!(region.len(), 1);
    }

    #[test]
    fn load_and_save_on_disk() {
        let dir =
            std::env::temp_dir().join(format!("compendium_region_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("r.0.0.mca");

        let mut region = Region::new();
        region.insert(nbt_chunk(4, 4, ChunkCompression::Zlib));
        region.save(&path).unwrap();

        let mut loaded = Region::load(&path).unwrap();
        let root = loaded.chunks_mut().next().unwrap().nbt_mut().unwrap();
        assert_eq!(root.compound["xPos"], NbtTag::Int(4));

        std::fs::remove_dir_all(&dir).ok();
    }
}
