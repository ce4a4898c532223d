//! Whole-file NBT access with transparent compression.
//!
//! Java edition stores `level.dat`, player files and map definitions as
//! gzip-compressed NBT; some tools write them raw or zlib-wrapped. The
//! compression observed on read is kept so a rewritten file uses the same
//! framing as the original.

use std::io::{Read, Write};
use std::path::Path;

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::error::NbtError;
use crate::tag::NbtRoot;

/// Outer framing of an NBT file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCompression {
    Gzip,
    Zlib,
    None,
}

impl FileCompression {
    /// Guess the framing from the leading bytes.
    pub fn detect(data: &[u8]) -> Self {
        match data {
            [0x1F, 0x8B, ..] => FileCompression::Gzip,
            [0x78, second, ..] if (0x78u16 * 256 + *second as u16) % 31 == 0 => {
                FileCompression::Zlib
            }
            _ => FileCompression::None,
        }
    }
}

/// A decoded NBT file together with its original framing.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtFile {
    pub root: NbtRoot,
    pub compression: FileCompression,
}

impl NbtFile {
    pub fn new(root: NbtRoot, compression: FileCompression) -> Self {
        Self { root, compression }
    }

    /// Decode a file image, detecting its compression.
    pub fn from_bytes(data: &[u8]) -> Result<Self, NbtError> {
        let compression = FileCompression::detect(data);
        let raw = decompress(data, compression)?;
        let root = crate::read_nbt(&mut raw.as_slice())?;
        Ok(Self { root, compression })
    }

    /// Encode to a file image using the stored compression.
    pub fn to_bytes(&self) -> Result<Vec<u8>, NbtError> {
        let mut raw = Vec::new();
        crate::write_nbt(&mut raw, &self.root);
        compress(&raw, self.compression)
    }

    pub fn load(path: &Path) -> Result<Self, NbtError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn save(&self, path: &Path) -> Result<(), NbtError> {
        let data = self.to_bytes()?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

fn decompress(data: &[u8], compression: FileCompression) -> Result<Vec<u8>, NbtError> {
    let mut out = Vec::new();
    match compression {
        FileCompression::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out)?;
        }
        FileCompression::Zlib => {
            ZlibDecoder::new(data).read_to_end(&mut out)?;
        }
        FileCompression::None => out.extend_from_slice(data),
    }
    Ok(out)
}

fn compress(raw: &[u8], compression: FileCompression) -> Result<Vec<u8>, NbtError> {
    match compression {
        FileCompression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(raw)?;
            Ok(encoder.finish()?)
        }
        FileCompression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(raw)?;
            Ok(encoder.finish()?)
        }
        FileCompression::None => Ok(raw.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{NbtCompound, NbtTag};

    fn sample() -> NbtRoot {
        let mut data = NbtCompound::new();
        data.insert("scale".into(), NbtTag::Byte(0));
        data.insert("colors".into(), NbtTag::ByteArray(vec![4, 5, 6, -1]));
        let mut c = NbtCompound::new();
        c.insert("data".into(), NbtTag::Compound(data));
        c.insert("DataVersion".into(), NbtTag::Int(3953));
        NbtRoot::new("", c)
    }

    #[test]
    fn detect_framing() {
        assert_eq!(FileCompression::detect(&[0x1F, 0x8B, 8]), FileCompression::Gzip);
        assert_eq!(FileCompression::detect(&[0x78, 0x9C]), FileCompression::Zlib);
        assert_eq!(FileCompression::detect(&[0x0A, 0x00]), FileCompression::None);
        assert_eq!(FileCompression::detect(&[]), FileCompression::None);
    }

    #[test]
    fn gzip_file_keeps_framing() {
        let file = NbtFile::new(sample(), FileCompression::Gzip);
        let bytes = file.to_bytes().unwrap();
        assert_eq!(&bytes[..2], &[0x1F, 0x8B]);

        let decoded = NbtFile::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.compression, FileCompression::Gzip);
        assert_eq!(decoded.root, file.root);
    }

    #[test]
    fn uncompressed_file() {
        let file = NbtFile::new(sample(), FileCompression::None);
        let bytes = file.to_bytes().unwrap();
        assert_eq!(bytes[0], 0x0A);
        assert_eq!(NbtFile::from_bytes(&bytes).unwrap(), file);
    }

    #[test]
    fn load_and_save_on_disk() {
        let dir = std::env::temp_dir().join(format!("compendium_nbt_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("map_3.dat");

        let file = NbtFile::new(sample(), FileCompression::Zlib);
        file.save(&path).unwrap();
        let loaded = NbtFile::load(&path).unwrap();
        assert_eq!(loaded, file);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("compendium_nbt_does_not_exist.dat");
        assert!(matches!(NbtFile::load(&path), Err(NbtError::Io(_))));
    }
}
