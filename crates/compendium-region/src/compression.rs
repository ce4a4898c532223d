//! Per-chunk compression schemes used inside region files.

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

/// Set on the compression byte when the payload lives in a `c.<x>.<z>.mcc` file.
pub const EXTERNAL_FLAG: u8 = 0x80;

/// Compression schemes this crate can decode and re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkCompression {
    Gzip = 1,
    Zlib = 2,
    None = 3,
}

impl ChunkCompression {
    /// Map a compression byte to a supported scheme. LZ4 (4), custom (127)
    /// and externally stored payloads return `None`.
    pub fn from_byte(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Gzip),
            2 => Some(Self::Zlib),
            3 => Some(Self::None),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

pub fn decompress(data: &[u8], compression: ChunkCompression) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    match compression {
        ChunkCompression::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out)?;
        }
        ChunkCompression::Zlib => {
            ZlibDecoder::new(data).read_to_end(&mut out)?;
        }
        ChunkCompression::None => out.extend_from_slice(data),
    }
    Ok(out)
}

pub fn compress(data: &[u8], compression: ChunkCompression) -> std::io::Result<Vec<u8>> {
    match compression {
        ChunkCompression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        ChunkCompression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        ChunkCompression::None => Ok(data.to_vec()),
    }
}
