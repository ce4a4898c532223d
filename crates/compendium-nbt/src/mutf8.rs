//! Java "modified UTF-8" string encoding.
//!
//! Identical to UTF-8 except that NUL is written as `C0 80` and characters
//! outside the BMP are written as a surrogate pair, three bytes per half.

use std::borrow::Cow;

use crate::error::NbtError;

/// Decode an NBT string payload.
pub(crate) fn decode(bytes: &[u8]) -> Result<String, NbtError> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_owned()),
        Err(_) => decode_modified(bytes),
    }
}

fn decode_modified(bytes: &[u8]) -> Result<String, NbtError> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < 0x80 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = continuation(bytes, i + 1)?;
            units.push((((b & 0x1F) as u16) << 6) | b2);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            units.push((((b & 0x0F) as u16) << 12) | (b2 << 6) | b3);
            i += 3;
        } else {
            return Err(NbtError::InvalidUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| NbtError::InvalidUtf8)
}

fn continuation(bytes: &[u8], index: usize) -> Result<u16, NbtError> {
    match bytes.get(index) {
        Some(&b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        _ => Err(NbtError::InvalidUtf8),
    }
}

/// Encode a string for an NBT payload. Borrows when no escaping is needed.
pub(crate) fn encode(s: &str) -> Cow<'_, [u8]> {
    if !s.chars().any(|c| c == '\0' || c as u32 > 0xFFFF) {
        return Cow::Borrowed(s.as_bytes());
    }

    let mut out = Vec::with_capacity(s.len() + 8);
    for c in s.chars() {
        if c == '\0' {
            out.extend_from_slice(&[0xC0, 0x80]);
        } else if c as u32 > 0xFFFF {
            let mut pair = [0u16; 2];
            for unit in c.encode_utf16(&mut pair) {
                out.push(0xE0 | (*unit >> 12) as u8);
                out.push(0x80 | ((*unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (*unit & 0x3F) as u8);
            }
        } else {
            let mut tmp = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_borrowed() {
        assert!(matches!(encode("minecraft:filled_map"), Cow::Borrowed(_)));
    }

    #[test]
    fn nul_uses_two_bytes() {
        assert_eq!(encode("a\0b").as_ref(), &[b'a', 0xC0, 0x80, b'b']);
        assert_eq!(decode(&[b'a', 0xC0, 0x80, b'b']).unwrap(), "a\0b");
    }

    #[test]
    fn supplementary_char_uses_surrogates() {
        let encoded = encode("🗺");
        assert_eq!(encoded.len(), 6);
        assert_eq!(encoded[0], 0xED);
        assert_eq!(decode(&encoded).unwrap(), "🗺");
    }

    #[test]
    fn standard_four_byte_utf8_is_accepted() {
        assert_eq!(decode("🗺".as_bytes()).unwrap(), "🗺");
    }

    #[test]
    fn truncated_sequence_is_rejected() {
        assert!(matches!(decode(&[0xE0, 0x80]), Err(NbtError::InvalidUtf8)));
    }
}
